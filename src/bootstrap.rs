//! Homebrew provisioning
//!
//! Runs once before any install. Finds `brew` (installing it if the user
//! agrees) and folds `brew shellenv` into the environment snapshot. This is
//! the only step whose failure ends the process.

use tracing::{info, warn};

use crate::command_runner::CommandRunner;
use crate::environment::{Environment, HOMEBREW_PATHS, apply_shellenv};
use crate::error::{Result, SetupError};

pub const INSTALL_PROMPT: &str = "Homebrew is not installed. Install Homebrew?";

/// Outcome of [`ensure_homebrew`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrewStatus {
    /// `brew` was already on `PATH` (possibly after adding the usual prefixes)
    Present,
    /// Installed during this run
    Installed,
    /// User declined the install (or could not be asked); brew packages will fail
    Declined,
    /// Dry run: the install was only logged
    Simulated,
}

/// `bash -c "$(curl -fsSL <url>)"`, Homebrew's documented install line
pub fn install_command(url: &str) -> String {
    format!("/bin/bash -c \"$(curl -fsSL {})\"", url)
}

/// Make sure Homebrew is usable and return the updated environment.
///
/// `confirm` is asked before installing. Declining, or a prompt that fails,
/// is not an error. An install that fails, or that leaves no `brew` behind,
/// is [`SetupError::Bootstrap`].
pub fn ensure_homebrew<F>(
    runner: &mut dyn CommandRunner,
    env: Environment,
    install_url: &str,
    mut confirm: F,
) -> Result<(Environment, BrewStatus)>
where
    F: FnMut(&str) -> Result<bool>,
{
    let mut env = with_homebrew_paths(env);

    let status = if env.find_tool("brew").is_some() {
        BrewStatus::Present
    } else if !accepted(&mut confirm) {
        warn!("Continuing without Homebrew; Homebrew packages will fail");
        return Ok((env, BrewStatus::Declined));
    } else {
        install_homebrew(runner, &env, install_url)?;
        if runner.is_dry_run() {
            return Ok((env, BrewStatus::Simulated));
        }
        if env.find_tool("brew").is_none() {
            return Err(SetupError::bootstrap(
                "installer finished but brew is still not on PATH",
            ));
        }
        BrewStatus::Installed
    };

    match runner.query("brew shellenv", &env) {
        Ok(output) if output.success => env = apply_shellenv(env, &output.stdout),
        Ok(output) => warn!(
            "`brew shellenv` exited with code {}; keeping current PATH",
            output.exit_code.unwrap_or(-1)
        ),
        Err(e) => warn!("`brew shellenv` could not run: {}", e),
    }
    Ok((env, status))
}

/// A prompt that cannot be answered (no TTY, closed stdin) counts as "no"
fn accepted<F>(confirm: &mut F) -> bool
where
    F: FnMut(&str) -> Result<bool>,
{
    match confirm(INSTALL_PROMPT) {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Could not ask about installing Homebrew: {}", e);
            false
        }
    }
}

/// Returns `env` with the Homebrew bin directories on `PATH` if `brew`
/// lives in one of them; otherwise `env` unchanged.
fn with_homebrew_paths(env: Environment) -> Environment {
    if env.find_tool("brew").is_some() {
        return env;
    }
    let mut candidate = env.clone();
    for dir in HOMEBREW_PATHS.iter().rev() {
        candidate.prepend_path(dir);
    }
    if candidate.find_tool("brew").is_some() {
        info!("Found brew outside PATH, adding Homebrew directories");
        candidate
    } else {
        env
    }
}

fn install_homebrew(runner: &mut dyn CommandRunner, env: &Environment, url: &str) -> Result<()> {
    info!("Installing Homebrew from {}", url);

    // The installer refuses to run as root but needs a live sudo ticket
    let auth = runner.run("true", true, env)?;
    if !auth.success {
        return Err(SetupError::bootstrap("could not authenticate with sudo"));
    }

    let mut install_env = env.clone();
    install_env.set("NONINTERACTIVE", "1");
    let command = install_command(url);
    let output = runner.run(&command, false, &install_env)?;
    if !output.success {
        return Err(SetupError::bootstrap(format!(
            "install script exited with code {}",
            output.exit_code.unwrap_or(-1)
        )));
    }
    Ok(())
}

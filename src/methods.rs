//! Install handlers, one per [`InstallMethod`].
//!
//! Each handler checks that the tool it drives is on the tracked `PATH`
//! before running anything, and reports failure as a [`SetupError`]. The
//! orchestrator decides what a failure means for the run.

use tracing::{info, warn};

use crate::catalog::PackageDescriptor;
use crate::command_runner::CommandRunner;
use crate::environment::Environment;
use crate::error::{Result, SetupError};
use crate::types::InstallMethod;

/// Everything a handler may touch.
pub struct InstallContext<'a> {
    pub runner: &'a mut dyn CommandRunner,
    /// Snapshot passed to commands; handlers may extend `PATH`
    pub env: &'a mut Environment,
    /// Ruby installed when rbenv offers no usable version
    pub ruby_fallback_version: &'a str,
}

/// Install one package with the handler its method tag selects.
pub fn install_package(descriptor: &PackageDescriptor, ctx: &mut InstallContext<'_>) -> Result<()> {
    match descriptor.method {
        InstallMethod::PackageManager => install_with_brew(descriptor, ctx),
        InstallMethod::VersionManagerCustom => install_with_rbenv(descriptor, ctx),
        InstallMethod::LanguagePackageManager => install_with_gem(descriptor, ctx),
        InstallMethod::DownloadScript => install_with_script(descriptor, ctx),
        InstallMethod::Direct => install_direct(descriptor, ctx),
    }
}

fn require_tool(method: InstallMethod, env: &Environment) -> Result<()> {
    match method.required_tool() {
        Some(tool) if env.find_tool(tool).is_none() => Err(SetupError::missing_tool(tool)),
        _ => Ok(()),
    }
}

fn install_command(descriptor: &PackageDescriptor) -> Result<&str> {
    descriptor.install_command.as_deref().ok_or_else(|| {
        SetupError::descriptor(format!("{} has no install command", descriptor.id))
    })
}

fn run_install_command(descriptor: &PackageDescriptor, ctx: &mut InstallContext<'_>) -> Result<()> {
    let command = install_command(descriptor)?;
    ctx.runner
        .run(command, descriptor.requires_privilege, ctx.env)?
        .ensure_success(command)?;
    Ok(())
}

fn install_with_brew(descriptor: &PackageDescriptor, ctx: &mut InstallContext<'_>) -> Result<()> {
    require_tool(InstallMethod::PackageManager, ctx.env)?;
    run_install_command(descriptor, ctx)
}

fn install_with_gem(descriptor: &PackageDescriptor, ctx: &mut InstallContext<'_>) -> Result<()> {
    require_tool(InstallMethod::LanguagePackageManager, ctx.env)?;
    run_install_command(descriptor, ctx)
}

fn install_with_script(descriptor: &PackageDescriptor, ctx: &mut InstallContext<'_>) -> Result<()> {
    require_tool(InstallMethod::DownloadScript, ctx.env)?;
    run_install_command(descriptor, ctx)
}

fn install_direct(descriptor: &PackageDescriptor, ctx: &mut InstallContext<'_>) -> Result<()> {
    run_install_command(descriptor, ctx)
}

// ============================================================================
// rbenv
// ============================================================================

/// Commands that list installable Ruby versions, newest rbenv first
const RBENV_LIST_COMMANDS: [&str; 2] = ["rbenv install --list-all", "rbenv install -l"];

/// Pick the lexicographically last plain `MAJOR.MINOR.PATCH` entry from an
/// rbenv listing.
///
/// Pre-releases (`3.4.0-preview1`), other interpreters (`jruby-9.4.5.0`)
/// and headers are ignored. Entries compare as strings, so 3.3.9 sorts
/// after 3.3.10.
pub fn select_latest_version(listing: &str) -> Option<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| crate::config::is_plain_version(line))
        .max()
        .map(str::to_string)
}

fn latest_ruby_version(ctx: &mut InstallContext<'_>) -> String {
    for command in RBENV_LIST_COMMANDS {
        match ctx.runner.query(command, ctx.env) {
            Ok(output) if output.success => {
                if let Some(version) = select_latest_version(&output.stdout) {
                    return version;
                }
            }
            Ok(output) => info!(
                "`{}` exited with code {}",
                command,
                output.exit_code.unwrap_or(-1)
            ),
            Err(e) => warn!("`{}` could not run: {}", command, e),
        }
    }

    warn!(
        "No stable Ruby found in rbenv listing, falling back to {}",
        ctx.ruby_fallback_version
    );
    ctx.ruby_fallback_version.to_string()
}

fn install_with_rbenv(descriptor: &PackageDescriptor, ctx: &mut InstallContext<'_>) -> Result<()> {
    require_tool(InstallMethod::VersionManagerCustom, ctx.env)?;

    let version = latest_ruby_version(ctx);
    info!("Installing {} {}", descriptor.name, version);

    for command in [
        format!("rbenv install -s {}", version),
        format!("rbenv global {}", version),
    ] {
        ctx.runner
            .run(&command, descriptor.requires_privilege, ctx.env)?
            .ensure_success(&command)?;
    }

    // gem and friends must resolve to the rbenv Ruby from here on
    if let Some(home) = ctx.env.home().map(str::to_string) {
        ctx.env.prepend_path(&format!("{}/.rbenv/shims", home));
    }
    Ok(())
}

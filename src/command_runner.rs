//! Command execution
//!
//! Every external command devsetup issues goes through a [`CommandRunner`].
//! The shell implementation runs `/bin/sh -c <command>` with the tracked
//! [`Environment`], in its own process group, registered with the
//! [`ChildRegistry`] for the duration of the call.
//!
//! # Two kinds of call
//!
//! - `run`: installs and follow-ups. Output streams to the terminal. In
//!   dry-run mode nothing is executed and success is reported.
//! - `query`: read-only checks (presence checks, `brew shellenv`,
//!   `rbenv install --list-all`). Output is captured and they always
//!   execute, even in dry-run mode, so plans reflect the real machine.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::environment::Environment;
use crate::error::{Result, SetupError};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};

/// Shell used for every command
pub const SHELL: &str = "/bin/sh";

/// Output from one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output (empty for streamed `run` calls)
    pub stdout: String,
    /// Captured standard error (empty for streamed `run` calls)
    pub stderr: String,
    /// Exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CommandOutput {
    pub fn succeeded() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            success: false,
            ..Self::default()
        }
    }

    /// Turn an unsuccessful exit into `SetupError::Command`.
    pub fn ensure_success(self, command: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(SetupError::command(command, self.exit_code))
        }
    }
}

/// Executes shell commands on behalf of the installer.
pub trait CommandRunner {
    /// Run a state-changing command. `privileged` wraps it with sudo.
    fn run(&mut self, command: &str, privileged: bool, env: &Environment) -> Result<CommandOutput>;

    /// Run a read-only command and capture its output.
    fn query(&mut self, command: &str, env: &Environment) -> Result<CommandOutput>;

    /// Presence check: exit status zero means installed. A check that
    /// cannot be spawned counts as not installed.
    fn is_present(&mut self, check_command: &str, env: &Environment) -> bool {
        match self.query(check_command, env) {
            Ok(output) => output.success,
            Err(e) => {
                debug!("Presence check `{}` errored: {}", check_command, e);
                false
            }
        }
    }

    /// Whether `run` only pretends
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Where the sudo password comes from
pub trait CredentialSource {
    fn password(&mut self) -> Result<String>;
}

/// Hidden-input terminal prompt
#[derive(Debug, Default)]
pub struct TerminalPassword;

impl CredentialSource for TerminalPassword {
    fn password(&mut self) -> Result<String> {
        let password = dialoguer::Password::new()
            .with_prompt("Password (for sudo)")
            .interact()?;
        Ok(password)
    }
}

/// Runs commands through `/bin/sh`.
pub struct ShellRunner {
    dry_run: bool,
    credentials: Box<dyn CredentialSource>,
    /// Asked for at most once per process
    password: Option<String>,
}

impl ShellRunner {
    pub fn new(dry_run: bool) -> Self {
        Self::with_credentials(dry_run, Box::new(TerminalPassword))
    }

    pub fn with_credentials(dry_run: bool, credentials: Box<dyn CredentialSource>) -> Self {
        Self {
            dry_run,
            credentials,
            password: None,
        }
    }

    fn sudo_password(&mut self, env: &Environment) -> Result<Option<String>> {
        if let Some(password) = &self.password {
            return Ok(Some(password.clone()));
        }

        // Cached sudo timestamp or NOPASSWD: nothing to ask
        if self.query("sudo -n true", env).map(|o| o.success).unwrap_or(false) {
            return Ok(None);
        }

        let password = self.credentials.password()?;
        self.password = Some(password.clone());
        Ok(Some(password))
    }

    /// After a failed privileged run: if sudo still has no valid session, the
    /// cached password was wrong and must be asked for again.
    fn forget_rejected_password(&mut self, env: &Environment) {
        if self.password.is_none() {
            return;
        }
        if !self.query("sudo -n true", env).map(|o| o.success).unwrap_or(false) {
            warn!("sudo did not accept the password; it will be asked for again");
            self.password = None;
        }
    }

    fn execute(
        &self,
        mut cmd: Command,
        label: &str,
        stdin_payload: Option<String>,
        capture: bool,
    ) -> Result<CommandOutput> {
        cmd.in_new_process_group();
        if stdin_payload.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }
        if capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = cmd.spawn()?;
        let pid = child.id();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid, label);
        }

        if let (Some(payload), Some(mut stdin)) = (stdin_payload, child.stdin.take()) {
            // sudo may already be satisfied and never read; a broken pipe is fine
            let _ = writeln!(stdin, "{}", payload);
        }

        let waited = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }
        let output = waited?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            success: output.status.success(),
        })
    }
}

fn shell_command(command: &str, env: &Environment) -> Command {
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c").arg(command).env_clear().envs(env.vars());
    cmd
}

/// `sudo -S -p '' /bin/sh -c <command>`: password on stdin, no prompt text
fn sudo_command(command: &str, env: &Environment) -> Command {
    let mut cmd = Command::new("sudo");
    cmd.args(["-S", "-p", "", SHELL, "-c", command])
        .env_clear()
        .envs(env.vars());
    cmd
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, command: &str, privileged: bool, env: &Environment) -> Result<CommandOutput> {
        if self.dry_run {
            info!(
                "[dry-run] would run{}: {}",
                if privileged { " with sudo" } else { "" },
                command
            );
            return Ok(CommandOutput::succeeded());
        }

        info!("Running: {}", command);
        let output = if privileged {
            let password = self.sudo_password(env)?;
            let output = self.execute(sudo_command(command, env), command, password, false)?;
            if !output.success {
                self.forget_rejected_password(env);
            }
            output
        } else {
            self.execute(shell_command(command, env), command, None, false)?
        };

        if !output.success {
            info!(
                "`{}` exited with code {}",
                command,
                output.exit_code.unwrap_or(-1)
            );
        }
        Ok(output)
    }

    fn query(&mut self, command: &str, env: &Environment) -> Result<CommandOutput> {
        debug!("Query: {}", command);
        self.execute(shell_command(command, env), command, None, true)
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

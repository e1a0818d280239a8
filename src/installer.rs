//! Installation orchestrator
//!
//! Resolves a request into an install order and walks it one package at a
//! time.
//!
//! # Failure Policy
//!
//! Best effort, report at the end. A package whose install fails is recorded
//! and the walk moves on, even if a later package depends on it. Follow-up
//! commands never turn an install into a failure.

use std::fmt;

use tracing::{info, warn};

use crate::catalog::{Catalog, PackageDescriptor};
use crate::command_runner::CommandRunner;
use crate::environment::Environment;
use crate::error::Result;
use crate::logic::resolver::{ResolveWarning, resolve};
use crate::methods::{InstallContext, install_package};

/// A package that could not be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPackage {
    pub id: String,
    pub reason: String,
}

/// Result of one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Present after the run, in install order (includes `already_present`)
    pub installed: Vec<String>,
    pub failed: Vec<FailedPackage>,
    /// Subset of `installed` whose presence check passed up front
    pub already_present: Vec<String>,
    /// Parts of the request that could not be ordered
    pub warnings: Vec<ResolveWarning>,
    /// Installs were only simulated
    pub dry_run: bool,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.warnings.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }

    /// Process exit status for this run. Failed packages and skipped parts
    /// of the request are reported in the summary only; the status stays 0.
    pub fn exit_code(&self) -> u8 {
        0
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} installed ({} already present), {} failed",
            self.installed.len(),
            self.already_present.len(),
            self.failed.len()
        )
    }
}

/// Drives one or more install runs over a catalog.
pub struct Orchestrator<'c, R: CommandRunner> {
    catalog: &'c Catalog,
    runner: R,
    env: Environment,
    ruby_fallback_version: String,
}

impl<'c, R: CommandRunner> Orchestrator<'c, R> {
    pub fn new(catalog: &'c Catalog, runner: R, env: Environment) -> Self {
        Self {
            catalog,
            runner,
            env,
            ruby_fallback_version: crate::config::DEFAULT_RUBY_VERSION.to_string(),
        }
    }

    pub fn with_ruby_fallback(mut self, version: impl Into<String>) -> Self {
        self.ruby_fallback_version = version.into();
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn set_environment(&mut self, env: Environment) {
        self.env = env;
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut R {
        &mut self.runner
    }

    pub fn into_parts(self) -> (R, Environment) {
        (self.runner, self.env)
    }

    /// Whether `descriptor` is already installed, per its check command
    pub fn is_present(&mut self, descriptor: &PackageDescriptor) -> bool {
        self.runner.is_present(&descriptor.check_command, &self.env)
    }

    /// Resolve `requested` and install every package in order.
    pub fn install<S: AsRef<str>>(&mut self, requested: &[S]) -> RunOutcome {
        let resolution = resolve(self.catalog, requested);
        for warning in &resolution.warnings {
            warn!("Skipping part of the request: {}", warning);
        }

        let mut outcome = RunOutcome {
            warnings: resolution.warnings,
            dry_run: self.runner.is_dry_run(),
            ..RunOutcome::default()
        };

        let catalog = self.catalog;
        let total = resolution.order.len();
        for (step, id) in resolution.order.iter().enumerate() {
            let Some(descriptor) = catalog.get(id) else {
                continue;
            };

            if self.is_present(descriptor) {
                info!("[{}/{}] {} is already installed", step + 1, total, descriptor.name);
                outcome.already_present.push(id.clone());
                outcome.installed.push(id.clone());
                continue;
            }

            info!("[{}/{}] Installing {}", step + 1, total, descriptor.name);
            match self.install_one(descriptor) {
                Ok(()) => {
                    self.run_post_install(descriptor);
                    info!("{} installed", descriptor.name);
                    outcome.installed.push(id.clone());
                }
                Err(e) => {
                    warn!("{} failed: {}", descriptor.name, e);
                    outcome.failed.push(FailedPackage {
                        id: id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("Run finished: {}", outcome);
        outcome
    }

    fn install_one(&mut self, descriptor: &PackageDescriptor) -> Result<()> {
        let mut ctx = InstallContext {
            runner: &mut self.runner,
            env: &mut self.env,
            ruby_fallback_version: &self.ruby_fallback_version,
        };
        install_package(descriptor, &mut ctx)
    }

    /// Follow-up commands; failures are logged and otherwise ignored
    fn run_post_install(&mut self, descriptor: &PackageDescriptor) {
        for command in &descriptor.post_install {
            match self.runner.run(command, false, &self.env) {
                Ok(output) if output.success => {}
                Ok(output) => warn!(
                    "Follow-up `{}` for {} exited with code {}",
                    command,
                    descriptor.id,
                    output.exit_code.unwrap_or(-1)
                ),
                Err(e) => warn!("Follow-up `{}` for {} failed: {}", command, descriptor.id, e),
            }
        }
    }
}

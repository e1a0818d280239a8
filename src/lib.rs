//! devsetup library
//!
//! Package catalog, dependency resolver and installation orchestrator behind
//! the `devsetup` binary.

pub mod bootstrap;
pub mod catalog;
pub mod cli;
pub mod command_runner;
pub mod config;
pub mod environment;
pub mod error;
pub mod installer;
pub mod logic;
pub mod menu;
pub mod methods;
pub mod process_guard;
pub mod summary;
pub mod types;

// Re-export main types for convenience
pub use bootstrap::{BrewStatus, ensure_homebrew};
pub use catalog::{Catalog, DEFAULT_PACKAGES, PackageDescriptor};
pub use command_runner::{CommandOutput, CommandRunner, CredentialSource, ShellRunner};
pub use config::SetupConfig;
pub use environment::Environment;
pub use error::{Result, SetupError};
pub use installer::{FailedPackage, Orchestrator, RunOutcome};
pub use logic::resolver::{Resolution, ResolveWarning, resolve};
pub use menu::{Selection, SelectionError, parse_selection};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use types::InstallMethod;

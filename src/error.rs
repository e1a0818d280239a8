//! Error handling module for devsetup
//!
//! Provides the crate-wide error type using thiserror. Per-package failures
//! travel as `SetupError` values until the orchestrator turns them into
//! failure records; only `Bootstrap` is allowed to end the process.

use thiserror::Error;

/// Main error type for devsetup
#[derive(Error, Debug)]
pub enum SetupError {
    /// IO errors (spawning commands, reading config files, terminal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A command ran but exited unsuccessfully
    #[error("`{command}` failed with exit code {code}")]
    Command { command: String, code: i32 },

    /// The tool a method needs is not on PATH
    #[error("required tool `{0}` was not found on PATH")]
    MissingTool(String),

    /// Homebrew could not be provisioned after the user opted in
    #[error("Homebrew bootstrap failed: {0}")]
    Bootstrap(String),

    /// Interactive prompt errors (menu, confirmation, password)
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// A package identifier that is not in the catalog
    #[error("unknown package `{0}`")]
    UnknownPackage(String),

    /// Descriptor is missing a field its install method needs
    #[error("Descriptor error: {0}")]
    Descriptor(String),
}

/// Result type alias for devsetup operations
pub type Result<T> = std::result::Result<T, SetupError>;

impl SetupError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a command failure from a command line and its exit code
    pub fn command(command: impl Into<String>, code: Option<i32>) -> Self {
        Self::Command {
            command: command.into(),
            code: code.unwrap_or(-1),
        }
    }

    /// Create a missing tool error
    pub fn missing_tool(tool: impl Into<String>) -> Self {
        Self::MissingTool(tool.into())
    }

    /// Create a bootstrap error
    pub fn bootstrap(msg: impl Into<String>) -> Self {
        Self::Bootstrap(msg.into())
    }

    /// Create a descriptor error
    pub fn descriptor(msg: impl Into<String>) -> Self {
        Self::Descriptor(msg.into())
    }
}

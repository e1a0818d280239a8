//! Configuration file handling.
//!
//! Settings come from, in increasing precedence: built-in defaults, a JSON
//! file (`--config` or `$DEVSETUP_CONFIG`), and environment overrides.
//! Every field is optional in the file.
//!
//! ```json
//! {
//!   "ruby_fallback_version": "3.3.6",
//!   "default_packages": ["git", "ruby", "rails"],
//!   "homebrew_install_url": "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh",
//!   "assume_yes": false
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, DEFAULT_PACKAGES};
use crate::environment::Environment;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "DEVSETUP_CONFIG";
/// Environment variable overriding the fallback Ruby version
pub const RUBY_VERSION_ENV: &str = "DEVSETUP_RUBY_VERSION";

pub const DEFAULT_RUBY_VERSION: &str = "3.3.6";
pub const DEFAULT_HOMEBREW_INSTALL_URL: &str =
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetupConfig {
    /// Ruby installed when rbenv lists no usable stable version
    pub ruby_fallback_version: String,
    /// Packages behind the "defaults" menu entry
    pub default_packages: Vec<String>,
    /// Homebrew's install script
    pub homebrew_install_url: String,
    /// Answer yes to every confirmation
    pub assume_yes: bool,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            ruby_fallback_version: DEFAULT_RUBY_VERSION.to_string(),
            default_packages: DEFAULT_PACKAGES.iter().map(|s| s.to_string()).collect(),
            homebrew_install_url: DEFAULT_HOMEBREW_INSTALL_URL.to_string(),
            assume_yes: false,
        }
    }
}

impl SetupConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Resolve the effective configuration: explicit path, then
    /// `$DEVSETUP_CONFIG`, then defaults; environment overrides last.
    pub fn load(explicit: Option<&Path>, env: &Environment) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.get(CONFIG_ENV).filter(|p| !p.is_empty()).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(env);
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, env: &Environment) {
        if let Some(version) = env.get(RUBY_VERSION_ENV).filter(|v| !v.trim().is_empty()) {
            self.ruby_fallback_version = version.trim().to_string();
        }
    }

    /// Validate the configuration against the catalog
    pub fn validate(&self, catalog: &Catalog) -> Result<()> {
        if !is_plain_version(&self.ruby_fallback_version) {
            anyhow::bail!(
                "ruby_fallback_version must look like MAJOR.MINOR.PATCH, got {:?}",
                self.ruby_fallback_version
            );
        }

        if self.default_packages.is_empty() {
            anyhow::bail!("default_packages must not be empty");
        }
        let unknown = catalog.unknown_ids(&self.default_packages);
        if !unknown.is_empty() {
            anyhow::bail!("default_packages contains unknown package(s): {}", unknown.join(", "));
        }

        if !self.homebrew_install_url.starts_with("https://") {
            anyhow::bail!("homebrew_install_url must be an https:// URL");
        }

        Ok(())
    }
}

/// `MAJOR.MINOR.PATCH` with no pre-release or build suffix
pub fn is_plain_version(version: &str) -> bool {
    semver::Version::parse(version)
        .map(|v| v.pre.is_empty() && v.build.is_empty())
        .unwrap_or(false)
}

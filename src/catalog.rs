//! Package catalog.
//!
//! The descriptor table is built once at process start and never changes
//! afterwards. Menu numbering follows table order.
//!
//! | Id            | Method  | Prerequisites        |
//! |---------------|---------|----------------------|
//! | xcode-cli     | direct  |                      |
//! | git           | brew    |                      |
//! | rbenv         | brew    |                      |
//! | ruby-build    | brew    |                      |
//! | ruby          | rbenv   | rbenv, ruby-build    |
//! | bundler       | gem     | ruby                 |
//! | rails         | gem     | ruby, bundler        |
//! | node          | brew    |                      |
//! | yarn          | brew    | node                 |
//! | postgresql    | brew    |                      |
//! | oh-my-zsh     | script  |                      |
//! | rosetta       | direct  |                      |

use std::collections::HashMap;

use crate::types::InstallMethod;

/// Packages installed by the "defaults" menu entry and `--defaults`.
pub const DEFAULT_PACKAGES: &[&str] = &[
    "xcode-cli",
    "git",
    "rbenv",
    "ruby-build",
    "ruby",
    "bundler",
    "rails",
    "node",
    "yarn",
    "postgresql",
];

/// Static description of one installable package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Unique key used on the command line and in prerequisites
    pub id: String,
    /// Human-readable name for the menu
    pub name: String,
    pub method: InstallMethod,
    /// Command that performs the install (unused by the rbenv method)
    pub install_command: Option<String>,
    /// Exit status zero means the package is already present
    pub check_command: String,
    /// Identifiers that must be installed first
    pub dependencies: Vec<String>,
    /// Best-effort commands run after a successful install
    pub post_install: Vec<String>,
    /// Wrap the install command with sudo
    pub requires_privilege: bool,
}

impl PackageDescriptor {
    /// Create a descriptor with no install command, dependencies or follow-ups.
    pub fn new(id: &str, name: &str, method: InstallMethod, check_command: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            method,
            install_command: None,
            check_command: check_command.to_string(),
            dependencies: Vec::new(),
            post_install: Vec::new(),
            requires_privilege: false,
        }
    }

    pub fn install(mut self, command: &str) -> Self {
        self.install_command = Some(command.to_string());
        self
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn then_run(mut self, commands: &[&str]) -> Self {
        self.post_install.extend(commands.iter().map(|s| s.to_string()));
        self
    }

    pub fn privileged(mut self) -> Self {
        self.requires_privilege = true;
        self
    }
}

/// Ordered, indexed set of package descriptors.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    descriptors: Vec<PackageDescriptor>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from descriptors. A later duplicate id replaces the
    /// earlier entry's lookup but keeps its menu position.
    pub fn new(descriptors: Vec<PackageDescriptor>) -> Self {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (i, descriptor) in descriptors.iter().enumerate() {
            index.insert(descriptor.id.clone(), i);
        }
        Self { descriptors, index }
    }

    /// The toolchain this binary installs.
    pub fn builtin() -> Self {
        use InstallMethod::*;

        Self::new(vec![
            PackageDescriptor::new(
                "xcode-cli",
                "Xcode Command Line Tools",
                Direct,
                "xcode-select -p",
            )
            .install("xcode-select --install"),
            PackageDescriptor::new("git", "Git", PackageManager, "brew list --versions git")
                .install("brew install git"),
            PackageDescriptor::new("rbenv", "rbenv", PackageManager, "command -v rbenv")
                .install("brew install rbenv"),
            PackageDescriptor::new(
                "ruby-build",
                "ruby-build",
                PackageManager,
                "brew list --versions ruby-build",
            )
            .install("brew install ruby-build"),
            PackageDescriptor::new(
                "ruby",
                "Ruby (latest stable via rbenv)",
                VersionManagerCustom,
                "rbenv version-name 2>/dev/null | grep -Eq '^[0-9]+\\.[0-9]+\\.[0-9]+$'",
            )
            .depends_on(&["rbenv", "ruby-build"])
            .then_run(&["rbenv rehash"]),
            PackageDescriptor::new("bundler", "Bundler", LanguagePackageManager, "gem list -i bundler")
                .install("gem install bundler")
                .depends_on(&["ruby"])
                .then_run(&["rbenv rehash"]),
            PackageDescriptor::new("rails", "Ruby on Rails", LanguagePackageManager, "gem list -i rails")
                .install("gem install rails")
                .depends_on(&["ruby", "bundler"])
                .then_run(&["rbenv rehash"]),
            PackageDescriptor::new("node", "Node.js", PackageManager, "command -v node")
                .install("brew install node"),
            PackageDescriptor::new("yarn", "Yarn", PackageManager, "command -v yarn")
                .install("brew install yarn")
                .depends_on(&["node"]),
            PackageDescriptor::new(
                "postgresql",
                "PostgreSQL 16",
                PackageManager,
                "brew list --versions postgresql@16",
            )
            .install("brew install postgresql@16")
            .then_run(&["brew services start postgresql@16"]),
            PackageDescriptor::new(
                "oh-my-zsh",
                "Oh My Zsh",
                DownloadScript,
                "test -d \"$HOME/.oh-my-zsh\"",
            )
            .install(
                "sh -c \"$(curl -fsSL https://raw.githubusercontent.com/ohmyzsh/ohmyzsh/master/tools/install.sh)\" \"\" --unattended",
            ),
            PackageDescriptor::new(
                "rosetta",
                "Rosetta 2 (Apple silicon)",
                Direct,
                "/usr/bin/pgrep -q oahd",
            )
            .install("softwareupdate --install-rosetta --agree-to-license")
            .privileged(),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&PackageDescriptor> {
        self.index.get(id).map(|&i| &self.descriptors[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Descriptor at a 1-based menu position
    pub fn by_menu_number(&self, number: usize) -> Option<&PackageDescriptor> {
        number.checked_sub(1).and_then(|i| self.descriptors.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Identifiers that are not in this catalog.
    pub fn unknown_ids<'a, S: AsRef<str>>(&self, ids: &'a [S]) -> Vec<&'a str> {
        ids.iter()
            .map(|s| s.as_ref())
            .filter(|id| !self.contains(id))
            .collect()
    }
}

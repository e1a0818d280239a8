//! Type-safe enums shared across devsetup.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a package gets installed.
///
/// The set is closed: the orchestrator dispatches on it with a `match`,
/// one handler per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMethod {
    /// `brew install <formula>`
    #[strum(serialize = "package-manager")]
    PackageManager,
    /// rbenv: pick the newest Ruby, install it and make it global
    #[strum(serialize = "version-manager-custom")]
    VersionManagerCustom,
    /// `gem install <name>`
    #[strum(serialize = "language-package-manager")]
    LanguagePackageManager,
    /// `curl ... | sh` style installers
    #[strum(serialize = "download-script")]
    DownloadScript,
    /// Install command runs as written
    #[strum(serialize = "direct")]
    Direct,
}

impl InstallMethod {
    /// Binary that must be on PATH before this method can run.
    pub fn required_tool(&self) -> Option<&'static str> {
        match self {
            Self::PackageManager => Some("brew"),
            Self::VersionManagerCustom => Some("rbenv"),
            Self::LanguagePackageManager => Some("gem"),
            Self::DownloadScript => Some("curl"),
            Self::Direct => None,
        }
    }

    /// Short label used in the menu and `list` output
    pub fn label(&self) -> &'static str {
        match self {
            Self::PackageManager => "brew",
            Self::VersionManagerCustom => "rbenv",
            Self::LanguagePackageManager => "gem",
            Self::DownloadScript => "script",
            Self::Direct => "direct",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_method_tags_parse() {
        assert_eq!(
            "version-manager-custom".parse::<InstallMethod>().unwrap(),
            InstallMethod::VersionManagerCustom
        );
        assert_eq!("direct".parse::<InstallMethod>().unwrap(), InstallMethod::Direct);
        assert!("apt".parse::<InstallMethod>().is_err());
    }

    #[test]
    fn test_serde_matches_display() {
        for method in InstallMethod::iter() {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method));
        }
    }

    #[test]
    fn test_only_direct_needs_no_tool() {
        let toolless: Vec<_> = InstallMethod::iter()
            .filter(|m| m.required_tool().is_none())
            .collect();
        assert_eq!(toolless, vec![InstallMethod::Direct]);
    }
}

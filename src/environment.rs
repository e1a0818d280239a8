//! Environment snapshot passed to every child command.
//!
//! The process's own environment is read once at start-up and never
//! mutated. Steps that change `PATH` (Homebrew's `shellenv`, rbenv shims)
//! take a snapshot and hand back an updated one, and commands are spawned
//! with exactly the variables in the snapshot.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Directories Homebrew installs into (Apple silicon, then Intel).
pub const HOMEBREW_PATHS: [&str; 2] = ["/opt/homebrew/bin", "/usr/local/bin"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Snapshot of the current process environment. Variables that are not
    /// valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `PATH` split into its entries
    pub fn path_entries(&self) -> Vec<PathBuf> {
        self.get("PATH")
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default()
    }

    /// Put `dir` at the front of `PATH` unless it is already an entry.
    /// Returns whether `PATH` changed.
    pub fn prepend_path(&mut self, dir: &str) -> bool {
        let mut entries = self.path_entries();
        if entries.iter().any(|e| e == Path::new(dir)) {
            return false;
        }
        entries.insert(0, PathBuf::from(dir));

        let joined = match std::env::join_paths(&entries) {
            Ok(joined) => joined,
            Err(e) => {
                debug!("Cannot add {} to PATH: {}", dir, e);
                return false;
            }
        };
        self.set("PATH", os_to_string(joined));
        true
    }

    /// Locate an executable on this snapshot's `PATH`.
    pub fn find_tool(&self, name: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        which::which_in(name, self.get("PATH"), cwd).ok()
    }

    pub fn home(&self) -> Option<&str> {
        self.get("HOME")
    }
}

fn os_to_string(value: OsString) -> String {
    value.to_string_lossy().into_owned()
}

/// Parse `export NAME=value` assignments out of `brew shellenv` output.
///
/// Values may be double-quoted (expanded later), single-quoted (kept
/// literally) or bare. A trailing `;` is allowed. Any other line is ignored.
pub fn parse_exports(output: &str) -> Vec<Export> {
    output.lines().filter_map(parse_export_line).collect()
}

/// One assignment from `brew shellenv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub value: String,
    /// Single-quoted values are not expanded
    pub literal: bool,
}

fn parse_export_line(line: &str) -> Option<Export> {
    let rest = line.trim().strip_prefix("export ")?;
    let rest = rest.trim().trim_end_matches(';').trim_end();
    let (name, raw) = rest.split_once('=')?;

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let (value, literal) = if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        (inner, false)
    } else if let Some(inner) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        (inner, true)
    } else {
        (raw, false)
    };

    Some(Export {
        name: name.to_string(),
        value: value.to_string(),
        literal,
    })
}

/// Expand `$VAR`, `${VAR}` and `${VAR+word}` against `env`. Unset
/// variables are left as written, except in the `+` form which expands to
/// nothing.
pub fn expand(value: &str, env: &Environment) -> String {
    shellexpand::env_with_context_no_errors(value, |name: &str| {
        match name.split_once('+') {
            Some((var, word)) => {
                if env.get(var).is_some() {
                    Some(Cow::Owned(expand(word, env)))
                } else {
                    Some(Cow::Borrowed(""))
                }
            }
            None => env.get(name).map(Cow::Borrowed),
        }
    })
    .into_owned()
}

/// Apply `brew shellenv` output to `env` and return the updated snapshot.
///
/// Each export is expanded against the snapshot as it stands when that line
/// is reached. Afterwards the Homebrew bin directories are put on `PATH` if
/// they are still missing.
pub fn apply_shellenv(mut env: Environment, output: &str) -> Environment {
    for export in parse_exports(output) {
        let value = if export.literal {
            export.value
        } else {
            expand(&export.value, &env)
        };
        debug!("shellenv: {}={}", export.name, value);
        env.set(export.name, value);
    }

    for dir in HOMEBREW_PATHS.iter().rev() {
        if env.prepend_path(dir) {
            debug!("Added {} to PATH", dir);
        }
    }
    env
}

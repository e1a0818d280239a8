//! Dependency resolver.
//!
//! Turns a list of requested package ids into an install order in which
//! every package comes after all of its prerequisites.
//!
//! # Design
//!
//! - **Depth-first with a recursion stack**: a prerequisite edge that points
//!   back at a package still on the stack closes a cycle. Every package on
//!   the cycle is dropped and a warning is recorded, so resolution always
//!   terminates in O(V + E).
//! - **Unknown requests are dropped silently**: a typo on the command line
//!   is not an error.
//! - **Unknown prerequisites are warnings**: the dependent can never be
//!   satisfied, so it is left out.
//! - **Pure logic**: no I/O, only tracing events.
//!
//! Requests are walked in the order given and prerequisites in declared
//! order, so the output is deterministic.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::catalog::Catalog;

/// Why part of a request could not be ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    /// Prerequisites loop back on themselves. `path` starts and ends with
    /// the same id.
    Cycle { path: Vec<String> },
    /// `package` lists a prerequisite that is not in the catalog.
    MissingPrerequisite { package: String, prerequisite: String },
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle { path } => {
                write!(f, "dependency cycle: {}", path.join(" -> "))
            }
            Self::MissingPrerequisite {
                package,
                prerequisite,
            } => write!(
                f,
                "{} requires unknown package {}",
                package, prerequisite
            ),
        }
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Install order, each id once
    pub order: Vec<String>,
    /// Packages left out and why
    pub warnings: Vec<ResolveWarning>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current recursion stack
    Visiting,
    /// Appended to the order
    Resolved,
    /// Cannot be ordered (cycle or missing prerequisite below it)
    Unsatisfiable,
}

struct Walk<'c> {
    catalog: &'c Catalog,
    marks: HashMap<&'c str, Mark>,
    stack: Vec<&'c str>,
    resolution: Resolution,
}

impl<'c> Walk<'c> {
    /// Returns whether `id` ended up in the order.
    fn visit(&mut self, id: &'c str) -> bool {
        match self.marks.get(id) {
            Some(Mark::Resolved) => return true,
            Some(Mark::Unsatisfiable) => return false,
            Some(Mark::Visiting) => {
                self.record_cycle(id);
                return false;
            }
            None => {}
        }

        let catalog = self.catalog;
        let Some(descriptor) = catalog.get(id) else {
            return false;
        };

        self.marks.insert(id, Mark::Visiting);
        self.stack.push(id);

        let mut satisfiable = true;
        for dep in &descriptor.dependencies {
            match catalog.get(dep) {
                Some(prerequisite) => {
                    if !self.visit(prerequisite.id.as_str()) {
                        satisfiable = false;
                    }
                }
                None => {
                    self.resolution
                        .warnings
                        .push(ResolveWarning::MissingPrerequisite {
                            package: id.to_string(),
                            prerequisite: dep.clone(),
                        });
                    satisfiable = false;
                }
            }
        }

        self.stack.pop();
        if satisfiable {
            self.marks.insert(id, Mark::Resolved);
            self.resolution.order.push(id.to_string());
        } else {
            self.marks.insert(id, Mark::Unsatisfiable);
        }
        satisfiable
    }

    fn record_cycle(&mut self, closing: &str) {
        let start = self
            .stack
            .iter()
            .position(|&s| s == closing)
            .unwrap_or(0);
        let mut path: Vec<String> = self.stack[start..].iter().map(|s| s.to_string()).collect();
        path.push(closing.to_string());
        self.resolution.warnings.push(ResolveWarning::Cycle { path });
    }
}

/// Resolve `requested` against `catalog` into an install order.
///
/// # Guarantees
///
/// - Every known requested id whose prerequisites can be satisfied appears
///   exactly once, after all of its transitive prerequisites.
/// - Unknown requested ids never appear and never produce a warning.
/// - Running `resolve` on its own output returns the same order.
pub fn resolve<S: AsRef<str>>(catalog: &Catalog, requested: &[S]) -> Resolution {
    let mut walk = Walk {
        catalog,
        marks: HashMap::new(),
        stack: Vec::new(),
        resolution: Resolution::default(),
    };

    for id in requested {
        let id = id.as_ref();
        match catalog.get(id) {
            Some(descriptor) => {
                walk.visit(descriptor.id.as_str());
            }
            None => debug!("Ignoring unknown package '{}'", id),
        }
    }

    debug!(
        "Resolved {} requested package(s) into {} install step(s)",
        requested.len(),
        walk.resolution.order.len()
    );
    walk.resolution
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DEFAULT_PACKAGES, PackageDescriptor};
    use crate::types::InstallMethod;

    fn pkg(id: &str, deps: &[&str]) -> PackageDescriptor {
        PackageDescriptor::new(id, id, InstallMethod::Direct, "false")
            .install("true")
            .depends_on(deps)
    }

    /// A (no deps), B (A), C (A, B)
    fn abc() -> Catalog {
        Catalog::new(vec![pkg("A", &[]), pkg("B", &["A"]), pkg("C", &["A", "B"])])
    }

    #[test]
    fn test_resolve_pulls_in_prerequisites() {
        let resolution = resolve(&abc(), &["C"]);
        assert_eq!(resolution.order, vec!["A", "B", "C"]);
        assert!(resolution.is_complete());
    }

    #[test]
    fn test_resolve_deduplicates_requested() {
        let resolution = resolve(&abc(), &["C", "A"]);
        assert_eq!(resolution.order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_resolve_repeated_ids() {
        let resolution = resolve(&abc(), &["B", "B", "A", "B"]);
        assert_eq!(resolution.order, vec!["A", "B"]);
    }

    #[test]
    fn test_resolve_drops_unknown_silently() {
        let resolution = resolve(&abc(), &["nope", "B", "also-nope"]);
        assert_eq!(resolution.order, vec!["A", "B"]);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_resolve_empty_request() {
        let resolution = resolve(&abc(), &[] as &[&str]);
        assert!(resolution.order.is_empty());
        assert!(resolution.is_complete());
    }

    #[test]
    fn test_resolve_cycle_terminates_with_warning() {
        let catalog = Catalog::new(vec![pkg("A", &["B"]), pkg("B", &["A"]), pkg("C", &[])]);
        let resolution = resolve(&catalog, &["A", "C"]);

        assert_eq!(resolution.order, vec!["C"]);
        assert_eq!(
            resolution.warnings,
            vec![ResolveWarning::Cycle {
                path: vec!["A".to_string(), "B".to_string(), "A".to_string()]
            }]
        );
    }

    #[test]
    fn test_resolve_self_dependency() {
        let catalog = Catalog::new(vec![pkg("A", &["A"])]);
        let resolution = resolve(&catalog, &["A"]);
        assert!(resolution.order.is_empty());
        assert_eq!(resolution.warnings.len(), 1);
    }

    #[test]
    fn test_resolve_cycle_taints_dependents_only() {
        // X -> A <-> B, D -> E
        let catalog = Catalog::new(vec![
            pkg("A", &["B"]),
            pkg("B", &["A"]),
            pkg("X", &["A"]),
            pkg("E", &[]),
            pkg("D", &["E"]),
        ]);
        let resolution = resolve(&catalog, &["X", "D"]);
        assert_eq!(resolution.order, vec!["E", "D"]);
        assert_eq!(resolution.warnings.len(), 1);
    }

    #[test]
    fn test_resolve_missing_prerequisite() {
        let catalog = Catalog::new(vec![pkg("A", &[]), pkg("B", &["A", "ghost"])]);
        let resolution = resolve(&catalog, &["B"]);

        assert_eq!(resolution.order, vec!["A"]);
        assert_eq!(
            resolution.warnings,
            vec![ResolveWarning::MissingPrerequisite {
                package: "B".to_string(),
                prerequisite: "ghost".to_string(),
            }]
        );
    }

    #[test]
    fn test_resolve_long_chain_is_not_truncated() {
        // A chain deeper than twice the catalog size would trip a
        // queue-growth guard; explicit cycle tracking must not.
        let ids: Vec<String> = (0..40).map(|i| format!("p{i}")).collect();
        let descriptors = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let deps: Vec<&str> = if i == 0 { vec![] } else { vec![ids[i - 1].as_str()] };
                pkg(id, &deps)
            })
            .collect();
        let catalog = Catalog::new(descriptors);

        let resolution = resolve(&catalog, &["p39"]);
        assert_eq!(resolution.order, ids);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let first = resolve(&abc(), &["C", "B"]);
        let second = resolve(&abc(), &first.order);
        assert_eq!(first.order, second.order);
    }

    #[test]
    fn test_resolve_builtin_defaults() {
        let catalog = Catalog::builtin();
        let resolution = resolve(&catalog, DEFAULT_PACKAGES);
        assert!(resolution.is_complete());

        let pos = |id: &str| resolution.order.iter().position(|p| p == id).unwrap();
        assert!(pos("rbenv") < pos("ruby"));
        assert!(pos("ruby-build") < pos("ruby"));
        assert!(pos("ruby") < pos("bundler"));
        assert!(pos("bundler") < pos("rails"));
        assert!(pos("node") < pos("yarn"));
    }

    #[test]
    fn test_warning_display() {
        let warning = ResolveWarning::Cycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(warning.to_string(), "dependency cycle: a -> b -> a");

        let warning = ResolveWarning::MissingPrerequisite {
            package: "rails".into(),
            prerequisite: "ruby".into(),
        };
        assert_eq!(warning.to_string(), "rails requires unknown package ruby");
    }
}

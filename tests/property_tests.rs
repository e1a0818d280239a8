//! Property-Based Tests for devsetup
//!
//! Uses proptest over randomly generated catalogs.
//!
//! These tests verify:
//! - Acyclic catalogs resolve completely into a valid topological order
//! - Resolving an order again returns it unchanged
//! - Unknown ids never reach the order
//! - Arbitrary (possibly cyclic) catalogs still terminate with a valid order
//! - Menu parsing never panics and only yields catalog ids

use std::collections::HashSet;

use proptest::prelude::*;
use proptest::sample::Index;

use devsetup::{
    Catalog, InstallMethod, PackageDescriptor, Resolution, Selection, parse_selection, resolve,
};

fn id(n: usize) -> String {
    format!("pkg{}", n)
}

/// Catalog of `deps.len()` packages. With `acyclic`, package `i` may only
/// depend on packages `0..i`.
fn build_catalog(deps: &[Vec<Index>], acyclic: bool) -> Catalog {
    let n = deps.len();
    let descriptors = deps
        .iter()
        .enumerate()
        .map(|(i, picks)| {
            let mut prerequisites: Vec<String> = Vec::new();
            for pick in picks {
                let target = match (acyclic, i) {
                    (true, 0) => continue,
                    (true, _) => pick.index(i),
                    (false, _) => pick.index(n),
                };
                let target = id(target);
                if !prerequisites.contains(&target) {
                    prerequisites.push(target);
                }
            }
            let refs: Vec<&str> = prerequisites.iter().map(String::as_str).collect();
            PackageDescriptor::new(&id(i), &id(i), InstallMethod::Direct, "true")
                .install("true")
                .depends_on(&refs)
        })
        .collect();
    Catalog::new(descriptors)
}

fn graph_strategy() -> impl Strategy<Value = Vec<Vec<Index>>> {
    prop::collection::vec(prop::collection::vec(any::<Index>(), 0..4), 1..14)
}

/// Every package in the order comes after all of its prerequisites, once.
fn assert_topological(catalog: &Catalog, resolution: &Resolution) -> Result<(), TestCaseError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for entry in &resolution.order {
        let descriptor = catalog.get(entry);
        prop_assert!(descriptor.is_some(), "unknown id {} in order", entry);
        for dep in &descriptor.unwrap().dependencies {
            prop_assert!(seen.contains(dep.as_str()), "{} before its prerequisite {}", entry, dep);
        }
        prop_assert!(seen.insert(entry.as_str()), "{} listed twice", entry);
    }
    Ok(())
}

proptest! {
    /// Acyclic: complete, valid, contains every requested id
    #[test]
    fn acyclic_resolution_is_topological(
        deps in graph_strategy(),
        picks in prop::collection::vec(any::<Index>(), 0..8),
    ) {
        let catalog = build_catalog(&deps, true);
        let requested: Vec<String> = picks.iter().map(|p| id(p.index(deps.len()))).collect();

        let resolution = resolve(&catalog, &requested);
        prop_assert!(resolution.is_complete());
        assert_topological(&catalog, &resolution)?;
        for wanted in &requested {
            prop_assert!(resolution.order.contains(wanted));
        }
    }

    /// Resolving an order again changes nothing
    #[test]
    fn resolution_is_idempotent(
        deps in graph_strategy(),
        picks in prop::collection::vec(any::<Index>(), 0..8),
    ) {
        let catalog = build_catalog(&deps, true);
        let requested: Vec<String> = picks.iter().map(|p| id(p.index(deps.len()))).collect();

        let first = resolve(&catalog, &requested);
        let second = resolve(&catalog, &first.order);
        prop_assert_eq!(first.order, second.order);
    }

    /// Unknown ids are dropped without a warning
    #[test]
    fn unknown_ids_never_appear(
        deps in graph_strategy(),
        unknown in prop::collection::vec("[a-z]{1,8}", 1..5),
    ) {
        let catalog = build_catalog(&deps, true);
        let unknown: Vec<String> = unknown.into_iter().map(|u| format!("missing-{}", u)).collect();

        let resolution = resolve(&catalog, &unknown);
        prop_assert!(resolution.order.is_empty());
        prop_assert!(resolution.warnings.is_empty());
    }

    /// Arbitrary graphs, cycles included: terminates, order still valid
    #[test]
    fn cyclic_graphs_terminate_with_valid_order(
        deps in graph_strategy(),
        picks in prop::collection::vec(any::<Index>(), 0..8),
    ) {
        let catalog = build_catalog(&deps, false);
        let requested: Vec<String> = picks.iter().map(|p| id(p.index(deps.len()))).collect();

        let resolution = resolve(&catalog, &requested);
        assert_topological(&catalog, &resolution)?;
        prop_assert!(resolution.order.len() <= catalog.len());
    }

    /// Menu input never panics; numbers map to catalog ids
    #[test]
    fn menu_parsing_is_total(input in "[0-9a-zA-Z, ]{0,16}") {
        let catalog = Catalog::builtin();
        if let Ok(Selection::Packages(ids)) = parse_selection(&input, &catalog) {
            prop_assert!(!ids.is_empty());
            for id in ids {
                prop_assert!(catalog.contains(&id));
            }
        }
    }
}

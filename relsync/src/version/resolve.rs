//! Inheritance resolution.
//!
//! A descriptor with `inheritsFrom` only carries the fields it changes.
//! Resolving it walks up the chain and overlays each child on its resolved
//! parent:
//!
//! ```text
//!   child (authored delta) ──inheritsFrom──▶ parent ──inheritsFrom──▶ base
//!        │                                      │                      │
//!        └──────── overlay ◀──── overlay ◀──────┴──────────────────────┘
//! ```
//!
//! Scalars set on the child replace the parent's, libraries are listed
//! child first, and per-phase arguments plus compatibility rules append the
//! child's after the parent's.

use std::collections::HashSet;

use tracing::debug;

use super::descriptor::ReleaseDescriptor;
use super::error::{ResolveError, ResolveResult};

/// Source of complete descriptors for parents in an inheritance chain.
///
/// Implementations may persist the parent locally as a side effect when it
/// is missing or stale.
pub trait ReleaseLookup {
    fn complete_release(&self, id: &str) -> ResolveResult<ReleaseDescriptor>;
}

impl<F> ReleaseLookup for F
where
    F: Fn(&str) -> ResolveResult<ReleaseDescriptor>,
{
    fn complete_release(&self, id: &str) -> ResolveResult<ReleaseDescriptor> {
        self(id)
    }
}

/// Fully resolve `descriptor` against its ancestors.
///
/// A descriptor without `inheritsFrom` is returned unchanged.
pub fn resolve(descriptor: ReleaseDescriptor, lookup: &dyn ReleaseLookup) -> ResolveResult<ReleaseDescriptor> {
    resolve_inner(descriptor, lookup, &mut HashSet::new())
}

fn resolve_inner(
    descriptor: ReleaseDescriptor,
    lookup: &dyn ReleaseLookup,
    visited: &mut HashSet<String>,
) -> ResolveResult<ReleaseDescriptor> {
    let parent_id = match &descriptor.inherits_from {
        None => return Ok(descriptor),
        Some(parent_id) => parent_id.clone(),
    };

    if !visited.insert(descriptor.id.clone()) {
        return Err(ResolveError::CircularDependency { id: descriptor.id });
    }

    debug!(id = %descriptor.id, parent = %parent_id, "Resolving inherited release");

    let parent = match lookup.complete_release(&parent_id) {
        Ok(parent) => parent,
        Err(e @ ResolveError::CircularDependency { .. }) => return Err(e),
        Err(e) => {
            return Err(ResolveError::MissingParent {
                id: descriptor.id,
                parent: parent_id,
                reason: e.to_string(),
            })
        }
    };
    let parent = resolve_inner(parent, lookup, visited)?;

    Ok(merge(parent, descriptor))
}

/// Overlay `child` on an already resolved `parent`.
pub fn merge(parent: ReleaseDescriptor, child: ReleaseDescriptor) -> ReleaseDescriptor {
    let mut result = parent;

    result.id = child.id.clone();
    result.release_type = child.release_type;
    result.updated_time = child.updated_time;
    result.release_time = child.release_time;
    result.inherits_from = None;

    overlay(&mut result.minecraft_arguments, &child.minecraft_arguments);
    overlay(&mut result.main_class, &child.main_class);
    overlay(&mut result.incompatibility_reason, &child.incompatibility_reason);
    overlay(&mut result.assets, &child.assets);
    overlay(&mut result.asset_index, &child.asset_index);
    overlay(&mut result.jar, &child.jar);
    overlay(&mut result.downloads, &child.downloads);
    overlay(&mut result.minimum_launcher_version, &child.minimum_launcher_version);

    let mut libraries = child.libraries.clone();
    libraries.append(&mut result.libraries);
    result.libraries = libraries;

    if let Some(child_args) = &child.arguments {
        let arguments = result.arguments.get_or_insert_with(Default::default);
        for (kind, args) in child_args {
            arguments.entry(*kind).or_default().extend(args.iter().cloned());
        }
    }

    if let Some(child_rules) = &child.compatibility_rules {
        result
            .compatibility_rules
            .get_or_insert_with(Vec::new)
            .extend(child_rules.iter().cloned());
    }

    let mut savable = child.savable_form().clone();
    savable.savable = None;
    result.savable = Some(Box::new(savable));
    result.set_synced(child.is_synced());
    result
}

fn overlay<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::argument::{Argument, ArgumentKind};
    use crate::version::descriptor::ReleaseType;
    use crate::version::library::LibraryRef;
    use crate::version::rule::CompatibilityRule;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, HashMap};

    fn catalog(entries: Vec<ReleaseDescriptor>) -> impl Fn(&str) -> ResolveResult<ReleaseDescriptor> {
        let map: HashMap<String, ReleaseDescriptor> =
            entries.into_iter().map(|d| (d.id.clone(), d)).collect();
        move |id: &str| {
            map.get(id).cloned().ok_or_else(|| ResolveError::Malformed {
                id: id.to_string(),
                reason: "not found".to_string(),
            })
        }
    }

    fn base() -> ReleaseDescriptor {
        let mut d = ReleaseDescriptor::new("1.12.2");
        d.release_type = Some(ReleaseType::Stable);
        d.main_class = Some("net.minecraft.client.main.Main".to_string());
        d.assets = Some("1.12".to_string());
        d.libraries = vec![LibraryRef::new("com.mojang:patchy:1.1")];
        d.arguments = Some(BTreeMap::from([(
            ArgumentKind::Game,
            vec![Argument::plain("--version")],
        )]));
        d
    }

    fn forge() -> ReleaseDescriptor {
        let mut d = ReleaseDescriptor::new("1.12.2-forge");
        d.inherits_from = Some("1.12.2".to_string());
        d.main_class = Some("net.minecraft.launchwrapper.Launch".to_string());
        d.libraries = vec![LibraryRef::new("net.minecraftforge:forge:14.23")];
        d.arguments = Some(BTreeMap::from([(
            ArgumentKind::Game,
            vec![Argument::plain("--tweakClass")],
        )]));
        d
    }

    #[test]
    fn test_resolved_descriptor_returned_as_is() {
        let lookup = catalog(vec![]);
        let resolved = resolve(base(), &lookup).unwrap();
        assert_eq!(resolved, base());
        assert!(resolved.savable.is_none());
    }

    #[test]
    fn test_child_overlays_parent() {
        let lookup = catalog(vec![base()]);
        let resolved = resolve(forge(), &lookup).unwrap();

        assert_eq!(resolved.id, "1.12.2-forge");
        assert!(resolved.inherits_from.is_none());
        assert_eq!(resolved.main_class.as_deref(), Some("net.minecraft.launchwrapper.Launch"));
        assert_eq!(resolved.assets.as_deref(), Some("1.12"));
        assert_eq!(resolved.release_type, None);
        assert_eq!(
            resolved.libraries.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
            vec!["net.minecraftforge:forge:14.23", "com.mojang:patchy:1.1"]
        );
        let game = &resolved.arguments.as_ref().unwrap()[&ArgumentKind::Game];
        assert_eq!(game, &vec![Argument::plain("--version"), Argument::plain("--tweakClass")]);
    }

    #[test]
    fn test_savable_form_is_authored_child() {
        let lookup = catalog(vec![base()]);
        let resolved = resolve(forge(), &lookup).unwrap();

        assert_eq!(resolved.savable_form(), &forge());
        let json = resolved.to_savable_json().unwrap();
        assert!(json.contains("inheritsFrom"));
        assert!(!json.contains("patchy"));
    }

    #[test]
    fn test_multi_level_chain() {
        let mut modpack = ReleaseDescriptor::new("pack");
        modpack.inherits_from = Some("1.12.2-forge".to_string());
        modpack.compatibility_rules = Some(vec![CompatibilityRule::allow()]);

        let lookup = catalog(vec![base(), forge()]);
        let resolved = resolve(modpack.clone(), &lookup).unwrap();

        assert_eq!(resolved.id, "pack");
        assert_eq!(resolved.libraries.len(), 2);
        assert_eq!(resolved.main_class.as_deref(), Some("net.minecraft.launchwrapper.Launch"));
        assert_eq!(resolved.savable_form(), &modpack);
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut a = ReleaseDescriptor::new("a");
        a.inherits_from = Some("b".to_string());
        let mut b = ReleaseDescriptor::new("b");
        b.inherits_from = Some("a".to_string());

        let lookup = catalog(vec![a.clone(), b]);
        assert!(matches!(
            resolve(a, &lookup),
            Err(ResolveError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_self_inheritance_is_a_cycle() {
        let mut a = ReleaseDescriptor::new("a");
        a.inherits_from = Some("a".to_string());
        let lookup = catalog(vec![a.clone()]);
        assert!(matches!(
            resolve(a, &lookup),
            Err(ResolveError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_missing_parent() {
        let lookup = catalog(vec![]);
        match resolve(forge(), &lookup) {
            Err(ResolveError::MissingParent { id, parent, .. }) => {
                assert_eq!(id, "1.12.2-forge");
                assert_eq!(parent, "1.12.2");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    fn arb_libs(prefix: &'static str) -> impl Strategy<Value = Vec<LibraryRef>> {
        prop::collection::vec(0u8..50, 0..5).prop_map(move |ids| {
            ids.into_iter()
                .map(|i| LibraryRef::new(format!("{prefix}:lib{i}:1")))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_merge_overrides_scalars_and_concatenates_libraries(
            parent_libs in arb_libs("p"),
            child_libs in arb_libs("c"),
            parent_main in prop::option::of("[a-z]{1,8}"),
            child_main in prop::option::of("[a-z]{1,8}"),
            child_assets in prop::option::of("[0-9]{1,2}"),
        ) {
            let mut parent = ReleaseDescriptor::new("parent");
            parent.libraries = parent_libs.clone();
            parent.main_class = parent_main.clone();
            parent.assets = Some("base".to_string());

            let mut child = ReleaseDescriptor::new("child");
            child.inherits_from = Some("parent".to_string());
            child.libraries = child_libs.clone();
            child.main_class = child_main.clone();
            child.assets = child_assets.clone();

            let merged = merge(parent, child);

            let mut expected = child_libs;
            expected.extend(parent_libs);
            prop_assert_eq!(merged.libraries, expected);
            prop_assert_eq!(merged.main_class, child_main.or(parent_main));
            prop_assert_eq!(merged.assets, child_assets.or(Some("base".to_string())));
            prop_assert!(merged.inherits_from.is_none());
        }
    }
}

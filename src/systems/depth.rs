//! Depth classification for entities that have children.
//!
//! The world-transform propagator processes inner nodes in ascending
//! [`DepthGroup`] order, so every parent is resolved before its children read
//! it. Depths only move when the parent graph changes, so the classifier is
//! skipped on cycles where the resolver did not touch the index.

use bevy_ecs::entity::EntityHashMap;
use bevy_ecs::prelude::*;

use crate::components::{DepthGroup, ParentLink};
use crate::config::PropagationConfig;
use crate::error::HierarchyError;
use crate::index::HierarchyIndex;

/// Run condition: `true` when the resolver changed the hierarchy this cycle.
pub fn topology_changed(index: Res<HierarchyIndex>) -> bool {
    index.topology_changed()
}

/// Recomputes [`DepthGroup`] for every inner node (an entity with both a
/// parent and children) as the number of its ancestors.
///
/// # Panics
///
/// Panics if an ancestor chain is longer than [`PropagationConfig::max_depth`].
/// The resolver rejects cyclic attach requests, so this only fires when the
/// parent graph was corrupted from outside.
pub fn classify_depths(
    config: Res<PropagationConfig>,
    links: Query<&ParentLink>,
    mut groups: Query<(Entity, &mut DepthGroup), With<ParentLink>>,
    mut memo: Local<EntityHashMap<u32>>,
) {
    memo.clear();
    let mut updated = 0usize;

    for (entity, mut group) in &mut groups {
        let depth = ancestor_count(
            entity,
            |e| links.get(e).ok().map(ParentLink::parent),
            &mut memo,
            config.max_depth,
        )
        .unwrap_or_else(|err| panic!("cannot order transform hierarchy: {err}"));

        if group.set_if_neq(DepthGroup(depth)) {
            updated += 1;
        }
    }

    log::trace!("Reclassified hierarchy depths: {updated} changed");
}

/// Counts the ancestors of `entity` by walking `parent_of` towards a root.
///
/// Results for every entity on the walked path are stored in `memo`, so
/// classifying a whole forest visits each link once.
///
/// # Errors
///
/// [`HierarchyError::CycleDetected`] when `entity` has more than `limit`
/// ancestors, counting those resolved through `memo`.
pub(crate) fn ancestor_count(
    entity: Entity,
    parent_of: impl Fn(Entity) -> Option<Entity>,
    memo: &mut EntityHashMap<u32>,
    limit: u32,
) -> Result<u32, HierarchyError> {
    let mut path = Vec::new();
    let mut current = entity;

    let base = loop {
        if let Some(&known) = memo.get(&current) {
            break known;
        }
        let Some(parent) = parent_of(current) else {
            break 0;
        };
        path.push(current);
        if path.len() > limit as usize {
            return Err(HierarchyError::CycleDetected { entity, limit });
        }
        current = parent;
    };
    if base as usize + path.len() > limit as usize {
        return Err(HierarchyError::CycleDetected { entity, limit });
    }

    // path[0] is `entity`; the last element is the closest to the root.
    let mut depth = base;
    for &node in path.iter().rev() {
        depth += 1;
        memo.insert(node, depth);
    }
    Ok(depth)
}

//! Hierarchical world-transform propagation.
//!
//! Runs after composition, so every root already has its final
//! [`WorldMatrix`] and every attached entity its [`LocalToParent`].
//!
//! - Inner nodes (parent and children) are bucketed by [`DepthGroup`] and
//!   resolved one depth at a time, shallowest first, in a single system.
//!   Depth `d` reads only matrices written at depths below `d`.
//! - Leaves (parent, no children) run last and fully in parallel: every
//!   possible parent is a root or inner node and is final by then.

use bevy_ecs::prelude::*;
use glam::Mat4;

use crate::components::{DepthGroup, Frozen, LocalToParent, ParentLink, WorldMatrix};
use crate::config::PropagationConfig;
use crate::par_map::par_map;

#[derive(Debug, Clone, Copy)]
struct InnerNode {
    entity: Entity,
    parent: Entity,
    local: Mat4,
}

#[derive(Debug)]
struct DepthBucket {
    depth: u32,
    nodes: Vec<InnerNode>,
}

/// Inner nodes grouped by depth, ascending.
///
/// Placement is a linear scan over the existing buckets. The number of
/// distinct depths is small in practice, so this stays cheaper than a general
/// sort of all nodes. Buckets keep their allocations across cycles.
#[derive(Debug, Default)]
pub struct DepthBuckets {
    buckets: Vec<DepthBucket>,
}

impl DepthBuckets {
    fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.nodes.clear();
        }
    }

    fn insert(&mut self, depth: u32, node: InnerNode) {
        let mut position = self.buckets.len();
        for (i, bucket) in self.buckets.iter_mut().enumerate() {
            if bucket.depth == depth {
                bucket.nodes.push(node);
                return;
            }
            if bucket.depth > depth {
                position = i;
                break;
            }
        }
        self.buckets.insert(
            position,
            DepthBucket {
                depth,
                nodes: vec![node],
            },
        );
    }

    fn iter(&self) -> impl Iterator<Item = &DepthBucket> {
        self.buckets.iter().filter(|bucket| !bucket.nodes.is_empty())
    }

    fn node_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.nodes.len()).sum()
    }
}

/// Resolves [`WorldMatrix`] of inner nodes in ascending depth order.
///
/// For each depth, parent matrices are gathered first, the products are
/// computed (in parallel for large buckets), and then written back. Nodes
/// whose parent has no world matrix keep their previous value.
#[allow(clippy::type_complexity)]
pub fn propagate_inner_world(
    mut buckets: Local<DepthBuckets>,
    mut pending: Local<Vec<(Entity, Mat4, Mat4)>>,
    config: Res<PropagationConfig>,
    inner: Query<(Entity, &ParentLink, &LocalToParent, &DepthGroup), Without<Frozen>>,
    mut worlds: Query<&mut WorldMatrix, With<DepthGroup>>,
) {
    buckets.clear();
    for (entity, link, local, group) in &inner {
        buckets.insert(
            group.0,
            InnerNode {
                entity,
                parent: link.parent(),
                local: local.0,
            },
        );
    }
    log::trace!("Propagating {} inner nodes", buckets.node_count());

    for bucket in buckets.iter() {
        pending.clear();
        for node in &bucket.nodes {
            if let Ok(parent_world) = worlds.get(node.parent) {
                pending.push((node.entity, parent_world.0, node.local));
            }
        }

        let products = par_map(&pending, &config, |(_, parent_world, local)| {
            *parent_world * *local
        });

        for (&(entity, _, _), product) in pending.iter().zip(products) {
            if let Ok(mut world) = worlds.get_mut(entity) {
                world.set_if_neq(WorldMatrix(product));
            }
        }
    }
}

/// Resolves [`WorldMatrix`] of leaves from their parent's final matrix.
#[allow(clippy::type_complexity)]
pub fn propagate_leaf_world(
    parents: Query<&WorldMatrix, With<DepthGroup>>,
    mut leaves: Query<
        (&ParentLink, &LocalToParent, &mut WorldMatrix),
        (Without<DepthGroup>, Without<Frozen>),
    >,
) {
    leaves
        .par_iter_mut()
        .for_each(|(link, local, mut world)| {
            let Ok(parent_world) = parents.get(link.parent()) else {
                return;
            };
            world.set_if_neq(WorldMatrix(parent_world.0 * local.0));
        });
}

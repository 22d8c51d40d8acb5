//! Parent → children relationship index.
//!
//! The index is the inverse of every [`ParentLink`](crate::components::ParentLink)
//! edge. Only the hierarchy resolver mutates it, once per cycle and on a single
//! thread; every other system may read it through `Res<HierarchyIndex>`.

use bevy_ecs::entity::{Entity, EntityHashMap, EntityHashSet};
use bevy_ecs::prelude::Resource;

use crate::error::HierarchyError;

/// Multi-map from parent entity to its set of children.
///
/// The child → parent direction is stored as well so that re-parenting done
/// earlier in a resolver pass is visible before its commands are applied.
#[derive(Resource, Debug, Default)]
pub struct HierarchyIndex {
    children: EntityHashMap<EntityHashSet>,
    parents: EntityHashMap<Entity>,
    topology_changed: bool,
}

impl HierarchyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the edge `parent -> child`.
    ///
    /// Returns `true` when `parent` had no children before this call, which is
    /// the moment it needs a depth group.
    ///
    /// The caller must have removed any previous edge of `child` first.
    pub fn add(&mut self, parent: Entity, child: Entity) -> bool {
        debug_assert!(
            !self.parents.contains_key(&child),
            "{child} is still attached to {:?}",
            self.parents.get(&child)
        );

        let set = self.children.entry(parent).or_default();
        let first_child = set.is_empty();
        set.insert(child);
        self.parents.insert(child, parent);
        self.topology_changed = true;
        first_child
    }

    /// Removes the edge `parent -> child`.
    ///
    /// Returns `Ok(true)` when `parent` has no children left, so its depth
    /// group must be cleared.
    ///
    /// # Errors
    ///
    /// [`HierarchyError::EdgeNotFound`] if the edge is not recorded. This means
    /// the index no longer mirrors the `ParentLink` components.
    pub fn remove(&mut self, parent: Entity, child: Entity) -> Result<bool, HierarchyError> {
        let Some(set) = self.children.get_mut(&parent) else {
            return Err(HierarchyError::EdgeNotFound { parent, child });
        };
        if !set.remove(&child) {
            return Err(HierarchyError::EdgeNotFound { parent, child });
        }

        if self.parents.get(&child) == Some(&parent) {
            self.parents.remove(&child);
        }
        self.topology_changed = true;

        if set.is_empty() {
            self.children.remove(&parent);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Returns whether `parent` has at least one child.
    #[inline]
    pub fn has_any_children(&self, parent: Entity) -> bool {
        self.children.contains_key(&parent)
    }

    /// Iterates over the children of `parent`, in no particular order.
    pub fn children(&self, parent: Entity) -> impl Iterator<Item = Entity> + '_ {
        self.children
            .get(&parent)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Returns the number of children of `parent`.
    pub fn child_count(&self, parent: Entity) -> usize {
        self.children.get(&parent).map_or(0, |set| set.len())
    }

    /// Returns the recorded parent of `child`.
    #[inline]
    pub fn parent_of(&self, child: Entity) -> Option<Entity> {
        self.parents.get(&child).copied()
    }

    /// Returns whether `candidate` is `entity` itself or one of its ancestors.
    ///
    /// # Errors
    ///
    /// [`HierarchyError::CycleDetected`] if the walk exceeds `limit` links.
    pub fn is_ancestor(
        &self,
        candidate: Entity,
        entity: Entity,
        limit: u32,
    ) -> Result<bool, HierarchyError> {
        let mut current = entity;
        let mut steps = 0;
        loop {
            if current == candidate {
                return Ok(true);
            }
            let Some(parent) = self.parent_of(current) else {
                return Ok(false);
            };
            steps += 1;
            if steps > limit {
                return Err(HierarchyError::CycleDetected { entity, limit });
            }
            current = parent;
        }
    }

    /// Returns the number of recorded edges.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Returns whether no edges are recorded.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Returns whether an edge was added or removed during the current cycle.
    #[inline]
    pub fn topology_changed(&self) -> bool {
        self.topology_changed
    }

    /// Clears the per-cycle topology flag. Called at the start of each
    /// resolver pass.
    pub(crate) fn begin_cycle(&mut self) {
        self.topology_changed = false;
    }
}

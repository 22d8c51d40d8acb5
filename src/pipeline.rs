//! Per-cycle entry point.
//!
//! One transform cycle runs three ordered stages:
//!
//! 1. [`TransformSystems::Hierarchy`]: resolve attach/detach requests,
//!    reclassify depths if the topology changed, advance the freeze state.
//!    These run on a single thread and only record structural changes.
//! 2. [`TransformSystems::Compose`]: after the deferred changes are applied,
//!    compose root world matrices and local-to-parent matrices in parallel.
//! 3. [`TransformSystems::Propagate`]: inner nodes in depth order, then
//!    leaves.
//!
//! Hosts that drive their own [`Schedule`] call
//! [`TransformPipeline::add_to_schedule`] and order their systems against the
//! sets. Everyone else owns a [`TransformPipeline`] and calls
//! [`update`](TransformPipeline::update) once per tick.

use bevy_ecs::prelude::*;
use bevy_tasks::{ComputeTaskPool, TaskPool};

use crate::config::PropagationConfig;
use crate::index::HierarchyIndex;
use crate::systems::{
    classify_depths, compose_inner_local, compose_leaf_local, compose_root_world,
    propagate_inner_world, propagate_leaf_world, resolve_hierarchy, topology_changed,
    update_freeze_state,
};

/// Ordered stages of one transform cycle.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformSystems {
    /// Structural bookkeeping: hierarchy, depth groups, freezing.
    Hierarchy,
    /// Root world and local-to-parent composition.
    Compose,
    /// Depth-ordered world propagation.
    Propagate,
}

/// Owns the schedule that runs one transform cycle.
///
/// # Example
///
/// ```
/// use bevy_ecs::world::World;
/// use glam::Vec3;
/// use redlilium_transform::prelude::*;
///
/// let mut world = World::new();
/// let parent = world.spawn(Position(Vec3::new(1.0, 0.0, 0.0))).id();
/// let child = world.spawn(Position(Vec3::new(0.0, 2.0, 0.0))).id();
/// world.request_attach(parent, child);
///
/// let mut pipeline = TransformPipeline::new();
/// pipeline.update(&mut world);
///
/// let world_matrix = world.get::<WorldMatrix>(child).unwrap();
/// assert!((world_matrix.translation() - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
/// ```
pub struct TransformPipeline {
    schedule: Schedule,
    config: PropagationConfig,
}

impl TransformPipeline {
    /// Creates a pipeline with the default [`PropagationConfig`].
    pub fn new() -> Self {
        Self::with_config(PropagationConfig::default())
    }

    /// Creates a pipeline that inserts `config` into worlds that have none.
    pub fn with_config(config: PropagationConfig) -> Self {
        let mut schedule = Schedule::default();
        Self::add_to_schedule(&mut schedule);
        Self { schedule, config }
    }

    /// Adds the transform systems and their set ordering to `schedule`.
    ///
    /// The world must contain [`HierarchyIndex`] and [`PropagationConfig`]
    /// resources before the schedule first runs.
    pub fn add_to_schedule(schedule: &mut Schedule) {
        schedule.configure_sets(
            (
                TransformSystems::Hierarchy,
                TransformSystems::Compose,
                TransformSystems::Propagate,
            )
                .chain(),
        );
        schedule.add_systems((
            (
                resolve_hierarchy,
                classify_depths.run_if(topology_changed),
                update_freeze_state,
            )
                .chain()
                .in_set(TransformSystems::Hierarchy),
            (compose_root_world, compose_inner_local, compose_leaf_local)
                .in_set(TransformSystems::Compose),
            (propagate_inner_world, propagate_leaf_world)
                .chain()
                .in_set(TransformSystems::Propagate),
        ));
    }

    /// Runs one full transform cycle on `world`.
    ///
    /// When this returns, every non-frozen entity's [`WorldMatrix`](crate::components::WorldMatrix)
    /// is consistent with its inputs and its ancestors.
    pub fn update(&mut self, world: &mut World) {
        ComputeTaskPool::get_or_init(TaskPool::default);
        if !world.contains_resource::<HierarchyIndex>() {
            world.init_resource::<HierarchyIndex>();
        }
        if !world.contains_resource::<PropagationConfig>() {
            world.insert_resource(self.config.clone());
        }
        self.schedule.run(world);
        world.clear_trackers();
    }

    /// Returns the configuration inserted into worlds that lack one.
    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to run one transform cycle on a world without
/// keeping a pipeline around.
///
/// Change detection is tracked per system, so a fresh schedule recomputes
/// every entity. Prefer a long-lived [`TransformPipeline`] in a frame loop.
pub fn run_transform_systems(world: &mut World) {
    TransformPipeline::new().update(world);
}

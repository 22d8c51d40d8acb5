//! # RedLilium Transform
//!
//! Hierarchical, parallel, incremental transform propagation on top of Bevy ECS.
//!
//! Entities describe their local transform with any subset of [`Rotation`],
//! [`Position`] and [`Scale`]. Each cycle the pipeline composes those into
//! matrices and resolves every entity's [`WorldMatrix`] through its ancestors,
//! touching only what changed.
//!
//! ## Core Types
//!
//! - [`TransformPipeline`]: Owns the schedule; call `update` once per tick
//! - [`TransformSystems`]: System sets for hosts that drive their own schedule
//! - [`HierarchyCommands`]: `request_attach` / `request_detach` on `Commands` and `World`
//! - [`HierarchyIndex`]: Parent → children index, read-only outside the resolver
//! - [`PropagationConfig`]: Parallelism thresholds and the depth limit
//! - [`HierarchyError`]: Bookkeeping failures
//!
//! ## Cycle
//!
//! 1. Attach/detach resolution and depth classification (single thread)
//! 2. Local composition (parallel)
//! 3. Inner nodes by ascending depth, then leaves (parallel within a layer)
//!
//! See `DESIGN.md` for architecture decisions.

pub mod components;
mod config;
mod error;
mod hierarchy;
mod index;
mod par_map;
mod pipeline;
pub mod systems;

pub use config::PropagationConfig;
pub use error::HierarchyError;
pub use hierarchy::HierarchyCommands;
pub use index::HierarchyIndex;
pub use pipeline::{run_transform_systems, TransformPipeline, TransformSystems};

pub use components::{
    AttachRequest, Attached, DepthGroup, Frozen, LocalToParent, ParentLink, PendingFrozen,
    Position, Rotation, Scale, Static, WorldMatrix,
};

/// Everything needed to build and drive a transform hierarchy.
pub mod prelude {
    pub use crate::components::{
        Frozen, LocalToParent, ParentLink, Position, Rotation, Scale, Static, WorldMatrix,
    };
    pub use crate::{
        HierarchyCommands, HierarchyIndex, PropagationConfig, TransformPipeline,
        TransformSystems,
    };
}

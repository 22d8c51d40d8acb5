//! Transform systems, in the order one cycle runs them.
//!
//! - [`resolve`]: apply attach/detach requests to the hierarchy index
//! - [`depth`]: recompute depth groups after a topology change
//! - [`freeze`]: stage and promote static entities
//! - [`compose`]: build world (roots) and local-to-parent matrices
//! - [`propagate`]: resolve world matrices of inner nodes, then leaves

pub mod compose;
pub mod depth;
pub mod freeze;
pub mod propagate;
pub mod resolve;

pub use compose::{
    compose_inner_local, compose_leaf_local, compose_local, compose_root_world, ComposeTarget,
    TransformLayout,
};
pub use depth::{classify_depths, topology_changed};
pub use freeze::update_freeze_state;
pub use propagate::{propagate_inner_world, propagate_leaf_world};
pub use resolve::resolve_hierarchy;

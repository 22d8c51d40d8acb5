//! Hierarchy error types.

use bevy_ecs::entity::Entity;
use thiserror::Error;

/// Errors raised by the hierarchy bookkeeping.
///
/// These describe corruption of the transform systems' own state or a parent
/// graph that cannot be ordered. The systems treat them as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("edge {parent} -> {child} is not in the hierarchy index")]
    EdgeNotFound { parent: Entity, child: Entity },
    #[error("parent chain of {entity} is cyclic or longer than {limit} links")]
    CycleDetected { entity: Entity, limit: u32 },
    #[error("cannot attach {0} to itself")]
    SelfParent(Entity),
}

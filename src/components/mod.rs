mod freeze;
mod hierarchy;
mod transform;

pub use freeze::{Frozen, PendingFrozen, Static};
pub use hierarchy::{AttachRequest, Attached, DepthGroup, ParentLink};
pub use transform::{LocalToParent, Position, Rotation, Scale, WorldMatrix};

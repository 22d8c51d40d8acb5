use bevy_ecs::component::Component;

/// Requests that the entity's world transform stop updating once settled.
///
/// Owned by the caller; the transform systems never remove it.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Static;

/// Staging state between [`Static`] and [`Frozen`]. The entity still receives
/// exactly one more world-transform update while it carries this marker.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingFrozen;

/// The world transform is final; propagation skips this entity for good.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frozen;

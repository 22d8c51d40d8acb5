use bevy_ecs::component::Component;
use bevy_ecs::entity::Entity;

/// One-shot request to make `child` a child of `parent`.
///
/// Spawn it on its own entity (see
/// [`HierarchyCommands::request_attach`](crate::HierarchyCommands::request_attach)).
/// The resolver consumes and despawns the request entity on the cycle it sees
/// it, whether or not the request could be honoured.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachRequest {
    pub parent: Entity,
    pub child: Entity,
}

/// Authoritative child → parent edge.
///
/// Written only by the resolver. Do not insert it by hand; the hierarchy
/// index would not know about the edge.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink(pub Entity);

impl ParentLink {
    /// Returns the parent entity.
    #[inline]
    pub fn parent(&self) -> Entity {
        self.0
    }
}

/// Marks an entity as incorporated into the hierarchy.
///
/// Removing it from an entity that has a [`ParentLink`] is the signal to
/// detach it.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attached;

/// Depth bucket of an entity that has children.
///
/// Roots with children sit at depth 0; an inner node sits at the number of
/// ancestors it has. Entities without children (leaves and plain roots)
/// carry no `DepthGroup`.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepthGroup(pub u32);

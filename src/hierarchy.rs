//! Requesting hierarchy changes.
//!
//! Attaching and detaching never touch [`ParentLink`](crate::components::ParentLink)
//! directly. Callers record intent, and the resolver applies it at the start of
//! the next transform cycle.
//!
//! # Usage
//!
//! ```ignore
//! // Direct (requires &mut World)
//! world.request_attach(parent, child);
//! world.request_detach(child);
//!
//! // Deferred, from within systems
//! commands.request_attach(parent, child);
//! commands.request_detach(child);
//! ```

use bevy_ecs::entity::Entity;
use bevy_ecs::system::Commands;
use bevy_ecs::world::World;

use crate::components::{AttachRequest, Attached};

/// Extension trait adding hierarchy requests to [`Commands`] and [`World`].
pub trait HierarchyCommands {
    /// Queues a request to make `child` a child of `parent`.
    ///
    /// Attaching an already attached child re-parents it.
    fn request_attach(&mut self, parent: Entity, child: Entity);

    /// Signals that `child` should be detached from its parent.
    ///
    /// Does nothing if `child` no longer exists.
    fn request_detach(&mut self, child: Entity);
}

impl HierarchyCommands for Commands<'_, '_> {
    fn request_attach(&mut self, parent: Entity, child: Entity) {
        self.spawn(AttachRequest { parent, child });
    }

    fn request_detach(&mut self, child: Entity) {
        if let Some(mut entity) = self.get_entity(child) {
            entity.remove::<Attached>();
        }
    }
}

impl HierarchyCommands for World {
    fn request_attach(&mut self, parent: Entity, child: Entity) {
        self.spawn(AttachRequest { parent, child });
    }

    fn request_detach(&mut self, child: Entity) {
        if self.entities().contains(child) {
            self.entity_mut(child).remove::<Attached>();
        }
    }
}

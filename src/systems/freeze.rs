//! Two-step freezing of static entities.
//!
//! An entity marked [`Static`] is first staged as [`PendingFrozen`] and only
//! becomes [`Frozen`] on the following cycle. The update that reacts to
//! `Static` can race with transform writes made in the same cycle; the extra
//! cycle guarantees one final, correct world matrix before propagation stops
//! touching the entity. Neither step may be skipped.

use bevy_ecs::prelude::*;

use crate::components::{Frozen, PendingFrozen, Static, WorldMatrix};

/// Advances the freeze state machine by one step.
///
/// - `PendingFrozen` without `Frozen` becomes `Frozen`.
/// - `Static` with a `WorldMatrix`, not yet staged, becomes `PendingFrozen`.
///
/// Both transitions are deferred, so an entity staged on this cycle is not
/// promoted until the next one.
#[allow(clippy::type_complexity)]
pub fn update_freeze_state(
    mut commands: Commands,
    pending: Query<Entity, (With<PendingFrozen>, Without<Frozen>)>,
    settled: Query<
        Entity,
        (
            With<WorldMatrix>,
            With<Static>,
            Without<PendingFrozen>,
            Without<Frozen>,
        ),
    >,
) {
    for entity in &pending {
        commands
            .entity(entity)
            .remove::<PendingFrozen>()
            .insert(Frozen);
    }
    for entity in &settled {
        commands.entity(entity).insert(PendingFrozen);
    }
}

//! Attach/detach resolution.
//!
//! Runs first in every transform cycle, on a single thread. It consumes
//! [`AttachRequest`] entities and removed [`Attached`] markers, keeps the
//! [`HierarchyIndex`] in step, and records every structural change in
//! [`Commands`] so nothing is applied until the following sync point.

use bevy_ecs::entity::Entities;
use bevy_ecs::prelude::*;

use crate::components::{
    AttachRequest, Attached, DepthGroup, Frozen, LocalToParent, ParentLink, Position, Rotation,
    Scale, WorldMatrix,
};
use crate::config::PropagationConfig;
use crate::error::HierarchyError;
use crate::index::HierarchyIndex;

/// Entities that carry local transform inputs but have never been seen by the
/// transform systems.
type NewRootFilter = (
    Or<(With<Rotation>, With<Position>, With<Scale>)>,
    Without<Frozen>,
    Without<ParentLink>,
    Without<WorldMatrix>,
    Without<DepthGroup>,
);

/// Resolves pending hierarchy changes for this cycle.
///
/// In order:
/// 1. Edges whose child lost its [`ParentLink`] outside the resolver (for
///    example because it was despawned) are dropped from the index.
/// 2. Newly seen roots get an identity [`WorldMatrix`].
/// 3. Children whose [`Attached`] marker was removed are detached.
/// 4. Every [`AttachRequest`] is applied (or rejected) and its entity despawned.
///
/// # Panics
///
/// Panics if a detached child's edge is missing from the index. That means
/// the hierarchy bookkeeping is corrupt and continuing would propagate wrong
/// transforms.
#[allow(clippy::type_complexity, clippy::too_many_arguments)]
pub fn resolve_hierarchy(
    mut commands: Commands,
    mut index: ResMut<HierarchyIndex>,
    config: Res<PropagationConfig>,
    entities: &Entities,
    new_roots: Query<Entity, NewRootFilter>,
    detached: Query<(Entity, &ParentLink), Without<Attached>>,
    requests: Query<(Entity, &AttachRequest)>,
    linked: Query<(), With<ParentLink>>,
    with_world: Query<(), With<WorldMatrix>>,
    mut removed_links: RemovedComponents<ParentLink>,
) {
    index.begin_cycle();

    for child in removed_links.read() {
        if linked.contains(child) {
            continue;
        }
        if let Some(parent) = index.parent_of(child) {
            log::debug!("Dropping stale hierarchy edge {parent} -> {child}");
            unlink(&mut commands, &mut index, parent, child).unwrap_or_else(|err| {
                panic!("transform hierarchy corrupted: {err}");
            });
        }
    }

    let mut roots = 0usize;
    for entity in &new_roots {
        commands.entity(entity).insert(WorldMatrix::IDENTITY);
        roots += 1;
    }

    let mut detached_count = 0usize;
    for (child, link) in &detached {
        unlink(&mut commands, &mut index, link.parent(), child).unwrap_or_else(|err| {
            panic!("transform hierarchy corrupted: {err}");
        });
        commands
            .entity(child)
            .remove::<(ParentLink, LocalToParent)>();
        detached_count += 1;
    }

    let mut attached = 0usize;
    let mut rejected = 0usize;
    for (request_entity, request) in &requests {
        consume_request(&mut commands, request_entity, request);

        let AttachRequest { parent, child } = *request;
        if !entities.contains(parent) || !entities.contains(child) {
            log::trace!("Ignoring attach request {parent} -> {child}: entity no longer exists");
            continue;
        }
        if let Err(err) = check_attach(&index, parent, child, config.max_depth) {
            log::warn!("Rejected attach request: {err}");
            rejected += 1;
            continue;
        }

        match index.parent_of(child) {
            Some(current) if current == parent => continue,
            Some(previous) => {
                unlink(&mut commands, &mut index, previous, child).unwrap_or_else(|err| {
                    panic!("transform hierarchy corrupted: {err}");
                });
                commands.entity(child).try_insert(ParentLink(parent));
            }
            None => {
                let mut child_commands = commands.entity(child);
                child_commands.try_insert((ParentLink(parent), Attached, LocalToParent::IDENTITY));
                if !with_world.contains(child) {
                    child_commands.try_insert(WorldMatrix::IDENTITY);
                }
            }
        }

        if index.add(parent, child) {
            let mut parent_commands = commands.entity(parent);
            parent_commands.try_insert(DepthGroup(0));
            if !with_world.contains(parent) {
                parent_commands.try_insert(WorldMatrix::IDENTITY);
            }
        }
        attached += 1;
    }

    if index.topology_changed() {
        log::debug!(
            "Hierarchy changed: {attached} attached, {detached_count} detached, {rejected} rejected"
        );
    }
    if roots > 0 {
        log::trace!("{roots} new transform roots");
    }
}

/// Despawns a consumed request. A request stored on the child or parent itself
/// only loses the component, so the request cannot take its subject with it.
fn consume_request(commands: &mut Commands, request_entity: Entity, request: &AttachRequest) {
    if request_entity == request.child || request_entity == request.parent {
        commands.entity(request_entity).remove::<AttachRequest>();
    } else {
        commands.entity(request_entity).despawn();
    }
}

/// Rejects attach requests that would make the parent graph cyclic.
pub(crate) fn check_attach(
    index: &HierarchyIndex,
    parent: Entity,
    child: Entity,
    max_depth: u32,
) -> Result<(), HierarchyError> {
    if parent == child {
        return Err(HierarchyError::SelfParent(child));
    }
    if index.is_ancestor(child, parent, max_depth)? {
        return Err(HierarchyError::CycleDetected {
            entity: child,
            limit: max_depth,
        });
    }
    Ok(())
}

/// Removes `parent -> child` from the index and clears the parent's depth
/// group if it has no children left.
fn unlink(
    commands: &mut Commands,
    index: &mut HierarchyIndex,
    parent: Entity,
    child: Entity,
) -> Result<(), HierarchyError> {
    if index.remove(parent, child)? {
        if let Some(mut parent_commands) = commands.get_entity(parent) {
            parent_commands.remove::<DepthGroup>();
        }
    }
    Ok(())
}

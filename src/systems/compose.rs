//! Local transform composition.
//!
//! Every entity carries any non-empty subset of [`Rotation`], [`Position`] and
//! [`Scale`]. The subset selects one of the [`TransformLayout`] variants, and
//! the matching matrix is written into either the entity's [`WorldMatrix`]
//! (roots) or its [`LocalToParent`] (attached entities). Entities whose inputs
//! did not change since the system last ran are skipped by the query filter;
//! entities that lost an input are picked up from [`RemovedInputs`] instead.

use bevy_ecs::component::Component;
use bevy_ecs::prelude::*;
use bevy_ecs::query::QueryFilter;
use bevy_ecs::system::SystemParam;
use glam::{Mat4, Quat, Vec3};

use crate::components::{
    DepthGroup, Frozen, LocalToParent, ParentLink, Position, Rotation, Scale, WorldMatrix,
};

/// Which local transform inputs an entity carries.
///
/// The empty combination has no variant: such an entity never matches the
/// composition queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformLayout {
    Scale,
    Rotation,
    RotationScale,
    Position,
    PositionScale,
    PositionRotation,
    PositionRotationScale,
}

impl TransformLayout {
    /// Classifies presence flags. Returns `None` when nothing is present.
    pub const fn from_presence(rotation: bool, position: bool, scale: bool) -> Option<Self> {
        match (position, rotation, scale) {
            (false, false, false) => None,
            (false, false, true) => Some(Self::Scale),
            (false, true, false) => Some(Self::Rotation),
            (false, true, true) => Some(Self::RotationScale),
            (true, false, false) => Some(Self::Position),
            (true, false, true) => Some(Self::PositionScale),
            (true, true, false) => Some(Self::PositionRotation),
            (true, true, true) => Some(Self::PositionRotationScale),
        }
    }

    /// Builds the matrix for this layout. Inputs the layout does not include
    /// are ignored.
    ///
    /// Scale is always applied first (rightmost), so a full transform is
    /// `rotate_translate(rotation, position) * scale(scale)`.
    #[inline]
    pub fn compose(self, rotation: Quat, position: Vec3, scale: Vec3) -> Mat4 {
        match self {
            Self::Scale => Mat4::from_scale(scale),
            Self::Rotation => Mat4::from_quat(rotation),
            Self::RotationScale => Mat4::from_quat(rotation) * Mat4::from_scale(scale),
            Self::Position => Mat4::from_translation(position),
            Self::PositionScale => Mat4::from_translation(position) * Mat4::from_scale(scale),
            Self::PositionRotation => Mat4::from_rotation_translation(rotation, position),
            Self::PositionRotationScale => {
                Mat4::from_rotation_translation(rotation, position) * Mat4::from_scale(scale)
            }
        }
    }
}

/// Composes the local matrix of an entity from whichever inputs it has.
///
/// Returns `None` if none of the three inputs is present.
pub fn compose_local(
    rotation: Option<&Rotation>,
    position: Option<&Position>,
    scale: Option<&Scale>,
) -> Option<Mat4> {
    let layout =
        TransformLayout::from_presence(rotation.is_some(), position.is_some(), scale.is_some())?;
    Some(layout.compose(
        rotation.map_or(Quat::IDENTITY, |r| r.0),
        position.map_or(Vec3::ZERO, |p| p.0),
        scale.map_or(Vec3::ONE, |s| s.0),
    ))
}

/// A matrix component the composer can write into.
pub trait ComposeTarget: Component + From<Mat4> + PartialEq {}

impl ComposeTarget for WorldMatrix {}
impl ComposeTarget for LocalToParent {}

type AnyLocalInput = Or<(With<Rotation>, With<Position>, With<Scale>)>;
type LocalInputChanged<T> = Or<(Changed<Rotation>, Changed<Position>, Changed<Scale>, Added<T>)>;
type InnerFilter = (With<ParentLink>, With<DepthGroup>);
type LeafFilter = (With<ParentLink>, Without<DepthGroup>);

/// Entities of batch filter `F` whose local inputs changed since the system
/// last ran, or whose target `T` was just added.
pub type ComposeQuery<'w, 's, T, F> = Query<
    'w,
    's,
    (
        Option<&'static Rotation>,
        Option<&'static Position>,
        Option<&'static Scale>,
        &'static mut T,
    ),
    (F, AnyLocalInput, LocalInputChanged<T>, Without<Frozen>),
>;

/// Every non-frozen entity of batch filter `F`, with or without inputs.
/// Looked up by entity for targets that must be rebuilt without a change tick.
pub type RecomposeQuery<'w, 's, T, F> = Query<
    'w,
    's,
    (
        Option<&'static Rotation>,
        Option<&'static Position>,
        Option<&'static Scale>,
        &'static mut T,
    ),
    (F, Without<Frozen>),
>;

/// Removal streams of the three local inputs.
///
/// Removing an input changes the entity's layout without raising a change
/// tick; the composers rebuild those targets from these streams.
#[derive(SystemParam)]
pub struct RemovedInputs<'w, 's> {
    rotation: RemovedComponents<'w, 's, Rotation>,
    position: RemovedComponents<'w, 's, Position>,
    scale: RemovedComponents<'w, 's, Scale>,
}

impl RemovedInputs<'_, '_> {
    /// Entities that lost at least one input since the system last ran.
    /// An entity may appear more than once.
    pub fn read(&mut self) -> impl Iterator<Item = Entity> + '_ {
        self.rotation
            .read()
            .chain(self.position.read())
            .chain(self.scale.read())
    }
}

fn compose_into<T: ComposeTarget, F: QueryFilter>(query: &mut ComposeQuery<'_, '_, T, F>) {
    query
        .par_iter_mut()
        .for_each(|(rotation, position, scale, mut target)| {
            if let Some(matrix) = compose_local(rotation, position, scale) {
                target.set_if_neq(T::from(matrix));
            }
        });
}

/// Rebuilds the target of each listed entity from whatever inputs it still
/// has. An entity left without inputs gets identity.
fn recompose<T: ComposeTarget, F: QueryFilter>(
    query: &mut RecomposeQuery<'_, '_, T, F>,
    entities: impl IntoIterator<Item = Entity>,
) {
    let mut iter = query.iter_many_mut(entities);
    while let Some((rotation, position, scale, mut target)) = iter.fetch_next() {
        let matrix = compose_local(rotation, position, scale).unwrap_or(Mat4::IDENTITY);
        target.set_if_neq(T::from(matrix));
    }
}

/// Writes [`WorldMatrix`] for root entities directly from their own inputs.
///
/// Entities detached since the last run, or that lost an input, are
/// recomputed even though none of their remaining inputs changed.
#[allow(clippy::type_complexity)]
pub fn compose_root_world(
    mut queries: ParamSet<(
        ComposeQuery<WorldMatrix, Without<ParentLink>>,
        RecomposeQuery<WorldMatrix, Without<ParentLink>>,
    )>,
    mut orphaned: RemovedComponents<ParentLink>,
    mut removed: RemovedInputs,
) {
    compose_into(&mut queries.p0());
    recompose(&mut queries.p1(), orphaned.read().chain(removed.read()));
}

/// Writes [`LocalToParent`] for attached entities that have children.
#[allow(clippy::type_complexity)]
pub fn compose_inner_local(
    mut queries: ParamSet<(
        ComposeQuery<LocalToParent, InnerFilter>,
        RecomposeQuery<LocalToParent, InnerFilter>,
    )>,
    mut removed: RemovedInputs,
) {
    compose_into(&mut queries.p0());
    recompose(&mut queries.p1(), removed.read());
}

/// Writes [`LocalToParent`] for attached entities without children.
#[allow(clippy::type_complexity)]
pub fn compose_leaf_local(
    mut queries: ParamSet<(
        ComposeQuery<LocalToParent, LeafFilter>,
        RecomposeQuery<LocalToParent, LeafFilter>,
    )>,
    mut removed: RemovedInputs,
) {
    compose_into(&mut queries.p0());
    recompose(&mut queries.p1(), removed.read());
}

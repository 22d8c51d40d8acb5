//! Transform components: the optional local inputs an entity may carry and the
//! matrices the propagation systems write.
//!
//! [`Rotation`], [`Position`] and [`Scale`] are owned by gameplay code and are
//! only ever read here. [`WorldMatrix`] and [`LocalToParent`] are written
//! exclusively by the transform systems; everything else should treat them as
//! read-only.

use bevy_ecs::component::Component;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

/// Local rotation, relative to the parent (or to the world for roots).
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Rotation(pub Quat);

impl Default for Rotation {
    fn default() -> Self {
        Self(Quat::IDENTITY)
    }
}

/// Local translation, relative to the parent (or to the world for roots).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position(pub Vec3);

impl Position {
    /// Creates a position from its coordinates.
    #[inline]
    pub const fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }
}

/// Local, possibly non-uniform scale.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Scale(pub Vec3);

impl Default for Scale {
    fn default() -> Self {
        Self(Vec3::ONE)
    }
}

impl Scale {
    /// Creates a uniform scale.
    #[inline]
    pub const fn splat(value: f32) -> Self {
        Self(Vec3::splat(value))
    }
}

/// Final world-space transform of an entity.
///
/// For a root this is the composition of its own [`Rotation`], [`Position`]
/// and [`Scale`]; for an attached entity it is always
/// `parent world * LocalToParent`. The layout is a plain `Mat4`, so a slice of
/// these can be uploaded to the GPU with [`bytemuck::cast_slice`].
#[derive(Component, Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(transparent)]
pub struct WorldMatrix(pub Mat4);

/// Transform of an attached entity relative to its immediate parent.
#[derive(Component, Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(transparent)]
pub struct LocalToParent(pub Mat4);

macro_rules! impl_matrix_component {
    ($ty:ident) => {
        impl $ty {
            /// Identity matrix.
            pub const IDENTITY: Self = Self(Mat4::IDENTITY);

            /// Returns the underlying matrix.
            #[inline]
            pub fn matrix(&self) -> Mat4 {
                self.0
            }

            /// Returns the translation part of the matrix.
            #[inline]
            pub fn translation(&self) -> Vec3 {
                self.0.w_axis.truncate()
            }

            /// Transforms a point by this matrix.
            #[inline]
            pub fn transform_point(&self, point: Vec3) -> Vec3 {
                self.0.transform_point3(point)
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::IDENTITY
            }
        }

        impl From<Mat4> for $ty {
            fn from(matrix: Mat4) -> Self {
                Self(matrix)
            }
        }
    };
}

impl_matrix_component!(WorldMatrix);
impl_matrix_component!(LocalToParent);

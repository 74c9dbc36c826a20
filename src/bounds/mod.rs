//! Bounding-volume primitives stored in the BVH nodes.

pub mod aabb;
pub mod sphere;

pub use aabb::Aabb;
pub use sphere::BoundingSphere;

use std::fmt::Debug;

use crate::collision::sat::SatSpace;

/// Value type the BVH is generic over.
pub trait BoundingVolume: Copy + Debug + PartialEq {
    type Vector: SatSpace;

    /// Tightest volume of this kind enclosing `aabb`.
    fn from_aabb(aabb: &Aabb<Self::Vector>) -> Self;

    fn combine(&self, other: &Self) -> Self;

    /// Surface measure used by the SAH cost metric.
    fn surface(&self) -> f32;

    /// Overlap test; touching volumes intersect.
    fn intersects(&self, other: &Self) -> bool;

    fn contains(&self, other: &Self) -> bool;

    /// Copy enlarged about its centre by `factor`.
    fn fattened(&self, factor: f32) -> Self;

    fn intersects_segment(&self, start: Self::Vector, end: Self::Vector) -> bool;

    fn center(&self) -> Self::Vector;
}

//! Dimension-generic vector helpers layered on top of `glam`.
//!
//! The BVH, the bounding volumes and the convex shapes are all written once
//! against [`SpaceVector`] and instantiated for [`Vec2`] and [`Vec3`].

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

use glam::{Mat2, Quat, Vec2, Vec3};

/// Squared length under which a vector is treated as zero.
pub const LENGTH_EPSILON_SQ: f32 = 1e-12;

/// A 2D or 3D vector with the operations the collision pipeline needs.
pub trait SpaceVector:
    Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f32, Output = Self>
    + Div<f32, Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign<f32>
    + Index<usize, Output = f32>
    + IndexMut<usize>
{
    /// Number of components.
    const DIM: usize;
    const ZERO: Self;

    /// Orientation type: `Mat2` in 2D, `Quat` in 3D.
    type Rotation: Copy + Debug + PartialEq + Send + Sync + 'static;

    fn splat(value: f32) -> Self;
    fn basis(axis: usize) -> Self;
    fn dot(self, other: Self) -> f32;
    fn min(self, other: Self) -> Self;
    fn max(self, other: Self) -> Self;
    fn abs(self) -> Self;
    fn min_element(self) -> f32;
    fn max_element(self) -> f32;

    fn length_squared(self) -> f32 {
        self.dot(self)
    }

    fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    fn normalize_or_zero(self) -> Self {
        let len_sq = self.length_squared();
        if len_sq > LENGTH_EPSILON_SQ {
            self / len_sq.sqrt()
        } else {
            Self::ZERO
        }
    }

    fn identity_rotation() -> Self::Rotation;
    fn rotate(rotation: Self::Rotation, v: Self) -> Self;
    fn unrotate(rotation: Self::Rotation, v: Self) -> Self;
    /// Applies `inner` first, then `outer`.
    fn compose_rotation(outer: Self::Rotation, inner: Self::Rotation) -> Self::Rotation;

    /// World-space direction of local axis `axis` under `rotation`.
    fn rotated_axis(rotation: Self::Rotation, axis: usize) -> Self {
        Self::rotate(rotation, Self::basis(axis))
    }

    /// Surface measure of a box with the given full extents (area in 3D, perimeter in 2D).
    fn box_surface(extents: Self) -> f32;

    /// Surface measure of a sphere (area in 3D, circumference in 2D).
    fn sphere_surface(radius: f32) -> f32;

    /// Separating-axis test of a segment against a box centred at the origin.
    ///
    /// `mid` is the segment midpoint relative to the box centre, `half` is half
    /// the segment vector and `extents` the box half extents.
    fn segment_overlaps_box(mid: Self, half: Self, extents: Self) -> bool;
}

const SEGMENT_AXIS_EPSILON: f32 = 1e-6;

impl SpaceVector for Vec3 {
    const DIM: usize = 3;
    const ZERO: Self = Vec3::ZERO;

    type Rotation = Quat;

    fn splat(value: f32) -> Self {
        Vec3::splat(value)
    }

    fn basis(axis: usize) -> Self {
        Vec3::AXES[axis]
    }

    fn dot(self, other: Self) -> f32 {
        Vec3::dot(self, other)
    }

    fn min(self, other: Self) -> Self {
        Vec3::min(self, other)
    }

    fn max(self, other: Self) -> Self {
        Vec3::max(self, other)
    }

    fn abs(self) -> Self {
        Vec3::abs(self)
    }

    fn min_element(self) -> f32 {
        Vec3::min_element(self)
    }

    fn max_element(self) -> f32 {
        Vec3::max_element(self)
    }

    fn identity_rotation() -> Quat {
        Quat::IDENTITY
    }

    fn rotate(rotation: Quat, v: Self) -> Self {
        rotation * v
    }

    fn unrotate(rotation: Quat, v: Self) -> Self {
        rotation.conjugate() * v
    }

    fn compose_rotation(outer: Quat, inner: Quat) -> Quat {
        (outer * inner).normalize()
    }

    fn box_surface(extents: Self) -> f32 {
        2.0 * (extents.x * extents.y + extents.y * extents.z + extents.z * extents.x)
    }

    fn sphere_surface(radius: f32) -> f32 {
        4.0 * std::f32::consts::PI * radius * radius
    }

    fn segment_overlaps_box(mid: Self, half: Self, extents: Self) -> bool {
        let mut ad = half.abs();
        for axis in 0..3 {
            if mid[axis].abs() > extents[axis] + ad[axis] {
                return false;
            }
        }
        // Near-parallel segments make the cross products vanish; pad them.
        ad += Vec3::splat(SEGMENT_AXIS_EPSILON);
        let cross = half.cross(mid).abs();
        cross.x <= extents.y * ad.z + extents.z * ad.y
            && cross.y <= extents.x * ad.z + extents.z * ad.x
            && cross.z <= extents.x * ad.y + extents.y * ad.x
    }
}

impl SpaceVector for Vec2 {
    const DIM: usize = 2;
    const ZERO: Self = Vec2::ZERO;

    type Rotation = Mat2;

    fn splat(value: f32) -> Self {
        Vec2::splat(value)
    }

    fn basis(axis: usize) -> Self {
        Vec2::AXES[axis]
    }

    fn dot(self, other: Self) -> f32 {
        Vec2::dot(self, other)
    }

    fn min(self, other: Self) -> Self {
        Vec2::min(self, other)
    }

    fn max(self, other: Self) -> Self {
        Vec2::max(self, other)
    }

    fn abs(self) -> Self {
        Vec2::abs(self)
    }

    fn min_element(self) -> f32 {
        Vec2::min_element(self)
    }

    fn max_element(self) -> f32 {
        Vec2::max_element(self)
    }

    fn identity_rotation() -> Mat2 {
        Mat2::IDENTITY
    }

    fn rotate(rotation: Mat2, v: Self) -> Self {
        rotation * v
    }

    fn unrotate(rotation: Mat2, v: Self) -> Self {
        rotation.transpose() * v
    }

    fn compose_rotation(outer: Mat2, inner: Mat2) -> Mat2 {
        outer * inner
    }

    fn box_surface(extents: Self) -> f32 {
        2.0 * (extents.x + extents.y)
    }

    fn sphere_surface(radius: f32) -> f32 {
        2.0 * std::f32::consts::PI * radius
    }

    fn segment_overlaps_box(mid: Self, half: Self, extents: Self) -> bool {
        let ad = half.abs();
        if mid.x.abs() > extents.x + ad.x || mid.y.abs() > extents.y + ad.y {
            return false;
        }
        let ad = ad + Vec2::splat(SEGMENT_AXIS_EPSILON);
        half.perp_dot(mid).abs() <= extents.x * ad.y + extents.y * ad.x
    }
}

/// Closest points between segments `[p0, p1]` and `[q0, q1]`.
///
/// Degenerate segments are handled, so a point can be passed as `p0 == p1`.
pub fn closest_points_on_segments<V: SpaceVector>(p0: V, p1: V, q0: V, q1: V) -> (V, V) {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    let (s, t) = if a <= LENGTH_EPSILON_SQ && e <= LENGTH_EPSILON_SQ {
        (0.0, 0.0)
    } else if a <= LENGTH_EPSILON_SQ {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= LENGTH_EPSILON_SQ {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > LENGTH_EPSILON_SQ {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p0 + d1 * s, q0 + d2 * t)
}

/// Closest point to `point` on segment `[a, b]`.
pub fn closest_point_on_segment<V: SpaceVector>(point: V, a: V, b: V) -> V {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= LENGTH_EPSILON_SQ {
        return a;
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

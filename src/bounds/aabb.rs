use serde::{Deserialize, Serialize};

use crate::bounds::BoundingVolume;
use crate::collision::sat::SatSpace;
use crate::utils::math::SpaceVector;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb<V> {
    pub min: V,
    pub max: V,
}

impl<V: SpaceVector> Aabb<V> {
    pub fn new(min: V, max: V) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: V, half_extents: V) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box containing every point of `points`; `None` for an empty slice.
    pub fn from_points(points: &[V]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(Self::new(*first, *first), |acc, p| Self {
            min: acc.min.min(*p),
            max: acc.max.max(*p),
        }))
    }

    pub fn half_extents(&self) -> V {
        (self.max - self.min) * 0.5
    }

    /// Enclosing box of this box after rotating it about its centre and
    /// translating the centre by `translation`.
    pub fn transformed(&self, rotation: V::Rotation, translation: V) -> Self {
        let half = self.half_extents();
        let mut rotated_half = V::ZERO;
        for axis in 0..V::DIM {
            rotated_half += V::rotated_axis(rotation, axis).abs() * half[axis];
        }
        Self::from_center_half_extents((self.min + self.max) * 0.5 + translation, rotated_half)
    }

    pub fn translated(&self, offset: V) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - V::splat(margin),
            max: self.max + V::splat(margin),
        }
    }
}

impl<V: SatSpace> BoundingVolume for Aabb<V> {
    type Vector = V;

    fn from_aabb(aabb: &Aabb<V>) -> Self {
        *aabb
    }

    fn combine(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    fn surface(&self) -> f32 {
        V::box_surface(self.max - self.min)
    }

    fn intersects(&self, other: &Self) -> bool {
        (0..V::DIM)
            .all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    fn contains(&self, other: &Self) -> bool {
        (0..V::DIM)
            .all(|axis| self.min[axis] <= other.min[axis] && other.max[axis] <= self.max[axis])
    }

    fn fattened(&self, factor: f32) -> Self {
        Self::from_center_half_extents(self.center(), self.half_extents() * factor)
    }

    fn intersects_segment(&self, start: V, end: V) -> bool {
        let mid = (start + end) * 0.5 - self.center();
        let half = (end - start) * 0.5;
        V::segment_overlaps_box(mid, half, self.half_extents())
    }

    fn center(&self) -> V {
        (self.min + self.max) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{Quat, Vec2, Vec3};

    #[test]
    fn touching_boxes_intersect() {
        let a = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let b = a.translated(Vec3::new(2.0, 0.0, 0.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&b.translated(Vec3::new(1e-3, 0.0, 0.0))));
    }

    #[test]
    fn combine_contains_both_inputs() {
        let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
        let b = Aabb::new(Vec2::new(3.0, -2.0), Vec2::new(4.0, -1.0));
        let c = a.combine(&b);
        assert!(c.contains(&a) && c.contains(&b));
        assert_relative_eq!(c.surface(), 2.0 * (4.0 + 3.0));
    }

    #[test]
    fn rotated_box_grows_to_enclose_corners() {
        let unit = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        let rotated = unit.transformed(Quat::from_rotation_z(std::f32::consts::FRAC_PI_4), Vec3::X);
        let half = rotated.half_extents();
        assert_relative_eq!(half.x, std::f32::consts::SQRT_2, epsilon = 1e-5);
        assert_relative_eq!(half.z, 1.0, epsilon = 1e-5);
        assert_relative_eq!(rotated.center(), Vec3::X, epsilon = 1e-6);
    }

    #[test]
    fn fattening_keeps_the_center() {
        let a = Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(3.0, 2.0));
        let fat = a.fattened(1.5);
        assert!(fat.contains(&a));
        assert_relative_eq!(fat.half_extents(), Vec2::new(1.5, 0.75));
    }
}

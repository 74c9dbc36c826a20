use serde::{Deserialize, Serialize};

use crate::bounds::{Aabb, BoundingVolume};
use crate::collision::sat::SatSpace;
use crate::utils::math::{closest_point_on_segment, SpaceVector};

/// Bounding sphere (a circle in 2D).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere<V> {
    pub center: V,
    pub radius: f32,
}

impl<V: SpaceVector> BoundingSphere<V> {
    pub fn new(center: V, radius: f32) -> Self {
        Self { center, radius }
    }
}

impl<V: SatSpace> BoundingVolume for BoundingSphere<V> {
    type Vector = V;

    fn from_aabb(aabb: &Aabb<V>) -> Self {
        Self::new(aabb.center(), aabb.half_extents().length())
    }

    fn combine(&self, other: &Self) -> Self {
        let offset = other.center - self.center;
        let distance = offset.length();
        if distance + other.radius <= self.radius {
            return *self;
        }
        if distance + self.radius <= other.radius {
            return *other;
        }
        let radius = (distance + self.radius + other.radius) * 0.5;
        let center = self.center + offset * ((radius - self.radius) / distance);
        Self::new(center, radius)
    }

    fn surface(&self) -> f32 {
        V::sphere_surface(self.radius)
    }

    fn intersects(&self, other: &Self) -> bool {
        let reach = self.radius + other.radius;
        (other.center - self.center).length_squared() <= reach * reach
    }

    fn contains(&self, other: &Self) -> bool {
        (other.center - self.center).length() + other.radius <= self.radius
    }

    fn fattened(&self, factor: f32) -> Self {
        Self::new(self.center, self.radius * factor)
    }

    fn intersects_segment(&self, start: V, end: V) -> bool {
        let closest = closest_point_on_segment(self.center, start, end);
        (closest - self.center).length_squared() <= self.radius * self.radius
    }

    fn center(&self) -> V {
        self.center
    }
}

use serde::{Deserialize, Serialize};

use crate::bounds::BoundingVolume;
use crate::bvh::forest::Forest;
use crate::utils::math::SpaceVector;

/// Ray described by an origin, a unit direction and a maximum length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayQuery<V> {
    pub origin: V,
    pub direction: V,
    pub max_distance: f32,
}

impl<V: SpaceVector> RayQuery<V> {
    /// Normalizes `direction`; a zero direction yields a ray that hits nothing
    /// but shapes containing `origin`.
    pub fn new(origin: V, direction: V, max_distance: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            max_distance,
        }
    }

    pub fn end(&self) -> V {
        self.origin + self.direction * self.max_distance
    }

    pub fn point_at(&self, t: f32) -> V {
        self.origin + self.direction * t
    }
}

/// Closest hit of a picking ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayCollisionData {
    pub has_collided: bool,
    pub model_idx: u32,
    pub instance_idx: u32,
    /// Distance along the ray; infinite when nothing was hit.
    pub t: f32,
}

impl Default for RayCollisionData {
    fn default() -> Self {
        Self {
            has_collided: false,
            model_idx: 0,
            instance_idx: 0,
            t: f32::INFINITY,
        }
    }
}

/// Walks `forest` without a stack, pruning subtrees whose volume the ray
/// segment misses, and keeps the nearest leaf hit in `best`. Equal distances
/// keep the earlier hit.
pub fn cast_forest<B: BoundingVolume, X>(
    query: &RayQuery<B::Vector>,
    forest: &Forest<B, X>,
    best: &mut RayCollisionData,
) {
    let end = query.end();
    let mut cursor = forest.root();
    while let Some(node) = cursor {
        if forest.bv(node).intersects_segment(query.origin, end) {
            if let Some([left, _]) = forest.children(node) {
                cursor = Some(left);
                continue;
            }
            if let Some(leaf) = node.as_leaf().and_then(|id| forest.leaf(id)) {
                let max_t = best.t.min(query.max_distance);
                let hit = leaf.primitive().intersect_ray(query.origin, query.direction, max_t);
                if let Some(t) = hit {
                    if t < best.t {
                        *best = RayCollisionData {
                            has_collided: true,
                            model_idx: leaf.id().model_idx,
                            instance_idx: leaf.id().instance_idx,
                            t,
                        };
                    }
                }
            }
        }
        cursor = forest.links(node).escape;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Aabb;
    use crate::bvh::forest::ForestKind;
    use crate::collision::contact::LmntId;
    use crate::collision::primitive::CollisionPrimitive;
    use crate::collision::shapes::Shape;
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};

    #[test]
    fn nearest_box_wins_regardless_of_insert_order() {
        let mut forest: Forest<Aabb<Vec3>, ()> = Forest::with_capacity(ForestKind::Static, 8);
        for (n, x) in [6.0f32, 0.0, 3.0, 9.0].into_iter().enumerate() {
            let shape = Shape::cuboid(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(0.5));
            forest
                .insert(shape.aabb(), LmntId::new(n as u32, 7), CollisionPrimitive::new(shape), ())
                .unwrap();
        }
        let query = RayQuery::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), 100.0);
        let mut best = RayCollisionData::default();
        cast_forest(&query, &forest, &mut best);
        assert!(best.has_collided);
        assert_eq!((best.model_idx, best.instance_idx), (1, 7));
        assert_relative_eq!(best.t, 9.5, epsilon = 1e-5);
    }

    #[test]
    fn ray_too_short_misses() {
        let mut forest: Forest<Aabb<Vec3>, ()> = Forest::with_capacity(ForestKind::Static, 1);
        let shape = Shape::sphere(Vec3::ZERO, 1.0);
        forest
            .insert(shape.aabb(), LmntId::new(0, 0), CollisionPrimitive::new(shape), ())
            .unwrap();
        let query = RayQuery::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::X, 5.0);
        let mut best = RayCollisionData::default();
        cast_forest(&query, &forest, &mut best);
        assert!(!best.has_collided);
    }
}

use crate::bounds::Aabb;
use crate::collision::contact::{ContactManifold, LmntId};
use crate::collision::narrowphase::{test_shapes, PairCache};
use crate::collision::sat::SatSpace;
use crate::collision::shapes::{Shape, ShapeKind, TransformDelta};

/// Coherence data remembered from the last narrow-phase test this primitive
/// led. It is only reused when the next test is against the same element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coherence<V> {
    pub other: Option<LmntId>,
    pub cache: PairCache<V>,
}

/// Exact shape of a scene element plus its narrow-phase coherence cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionPrimitive<V: SatSpace> {
    shape: Shape<V>,
    coherence: Coherence<V>,
}

impl<V: SatSpace> CollisionPrimitive<V> {
    pub fn new(shape: Shape<V>) -> Self {
        Self {
            shape,
            coherence: Coherence::default(),
        }
    }

    pub fn shape(&self) -> &Shape<V> {
        &self.shape
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn coherence(&self) -> &Coherence<V> {
        &self.coherence
    }

    pub fn aabb(&self) -> Aabb<V> {
        self.shape.aabb()
    }

    pub fn transform(&mut self, delta: &TransformDelta<V>) {
        self.shape.transform(delta);
    }

    pub fn translate(&mut self, offset: V) {
        self.shape.translate(offset);
    }

    pub fn rotate(&mut self, rotation: V::Rotation) {
        self.shape.rotate(rotation);
    }

    pub fn scale(&mut self, factor: f32) {
        self.shape.scale(factor);
    }

    pub fn intersect_ray(&self, origin: V, direction: V, max_t: f32) -> Option<f32> {
        self.shape.intersect_ray(origin, direction, max_t)
    }

    /// Exact test against `other`, identified by `other_id` for the
    /// coherence cache. The manifold normal points from `self` to `other`.
    pub fn test_collision(
        &mut self,
        other: &CollisionPrimitive<V>,
        other_id: LmntId,
        manifold: Option<&mut ContactManifold<V>>,
    ) -> bool {
        if self.coherence.other != Some(other_id) {
            self.coherence = Coherence {
                other: Some(other_id),
                cache: PairCache::default(),
            };
        }
        test_shapes(&self.shape, &other.shape, &mut self.coherence.cache, manifold)
    }
}

impl<V: SatSpace> From<Shape<V>> for CollisionPrimitive<V> {
    fn from(shape: Shape<V>) -> Self {
        Self::new(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn coherence_resets_when_partner_changes() {
        let mut a = CollisionPrimitive::new(Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE));
        let far_box = Shape::cuboid(Vec3::new(5.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        let far = CollisionPrimitive::new(far_box);
        let mut manifold = ContactManifold::default();
        assert!(!a.test_collision(&far, LmntId::new(1, 0), Some(&mut manifold)));
        assert_eq!(a.coherence().other, Some(LmntId::new(1, 0)));
        assert_eq!(a.coherence().cache.separating_axis, Some(0));

        let sphere = CollisionPrimitive::new(Shape::sphere(Vec3::new(0.0, 5.0, 0.0), 1.0));
        assert!(!a.test_collision(&sphere, LmntId::new(2, 0), None));
        assert_eq!(a.coherence().other, Some(LmntId::new(2, 0)));
        assert_eq!(a.coherence().cache.separating_axis, None);
    }
}

//! Convex shapes: box (rect in 2D), sphere (circle in 2D) and capsule
//! (stadium in 2D).
//!
//! Every shape is a convex *core* plus a *margin*: a box has no margin, a
//! sphere is a point core with its radius as margin and a capsule is a segment
//! core with its radius as margin. GJK runs on the cores only.

use crate::bounds::Aabb;
use crate::utils::math::SpaceVector;

/// Rigid change applied to a shape by the mobility layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformDelta<V: SpaceVector> {
    pub translation: V,
    /// Rotation about the shape's own centre.
    pub rotation: V::Rotation,
    /// Uniform scale factor; `1.0` leaves the size unchanged.
    pub scale: f32,
}

impl<V: SpaceVector> Default for TransformDelta<V> {
    fn default() -> Self {
        Self {
            translation: V::ZERO,
            rotation: V::identity_rotation(),
            scale: 1.0,
        }
    }
}

impl<V: SpaceVector> TransformDelta<V> {
    pub fn translation(translation: V) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn rotation(rotation: V::Rotation) -> Self {
        Self {
            rotation,
            ..Self::default()
        }
    }
}

/// Oriented box; `half_extents` is the box's scale relative to the unit box `[-1, 1]^d`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox<V: SpaceVector> {
    pub center: V,
    pub rotation: V::Rotation,
    pub half_extents: V,
}

impl<V: SpaceVector> OrientedBox<V> {
    pub fn new(center: V, rotation: V::Rotation, half_extents: V) -> Self {
        debug_assert!(half_extents.min_element() >= 0.0, "negative box extents");
        Self {
            center,
            rotation,
            half_extents,
        }
    }

    pub fn axis(&self, axis: usize) -> V {
        V::rotated_axis(self.rotation, axis)
    }

    /// Vertex of the box furthest along `direction`.
    pub fn support(&self, direction: V) -> V {
        let local = V::unrotate(self.rotation, direction);
        let mut corner = V::ZERO;
        for axis in 0..V::DIM {
            corner[axis] = if local[axis] >= 0.0 {
                self.half_extents[axis]
            } else {
                -self.half_extents[axis]
            };
        }
        self.center + V::rotate(self.rotation, corner)
    }

    /// Half-length of the box's projection onto unit `axis`.
    pub fn projected_radius(&self, axis: V) -> f32 {
        (0..V::DIM)
            .map(|i| self.axis(i).dot(axis).abs() * self.half_extents[i])
            .sum()
    }

    pub fn aabb(&self) -> Aabb<V> {
        Aabb::from_center_half_extents(V::ZERO, self.half_extents)
            .transformed(self.rotation, self.center)
    }

    pub fn to_local(&self, point: V) -> V {
        V::unrotate(self.rotation, point - self.center)
    }

    /// Slab test in box space.
    pub fn intersect_ray(&self, origin: V, direction: V, max_t: f32) -> Option<f32> {
        let o = self.to_local(origin);
        let d = V::unrotate(self.rotation, direction);
        let mut t_min = 0.0f32;
        let mut t_max = max_t;
        for axis in 0..V::DIM {
            let h = self.half_extents[axis];
            if d[axis].abs() < 1e-8 {
                if o[axis] < -h || o[axis] > h {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let mut t1 = (-h - o[axis]) * inv;
            let mut t2 = (h - o[axis]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Sphere in 3D, circle in 2D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball<V> {
    pub center: V,
    pub radius: f32,
}

impl<V: SpaceVector> Ball<V> {
    pub fn new(center: V, radius: f32) -> Self {
        debug_assert!(radius >= 0.0, "negative radius");
        Self { center, radius }
    }

    pub fn aabb(&self) -> Aabb<V> {
        Aabb::from_center_half_extents(self.center, V::splat(self.radius))
    }

    pub fn intersect_ray(&self, origin: V, direction: V, max_t: f32) -> Option<f32> {
        ray_ball(origin, direction, self.center, self.radius, max_t)
    }
}

/// Capsule in 3D, stadium in 2D: the set of points within `radius` of a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule<V> {
    pub center: V,
    /// Unit direction of the core segment.
    pub axis: V,
    pub half_length: f32,
    pub radius: f32,
}

impl<V: SpaceVector> Capsule<V> {
    /// Capsule whose core runs from `start` along unit `axis` for `length`.
    pub fn new(start: V, axis: V, length: f32, radius: f32) -> Self {
        debug_assert!(axis.length_squared() > 0.0, "zero-length capsule axis");
        let axis = axis.normalize_or_zero();
        Self {
            center: start + axis * (length * 0.5),
            axis,
            half_length: length * 0.5,
            radius,
        }
    }

    pub fn segment(&self) -> (V, V) {
        let offset = self.axis * self.half_length;
        (self.center - offset, self.center + offset)
    }

    pub fn aabb(&self) -> Aabb<V> {
        let (a, b) = self.segment();
        Aabb::new(a.min(b), a.max(b)).expanded(self.radius)
    }

    pub fn intersect_ray(&self, origin: V, direction: V, max_t: f32) -> Option<f32> {
        let (a, b) = self.segment();
        let mut best = [
            ray_ball(origin, direction, a, self.radius, max_t),
            ray_ball(origin, direction, b, self.radius, max_t),
        ]
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<f32>, t| Some(acc.map_or(t, |best| best.min(t))));

        // Side of the swept part: distance to the infinite core line equals the radius.
        let rel = origin - self.center;
        let rel_perp = rel - self.axis * rel.dot(self.axis);
        let dir_perp = direction - self.axis * direction.dot(self.axis);
        let a2 = dir_perp.length_squared();
        if a2 > 1e-12 {
            let b2 = rel_perp.dot(dir_perp);
            let c2 = rel_perp.length_squared() - self.radius * self.radius;
            let disc = b2 * b2 - a2 * c2;
            if disc >= 0.0 {
                let t = if c2 <= 0.0 { 0.0 } else { (-b2 - disc.sqrt()) / a2 };
                let axial = (rel + direction * t).dot(self.axis);
                if t >= 0.0 && t <= max_t && axial.abs() <= self.half_length {
                    best = Some(best.map_or(t, |current| current.min(t)));
                }
            }
        }
        best
    }
}

fn ray_ball<V: SpaceVector>(
    origin: V,
    direction: V,
    center: V,
    radius: f32,
    max_t: f32,
) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let disc = b * b - c;
    if disc < 0.0 || b > 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t <= max_t).then_some(t)
}

/// Discriminant of [`Shape`], used to index the pair-test table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Box = 0,
    Sphere = 1,
    Capsule = 2,
}

/// Closed set of convex shapes. In 2D the variants are a rectangle, a circle and a stadium.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<V: SpaceVector> {
    Box(OrientedBox<V>),
    Sphere(Ball<V>),
    Capsule(Capsule<V>),
}

impl<V: SpaceVector> Shape<V> {
    pub fn cuboid(center: V, rotation: V::Rotation, half_extents: V) -> Self {
        Self::Box(OrientedBox::new(center, rotation, half_extents))
    }

    pub fn sphere(center: V, radius: f32) -> Self {
        Self::Sphere(Ball::new(center, radius))
    }

    pub fn capsule(start: V, axis: V, length: f32, radius: f32) -> Self {
        Self::Capsule(Capsule::new(start, axis, length, radius))
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Box(_) => ShapeKind::Box,
            Shape::Sphere(_) => ShapeKind::Sphere,
            Shape::Capsule(_) => ShapeKind::Capsule,
        }
    }

    pub fn center(&self) -> V {
        match self {
            Shape::Box(b) => b.center,
            Shape::Sphere(s) => s.center,
            Shape::Capsule(c) => c.center,
        }
    }

    pub fn margin(&self) -> f32 {
        match self {
            Shape::Box(_) => 0.0,
            Shape::Sphere(s) => s.radius,
            Shape::Capsule(c) => c.radius,
        }
    }

    /// Support point of the core (the shape shrunk by its margin).
    pub fn core_support(&self, direction: V) -> V {
        match self {
            Shape::Box(b) => b.support(direction),
            Shape::Sphere(s) => s.center,
            Shape::Capsule(c) => {
                let (a, b) = c.segment();
                if direction.dot(c.axis) >= 0.0 {
                    b
                } else {
                    a
                }
            }
        }
    }

    /// Support point of the full shape, margin included.
    pub fn support(&self, direction: V) -> V {
        self.core_support(direction) + direction.normalize_or_zero() * self.margin()
    }

    /// Point of the core closest to `point` (approximate for boxes: the centre).
    pub fn core_point_towards(&self, point: V) -> V {
        match self {
            Shape::Box(b) => b.center,
            Shape::Sphere(s) => s.center,
            Shape::Capsule(c) => {
                let (a, b) = c.segment();
                crate::utils::math::closest_point_on_segment(point, a, b)
            }
        }
    }

    pub fn aabb(&self) -> Aabb<V> {
        match self {
            Shape::Box(b) => b.aabb(),
            Shape::Sphere(s) => s.aabb(),
            Shape::Capsule(c) => c.aabb(),
        }
    }

    pub fn translate(&mut self, offset: V) {
        match self {
            Shape::Box(b) => b.center += offset,
            Shape::Sphere(s) => s.center += offset,
            Shape::Capsule(c) => c.center += offset,
        }
    }

    /// Rotates about the shape's centre.
    pub fn rotate(&mut self, rotation: V::Rotation) {
        match self {
            Shape::Box(b) => b.rotation = V::compose_rotation(rotation, b.rotation),
            Shape::Sphere(_) => {}
            Shape::Capsule(c) => c.axis = V::rotate(rotation, c.axis).normalize_or_zero(),
        }
    }

    /// Uniform scale about the shape's centre.
    pub fn scale(&mut self, factor: f32) {
        match self {
            Shape::Box(b) => b.half_extents *= factor,
            Shape::Sphere(s) => s.radius *= factor,
            Shape::Capsule(c) => {
                c.half_length *= factor;
                c.radius *= factor;
            }
        }
    }

    pub fn transform(&mut self, delta: &TransformDelta<V>) {
        if delta.scale != 1.0 {
            self.scale(delta.scale);
        }
        if delta.rotation != V::identity_rotation() {
            self.rotate(delta.rotation);
        }
        self.translate(delta.translation);
    }

    /// Smallest `t` in `[0, max_t]` at which `origin + direction * t` touches
    /// the shape. `direction` must be unit length.
    pub fn intersect_ray(&self, origin: V, direction: V, max_t: f32) -> Option<f32> {
        match self {
            Shape::Box(b) => b.intersect_ray(origin, direction, max_t),
            Shape::Sphere(s) => s.intersect_ray(origin, direction, max_t),
            Shape::Capsule(c) => c.intersect_ray(origin, direction, max_t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{Mat2, Quat, Vec2, Vec3};

    #[test]
    fn box_support_picks_corner() {
        let b = OrientedBox::new(Vec3::ZERO, Quat::IDENTITY, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.support(Vec3::new(1.0, -1.0, 1.0)), Vec3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn capsule_aabb_covers_both_caps() {
        let c = Capsule::new(Vec3::new(3.0, 0.0, 0.0), Vec3::X, 1.0, 1.0);
        let aabb = c.aabb();
        assert_relative_eq!(aabb.min, Vec3::new(2.0, -1.0, -1.0));
        assert_relative_eq!(aabb.max, Vec3::new(5.0, 1.0, 1.0));
    }

    #[test]
    fn rotating_a_stadium_turns_its_axis() {
        let mut s = Shape::capsule(Vec2::new(-1.0, 0.0), Vec2::X, 2.0, 0.5);
        s.rotate(Mat2::from_angle(std::f32::consts::FRAC_PI_2));
        let Shape::Capsule(c) = s else { unreachable!() };
        assert_relative_eq!(c.axis, Vec2::Y, epsilon = 1e-6);
        assert_relative_eq!(c.center, Vec2::ZERO, epsilon = 1e-6);
    }

    #[test]
    fn ray_hits_near_faces_first() {
        let origin = Vec3::new(-10.0, 0.0, 0.0);
        let b = Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        assert_relative_eq!(b.intersect_ray(origin, Vec3::X, 100.0).unwrap(), 9.0);
        let s = Shape::sphere(Vec3::ZERO, 2.0);
        assert_relative_eq!(s.intersect_ray(origin, Vec3::X, 100.0).unwrap(), 8.0);
        let c = Shape::capsule(Vec3::new(0.0, -2.0, 0.0), Vec3::Y, 4.0, 0.5);
        assert_relative_eq!(c.intersect_ray(origin, Vec3::X, 100.0).unwrap(), 9.5, epsilon = 1e-5);
        assert!(c.intersect_ray(origin, Vec3::X, 5.0).is_none());
    }
}

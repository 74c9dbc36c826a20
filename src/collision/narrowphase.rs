//! Shape-pair dispatch for the narrow phase.
//!
//! Pairs are routed through a `ShapeKind × ShapeKind` table of plain function
//! pointers. Box/box goes through the separating-axis test; every pair with a
//! round shape goes through GJK on the cores with the margins added back, and
//! falls back to an analytic penetration estimate when the cores overlap.

use crate::collision::contact::ContactManifold;
use crate::collision::gjk::{
    gjk_intersection_test, gjk_shallow_penetration_test, GjkJohnsonsDistanceIterator, GjkOutput,
};
use crate::collision::sat::{self, SatSpace};
use crate::collision::shapes::{OrientedBox, Shape};
use crate::utils::math::{closest_points_on_segments, SpaceVector, LENGTH_EPSILON_SQ};

/// Per-pair state carried between ticks for temporal coherence.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairCache<V> {
    /// Last GJK search direction, used to seed the next query.
    pub v: V,
    /// Index of the last separating axis found by the box/box test.
    pub separating_axis: Option<u8>,
}

/// Signature shared by every entry of the dispatch table. The manifold
/// normal, when requested, points from the first shape to the second.
pub type PairTest<V> =
    fn(&Shape<V>, &Shape<V>, &mut PairCache<V>, Option<&mut ContactManifold<V>>) -> bool;

fn dispatch_table<V: SatSpace>() -> [[PairTest<V>; 3]; 3] {
    [
        [box_box, box_round, box_round],
        [round_box, round_round, round_round],
        [round_box, round_round, round_round],
    ]
}

/// Tests `a` against `b`, filling `manifold` on contact.
pub fn test_shapes<V: SatSpace>(
    a: &Shape<V>,
    b: &Shape<V>,
    cache: &mut PairCache<V>,
    manifold: Option<&mut ContactManifold<V>>,
) -> bool {
    dispatch_table::<V>()[a.kind() as usize][b.kind() as usize](a, b, cache, manifold)
}

fn box_box<V: SatSpace>(
    a: &Shape<V>,
    b: &Shape<V>,
    cache: &mut PairCache<V>,
    manifold: Option<&mut ContactManifold<V>>,
) -> bool {
    let (Shape::Box(box_a), Shape::Box(box_b)) = (a, b) else {
        return round_round(a, b, cache, manifold);
    };
    match manifold {
        Some(manifold) => sat::box_box(box_a, box_b, &mut cache.separating_axis, Some(manifold)),
        None => {
            if cache.v.length_squared() <= LENGTH_EPSILON_SQ {
                cache.v = a.center() - b.center();
            }
            let mut iterator = GjkJohnsonsDistanceIterator::new();
            gjk_intersection_test(a, b, &mut iterator, &mut cache.v)
        }
    }
}

enum MarginOutcome {
    Separated,
    Shallow,
    Deep,
}

/// GJK on the cores, interpreted against the sum of the margins.
fn margin_test<V: SatSpace>(
    a: &Shape<V>,
    b: &Shape<V>,
    cache: &mut PairCache<V>,
    manifold: Option<&mut ContactManifold<V>>,
) -> MarginOutcome {
    let margins = a.margin() + b.margin();
    let seed = if cache.v.length_squared() > LENGTH_EPSILON_SQ {
        cache.v
    } else {
        a.center() - b.center()
    };
    let mut iterator = GjkJohnsonsDistanceIterator::new();
    let mut out = GjkOutput::default();
    let depth = gjk_shallow_penetration_test(a, b, margins, &mut iterator, seed, &mut out, &mut ());
    cache.v = out.v;

    if depth < 0.0 {
        return MarginOutcome::Deep;
    }
    if out.distance > margins {
        return MarginOutcome::Separated;
    }

    let delta = out.point_b - out.point_a;
    if delta.length_squared() <= LENGTH_EPSILON_SQ {
        return MarginOutcome::Deep;
    }
    if let Some(manifold) = manifold {
        let normal = delta.normalize_or_zero();
        let surface_a = out.point_a + normal * a.margin();
        let surface_b = out.point_b - normal * b.margin();
        manifold.set_single(normal, (surface_a + surface_b) * 0.5, depth);
    }
    MarginOutcome::Shallow
}

fn box_round<V: SatSpace>(
    a: &Shape<V>,
    b: &Shape<V>,
    cache: &mut PairCache<V>,
    mut manifold: Option<&mut ContactManifold<V>>,
) -> bool {
    match margin_test(a, b, cache, manifold.as_deref_mut()) {
        MarginOutcome::Separated => false,
        MarginOutcome::Shallow => true,
        MarginOutcome::Deep => {
            if let (Shape::Box(bx), Some(manifold)) = (a, manifold) {
                deep_box_round(bx, b, manifold);
            }
            true
        }
    }
}

fn round_box<V: SatSpace>(
    a: &Shape<V>,
    b: &Shape<V>,
    cache: &mut PairCache<V>,
    mut manifold: Option<&mut ContactManifold<V>>,
) -> bool {
    let hit = box_round(b, a, cache, manifold.as_deref_mut());
    if hit {
        if let Some(manifold) = manifold {
            manifold.flip();
        }
    }
    hit
}

fn round_round<V: SatSpace>(
    a: &Shape<V>,
    b: &Shape<V>,
    cache: &mut PairCache<V>,
    mut manifold: Option<&mut ContactManifold<V>>,
) -> bool {
    match margin_test(a, b, cache, manifold.as_deref_mut()) {
        MarginOutcome::Separated => false,
        MarginOutcome::Shallow => true,
        MarginOutcome::Deep => {
            if let Some(manifold) = manifold {
                deep_round_round(a, b, manifold);
            }
            true
        }
    }
}

/// Penetration of a round shape whose core reaches into a box: the core point
/// nearest the box centre is pushed out through the closest box face.
fn deep_box_round<V: SpaceVector>(
    bx: &OrientedBox<V>,
    round: &Shape<V>,
    manifold: &mut ContactManifold<V>,
) {
    let core = round.core_point_towards(bx.center);
    let local = bx.to_local(core);
    let radius = round.margin();

    let mut best_axis = 0;
    let mut best_sign = 1.0;
    let mut best_depth = f32::INFINITY;
    for axis in 0..V::DIM {
        let h = bx.half_extents[axis];
        for sign in [1.0f32, -1.0] {
            let depth = h + radius - sign * local[axis];
            if depth < best_depth {
                best_depth = depth;
                best_axis = axis;
                best_sign = sign;
            }
        }
    }

    let normal = bx.axis(best_axis) * best_sign;
    manifold.set_single(normal, core + normal * (best_depth * 0.5 - radius), best_depth);
}

fn core_segment<V: SpaceVector>(shape: &Shape<V>) -> (V, V) {
    match shape {
        Shape::Capsule(c) => c.segment(),
        other => (other.center(), other.center()),
    }
}

/// Penetration between two round shapes whose cores touch or cross.
fn deep_round_round<V: SpaceVector>(a: &Shape<V>, b: &Shape<V>, manifold: &mut ContactManifold<V>) {
    let (a0, a1) = core_segment(a);
    let (b0, b1) = core_segment(b);
    let (pa, pb) = closest_points_on_segments(a0, a1, b0, b1);
    let delta = pb - pa;
    let distance = delta.length();
    let normal = if distance * distance > LENGTH_EPSILON_SQ {
        delta / distance
    } else {
        V::basis(0)
    };
    let depth = a.margin() + b.margin() - distance;
    manifold.set_single(normal, (pa + pb) * 0.5, depth);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{Mat2, Quat, Vec2, Vec3};

    fn test(a: &Shape<Vec3>, b: &Shape<Vec3>) -> Option<ContactManifold<Vec3>> {
        let mut manifold = ContactManifold::default();
        test_shapes(a, b, &mut PairCache::default(), Some(&mut manifold)).then_some(manifold)
    }

    #[test]
    fn spheres_report_shallow_overlap() {
        let a = Shape::sphere(Vec3::ZERO, 1.0);
        let b = Shape::sphere(Vec3::new(1.5, 0.0, 0.0), 1.0);
        let m = test(&a, &b).expect("spheres overlap");
        assert_relative_eq!(m.normal, Vec3::X, epsilon = 1e-5);
        assert_relative_eq!(m.depth, 0.5, epsilon = 1e-4);
        assert_relative_eq!(m.points[0].position, Vec3::new(0.75, 0.0, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn touching_spheres_collide() {
        let a = Shape::sphere(Vec3::ZERO, 1.0);
        let b = Shape::sphere(Vec3::new(2.0, 0.0, 0.0), 1.0);
        assert!(test(&a, &b).is_some());
        let c = Shape::sphere(Vec3::new(2.01, 0.0, 0.0), 1.0);
        assert!(test(&a, &c).is_none());
    }

    #[test]
    fn concentric_spheres_use_fallback() {
        let a = Shape::sphere(Vec3::ZERO, 1.0);
        let b = Shape::sphere(Vec3::ZERO, 0.5);
        let m = test(&a, &b).expect("concentric");
        assert_relative_eq!(m.depth, 1.5);
    }

    #[test]
    fn sphere_inside_box_escapes_through_nearest_face() {
        let bx = Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let ball = Shape::sphere(Vec3::new(0.0, 0.8, 0.0), 0.5);
        let m = test(&bx, &ball).expect("deep");
        assert_relative_eq!(m.normal, Vec3::Y, epsilon = 1e-6);
        assert_relative_eq!(m.depth, 0.7, epsilon = 1e-5);

        let flipped = test(&ball, &bx).expect("deep");
        assert_relative_eq!(flipped.normal, -Vec3::Y, epsilon = 1e-6);
    }

    #[test]
    fn box_capsule_shallow_contact() {
        let bx = Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let capsule = Shape::capsule(Vec3::new(1.25, -1.0, 0.0), Vec3::Y, 2.0, 0.5);
        let m = test(&bx, &capsule).expect("contact");
        assert_relative_eq!(m.normal, Vec3::X, epsilon = 1e-4);
        assert_relative_eq!(m.depth, 0.25, epsilon = 1e-4);
    }

    #[test]
    fn boolean_box_query_skips_manifold() {
        let a = Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let b = Shape::cuboid(Vec3::new(1.5, 1.5, 0.0), Quat::IDENTITY, Vec3::ONE);
        let mut cache = PairCache::default();
        assert!(test_shapes(&a, &b, &mut cache, None));
        let c = Shape::cuboid(Vec3::new(2.5, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        assert!(!test_shapes(&a, &c, &mut PairCache::default(), None));
    }

    #[test]
    fn circle_and_stadium_in_the_plane() {
        let circle = Shape::sphere(Vec2::ZERO, 1.0);
        let stadium = Shape::capsule(Vec2::new(-2.0, 1.5), Vec2::X, 4.0, 0.75);
        let mut manifold = ContactManifold::default();
        assert!(test_shapes(&circle, &stadium, &mut PairCache::default(), Some(&mut manifold)));
        assert_relative_eq!(manifold.normal, Vec2::Y, epsilon = 1e-4);
        assert_relative_eq!(manifold.depth, 0.25, epsilon = 1e-4);

        let rect = Shape::cuboid(Vec2::new(0.0, -1.9), Mat2::IDENTITY, Vec2::ONE);
        assert!(test_shapes(&circle, &rect, &mut PairCache::default(), Some(&mut manifold)));
        assert_relative_eq!(manifold.normal, -Vec2::Y, epsilon = 1e-4);
        assert_relative_eq!(manifold.depth, 0.1, epsilon = 1e-4);
    }
}

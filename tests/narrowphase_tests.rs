use approx::assert_relative_eq;
use bvh_collision::collision::gjk::{
    gjk_shallow_penetration_test, GjkJohnsonsDistanceIterator, GjkOutput,
};
use bvh_collision::collision::narrowphase::{test_shapes, PairCache};
use bvh_collision::utils::logging::LogTrace;
use bvh_collision::{ContactManifold, Quat, Shape, Vec3};

fn shallow(a: &Shape<Vec3>, b: &Shape<Vec3>) -> (f32, GjkOutput<Vec3>) {
    let mut iterator = GjkJohnsonsDistanceIterator::new();
    let mut out = GjkOutput::default();
    let margins = a.margin() + b.margin();
    let result = gjk_shallow_penetration_test(
        a,
        b,
        margins,
        &mut iterator,
        a.center() - b.center(),
        &mut out,
        &mut LogTrace,
    );
    (result, out)
}

#[test]
fn sphere_and_distant_capsule_are_separated() {
    let sphere = Shape::sphere(Vec3::ZERO, 1.0);
    let capsule = Shape::capsule(Vec3::new(3.0, 0.0, 0.0), Vec3::X, 1.0, 1.0);
    let (result, _) = shallow(&sphere, &capsule);
    assert_eq!(result, 0.0);

    let mut manifold = ContactManifold::default();
    assert!(!test_shapes(&sphere, &capsule, &mut PairCache::default(), Some(&mut manifold)));
}

#[test]
fn shallow_overlap_returns_margin_excess() {
    let sphere = Shape::sphere(Vec3::ZERO, 1.0);
    for gap in [1.2f32, 1.5, 1.9] {
        let capsule = Shape::capsule(Vec3::new(gap, 0.0, 0.0), Vec3::X, 1.0, 1.0);
        let (result, out) = shallow(&sphere, &capsule);
        assert_relative_eq!(result, 2.0 - gap, epsilon = 1e-4);
        assert_relative_eq!(out.distance, gap, epsilon = 1e-4);
        assert_relative_eq!(out.point_b, Vec3::new(gap, 0.0, 0.0), epsilon = 1e-4);
    }
}

#[test]
fn rotated_boxes_produce_manifold_with_unit_normal() {
    let a = Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
    let b = Shape::cuboid(Vec3::new(1.4, 0.3, 0.0), Quat::from_rotation_y(0.4), Vec3::splat(0.5));
    let mut cache = PairCache::default();
    let mut manifold = ContactManifold::default();
    assert!(test_shapes(&a, &b, &mut cache, Some(&mut manifold)));
    assert_relative_eq!(manifold.normal.length(), 1.0, epsilon = 1e-4);
    assert!(manifold.normal.x > 0.0);
    assert!(!manifold.points.is_empty());
    assert!(manifold.points.iter().all(|p| p.depth >= 0.0));
}

#[test]
fn manifold_normal_follows_argument_order() {
    let sphere = Shape::sphere(Vec3::new(0.0, 1.5, 0.0), 1.0);
    let cube = Shape::cuboid(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
    let mut manifold = ContactManifold::default();
    assert!(test_shapes(&cube, &sphere, &mut PairCache::default(), Some(&mut manifold)));
    assert_relative_eq!(manifold.normal, Vec3::Y, epsilon = 1e-4);

    let mut manifold = ContactManifold::default();
    assert!(test_shapes(&sphere, &cube, &mut PairCache::default(), Some(&mut manifold)));
    assert_relative_eq!(manifold.normal, -Vec3::Y, epsilon = 1e-4);
}

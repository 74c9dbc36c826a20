use bvh_collision::{
    Aabb, BoundingSphere, BoundingVolume, CollisionPrimitive, Forest, ForestKind, LmntId, NodeId,
    NodeView, Quat, Shape, Vec3,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Recursive pre-order over the child structure, independent of escape links.
fn structural_preorder<'a, B: BoundingVolume, X>(
    view: NodeView<'a, B, X>,
    out: &mut Vec<NodeView<'a, B, X>>,
) {
    out.push(view);
    if let Some([left, right]) = view.children() {
        structural_preorder(left, out);
        structural_preorder(right, out);
    }
}

fn check_forest<B: BoundingVolume, X>(forest: &mut Forest<B, X>) {
    forest.ensure_depths();
    let Some(root) = forest.root_view() else {
        assert!(forest.is_empty());
        return;
    };
    assert!(root.parent().is_none());

    let mut order = Vec::new();
    structural_preorder(root, &mut order);
    assert_eq!(order.len(), 2 * forest.len() - 1);
    assert_eq!(forest.branch_count(), forest.len() - 1);

    let walked: Vec<NodeId> = forest.preorder().map(|view| view.id()).collect();
    let expected: Vec<NodeId> = order.iter().map(|view| view.id()).collect();
    assert_eq!(walked, expected, "escape links disagree with the child structure");

    for (index, view) in order.iter().enumerate() {
        let next_outside = order[index + 1..]
            .iter()
            .find(|other| other.depth() <= view.depth())
            .map(|other| other.id());
        assert_eq!(view.escape().map(|e| e.id()), next_outside);

        if let Some(children) = view.children() {
            for child in children {
                assert_eq!(child.parent().map(|p| p.id()), Some(view.id()));
                assert_eq!(child.depth(), view.depth() + 1);
                assert!(view.bv().fattened(1.0001).contains(child.bv()));
            }
        }
    }
}

fn random_box(rng: &mut StdRng) -> Shape<Vec3> {
    let center = Vec3::new(
        rng.random_range(-20.0..20.0),
        rng.random_range(-20.0..20.0),
        rng.random_range(-20.0..20.0),
    );
    let half = Vec3::new(
        rng.random_range(0.1..2.0),
        rng.random_range(0.1..2.0),
        rng.random_range(0.1..2.0),
    );
    Shape::cuboid(center, Quat::IDENTITY, half)
}

#[test]
fn structure_survives_random_inserts_and_removals() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut forest: Forest<Aabb<Vec3>, ()> = Forest::with_capacity(ForestKind::Static, 128);
    let mut live = Vec::new();

    for round in 0..400u32 {
        let remove = !live.is_empty() && (live.len() == 128 || rng.random_bool(0.4));
        if remove {
            let index = rng.random_range(0..live.len());
            let leaf = live.swap_remove(index);
            forest.remove(leaf).unwrap();
        } else {
            let shape = random_box(&mut rng);
            let leaf = forest
                .insert(shape.aabb(), LmntId::new(round, 0), CollisionPrimitive::new(shape), ())
                .unwrap();
            live.push(leaf);
        }
        if round % 20 == 0 {
            check_forest(&mut forest);
        }
    }
    check_forest(&mut forest);
    assert_eq!(forest.len(), live.len());
}

#[test]
fn sphere_volumes_keep_the_same_structure_rules() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut forest: Forest<BoundingSphere<Vec3>, ()> =
        Forest::with_capacity(ForestKind::Static, 64);
    for n in 0..64 {
        let shape = random_box(&mut rng);
        let bv = BoundingSphere::from_aabb(&shape.aabb());
        forest.insert(bv, LmntId::new(n, 0), CollisionPrimitive::new(shape), ()).unwrap();
    }
    check_forest(&mut forest);
}

#[test]
fn removing_everything_leaves_an_empty_forest() {
    let mut forest: Forest<Aabb<Vec3>, ()> = Forest::with_capacity(ForestKind::Static, 8);
    let ids: Vec<_> = (0..8)
        .map(|n| {
            let shape = Shape::sphere(Vec3::new(n as f32, 0.0, 0.0), 0.5);
            forest
                .insert(shape.aabb(), LmntId::new(n, 0), CollisionPrimitive::new(shape), ())
                .unwrap()
        })
        .collect();
    for id in ids {
        forest.remove(id).unwrap();
        check_forest(&mut forest);
    }
    assert!(forest.root().is_none());
    assert_eq!(forest.branch_count(), 0);
}

#[test]
fn full_pool_rejects_insert() {
    let mut forest: Forest<Aabb<Vec3>, ()> = Forest::with_capacity(ForestKind::Static, 2);
    for n in 0..2 {
        let shape = Shape::sphere(Vec3::ZERO, 1.0);
        forest
            .insert(shape.aabb(), LmntId::new(n, 0), CollisionPrimitive::new(shape), ())
            .unwrap();
    }
    let shape = Shape::sphere(Vec3::ZERO, 1.0);
    assert!(forest
        .insert(shape.aabb(), LmntId::new(9, 0), CollisionPrimitive::new(shape), ())
        .is_err());
    check_forest(&mut forest);
}

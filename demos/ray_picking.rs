use bvh_collision::*;
use std::collections::HashMap;

fn main() -> Result<()> {
    let mut world = CollisionWorld::new(CollisionConfig {
        frame_budget_ms: Some(1.0),
        ..CollisionConfig::default()
    });

    for i in 0..4u32 {
        let center = Vec3::new(i as f32 * 4.0, 0.0, 0.0);
        world
            .space_3d
            .insert_static(LmntId::new(0, i), Shape::cuboid(center, Quat::IDENTITY, Vec3::ONE))?;
    }
    let ball = LmntId::new(1, 0);
    world.space_3d.insert_mobile(ball, Shape::sphere(Vec3::new(2.0, 3.0, 0.0), 0.75))?;

    let mut moves = HashMap::new();
    for frame in 0..4 {
        moves.insert(ball, TransformDelta::translation(Vec3::new(0.0, -0.5, 0.0)));
        world.step(&mut moves, &mut ())?;
        let out = world.collisions_3d();
        println!(
            "frame {frame}: {} started, {} ended",
            out.collisions_count(),
            out.detachments_count()
        );
    }

    let hit = world.ray_collision_data_3d(Vec3::new(-10.0, 0.0, 0.0), Vec3::X);
    if hit.has_collided {
        println!("Ray hit element ({}, {}) at t = {:.2}", hit.model_idx, hit.instance_idx, hit.t);
    } else {
        println!("Ray hit nothing");
    }
    Ok(())
}

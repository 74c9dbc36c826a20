use bvh_collision::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use std::hint::black_box;

fn scattered_center(i: usize) -> Vec3 {
    let side = 16;
    Vec3::new(
        (i % side) as f32 * 1.7,
        ((i / side) % side) as f32 * 1.7,
        (i / (side * side)) as f32 * 1.7,
    )
}

fn prepare_space(static_count: usize, mobile_count: usize) -> CollisionSpace<Vec3> {
    let max_collisions = 16 * (static_count + mobile_count);
    let config = SpaceConfig::with_capacities(static_count, mobile_count, max_collisions);
    let mut space = CollisionSpace::new(config);
    for i in 0..static_count {
        let shape = Shape::cuboid(scattered_center(i), Quat::IDENTITY, Vec3::splat(0.5));
        space.insert_static(LmntId::new(0, i as u32), shape).unwrap();
    }
    for i in 0..mobile_count {
        let shape = Shape::sphere(scattered_center(i) + Vec3::splat(0.6), 0.6);
        space.insert_mobile(LmntId::new(1, i as u32), shape).unwrap();
    }
    space
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("bvh_insert");
    for &count in &[256usize, 1024, 4096] {
        group.bench_with_input(BenchmarkId::new("static", count), &count, |b, &count| {
            b.iter(|| black_box(prepare_space(count, 0)))
        });
    }
    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("collision_tick");
    for &count in &[256usize, 1024, 4096] {
        group.bench_with_input(BenchmarkId::new("still", count), &count, |b, &count| {
            let mut space = prepare_space(count, count);
            b.iter(|| {
                space.tick(&mut ()).unwrap();
                black_box(space.stats().candidate_count)
            })
        });
        group.bench_with_input(BenchmarkId::new("jitter", count), &count, |b, &count| {
            let mut space = prepare_space(count, count);
            let mut flip = 1.0f32;
            b.iter(|| {
                flip = -flip;
                let mut moves: HashMap<LmntId, TransformDelta<Vec3>> = (0..count)
                    .map(|i| {
                        let delta = TransformDelta::translation(Vec3::X * 0.05 * flip);
                        (LmntId::new(1, i as u32), delta)
                    })
                    .collect();
                space.tick(&mut moves).unwrap();
                black_box(space.stats().reinserted)
            })
        });
    }
    group.finish();
}

fn bench_ray(c: &mut Criterion) {
    let space = prepare_space(4096, 1024);
    c.bench_function("ray_collision_data", |b| {
        b.iter(|| {
            let origin = black_box(Vec3::new(-5.0, 3.4, 3.4));
            black_box(space.ray_collision_data(origin, Vec3::X))
        })
    });
}

criterion_group!(benches, bench_insert, bench_tick, bench_ray);
criterion_main!(benches);

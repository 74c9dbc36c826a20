pub mod collision_space;
pub mod mobility;

pub use collision_space::{Candidate, CollisionSpace, LeafHandle};
pub use mobility::MobilityInterface;

use std::time::Instant;

use glam::{Vec2, Vec3};

use crate::{
    collision::{contact::CollisionsData, queries::RayCollisionData},
    config::CollisionConfig,
    error::Result,
    utils::logging::warn_if_frame_budget_exceeded,
};

/// Central container owning the 3D and 2D collision spaces.
///
/// Elements of one dimensionality never interact with the other; a world
/// step simply ticks both spaces.
pub struct CollisionWorld {
    pub space_3d: CollisionSpace<Vec3>,
    pub space_2d: CollisionSpace<Vec2>,
    frame_budget_ms: Option<f32>,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}

impl CollisionWorld {
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            space_3d: CollisionSpace::new(config.space_3d),
            space_2d: CollisionSpace::new(config.space_2d),
            frame_budget_ms: config.frame_budget_ms,
        }
    }

    pub fn set_frame_budget(&mut self, budget_ms: Option<f32>) {
        self.frame_budget_ms = budget_ms;
    }

    pub fn frame_budget(&self) -> Option<f32> {
        self.frame_budget_ms
    }

    /// Advances both spaces by one tick. Results are read back through
    /// [`collisions_3d`](Self::collisions_3d) and [`collisions_2d`](Self::collisions_2d).
    pub fn step<M3, M2>(&mut self, mobility_3d: &mut M3, mobility_2d: &mut M2) -> Result<()>
    where
        M3: MobilityInterface<Vec3> + ?Sized,
        M2: MobilityInterface<Vec2> + ?Sized,
    {
        let start = Instant::now();
        self.space_3d.tick(mobility_3d)?;
        self.space_2d.tick(mobility_2d)?;
        if let Some(budget) = self.frame_budget_ms {
            warn_if_frame_budget_exceeded(start.elapsed(), budget);
        }
        Ok(())
    }

    pub fn collisions_3d(&self) -> &CollisionsData<Vec3> {
        self.space_3d.last_collisions()
    }

    pub fn collisions_2d(&self) -> &CollisionsData<Vec2> {
        self.space_2d.last_collisions()
    }

    pub fn ray_collision_data_3d(&self, origin: Vec3, direction: Vec3) -> RayCollisionData {
        self.space_3d.ray_collision_data(origin, direction)
    }

    pub fn ray_collision_data_2d(&self, origin: Vec2, direction: Vec2) -> RayCollisionData {
        self.space_2d.ray_collision_data(origin, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::contact::LmntId;
    use crate::collision::shapes::Shape;
    use glam::Mat2;

    #[test]
    fn spaces_tick_independently() {
        let mut world = CollisionWorld::default();
        world
            .space_2d
            .insert_static(LmntId::new(0, 0), Shape::cuboid(Vec2::ZERO, Mat2::IDENTITY, Vec2::ONE))
            .unwrap();
        world
            .space_2d
            .insert_mobile(LmntId::new(1, 0), Shape::sphere(Vec2::new(1.5, 0.0), 1.0))
            .unwrap();
        world
            .space_3d
            .insert_mobile(LmntId::new(0, 0), Shape::sphere(Vec3::new(1.5, 0.0, 0.0), 1.0))
            .unwrap();

        world.step(&mut (), &mut ()).unwrap();
        assert_eq!(world.collisions_2d().collisions_count(), 1);
        assert_eq!(world.collisions_3d().collisions_count(), 0);
    }
}

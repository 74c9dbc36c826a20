//! Configuration for the collision subsystem.
//!
//! All capacities are hard upper bounds fixed at construction time.

use serde::{Deserialize, Serialize};

/// Factor by which a mobile leaf's bounding volume is enlarged before insertion.
pub const DEFAULT_FATTEN_FACTOR: f32 = 1.05;

/// Default number of static leaves per forest.
pub const DEFAULT_STATIC_CAPACITY: usize = 1024;

/// Default number of mobile leaves per forest.
pub const DEFAULT_MOBILE_CAPACITY: usize = 1024;

/// Default number of simultaneously tracked colliding pairs.
pub const DEFAULT_MAX_COLLISIONS: usize = 4096;

/// Length of the segment used for picking rays.
pub const DEFAULT_RAY_LENGTH: f32 = 1.0e4;

/// Capacities and tuning for one dimensionality (2D or 3D).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    pub static_capacity: usize,
    pub mobile_capacity: usize,
    /// Upper bound on pairs kept in the collision record and the output buffers.
    pub max_collisions: usize,
    /// Upper bound on broad-phase candidates per tick.
    pub max_candidates: usize,
    pub fatten_factor: f32,
    pub ray_length: f32,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            static_capacity: DEFAULT_STATIC_CAPACITY,
            mobile_capacity: DEFAULT_MOBILE_CAPACITY,
            max_collisions: DEFAULT_MAX_COLLISIONS,
            max_candidates: DEFAULT_MAX_COLLISIONS,
            fatten_factor: DEFAULT_FATTEN_FACTOR,
            ray_length: DEFAULT_RAY_LENGTH,
        }
    }
}

impl SpaceConfig {
    pub fn with_capacities(
        static_capacity: usize,
        mobile_capacity: usize,
        max_collisions: usize,
    ) -> Self {
        Self {
            static_capacity,
            mobile_capacity,
            max_collisions,
            max_candidates: max_collisions,
            ..Self::default()
        }
    }
}

/// Configuration for both dimensionalities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub space_3d: SpaceConfig,
    pub space_2d: SpaceConfig,
    /// Logs a warning when a world step takes longer than this many milliseconds.
    pub frame_budget_ms: Option<f32>,
}

//! BVH Collision – broad and narrow phase collision detection for Rust.
//!
//! Scene elements live in per-dimensionality collision spaces. Each space
//! keeps a static and a mobile bounding-volume hierarchy traversed without
//! recursion, confirms broad-phase candidates with GJK or SAT, and reports
//! pairs that started or stopped colliding on every tick.

pub mod bounds;
pub mod bvh;
pub mod collision;
pub mod config;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::{Mat2, Quat, Vec2, Vec3};

pub use bounds::{Aabb, BoundingSphere, BoundingVolume};
pub use bvh::{Forest, ForestKind, MobileData, NodeId, NodeView};
pub use collision::{
    contact::{
        CollisionData, CollisionState, CollisionsData, ContactManifold, ContactPoint, LmntId,
        PairKey,
    },
    primitive::CollisionPrimitive,
    queries::{RayCollisionData, RayQuery},
    sat::SatSpace,
    shapes::{Shape, ShapeKind, TransformDelta},
};
pub use config::{CollisionConfig, SpaceConfig};
pub use error::{CollisionError, Result};
pub use utils::allocator::GenerationalId;
pub use utils::math::SpaceVector;
pub use utils::profiling::TickStats;
pub use world::{CollisionSpace, CollisionWorld, LeafHandle, MobilityInterface};

//! Collision detection modules: shapes, GJK, SAT, clipping, contact data, record, queries.

pub mod clipping;
pub mod contact;
pub mod gjk;
pub mod narrowphase;
pub mod primitive;
pub mod queries;
pub mod record;
pub mod sat;
pub mod shapes;

pub use contact::{
    CollisionData, CollisionState, CollisionsData, ContactManifold, ContactPoint, LmntId, PairKey,
};
pub use gjk::{
    gjk_intersection_test, gjk_shallow_penetration_test, GjkJohnsonsDistanceIterator, GjkOutput,
};
pub use narrowphase::{test_shapes, PairCache};
pub use primitive::CollisionPrimitive;
pub use queries::{RayCollisionData, RayQuery};
pub use record::CollisionRecord;
pub use sat::SatSpace;
pub use shapes::{Shape, ShapeKind, TransformDelta};

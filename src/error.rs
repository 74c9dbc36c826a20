//! Error types for the collision subsystem.
//!
//! Every variant is a caller-side sizing or bookkeeping bug: the subsystem
//! never truncates or retries, it reports the condition at the call site.

use thiserror::Error;

use crate::utils::allocator::GenerationalId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollisionError {
    /// A fixed-capacity pool or scratch buffer is full.
    #[error("{pool} capacity of {capacity} exhausted")]
    CapacityExhausted { pool: &'static str, capacity: usize },
    /// The handle is stale or was never handed out by this pool.
    #[error("handle {0:?} is not owned by its pool")]
    InvalidHandle(GenerationalId),
}

pub type Result<T, E = CollisionError> = std::result::Result<T, E>;

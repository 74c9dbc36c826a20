//! Utility helpers including dimension-generic math, pools, logging and profiling.

pub mod allocator;
pub mod logging;
pub mod math;
pub mod profiling;

pub use allocator::{GenerationalId, Pool};
pub use logging::{GjkTrace, LogTrace};
pub use math::SpaceVector;
pub use profiling::{ScopedTimer, TickStats};

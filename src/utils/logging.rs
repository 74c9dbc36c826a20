use log::{log_enabled, warn, Level};
use std::time::Duration;

use crate::utils::math::SpaceVector;

/// Observer for GJK iterations, threaded through the call chain explicitly.
pub trait GjkTrace<V: SpaceVector> {
    /// Called once per support evaluation with the current direction `v` and
    /// the new Minkowski-difference point `w`.
    fn on_iteration(&mut self, iteration: usize, v: V, w: V);

    /// Called when the test settles, with its return value.
    fn on_result(&mut self, _result: f32) {}
}

/// Discards all trace events.
impl<V: SpaceVector> GjkTrace<V> for () {
    fn on_iteration(&mut self, _iteration: usize, _v: V, _w: V) {}
}

/// Forwards GJK iterations to `log::trace!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl<V: SpaceVector> GjkTrace<V> for LogTrace {
    fn on_iteration(&mut self, iteration: usize, v: V, w: V) {
        if log_enabled!(Level::Trace) {
            log::trace!("gjk #{iteration}: v={v:?} w={w:?}");
        }
    }

    fn on_result(&mut self, result: f32) {
        log::trace!("gjk result {result}");
    }
}

/// Registers a warning when frame budget is exceeded.
pub fn warn_if_frame_budget_exceeded(duration: Duration, budget_ms: f32) {
    if duration.as_secs_f32() * 1000.0 > budget_ms {
        warn!(
            "Collision tick exceeded budget: {:.2} ms > {:.2} ms",
            duration.as_secs_f32() * 1000.0,
            budget_ms
        );
    }
}

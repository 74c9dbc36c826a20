use std::time::{Duration, Instant};

/// Timing and counters gathered over one collision tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickStats {
    pub refit_time: Duration,
    pub broad_phase_time: Duration,
    pub narrow_phase_time: Duration,

    pub reinserted: usize,
    pub candidate_count: usize,
    pub collision_count: usize,
    pub detachment_count: usize,
}

impl TickStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn total_time(&self) -> Duration {
        self.refit_time + self.broad_phase_time + self.narrow_phase_time
    }

    pub fn report(&self) {
        let total_us = self.total_time().as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        log::debug!(
            "collision tick: {:.3} ms (refit {:.1}%, broad {:.1}%, narrow {:.1}%), \
             {} candidates, {} collisions, {} detachments, {} reinserted",
            self.total_time().as_secs_f32() * 1000.0,
            (self.refit_time.as_micros() as f32 / total_us) * 100.0,
            (self.broad_phase_time.as_micros() as f32 / total_us) * 100.0,
            (self.narrow_phase_time.as_micros() as f32 / total_us) * 100.0,
            self.candidate_count,
            self.collision_count,
            self.detachment_count,
            self.reinserted,
        );
    }
}

/// Adds the elapsed time of its scope to `output` when dropped.
pub struct ScopedTimer<'a> {
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(output: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            output,
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        *self.output += self.start.elapsed();
    }
}

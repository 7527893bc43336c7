//! Per-trace performance counters.

use std::time::Duration;

/// Counters for one `ray_trace` call.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceMetrics {
    /// Pixels completed (including sentinel-only pixels).
    pub pixels: usize,
    /// Pixels whose ray met the emitter.
    pub hits: usize,
    /// Accepted integrator steps summed over all photons.
    pub steps: u64,
    /// Wall time of the call.
    pub elapsed: Duration,
}

impl TraceMetrics {
    /// Fold a worker's counters into the total.
    pub fn absorb(&mut self, other: &TraceMetrics) {
        self.pixels += other.pixels;
        self.hits += other.hits;
        self.steps += other.steps;
    }
}

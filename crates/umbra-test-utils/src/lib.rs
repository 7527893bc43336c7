//! Test utilities and fixtures for umbra development.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use umbra_core::{CoordKind, Pos4, State8};
use umbra_metric::{Metric, Minkowski, StopCondition};

/// A flat metric whose thread-safety declaration is configurable, for
/// exercising the dispatcher's single-thread fallback.
pub struct MockMetric {
    inner: Minkowski,
    thread_safe: bool,
}

impl MockMetric {
    pub fn new(kind: CoordKind) -> Self {
        Self {
            inner: Minkowski::new(kind),
            thread_safe: true,
        }
    }

    pub fn thread_unsafe(kind: CoordKind) -> Self {
        Self {
            inner: Minkowski::new(kind),
            thread_safe: false,
        }
    }
}

impl Metric for MockMetric {
    fn name(&self) -> &'static str {
        "MockMetric"
    }

    fn coord_kind(&self) -> CoordKind {
        self.inner.coord_kind()
    }

    fn mass(&self) -> f64 {
        self.inner.mass()
    }

    fn gmunu(&self, pos: &Pos4) -> [[f64; 4]; 4] {
        self.inner.gmunu(pos)
    }

    fn gmunu_up(&self, pos: &Pos4) -> [[f64; 4]; 4] {
        self.inner.gmunu_up(pos)
    }

    fn rhs(&self, state: &State8, dstate: &mut State8) {
        self.inner.rhs(state, dstate)
    }

    fn stop_condition(&self, state: &State8) -> Option<StopCondition> {
        self.inner.stop_condition(state)
    }

    fn thread_safe(&self) -> bool {
        self.thread_safe
    }
}

/// Complete a null momentum from spatial components and lower it, ready
/// for seeding a photon — the test-side twin of the screen's pixel
/// seeding.
pub fn seed_null(metric: &dyn Metric, pos: Pos4, k_spatial: [f64; 3]) -> (Pos4, [f64; 4]) {
    let kt = metric.null_tdot(&pos, &k_spatial);
    let k = [kt, k_spatial[0], k_spatial[1], k_spatial[2]];
    (pos, metric.lower(&pos, &k))
}

//! Shared scene builders for the umbra benchmarks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::f64::consts::PI;
use std::sync::Arc;

use umbra_engine::{Scenery, SceneryConfig, Screen};
use umbra_metric::Minkowski;
use umbra_photon::Tuning;
use umbra_test_utils::fixtures::blob_star;

/// A small flat-space blob scene, cheap enough to trace whole frames in
/// a benchmark iteration.
pub fn bench_scenery(resolution: usize, n_threads: usize) -> Scenery {
    let mut screen = Screen::new(resolution, 0.06, 200.0);
    screen.inclination = PI / 2.0;
    Scenery::new(SceneryConfig {
        metric: Arc::new(Minkowski::new(umbra_core::CoordKind::Spherical)),
        screen,
        astrobj: Arc::new(blob_star(4.0, 1e-3, 1e-2)),
        quantities: "Intensity".parse().unwrap(),
        n_threads,
        tuning: Tuning {
            delta: 0.5,
            delta_max: 2.0,
            ..Tuning::default()
        },
    })
    .expect("valid bench scenery")
}

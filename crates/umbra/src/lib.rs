//! Umbra: a general-relativistic ray-tracing engine.
//!
//! Umbra renders synthetic images and spectra of emitters around compact
//! objects by integrating null geodesics backward from a virtual camera
//! through a pluggable space-time metric. This is the top-level facade
//! crate re-exporting the public API of the umbra sub-crates; for most
//! users a single `umbra` dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use umbra::prelude::*;
//!
//! // An optically thin emitting sphere in flat space.
//! let star = FixedStar::new(CoordKind::Spherical, [0.0; 3], 2.0)
//!     .with_spectrum(Spectrum::PowerLaw(PowerLawSpectrum::flat(1e-3)));
//!
//! let scenery = Scenery::new(SceneryConfig {
//!     metric: Arc::new(Minkowski::new(CoordKind::Spherical)),
//!     screen: Screen::new(8, 0.06, 200.0),
//!     astrobj: Arc::new(star),
//!     quantities: "Intensity".parse().unwrap(),
//!     n_threads: 1,
//!     tuning: Tuning { delta: 0.5, delta_max: 2.0, ..Tuning::default() },
//! })
//! .unwrap();
//!
//! let range = PixelRange::full(8);
//! let mut buffer = TraceBuffer::new(scenery.quantities(), 8, 8, 0);
//! let metrics = scenery.ray_trace(&range, &mut buffer, None, None).unwrap();
//! assert_eq!(metrics.pixels, 64);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `umbra-core` | coordinates, quantities, buffers, shared errors |
//! | [`metric`] | `umbra-metric` | the `Metric` trait, Minkowski, KerrBL |
//! | [`photon`] | `umbra-photon` | worldlines, integrators, the photon state machine |
//! | [`astrobj`] | `umbra-astrobj` | emitters, spectra, radiative transfer, grid tables |
//! | [`engine`] | `umbra-engine` | scenery, screen, dispatchers, distributed protocol |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types: coordinates, quantities, buffers, shared errors
/// (`umbra-core`).
pub use umbra_core as types;

/// Space-time metrics (`umbra-metric`).
///
/// The [`metric::Metric`] trait is the main extension point for new
/// space-times.
pub use umbra_metric as metric;

/// Photon transport (`umbra-photon`).
pub use umbra_photon as photon;

/// Emitters and radiative transfer (`umbra-astrobj`).
///
/// The [`astrobj::Astrobj`] trait is the main extension point for new
/// emitting bodies.
pub use umbra_astrobj as astrobj;

/// Scenery aggregate and ray-trace dispatchers (`umbra-engine`).
pub use umbra_engine as engine;

/// Common imports for typical umbra usage.
///
/// ```rust
/// use umbra::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use umbra_core::{
        CoordKind, PixelProps, Quantity, QuantitySet, TraceBuffer,
    };

    // Metrics
    pub use umbra_metric::{KerrBL, Metric, Minkowski, StopCondition};

    // Photon transport
    pub use umbra_photon::{IntegratorKind, Photon, StopReason, Tuning, Worldline};

    // Emitters
    pub use umbra_astrobj::{
        Astrobj, BlackBodySpectrum, Disk3D, Disk3DConfig, FixedStar, PowerLawSpectrum,
        Spectrum, Table, Torus,
    };

    // Engine
    pub use umbra_engine::{
        PixelRange, Scenery, SceneryConfig, Screen, Spectro, TraceMetrics,
    };
}

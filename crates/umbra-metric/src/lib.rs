//! Space-time metrics for the umbra ray-tracing engine.
//!
//! The [`Metric`] trait is the pluggability seam for curved space-times:
//! geodesic right-hand side, circular-orbit velocity, 4-velocity
//! normalization, and terminal-event detection. Two backends ship here —
//! [`Minkowski`] (flat, spherical or cartesian chart) and [`KerrBL`]
//! (rotating black hole, Boyer-Lindquist chart). The catalog of further
//! metrics is an external concern; anything implementing [`Metric`] plugs
//! in.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod compliance;
pub mod error;
pub mod kerr;
pub mod metric;
pub mod minkowski;

pub use error::MetricError;
pub use kerr::KerrBL;
pub use metric::{LegacyStep, Metric, StopCondition};
pub use minkowski::Minkowski;

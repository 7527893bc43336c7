//! Ray-trace engine: the scenery aggregate, the virtual camera, and the
//! dispatchers that drive photons over pixel ranges.
//!
//! A [`Scenery`] ties together a metric, a [`Screen`], an emitter, the
//! requested quantity set and the numerical tuning, and owns the photon
//! template cloned for every traced pixel. [`Scenery::ray_trace`] fills a
//! caller-owned buffer, in-line or over a shared-memory worker pool;
//! [`distributed`] provides the coordinator/worker protocol for
//! multi-process style deployments.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod distributed;
pub mod metrics;
pub mod scenery;
pub mod screen;
pub mod trace;

pub use config::{ConfigError, SceneryConfig};
pub use metrics::TraceMetrics;
pub use scenery::Scenery;
pub use screen::{Screen, ScreenError, Spectro};
pub use trace::{PixelOutcome, PixelRange, TraceError};

//! Photon transport for the umbra ray-tracing engine.
//!
//! A [`Photon`] integrates a null geodesic *backward* in coordinate time
//! from its seed state (a camera pixel), recording every accepted state in
//! a [`Worldline`] that supports interpolated lookup at any intermediate
//! time. Step sizes adapt to local error estimates and to the cooperative
//! [`StepGovernor`](umbra_core::StepGovernor) advertised by the active
//! emitter.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod integrator;
pub mod photon;
pub mod worldline;

mod tableau;

pub use integrator::{IntegratorKind, IntegratorParseError, Tuning};
pub use photon::{Photon, PhotonStatus, StopReason};
pub use worldline::Worldline;

//! Emitters (astrophysical objects) for the umbra ray-tracing engine.
//!
//! Two complementary modes share the [`Astrobj`] capability set:
//!
//! - **standard mode** — the body is described by a signed squared-distance
//!   function with a critical surface and a safety shell
//!   ([`FixedStar`], [`Torus`]);
//! - **grid mode** — emission and matter velocity are tabulated on a dense
//!   cylindrical (ν, φ, z, r) grid ([`Disk3D`]), read from and written to
//!   the binary grid-table container in [`table`].
//!
//! Both drive the same radiative-transfer fold in [`hit`], which writes
//! every requested quantity into the per-pixel accumulator.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod astrobj;
pub mod disk3d;
pub mod error;
pub mod fixed_star;
pub mod hit;
pub mod spectrum;
pub mod standard;
pub mod table;
pub mod torus;

pub use astrobj::{Astrobj, RadiativeEmitter};
pub use disk3d::{Disk3D, Disk3DConfig};
pub use error::{AstrobjError, TableError};
pub use fixed_star::FixedStar;
pub use hit::ObsInfo;
pub use spectrum::{BlackBodySpectrum, PowerLawSpectrum, Spectrum};
pub use table::{Extension, Table};
pub use torus::Torus;

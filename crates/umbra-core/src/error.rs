//! Shared error vocabulary for the umbra workspace.
//!
//! Subsystem-specific errors (table I/O, scenery configuration) live next to
//! their subsystems; the enums here are the ones that cross crate
//! boundaries. All failures format as a single machine-parseable line.

use std::error::Error;
use std::fmt;

use crate::coord::CoordKind;

/// A component was asked to operate under a coordinate chart it does not
/// support.
///
/// This signals a model mismatch between metric and emitter: by policy it
/// terminates the run, not just the pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordKindError {
    /// The component that rejected the chart.
    pub component: &'static str,
    /// The active chart.
    pub kind: CoordKind,
}

impl fmt::Display for CoordKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} does not support {} coordinates",
            self.component, self.kind
        )
    }
}

impl Error for CoordKindError {}

/// Tabulated-grid indexing overflow.
///
/// Index values one cell past the end are clamped (floating-point positions
/// on the outer boundary land there); anything beyond is fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridError {
    /// Computed cell index lies strictly beyond the clamping tolerance.
    IndexOutOfRange {
        /// Axis name (`"z"` or `"r"`).
        axis: &'static str,
        /// The offending index.
        index: usize,
        /// Number of cells on that axis.
        len: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { axis, index, len } => write!(
                f,
                "grid index {index} out of range on {axis} axis (len {len})"
            ),
        }
    }
}

impl Error for GridError {}

/// Internal consistency violation. Aborts the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantError {
    /// Description of the violated invariant.
    pub detail: String,
}

impl InvariantError {
    /// Construct from anything stringifiable.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invariant violation: {}", self.detail)
    }
}

impl Error for InvariantError {}

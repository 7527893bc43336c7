//! Metric-level error type.

use std::error::Error;
use std::fmt;

use umbra_core::CoordKindError;

/// Errors surfaced by metric operations.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricError {
    /// A metric operation was asked for under an unsupported chart.
    UnsupportedCoordKind(CoordKindError),
    /// A 4-velocity normalization has no real solution at this position
    /// (the requested spatial velocity is not subluminal there).
    NoTimelikeSolution {
        /// Position at which the normalization failed.
        pos: [f64; 4],
    },
    /// The metric tensor is singular at this position.
    SingularMetric {
        /// Position of the singularity.
        pos: [f64; 4],
    },
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedCoordKind(e) => write!(f, "{e}"),
            Self::NoTimelikeSolution { pos } => write!(
                f,
                "no timelike normalization at (t={}, x1={}, x2={}, x3={})",
                pos[0], pos[1], pos[2], pos[3]
            ),
            Self::SingularMetric { pos } => write!(
                f,
                "metric singular at (t={}, x1={}, x2={}, x3={})",
                pos[0], pos[1], pos[2], pos[3]
            ),
        }
    }
}

impl Error for MetricError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnsupportedCoordKind(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoordKindError> for MetricError {
    fn from(e: CoordKindError) -> Self {
        Self::UnsupportedCoordKind(e)
    }
}

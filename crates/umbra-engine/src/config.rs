//! Scenery configuration and validation.
//!
//! [`SceneryConfig`] is the builder-input for [`Scenery`](crate::Scenery):
//! the external description layer (XML or otherwise) deserializes into
//! this struct, and [`validate()`](SceneryConfig::validate) checks the
//! structural invariants before any photon flies.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use umbra_astrobj::{Astrobj, AstrobjError};
use umbra_core::{CoordKind, Quantity, QuantityParseError, QuantitySet};
use umbra_metric::Metric;
use umbra_photon::{IntegratorParseError, Tuning};

use crate::screen::Screen;

/// Errors detected while building a scenery. All abort the run.
#[derive(Debug)]
pub enum ConfigError {
    /// Screen geometry is unusable.
    InvalidScreen {
        /// Which invariant failed.
        reason: String,
    },
    /// Numerical tuning is contradictory.
    InvalidTuning {
        /// Which invariant failed.
        reason: String,
    },
    /// The emitter is bound to a different chart than the metric.
    ChartMismatch {
        /// The metric's chart.
        metric: CoordKind,
        /// The emitter's chart.
        emitter: CoordKind,
    },
    /// Spectral quantities requested without a spectrometer.
    MissingSpectrometer,
    /// Unknown quantity name in the textual form.
    Quantity(QuantityParseError),
    /// Unknown integrator name in the textual form.
    Integrator(IntegratorParseError),
    /// Emitter construction failure (grid table, conformability).
    Astrobj(AstrobjError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScreen { reason } => write!(f, "invalid screen: {reason}"),
            Self::InvalidTuning { reason } => write!(f, "invalid tuning: {reason}"),
            Self::ChartMismatch { metric, emitter } => write!(
                f,
                "emitter expects {emitter} coordinates but metric is {metric}"
            ),
            Self::MissingSpectrometer => {
                write!(f, "spectral quantities requested without a spectrometer")
            }
            Self::Quantity(e) => write!(f, "{e}"),
            Self::Integrator(e) => write!(f, "{e}"),
            Self::Astrobj(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Quantity(e) => Some(e),
            Self::Integrator(e) => Some(e),
            Self::Astrobj(e) => Some(e),
            _ => None,
        }
    }
}

impl From<QuantityParseError> for ConfigError {
    fn from(e: QuantityParseError) -> Self {
        Self::Quantity(e)
    }
}

impl From<IntegratorParseError> for ConfigError {
    fn from(e: IntegratorParseError) -> Self {
        Self::Integrator(e)
    }
}

impl From<AstrobjError> for ConfigError {
    fn from(e: AstrobjError) -> Self {
        Self::Astrobj(e)
    }
}

/// Complete configuration for constructing a scenery.
pub struct SceneryConfig {
    /// The space-time.
    pub metric: Arc<dyn Metric>,
    /// The camera.
    pub screen: Screen,
    /// The emitter.
    pub astrobj: Arc<dyn Astrobj>,
    /// Requested quantities; empty defaults to Intensity.
    pub quantities: QuantitySet,
    /// Shared-memory worker count; 0 means 1.
    pub n_threads: usize,
    /// Photon tuning, shared by every traced pixel.
    pub tuning: Tuning,
}

impl SceneryConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.screen;
        if s.resolution == 0 {
            return Err(ConfigError::InvalidScreen {
                reason: "resolution must be at least 1".into(),
            });
        }
        if !(s.field_of_view > 0.0 && s.field_of_view.is_finite()) {
            return Err(ConfigError::InvalidScreen {
                reason: format!("field of view must be positive, got {}", s.field_of_view),
            });
        }
        if !(s.distance > 0.0 && s.distance.is_finite()) {
            return Err(ConfigError::InvalidScreen {
                reason: format!("distance must be positive, got {}", s.distance),
            });
        }
        self.tuning
            .check()
            .map_err(|reason| ConfigError::InvalidTuning { reason })?;
        if let Some(chart) = self.astrobj.chart() {
            if chart != self.metric.coord_kind() {
                return Err(ConfigError::ChartMismatch {
                    metric: self.metric.coord_kind(),
                    emitter: chart,
                });
            }
        }
        let spectral = self.quantities.contains(Quantity::Spectrum)
            || self.quantities.contains(Quantity::BinSpectrum);
        if spectral && self.screen.spectro.is_none() {
            return Err(ConfigError::MissingSpectrometer);
        }
        Ok(())
    }
}

impl fmt::Debug for SceneryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneryConfig")
            .field("metric", &self.metric.name())
            .field("astrobj", &self.astrobj.name())
            .field("resolution", &self.screen.resolution)
            .field("quantities", &self.quantities.to_string())
            .field("n_threads", &self.n_threads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_astrobj::FixedStar;
    use umbra_metric::Minkowski;

    fn valid() -> SceneryConfig {
        SceneryConfig {
            metric: Arc::new(Minkowski::new(CoordKind::Spherical)),
            screen: Screen::new(8, 1e-4, 1000.0),
            astrobj: Arc::new(FixedStar::new(CoordKind::Spherical, [0.0; 3], 2.0)),
            quantities: "Intensity".parse().unwrap(),
            n_threads: 1,
            tuning: Tuning::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn zero_resolution_fails() {
        let mut cfg = valid();
        cfg.screen.resolution = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidScreen { .. })
        ));
    }

    #[test]
    fn contradictory_tuning_fails() {
        let mut cfg = valid();
        cfg.tuning.delta_min = 10.0;
        cfg.tuning.delta_max = 1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTuning { .. })
        ));
    }

    #[test]
    fn chart_mismatch_fails() {
        let mut cfg = valid();
        cfg.astrobj = Arc::new(FixedStar::new(CoordKind::Cartesian, [0.0; 3], 2.0));
        match cfg.validate() {
            Err(ConfigError::ChartMismatch { metric, emitter }) => {
                assert_eq!(metric, CoordKind::Spherical);
                assert_eq!(emitter, CoordKind::Cartesian);
            }
            other => panic!("expected ChartMismatch, got {other:?}"),
        }
    }

    #[test]
    fn spectrum_without_spectrometer_fails() {
        let mut cfg = valid();
        cfg.quantities = "Intensity Spectrum".parse().unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingSpectrometer)
        ));
    }
}

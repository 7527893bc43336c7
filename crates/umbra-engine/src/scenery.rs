//! The scenery aggregate root.

use std::sync::Arc;

use umbra_astrobj::{Astrobj, ObsInfo};
use umbra_core::{Pos4, Quantity, QuantitySet, State8, StepGovernor};
use umbra_metric::Metric;
use umbra_photon::{Photon, Tuning};

use crate::config::{ConfigError, SceneryConfig};
use crate::screen::Screen;

/// Adapts the emitter's step constraint to the integrator's governor
/// handle.
struct GovernorAdapter(Arc<dyn Astrobj>);

impl StepGovernor for GovernorAdapter {
    fn delta_max(&self, state: &State8) -> f64 {
        self.0.delta_max(state)
    }
}

/// A ray-tracing scene: metric, screen, emitter, requested quantities,
/// and the photon template every pixel clones.
///
/// The scenery is the single authoritative owner of its components;
/// workers receive shared read-only references. It is read-only during
/// tracing.
pub struct Scenery {
    metric: Arc<dyn Metric>,
    screen: Screen,
    astrobj: Arc<dyn Astrobj>,
    quantities: QuantitySet,
    n_threads: usize,
    template: Photon,
}

impl Scenery {
    /// Build and validate a scenery from its configuration.
    ///
    /// An empty quantity set defaults to Intensity. The photon template is
    /// seeded with the emitter's step governor and escape radius.
    pub fn new(config: SceneryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let SceneryConfig {
            metric,
            screen,
            astrobj,
            mut quantities,
            n_threads,
            tuning,
        } = config;
        if quantities.is_empty() {
            quantities.insert(Quantity::Intensity);
        }
        let template = Photon::new(Arc::clone(&metric), tuning)
            .with_governor(Arc::new(GovernorAdapter(Arc::clone(&astrobj))))
            .with_escape_radius(astrobj.r_max());
        Ok(Self {
            metric,
            screen,
            astrobj,
            quantities,
            n_threads,
            template,
        })
    }

    /// The active metric.
    pub fn metric(&self) -> &Arc<dyn Metric> {
        &self.metric
    }

    /// The camera.
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// The emitter.
    pub fn astrobj(&self) -> &Arc<dyn Astrobj> {
        &self.astrobj
    }

    /// The requested quantity set.
    pub fn quantities(&self) -> QuantitySet {
        self.quantities
    }

    /// Number of requested quantities of scalar nature.
    pub fn scalar_quantities_count(&self) -> usize {
        self.quantities.scalar_count()
    }

    /// Configured shared-memory worker count (0 means 1).
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Spectrometer channel count, 0 without a spectrometer.
    pub fn n_spectral(&self) -> usize {
        self.screen.spectro.map_or(0, |s| s.n_samples)
    }

    /// Clone the photon template for one pixel.
    pub fn clone_photon(&self) -> Photon {
        self.template.clone()
    }

    /// Numerical tuning of the template photon.
    pub fn tuning(&self) -> &Tuning {
        self.template.tuning()
    }

    /// Observer-side radiative context for a pixel seeded at `pos` with
    /// covariant momentum `p`: the observed frequency scale comes from
    /// the static observer at the screen.
    pub fn obs_info(&self, pos: &Pos4, p: &[f64; 4]) -> ObsInfo {
        let g = self.metric.gmunu(pos);
        let u_obs_t = 1.0 / (-g[0][0]).sqrt();
        let (channels, bounds) = match &self.screen.spectro {
            Some(sp) => (sp.channels(), sp.bounds()),
            None => (Vec::new(), Vec::new()),
        };
        ObsInfo {
            freq_obs: -(p[0] * u_obs_t),
            nu_obs: 1.0,
            channels,
            bounds,
        }
    }
}

//! A geometrical torus in circular rotation.

use std::f64::consts::PI;

use umbra_core::{CoordKind, PixelProps, Pos4, State8, StepGovernor, Vel4};
use umbra_metric::Metric;
use umbra_photon::Photon;

use crate::astrobj::{Astrobj, RadiativeEmitter};
use crate::error::AstrobjError;
use crate::hit::ObsInfo;
use crate::spectrum::{BlackBodySpectrum, PowerLawSpectrum, Spectrum};
use crate::standard::{self, StandardShape};

/// Solid torus centred on the equatorial plane, rotating on circular
/// orbits of the active metric.
///
/// `large_radius` is the distance from the centre of the tube to the
/// symmetry axis; `small_radius` the tube (meridian circle) radius.
#[derive(Clone, Debug)]
pub struct Torus {
    kind: CoordKind,
    large_radius: f64,
    critical_value: f64,
    safety_value: f64,
    optically_thin: bool,
    spectrum: Spectrum,
    opacity: PowerLawSpectrum,
}

impl Torus {
    /// Torus with the given large and small radii.
    pub fn new(kind: CoordKind, large_radius: f64, small_radius: f64) -> Self {
        let critical_value = small_radius * small_radius;
        Self {
            kind,
            large_radius,
            critical_value,
            safety_value: critical_value * 1.1,
            optically_thin: true,
            spectrum: Spectrum::BlackBody(BlackBodySpectrum::new(1.0)),
            opacity: PowerLawSpectrum::flat(0.0),
        }
    }

    /// Replace the emission law.
    pub fn with_spectrum(mut self, spectrum: Spectrum) -> Self {
        self.spectrum = spectrum;
        self
    }

    /// Replace the absorption law.
    pub fn with_opacity(mut self, opacity: PowerLawSpectrum) -> Self {
        self.opacity = opacity;
        self
    }

    /// Toggle the optically-thin flag (defaults to thin).
    pub fn optically_thin(mut self, thin: bool) -> Self {
        self.optically_thin = thin;
        self
    }

    /// Distance from tube centre to the symmetry axis.
    pub fn large_radius(&self) -> f64 {
        self.large_radius
    }

    /// Tube radius.
    pub fn small_radius(&self) -> f64 {
        self.critical_value.sqrt()
    }
}

impl StandardShape for Torus {
    fn distance2(&self, pos: &Pos4) -> f64 {
        let (drproj, h) = match self.kind {
            CoordKind::Spherical => (
                pos[1] * pos[2].sin() - self.large_radius,
                pos[1] * pos[2].cos(),
            ),
            CoordKind::Cartesian => (
                pos[1].hypot(pos[2]) - self.large_radius,
                pos[3],
            ),
        };
        drproj * drproj + h * h
    }

    fn critical_value(&self) -> f64 {
        self.critical_value
    }

    fn safety_value(&self) -> f64 {
        self.safety_value
    }
}

impl StepGovernor for Torus {
    fn delta_max(&self, state: &State8) -> f64 {
        standard::shell_delta_max(self, state)
    }
}

impl RadiativeEmitter for Torus {
    fn emission(&self, nu_em: f64, _coord_obj: &State8) -> f64 {
        self.spectrum.value(nu_em)
    }

    fn absorption(&self, nu_em: f64, _coord_obj: &State8) -> f64 {
        self.opacity.value(nu_em)
    }

    fn integrate_emission(&self, nu1: f64, nu2: f64, _coord_obj: &State8) -> f64 {
        self.spectrum.integrate(nu1, nu2)
    }
}

impl Astrobj for Torus {
    fn name(&self) -> &'static str {
        "Torus"
    }

    fn r_max(&self) -> f64 {
        3.0 * (self.large_radius + self.small_radius())
    }

    fn optically_thin(&self) -> bool {
        self.optically_thin
    }

    fn chart(&self) -> Option<CoordKind> {
        Some(self.kind)
    }

    fn emitter_velocity(
        &self,
        metric: &dyn Metric,
        pos: &Pos4,
        vel: &mut Vel4,
    ) -> Result<(), AstrobjError> {
        // Circular orbit at the projection onto the equatorial plane.
        let pos2 = match self.kind {
            CoordKind::Spherical => [pos[0], pos[1] * pos[2].sin(), PI * 0.5, pos[3]],
            CoordKind::Cartesian => [pos[0], pos[1], pos[2], 0.0],
        };
        metric.circular_velocity(&pos2, vel);
        Ok(())
    }

    fn impact(
        &self,
        metric: &dyn Metric,
        photon: &Photon,
        segment: usize,
        obs: &ObsInfo,
        props: &mut PixelProps,
    ) -> Result<bool, AstrobjError> {
        standard::standard_impact(self, metric, photon, segment, obs, props)
    }
}

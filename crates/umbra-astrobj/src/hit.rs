//! Radiative-transfer accumulation and hit-quantity processing.
//!
//! One call folds one piecewise-constant step of the formal solution
//! `I(s + Δs) = I(s)·e^{−αΔs} + (j/α)(1 − e^{−αΔs})` into the pixel
//! accumulator, front-to-back along the backward-traced ray, together with
//! every other requested quantity (emission time, redshift, impact
//! coordinates, spectra, optical depth).
//!
//! The emitter's optically-thin flag forces `α = 0` regardless of the
//! tabulated opacity, so a thin body accumulates `I += j·Δs`. Without the
//! flag the tabulated absorption drives the fold until the transmission
//! saturates; a body with no absorption data at all degenerates to an
//! opaque surface (one sample, then fully blocked).

use umbra_core::{PixelProps, Quantity, State8};
use umbra_metric::Metric;

use crate::astrobj::RadiativeEmitter;

/// Transmission below which a ray is considered fully absorbed.
pub const TRANSMISSION_FLOOR: f64 = 1e-6;

/// Observer-side context shared by every pixel of one trace.
#[derive(Clone, Debug)]
pub struct ObsInfo {
    /// `−g(p, u_obs)` at the observer: the observed frequency scale of the
    /// traced photon.
    pub freq_obs: f64,
    /// Observed frequency for the scalar Intensity quantity.
    pub nu_obs: f64,
    /// Spectrometer channel midpoints (observed frame).
    pub channels: Vec<f64>,
    /// Spectrometer bin boundaries, `channels.len() + 1` entries.
    pub bounds: Vec<f64>,
}

impl ObsInfo {
    /// Context without a spectrometer, unit observed frequency.
    pub fn monochromatic() -> Self {
        Self {
            freq_obs: 1.0,
            nu_obs: 1.0,
            channels: Vec::new(),
            bounds: Vec::new(),
        }
    }
}

/// Frequency shift and path-length context for one emitting sample.
struct SampleFrame {
    /// ν_em/ν_obs.
    ggred: f64,
    /// Proper path length of the step in the emitter frame.
    dsem: f64,
}

impl SampleFrame {
    fn compute(metric: &dyn Metric, coord_ph: &State8, coord_obj: &State8, dt: f64, obs: &ObsInfo) -> Self {
        let pos = [coord_ph[0], coord_ph[1], coord_ph[2], coord_ph[3]];
        let p = [coord_ph[4], coord_ph[5], coord_ph[6], coord_ph[7]];
        let u = [coord_obj[4], coord_obj[5], coord_obj[6], coord_obj[7]];
        // Emitted frequency scale: −p·u, covariant against contravariant.
        let freq_em = -(p[0] * u[0] + p[1] * u[1] + p[2] * u[2] + p[3] * u[3]);
        let gup = metric.gmunu_up(&pos);
        let tdot: f64 = (0..4).map(|nu| gup[0][nu] * p[nu]).sum();
        let dlambda = (dt / tdot).abs();
        Self {
            ggred: freq_em / obs.freq_obs,
            dsem: dlambda * freq_em,
        }
    }
}

/// One front-to-back step of the formal solution at one frequency.
///
/// Returns the intensity increment (observer frame, incoming transmission
/// applied) and the step transmission factor.
fn rt_step(j: f64, alpha: f64, ds: f64, transmission: f64, ggred: f64) -> (f64, f64) {
    let g3 = ggred * ggred * ggred;
    if alpha > 0.0 {
        let absorb = (-alpha * ds).exp();
        let source = j / alpha * (1.0 - absorb);
        (transmission * source / g3, absorb)
    } else {
        (transmission * j * ds / g3, 1.0)
    }
}

/// The saturated limit of the formal solution: what an infinitely deep
/// column of this material radiates. `j/α` with absorption, the bare
/// surface value without.
fn rt_saturated(j: f64, alpha: f64, transmission: f64, ggred: f64) -> f64 {
    let g3 = ggred * ggred * ggred;
    if alpha > 0.0 {
        transmission * (j / alpha) / g3
    } else {
        transmission * j / g3
    }
}

fn record_first_hit(props: &mut PixelProps, coord_ph: &State8, coord_obj: &State8, ggred: f64) {
    if props.hit {
        return;
    }
    if props.requested.contains(Quantity::EmissionTime) {
        props.emission_time = coord_ph[0];
    }
    if props.requested.contains(Quantity::Redshift) {
        props.redshift = ggred;
    }
    if props.requested.contains(Quantity::ImpactCoords) {
        props.impact_coords[..8].copy_from_slice(coord_ph);
        props.impact_coords[8..].copy_from_slice(coord_obj);
    }
}

/// Fold one emitting sample into the pixel accumulator.
///
/// `coord_ph` is the photon 8-state at the sample, `coord_obj` the emitter
/// position (first 4) and 4-velocity (last 4), `dt` the coordinate-time
/// width of the step.
#[allow(clippy::too_many_arguments)]
pub fn process_hit_quantities<E: RadiativeEmitter + ?Sized>(
    metric: &dyn Metric,
    coord_ph: &State8,
    coord_obj: &State8,
    dt: f64,
    obs: &ObsInfo,
    emitter: &E,
    optically_thin: bool,
    props: &mut PixelProps,
) {
    let frame = SampleFrame::compute(metric, coord_ph, coord_obj, dt, obs);
    let ggred = frame.ggred;
    let dsem = frame.dsem;
    record_first_hit(props, coord_ph, coord_obj, ggred);

    if props.requested.contains(Quantity::Intensity) {
        let nu_em = obs.nu_obs * ggred;
        let j = emitter.emission(nu_em, coord_obj);
        let alpha = if optically_thin {
            0.0
        } else {
            emitter.absorption(nu_em, coord_obj)
        };
        if !optically_thin && alpha == 0.0 {
            // No absorption data: opaque surface.
            props.intensity += rt_saturated(j, 0.0, props.transmission, ggred);
        } else {
            let (inc, absorb) = rt_step(j, alpha, dsem, props.transmission, ggred);
            props.intensity += inc;
            props.transmission *= absorb;
        }
        if props.requested.contains(Quantity::Opacity) {
            props.opacity += alpha * dsem;
        }
    } else if props.requested.contains(Quantity::Opacity) {
        let nu_em = obs.nu_obs * ggred;
        let alpha = if optically_thin {
            0.0
        } else {
            emitter.absorption(nu_em, coord_obj)
        };
        props.opacity += alpha * dsem;
    }

    if props.requested.contains(Quantity::Spectrum) {
        for (c, &nu_obs) in obs.channels.iter().enumerate() {
            let nu_em = nu_obs * ggred;
            let j = emitter.emission(nu_em, coord_obj);
            let alpha = if optically_thin {
                0.0
            } else {
                emitter.absorption(nu_em, coord_obj)
            };
            if !optically_thin && alpha == 0.0 {
                props.spectrum[c] += rt_saturated(j, 0.0, props.transmission_nu[c], ggred);
            } else {
                let (inc, absorb) = rt_step(j, alpha, dsem, props.transmission_nu[c], ggred);
                props.spectrum[c] += inc;
                props.transmission_nu[c] *= absorb;
            }
        }
    }

    if props.requested.contains(Quantity::BinSpectrum) {
        let g4 = ggred * ggred * ggred * ggred;
        for c in 0..props.bin_spectrum.len() {
            let nu1 = obs.bounds[c] * ggred;
            let nu2 = obs.bounds[c + 1] * ggred;
            let integral = emitter.integrate_emission(nu1, nu2, coord_obj);
            props.bin_spectrum[c] += props.transmission_nu[c] * integral * dsem / g4;
        }
    }

    if !optically_thin && is_surface(emitter, obs, coord_obj, ggred) {
        // Nothing behind an opaque surface contributes.
        props.transmission = 0.0;
        props.transmission_nu.fill(0.0);
    }

    props.hit = true;
}

/// Evaluate the saturated fold at explicit impact coordinates.
///
/// The re-render path: geometry (and therefore `coord_ph`/`coord_obj`)
/// comes from a previous trace, the integrator is skipped, and each pixel
/// takes the infinitely-deep-column limit of the formal solution. Only
/// meaningful for optically thick emitters, whose intensity is set by
/// their surface.
pub fn process_saturated<E: RadiativeEmitter + ?Sized>(
    coord_ph: &State8,
    coord_obj: &State8,
    obs: &ObsInfo,
    emitter: &E,
    props: &mut PixelProps,
) {
    let p = [coord_ph[4], coord_ph[5], coord_ph[6], coord_ph[7]];
    let u = [coord_obj[4], coord_obj[5], coord_obj[6], coord_obj[7]];
    let freq_em = -(p[0] * u[0] + p[1] * u[1] + p[2] * u[2] + p[3] * u[3]);
    let ggred = freq_em / obs.freq_obs;
    record_first_hit(props, coord_ph, coord_obj, ggred);

    if props.requested.contains(Quantity::Intensity) {
        let nu_em = obs.nu_obs * ggred;
        let j = emitter.emission(nu_em, coord_obj);
        let alpha = emitter.absorption(nu_em, coord_obj);
        props.intensity += rt_saturated(j, alpha, props.transmission, ggred);
    }
    if props.requested.contains(Quantity::Spectrum) {
        for (c, &nu_obs) in obs.channels.iter().enumerate() {
            let nu_em = nu_obs * ggred;
            let j = emitter.emission(nu_em, coord_obj);
            let alpha = emitter.absorption(nu_em, coord_obj);
            props.spectrum[c] += rt_saturated(j, alpha, props.transmission_nu[c], ggred);
        }
    }
    props.transmission = 0.0;
    props.transmission_nu.fill(0.0);
    props.hit = true;
}

/// Whether a thick emitter behaves as a hard surface at this sample (no
/// absorption data at the intensity frequency).
fn is_surface<E: RadiativeEmitter + ?Sized>(
    emitter: &E,
    obs: &ObsInfo,
    coord_obj: &State8,
    ggred: f64,
) -> bool {
    emitter.absorption(obs.nu_obs * ggred, coord_obj) == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use umbra_core::{CoordKind, QuantitySet};
    use umbra_metric::Minkowski;

    struct Uniform {
        j: f64,
        alpha: f64,
    }

    impl RadiativeEmitter for Uniform {
        fn emission(&self, _nu: f64, _c: &State8) -> f64 {
            self.j
        }
        fn absorption(&self, _nu: f64, _c: &State8) -> f64 {
            self.alpha
        }
        fn integrate_emission(&self, nu1: f64, nu2: f64, _c: &State8) -> f64 {
            self.j * (nu2 - nu1)
        }
    }

    fn static_hit(props: &mut PixelProps, emitter: &Uniform, thin: bool, dt: f64) {
        let metric = Arc::new(Minkowski::new(CoordKind::Cartesian));
        // Photon traveling in +x past a static emitter: k = (1, 1, 0, 0),
        // p = (-1, 1, 0, 0); u_em = (1, 0, 0, 0).
        let coord_ph = [0.0, 5.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0];
        let coord_obj = [0.0, 5.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        process_hit_quantities(
            &*metric,
            &coord_ph,
            &coord_obj,
            dt,
            &ObsInfo::monochromatic(),
            emitter,
            thin,
            props,
        );
    }

    fn props_for(list: &str) -> PixelProps {
        PixelProps::new(list.parse::<QuantitySet>().unwrap(), 0)
    }

    #[test]
    fn thin_flag_forces_zero_absorption() {
        let mut props = props_for("Intensity Opacity");
        let emitter = Uniform { j: 2.0, alpha: 5.0 };
        // freq_em = 1, ggred = 1, tdot = 1 so dsem = dt.
        static_hit(&mut props, &emitter, true, 0.25);
        assert!((props.intensity - 0.5).abs() < 1e-12, "I = j·Δs expected");
        assert_eq!(props.transmission, 1.0);
        assert_eq!(props.opacity, 0.0);
        assert!(props.hit);
    }

    #[test]
    fn thick_with_opacity_saturates_at_source_function() {
        let mut props = props_for("Intensity Opacity");
        let emitter = Uniform { j: 3.0, alpha: 2.0 };
        for _ in 0..400 {
            static_hit(&mut props, &emitter, false, 0.05);
        }
        assert!(
            (props.intensity - 1.5).abs() < 1e-6,
            "I = {}, expected j/α = 1.5",
            props.intensity
        );
        assert!(props.transmission < TRANSMISSION_FLOOR);
        assert!(props.opacity > 1.0, "optical depth accumulates in thick mode");
    }

    #[test]
    fn thick_without_opacity_is_opaque_surface() {
        let mut props = props_for("Intensity");
        let emitter = Uniform { j: 4.0, alpha: 0.0 };
        static_hit(&mut props, &emitter, false, 0.5);
        static_hit(&mut props, &emitter, false, 0.5);
        // Second sample is behind the opaque surface.
        assert!((props.intensity - 4.0).abs() < 1e-12);
        assert_eq!(props.transmission, 0.0);
    }

    #[test]
    fn first_hit_records_event_quantities_once() {
        let mut props = props_for("EmissionTime Redshift ImpactCoords");
        let emitter = Uniform { j: 1.0, alpha: 0.0 };
        let metric = Arc::new(Minkowski::new(CoordKind::Cartesian));
        let first = [3.0, 5.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0];
        let obj = [3.0, 5.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let obs = ObsInfo::monochromatic();
        process_hit_quantities(&*metric, &first, &obj, 0.1, &obs, &emitter, true, &mut props);
        let second = [2.0, 4.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0];
        process_hit_quantities(&*metric, &second, &obj, 0.1, &obs, &emitter, true, &mut props);
        assert_eq!(props.emission_time, 3.0, "first-impact time overwritten");
        assert!((props.redshift - 1.0).abs() < 1e-12);
        assert_eq!(props.impact_coords[0], 3.0);
        assert_eq!(props.impact_coords[8], 3.0);
    }

    #[test]
    fn saturated_rerender_matches_thick_surface_and_scales() {
        let emitter = Uniform { j: 1.5, alpha: 0.0 };
        let doubled = Uniform { j: 3.0, alpha: 0.0 };
        let coord_ph = [0.0, 5.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0];
        let coord_obj = [0.0, 5.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let obs = ObsInfo::monochromatic();

        let mut full = props_for("Intensity");
        static_hit(&mut full, &emitter, false, 0.5);

        let mut re = props_for("Intensity");
        process_saturated(&coord_ph, &coord_obj, &obs, &emitter, &mut re);
        assert!((full.intensity - re.intensity).abs() < 1e-12);

        let mut re2 = props_for("Intensity");
        process_saturated(&coord_ph, &coord_obj, &obs, &doubled, &mut re2);
        assert!((re2.intensity - 2.0 * re.intensity).abs() < 1e-12);
    }
}

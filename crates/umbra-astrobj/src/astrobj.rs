//! The [`Astrobj`] capability trait.
//!
//! Emitters are pluggable: the engine drives every concrete body through
//! this trait and through the [`StepGovernor`] hook the integrator consults
//! each step.

use umbra_core::{CoordKind, PixelProps, Pos4, State8, StepGovernor, Vel4};
use umbra_metric::Metric;
use umbra_photon::Photon;

use crate::error::AstrobjError;
use crate::hit::{self, ObsInfo};

/// Local radiative properties of an emitter.
///
/// Coefficients are evaluated in the emitter rest frame at the emitted
/// frequency; the relativistic frequency shifts are applied by the
/// radiative-transfer fold, not here.
pub trait RadiativeEmitter {
    /// Emission coefficient `j_ν` at the given point (per unit proper
    /// length).
    fn emission(&self, nu_em: f64, coord_obj: &State8) -> f64;

    /// Absorption coefficient `α_ν` at the given point. The optically-thin
    /// flag zeroes this in the fold regardless of the returned value.
    fn absorption(&self, nu_em: f64, coord_obj: &State8) -> f64;

    /// `∫ j_ν dν` over an emitted-frame frequency bin.
    fn integrate_emission(&self, nu1: f64, nu2: f64, coord_obj: &State8) -> f64;
}

/// An astrophysical emitter: geometry, matter velocity, and radiative
/// properties.
///
/// # Contract
///
/// - `impact()` MUST be deterministic and must not mutate shared state:
///   parallel workers call it through a shared reference.
/// - An implementation whose internal caches are not thread-safe must
///   return `false` from [`thread_safe`](Astrobj::thread_safe); the
///   dispatcher then falls back to single-threaded execution.
pub trait Astrobj: RadiativeEmitter + StepGovernor + Send + Sync + 'static {
    /// Emitter name for error reporting and telemetry.
    fn name(&self) -> &'static str;

    /// Radius of a sphere containing every emitting point. Rays receding
    /// beyond it terminate with an escape.
    fn r_max(&self) -> f64;

    /// Whether radiative transfer integrates through the body (`true`) or
    /// stops at its surface (`false`).
    fn optically_thin(&self) -> bool;

    /// The chart this emitter is bound to, if any. The scenery rejects a
    /// metric with a different chart at configuration time.
    fn chart(&self) -> Option<CoordKind> {
        None
    }

    /// Whether shared references may be used from several workers at once.
    fn thread_safe(&self) -> bool {
        true
    }

    /// 4-velocity of the emitting matter at a position.
    fn emitter_velocity(
        &self,
        metric: &dyn Metric,
        pos: &Pos4,
        vel: &mut Vel4,
    ) -> Result<(), AstrobjError>;

    /// Decide whether the worldline segment `(segment, segment + 1)`
    /// meets the emitter, and accumulate radiative transfer over the
    /// portion inside it.
    ///
    /// Returns `Ok(true)` when at least one emitting sample was processed.
    fn impact(
        &self,
        metric: &dyn Metric,
        photon: &Photon,
        segment: usize,
        obs: &ObsInfo,
        props: &mut PixelProps,
    ) -> Result<bool, AstrobjError>;

    /// Evaluate the saturated radiative fold at explicit photon and
    /// emitter coordinates.
    ///
    /// This is the re-render entry point: with pre-computed impact
    /// coordinates the integrator is skipped entirely and only this is
    /// called per pixel. Meaningful for optically thick emitters.
    fn process_at(
        &self,
        coord_ph: &State8,
        coord_obj: &State8,
        obs: &ObsInfo,
        props: &mut PixelProps,
    ) {
        hit::process_saturated(coord_ph, coord_obj, obs, self, props);
    }
}

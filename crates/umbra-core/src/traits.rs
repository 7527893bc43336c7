//! Small traits shared across crate boundaries.

use crate::coord::State8;

/// Cooperative step-size governor advertised by an emitter.
///
/// The integrator consults this on every proposed step so that a ray
/// approaching the emitter's safety shell slows down enough not to tunnel
/// through it. Implementations return the largest step acceptable at the
/// given photon state; return `f64::INFINITY` to impose no constraint.
pub trait StepGovernor: Send + Sync {
    /// Maximum integrator step permitted at this state.
    fn delta_max(&self, state: &State8) -> f64;
}

/// The unconstrained governor.
impl StepGovernor for () {
    fn delta_max(&self, _state: &State8) -> f64 {
        f64::INFINITY
    }
}

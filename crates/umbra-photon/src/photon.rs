//! The photon state machine and its backward-integration loop.

use std::sync::Arc;

use log::{debug, trace};

use umbra_core::{normalize_angles, radius, InvariantError, Pos4, State8, StepGovernor};
use umbra_metric::{Metric, StopCondition};

use crate::integrator::{IntegratorKind, Tuning};
use crate::tableau::{embedded_step, CASH_KARP_54, DOPRI_5, FEHLBERG_78};
use crate::worldline::Worldline;

/// Lifecycle of a photon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhotonStatus {
    /// No initial condition yet.
    Uninitialized,
    /// Seeded with a position and momentum; not yet stepped.
    Seeded,
    /// Backward integration in progress.
    Integrating,
    /// Integration finished with the recorded reason.
    Terminated(StopReason),
}

/// Why a photon stopped integrating.
///
/// All reasons are pixel-local and non-fatal: the pixel writes its
/// quantity sentinels and the trace continues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Reached the configured minimum coordinate date.
    MinimumTime,
    /// Iteration cap hit.
    Maxiter,
    /// Adaptive step shrank below `DeltaMin` without meeting tolerance.
    Stalled,
    /// The metric reported a causal-sink crossing.
    Horizon,
    /// Left the region of interest, receding.
    Escape,
}

/// A photon: seed state, tuning, and the worldline it integrates.
///
/// Cloned from the scenery's template for every traced pixel; the clone
/// shares the metric and governor by reference and owns its worldline.
#[derive(Clone)]
pub struct Photon {
    metric: Arc<dyn Metric>,
    governor: Option<Arc<dyn StepGovernor>>,
    tuning: Tuning,
    escape_radius: f64,
    worldline: Worldline,
    status: PhotonStatus,
    steps: usize,
}

impl Photon {
    /// New, uninitialized photon bound to a metric.
    pub fn new(metric: Arc<dyn Metric>, tuning: Tuning) -> Self {
        Self {
            metric,
            governor: None,
            tuning,
            escape_radius: f64::INFINITY,
            worldline: Worldline::new(),
            status: PhotonStatus::Uninitialized,
            steps: 0,
        }
    }

    /// Attach the emitter's cooperative step governor.
    pub fn with_governor(mut self, governor: Arc<dyn StepGovernor>) -> Self {
        self.governor = Some(governor);
        self
    }

    /// Radius beyond which a receding ray terminates with
    /// [`StopReason::Escape`]. Typically the emitter's `r_max`.
    pub fn with_escape_radius(mut self, r: f64) -> Self {
        self.escape_radius = r;
        self
    }

    /// The bound metric.
    pub fn metric(&self) -> &Arc<dyn Metric> {
        &self.metric
    }

    /// Numerical tuning (shared with the scenery vocabulary).
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Mutable tuning access, for scenery pass-through setters.
    pub fn tuning_mut(&mut self) -> &mut Tuning {
        &mut self.tuning
    }

    /// Lifecycle state.
    pub fn status(&self) -> PhotonStatus {
        self.status
    }

    /// Accepted steps taken by the last integration.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// The recorded worldline.
    pub fn worldline(&self) -> &Worldline {
        &self.worldline
    }

    /// Set the initial condition: 4-position and covariant 4-momentum.
    ///
    /// Resets any previous worldline; the photon returns to `Seeded`.
    pub fn seed(&mut self, pos: Pos4, p: [f64; 4]) {
        self.worldline.clear();
        self.worldline.push([
            pos[0], pos[1], pos[2], pos[3], p[0], p[1], p[2], p[3],
        ]);
        self.status = PhotonStatus::Seeded;
        self.steps = 0;
    }

    /// The k-th recorded state.
    pub fn get_coord(&self, index: usize) -> Option<&State8> {
        self.worldline.get(index)
    }

    /// Interpolated 8-state at coordinate time `t` within the traced span,
    /// with angles folded back into canonical ranges.
    pub fn interpolate(&self, t: f64) -> Option<State8> {
        let mut state = self.worldline.interpolate(t)?;
        normalize_angles(self.metric.coord_kind(), &mut state);
        Some(state)
    }

    /// Null-norm residual `g^{μν} p_μ p_ν` at a recorded state, for
    /// diagnostics and tests.
    pub fn null_norm(&self, index: usize) -> Option<f64> {
        let s = self.worldline.get(index)?;
        let pos = [s[0], s[1], s[2], s[3]];
        let p = [s[4], s[5], s[6], s[7]];
        Some(self.metric.norm_p(&pos, &p))
    }

    /// Integrate backward until a terminal condition.
    ///
    /// Requires a seeded photon; the worldline grows by one record per
    /// accepted step. Returns the stop reason, also recorded in
    /// [`status`](Self::status).
    pub fn integrate(&mut self) -> Result<StopReason, InvariantError> {
        match self.status {
            PhotonStatus::Seeded => {}
            PhotonStatus::Terminated(reason) => return Ok(reason),
            _ => {
                return Err(InvariantError::new(
                    "integrate() requires a seeded photon",
                ))
            }
        }
        self.status = PhotonStatus::Integrating;

        let kind = self.metric.coord_kind();
        let mut state = *self
            .worldline
            .last()
            .ok_or_else(|| InvariantError::new("seeded photon has empty worldline"))?;
        let mut h = self.tuning.delta;
        let mut r_prev = radius(kind, &[state[0], state[1], state[2], state[3]]);

        let reason = loop {
            if self.steps >= self.tuning.maxiter {
                break StopReason::Maxiter;
            }

            // Cooperative step governor: emitter shell, radial fraction,
            // hard cap.
            let pos = [state[0], state[1], state[2], state[3]];
            let r = radius(kind, &pos);
            let mut cap = self
                .tuning
                .delta_max
                .min(self.tuning.delta_max_over_r * r);
            if let Some(gov) = &self.governor {
                cap = cap.min(gov.delta_max(&state));
            }
            let mut h_try = h.min(cap).max(self.tuning.delta_min);

            let next = match self.attempt_step(&state, &mut h_try, cap) {
                Ok(next) => next,
                Err(reason) => break reason,
            };
            h = h_try;

            if !self.worldline.push(next) {
                // Accepted step failed to advance coordinate time.
                break StopReason::Stalled;
            }
            self.steps += 1;
            trace!(
                "photon step {}: t={} h={}",
                self.steps,
                next[0],
                h
            );

            if let Some(stop) = self.metric.stop_condition(&next) {
                break match stop {
                    StopCondition::Horizon => StopReason::Horizon,
                    StopCondition::Escape => StopReason::Escape,
                };
            }
            if next[0] <= self.tuning.tmin {
                break StopReason::MinimumTime;
            }
            let r_new = radius(kind, &[next[0], next[1], next[2], next[3]]);
            if r_new > self.escape_radius && r_new > r_prev {
                break StopReason::Escape;
            }
            r_prev = r_new;
            state = next;
        };

        debug!(
            "photon terminated: {:?} after {} steps, span {:?}",
            reason,
            self.steps,
            self.worldline.span()
        );
        self.status = PhotonStatus::Terminated(reason);
        Ok(reason)
    }

    /// One accepted step, driving the adaptive accept/reject loop.
    ///
    /// On entry `h_try` is the proposed magnitude; on success it holds the
    /// suggestion for the next step (already clamped to `cap`).
    fn attempt_step(
        &self,
        state: &State8,
        h_try: &mut f64,
        cap: f64,
    ) -> Result<State8, StopReason> {
        let tuning = &self.tuning;
        let norm = state.iter().map(|v| v.abs()).fold(0.0f64, f64::max);
        let tol = tuning.abs_tol.max(tuning.rel_tol * norm);

        if !tuning.adaptive {
            let next = match tuning.integrator {
                IntegratorKind::Legacy => self.metric.rk4_step(state, -*h_try),
                kind => {
                    let tab = tableau_for(kind);
                    embedded_step(&*self.metric, state, -*h_try, tab).0
                }
            };
            return Ok(next);
        }

        loop {
            let (next, err, grow) = match tuning.integrator {
                IntegratorKind::Legacy => {
                    let step = self.metric.legacy_adaptive_step(
                        state,
                        -*h_try,
                        tuning.abs_tol,
                        tuning.rel_tol,
                    );
                    let factor = (step.h_next / -*h_try).abs();
                    (
                        if step.accepted { Some(step.state) } else { None },
                        step.err,
                        factor,
                    )
                }
                IntegratorKind::RungeKuttaCashKarp54Classic => {
                    // Classic halve/double controller on the CK54 pair.
                    let (next, err) =
                        embedded_step(&*self.metric, state, -*h_try, &CASH_KARP_54);
                    let accepted = err <= tol;
                    (
                        if accepted { Some(next) } else { None },
                        err,
                        if accepted { 2.0 } else { 0.5 },
                    )
                }
                kind => {
                    let tab = tableau_for(kind);
                    let (next, err) = embedded_step(&*self.metric, state, -*h_try, tab);
                    let factor = if err > 0.0 {
                        (0.9 * (tol / err).powf(tab.error_exponent)).clamp(0.1, 5.0)
                    } else {
                        5.0
                    };
                    (if err <= tol { Some(next) } else { None }, err, factor)
                }
            };

            match next {
                Some(next) => {
                    *h_try = (*h_try * grow).min(cap).max(tuning.delta_min);
                    return Ok(next);
                }
                None => {
                    if *h_try <= tuning.delta_min * (1.0 + 1e-12) {
                        debug!(
                            "step rejected at DeltaMin: err={err} tol={tol}"
                        );
                        return Err(StopReason::Stalled);
                    }
                    *h_try = (*h_try * grow.min(0.9)).max(tuning.delta_min);
                }
            }
        }
    }
}

fn tableau_for(kind: IntegratorKind) -> &'static crate::tableau::Tableau {
    match kind {
        IntegratorKind::RungeKuttaFehlberg78 => &FEHLBERG_78,
        IntegratorKind::RungeKuttaCashKarp54
        | IntegratorKind::RungeKuttaCashKarp54Classic => &CASH_KARP_54,
        IntegratorKind::RungeKuttaDopri5 => &DOPRI_5,
        IntegratorKind::Legacy => &CASH_KARP_54, // unreachable by construction
    }
}

//! Integrator selection and tuning parameters.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// The closed vocabulary of geodesic integrators.
///
/// All kinds share the same public contract; they differ in order and in
/// step-control detail. `Legacy` delegates to the metric's own adaptive
/// RK4 ([`Metric::legacy_adaptive_step`](umbra_metric::Metric::legacy_adaptive_step)).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IntegratorKind {
    /// Metric-owned step-doubling RK4.
    Legacy,
    /// Fehlberg 7(8) embedded pair.
    #[default]
    RungeKuttaFehlberg78,
    /// Cash-Karp 5(4) embedded pair, safety-factor controller.
    RungeKuttaCashKarp54,
    /// Dormand-Prince 5(4) embedded pair.
    RungeKuttaDopri5,
    /// Cash-Karp 5(4) with the classic halve/double controller.
    RungeKuttaCashKarp54Classic,
}

impl IntegratorKind {
    /// Canonical name, matching scenery descriptions.
    pub fn name(self) -> &'static str {
        match self {
            Self::Legacy => "Legacy",
            Self::RungeKuttaFehlberg78 => "runge_kutta_fehlberg78",
            Self::RungeKuttaCashKarp54 => "runge_kutta_cash_karp54",
            Self::RungeKuttaDopri5 => "runge_kutta_dopri5",
            Self::RungeKuttaCashKarp54Classic => "runge_kutta_cash_karp54_classic",
        }
    }
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntegratorKind {
    type Err = IntegratorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Legacy" => Ok(Self::Legacy),
            "runge_kutta_fehlberg78" => Ok(Self::RungeKuttaFehlberg78),
            "runge_kutta_cash_karp54" => Ok(Self::RungeKuttaCashKarp54),
            "runge_kutta_dopri5" => Ok(Self::RungeKuttaDopri5),
            "runge_kutta_cash_karp54_classic" => Ok(Self::RungeKuttaCashKarp54Classic),
            _ => Err(IntegratorParseError {
                name: s.to_string(),
            }),
        }
    }
}

/// An unrecognized integrator name. A configuration error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegratorParseError {
    /// The unrecognized name.
    pub name: String,
}

impl fmt::Display for IntegratorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown integrator '{}'", self.name)
    }
}

impl Error for IntegratorParseError {}

/// Numerical tuning for a photon, reset for each traced ray.
///
/// Field meanings are language-neutral and match the scenery vocabulary:
/// `Delta`, `Adaptive`/`NonAdaptive`, `AbsTol`, `RelTol`, `DeltaMax`,
/// `DeltaMaxOverR`, `DeltaMin`, `Maxiter`, `MinimumTime`, `PrimaryOnly`,
/// `Integrator`.
#[derive(Clone, Debug)]
pub struct Tuning {
    /// Initial step (reset per ray; the running step under adaptive mode).
    pub delta: f64,
    /// Adaptive step control; `false` integrates at fixed `delta`.
    pub adaptive: bool,
    /// Absolute tolerance on the local error estimate.
    pub abs_tol: f64,
    /// Relative tolerance on the local error estimate.
    pub rel_tol: f64,
    /// Hard cap on the step size.
    pub delta_max: f64,
    /// Step cap as a fraction of the current radial coordinate.
    pub delta_max_over_r: f64,
    /// Smallest allowed step; rejection at this size stalls the ray.
    pub delta_min: f64,
    /// Iteration cap per ray.
    pub maxiter: usize,
    /// Earliest coordinate date a photon may reach backwards in time.
    pub tmin: f64,
    /// Stop after the first impact, suppressing secondary images.
    pub primary_only: bool,
    /// Which stepper drives the ray.
    pub integrator: IntegratorKind,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            delta: 1.0,
            adaptive: true,
            abs_tol: 1e-10,
            rel_tol: 1e-10,
            delta_max: f64::INFINITY,
            delta_max_over_r: 1.0,
            delta_min: 1e-20,
            maxiter: 100_000,
            tmin: f64::NEG_INFINITY,
            primary_only: false,
            integrator: IntegratorKind::default(),
        }
    }
}

impl Tuning {
    /// Validate internal consistency; the scenery surfaces violations as
    /// configuration errors.
    pub fn check(&self) -> Result<(), String> {
        if !(self.delta > 0.0 && self.delta.is_finite()) {
            return Err(format!("Delta must be finite and positive, got {}", self.delta));
        }
        if self.delta_min <= 0.0 {
            return Err(format!("DeltaMin must be positive, got {}", self.delta_min));
        }
        if self.delta_min > self.delta_max {
            return Err(format!(
                "DeltaMin ({}) exceeds DeltaMax ({})",
                self.delta_min, self.delta_max
            ));
        }
        if self.abs_tol <= 0.0 || self.rel_tol < 0.0 {
            return Err(format!(
                "tolerances must be positive, got AbsTol={} RelTol={}",
                self.abs_tol, self.rel_tol
            ));
        }
        if self.delta_max_over_r <= 0.0 {
            return Err(format!(
                "DeltaMaxOverR must be positive, got {}",
                self.delta_max_over_r
            ));
        }
        if self.maxiter == 0 {
            return Err("Maxiter must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in [
            IntegratorKind::Legacy,
            IntegratorKind::RungeKuttaFehlberg78,
            IntegratorKind::RungeKuttaCashKarp54,
            IntegratorKind::RungeKuttaDopri5,
            IntegratorKind::RungeKuttaCashKarp54Classic,
        ] {
            let parsed: IntegratorKind = kind.name().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unknown_name_rejected() {
        let err = "runge_kutta_99".parse::<IntegratorKind>().unwrap_err();
        assert!(err.to_string().contains("runge_kutta_99"));
    }

    #[test]
    fn default_tuning_is_valid() {
        assert!(Tuning::default().check().is_ok());
    }

    #[test]
    fn contradictory_tuning_rejected() {
        let t = Tuning {
            delta_min: 2.0,
            delta_max: 1.0,
            ..Tuning::default()
        };
        assert!(t.check().is_err());
    }
}

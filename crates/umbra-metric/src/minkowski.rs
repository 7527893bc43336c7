//! Flat space-time in a spherical or cartesian chart.
//!
//! Geodesics are straight lines; in the spherical chart the connection
//! terms are nonetheless nontrivial, which makes this backend the
//! reference test case for the integrator stack. An optional point mass
//! drives the Keplerian circular-velocity field used by rotating emitters
//! in otherwise-flat scenes.

use umbra_core::{CoordKind, Pos4, State8};

use crate::metric::Metric;

/// Flat metric, optionally carrying a Newtonian point mass for emitter
/// velocity fields.
#[derive(Clone, Debug)]
pub struct Minkowski {
    kind: CoordKind,
    mass: f64,
}

impl Minkowski {
    /// Flat space in the given chart, massless.
    pub fn new(kind: CoordKind) -> Self {
        Self { kind, mass: 0.0 }
    }

    /// Flat space with a central point mass (geometrical units) for
    /// Keplerian emitter rotation.
    pub fn with_mass(kind: CoordKind, mass: f64) -> Self {
        Self { kind, mass }
    }
}

impl Metric for Minkowski {
    fn name(&self) -> &'static str {
        "Minkowski"
    }

    fn coord_kind(&self) -> CoordKind {
        self.kind
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn gmunu(&self, pos: &Pos4) -> [[f64; 4]; 4] {
        let mut g = [[0.0; 4]; 4];
        g[0][0] = -1.0;
        match self.kind {
            CoordKind::Cartesian => {
                g[1][1] = 1.0;
                g[2][2] = 1.0;
                g[3][3] = 1.0;
            }
            CoordKind::Spherical => {
                let r = pos[1];
                let sth = pos[2].sin();
                g[1][1] = 1.0;
                g[2][2] = r * r;
                g[3][3] = r * r * sth * sth;
            }
        }
        g
    }

    fn gmunu_up(&self, pos: &Pos4) -> [[f64; 4]; 4] {
        let mut g = [[0.0; 4]; 4];
        g[0][0] = -1.0;
        match self.kind {
            CoordKind::Cartesian => {
                g[1][1] = 1.0;
                g[2][2] = 1.0;
                g[3][3] = 1.0;
            }
            CoordKind::Spherical => {
                let r = pos[1];
                let sth = pos[2].sin();
                g[1][1] = 1.0;
                g[2][2] = 1.0 / (r * r);
                g[3][3] = 1.0 / (r * r * sth * sth);
            }
        }
        g
    }

    fn rhs(&self, state: &State8, dstate: &mut State8) {
        let p = [state[4], state[5], state[6], state[7]];
        match self.kind {
            CoordKind::Cartesian => {
                dstate[0] = -p[0];
                dstate[1] = p[1];
                dstate[2] = p[2];
                dstate[3] = p[3];
                dstate[4..8].fill(0.0);
            }
            CoordKind::Spherical => {
                let r = state[1];
                let sth = state[2].sin();
                let cth = state[2].cos();
                let r2 = r * r;
                let s2 = sth * sth;
                dstate[0] = -p[0];
                dstate[1] = p[1];
                dstate[2] = p[2] / r2;
                dstate[3] = p[3] / (r2 * s2);
                dstate[4] = 0.0;
                dstate[5] = p[2] * p[2] / (r2 * r) + p[3] * p[3] / (r2 * r * s2);
                dstate[6] = cth * p[3] * p[3] / (r2 * s2 * sth);
                dstate[7] = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn null_seed(metric: &Minkowski, pos: Pos4, k_spatial: [f64; 3]) -> State8 {
        let kt = metric.null_tdot(&pos, &k_spatial);
        let k = [kt, k_spatial[0], k_spatial[1], k_spatial[2]];
        let p = metric.lower(&pos, &k);
        [pos[0], pos[1], pos[2], pos[3], p[0], p[1], p[2], p[3]]
    }

    #[test]
    fn cartesian_geodesics_are_straight() {
        let m = Minkowski::new(CoordKind::Cartesian);
        let state = null_seed(&m, [0.0, 1.0, 2.0, 3.0], [0.6, 0.8, 0.0]);
        let stepped = m.rk4_step(&state, 0.5);
        assert!((stepped[1] - (1.0 + 0.3)).abs() < 1e-12);
        assert!((stepped[2] - (2.0 + 0.4)).abs() < 1e-12);
        assert!((stepped[3] - 3.0).abs() < 1e-12);
        // Momentum constant along a straight line.
        for i in 4..8 {
            assert_eq!(stepped[i], state[i]);
        }
    }

    #[test]
    fn null_norm_preserved_in_spherical_chart() {
        let m = Minkowski::new(CoordKind::Spherical);
        let mut state = null_seed(&m, [0.0, 10.0, PI / 3.0, 0.2], [-0.9, 0.01, 0.002]);
        for _ in 0..100 {
            state = m.rk4_step(&state, 0.05);
        }
        let pos = [state[0], state[1], state[2], state[3]];
        let p = [state[4], state[5], state[6], state[7]];
        let norm = m.norm_p(&pos, &p);
        assert!(norm.abs() < 1e-6, "null norm drifted to {norm}");
    }

    #[test]
    fn analytic_rhs_matches_finite_difference_default() {
        struct Fd(Minkowski);
        impl Metric for Fd {
            fn name(&self) -> &'static str {
                "fd"
            }
            fn coord_kind(&self) -> CoordKind {
                self.0.coord_kind()
            }
            fn mass(&self) -> f64 {
                0.0
            }
            fn gmunu(&self, pos: &Pos4) -> [[f64; 4]; 4] {
                self.0.gmunu(pos)
            }
            // rhs left at the finite-difference default.
        }

        let analytic = Minkowski::new(CoordKind::Spherical);
        let fd = Fd(analytic.clone());
        let state = null_seed(&analytic, [0.0, 8.0, 1.1, 0.4], [-1.0, 0.05, 0.01]);
        let mut da = [0.0; 8];
        let mut dn = [0.0; 8];
        analytic.rhs(&state, &mut da);
        fd.rhs(&state, &mut dn);
        for i in 0..8 {
            assert!(
                (da[i] - dn[i]).abs() < 1e-5,
                "component {i}: analytic {} vs fd {}",
                da[i],
                dn[i]
            );
        }
    }

    #[test]
    fn keplerian_circular_velocity_is_timelike() {
        let m = Minkowski::with_mass(CoordKind::Spherical, 1.0);
        let pos = [0.0, 20.0, PI / 2.0, 0.0];
        let mut vel = [0.0; 4];
        m.circular_velocity(&pos, &mut vel);
        let norm = m.scalar_prod(&pos, &vel, &vel);
        assert!((norm + 1.0).abs() < 1e-10, "u·u = {norm}, expected -1");
        assert!(vel[3] > 0.0, "prograde rotation expected");
    }

    #[test]
    fn massless_circular_velocity_is_static_observer() {
        let m = Minkowski::new(CoordKind::Spherical);
        let pos = [0.0, 20.0, PI / 2.0, 0.0];
        let mut vel = [0.0; 4];
        m.circular_velocity(&pos, &mut vel);
        assert_eq!(vel, [1.0, 0.0, 0.0, 0.0]);
    }
}

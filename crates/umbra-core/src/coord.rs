//! Coordinate kinds, state tuples, and chart conversion helpers.
//!
//! Positions are 4-tuples `(t, x¹, x², x³)`; a photon's full state is an
//! 8-tuple appending the covariant momentum `(p_t, p₁, p₂, p₃)`. The
//! interpretation of the spatial triple is selected by [`CoordKind`].

use std::fmt;

use crate::error::CoordKindError;

/// A 4-position `(t, x¹, x², x³)`.
pub type Pos4 = [f64; 4];

/// A 4-velocity or 4-momentum `(u⁰, u¹, u², u³)`.
pub type Vel4 = [f64; 4];

/// A full photon state: 4-position followed by covariant 4-momentum.
pub type State8 = [f64; 8];

/// The coordinate chart used for the spatial part of positions.
///
/// Every metric declares its kind; components that only support one chart
/// (e.g. the tabulated disk's velocity reconstruction) reject the other
/// with [`CoordKindError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoordKind {
    /// `(t, r, θ, φ)` — polar radius, colatitude, azimuth.
    Spherical,
    /// `(t, x, y, z)`.
    Cartesian,
}

impl fmt::Display for CoordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spherical => write!(f, "spherical"),
            Self::Cartesian => write!(f, "cartesian"),
        }
    }
}

/// Convert a position to cylindrical `(r_cyl, z, φ)`.
///
/// Both charts are supported; this is the conversion the tabulated-grid
/// emitter indexes with.
pub fn cylindrical(kind: CoordKind, pos: &Pos4) -> (f64, f64, f64) {
    match kind {
        CoordKind::Spherical => {
            let rs = pos[1];
            let z = rs * pos[2].cos();
            let rcyl = (rs * rs - z * z).max(0.0).sqrt();
            (rcyl, z, pos[3])
        }
        CoordKind::Cartesian => {
            let (x, y, z) = (pos[1], pos[2], pos[3]);
            (x.hypot(y), z, y.atan2(x))
        }
    }
}

/// Coordinate distance from the origin, used by the `DeltaMaxOverR` step cap.
pub fn radius(kind: CoordKind, pos: &Pos4) -> f64 {
    match kind {
        CoordKind::Spherical => pos[1].abs(),
        CoordKind::Cartesian => {
            (pos[1] * pos[1] + pos[2] * pos[2] + pos[3] * pos[3]).sqrt()
        }
    }
}

/// Fold a spherical-chart state back into the canonical ranges
/// θ ∈ [0, π], φ ∈ [0, 2π).
///
/// Integration happily walks θ through the poles; interpolated states must
/// be renormalized before being used as grid lookups. Reflecting θ across a
/// pole shifts φ by π and flips the sign of p_θ. No-op for cartesian charts.
pub fn normalize_angles(kind: CoordKind, state: &mut State8) {
    if kind != CoordKind::Spherical {
        return;
    }
    let two_pi = 2.0 * std::f64::consts::PI;
    let pi = std::f64::consts::PI;
    let mut theta = state[2].rem_euclid(two_pi);
    if theta > pi {
        theta = two_pi - theta;
        state[3] += pi;
        state[6] = -state[6];
    }
    state[2] = theta;
    state[3] = state[3].rem_euclid(two_pi);
}

/// Check that a chart is the spherical one, naming the rejecting component.
pub fn require_spherical(
    component: &'static str,
    kind: CoordKind,
) -> Result<(), CoordKindError> {
    match kind {
        CoordKind::Spherical => Ok(()),
        other => Err(CoordKindError {
            component,
            kind: other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn cylindrical_spherical_equator() {
        let pos = [0.0, 5.0, PI / 2.0, 1.0];
        let (rcyl, z, phi) = cylindrical(CoordKind::Spherical, &pos);
        assert!((rcyl - 5.0).abs() < 1e-12);
        assert!(z.abs() < 1e-12);
        assert!((phi - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cylindrical_spherical_axis() {
        let pos = [0.0, 3.0, 0.0, 0.0];
        let (rcyl, z, _) = cylindrical(CoordKind::Spherical, &pos);
        assert!(rcyl.abs() < 1e-12);
        assert!((z - 3.0).abs() < 1e-12);
    }

    #[test]
    fn cylindrical_cartesian() {
        let pos = [0.0, 3.0, 4.0, 2.0];
        let (rcyl, z, phi) = cylindrical(CoordKind::Cartesian, &pos);
        assert!((rcyl - 5.0).abs() < 1e-12);
        assert!((z - 2.0).abs() < 1e-12);
        assert!((phi - (4.0f64).atan2(3.0)).abs() < 1e-12);
    }

    #[test]
    fn normalize_folds_theta_through_pole() {
        // θ slightly past π: reflect, shift φ, flip p_θ.
        let mut state = [0.0, 1.0, PI + 0.1, 0.5, 0.0, 0.0, 2.0, 0.0];
        normalize_angles(CoordKind::Spherical, &mut state);
        assert!((state[2] - (PI - 0.1)).abs() < 1e-12);
        assert!((state[3] - (0.5 + PI)).abs() < 1e-12);
        assert!((state[6] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_wraps_phi() {
        let mut state = [0.0, 1.0, 1.0, -0.5, 0.0, 0.0, 0.0, 0.0];
        normalize_angles(CoordKind::Spherical, &mut state);
        assert!((state[3] - (2.0 * PI - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn normalize_leaves_cartesian_alone() {
        let mut state = [0.0, 1.0, 7.0, -0.5, 0.0, 0.0, 1.0, 0.0];
        let before = state;
        normalize_angles(CoordKind::Cartesian, &mut state);
        assert_eq!(state, before);
    }

    #[test]
    fn require_spherical_rejects_cartesian() {
        let err = require_spherical("Disk3D::emitter_velocity", CoordKind::Cartesian)
            .unwrap_err();
        assert!(err.to_string().contains("Disk3D"));
        assert!(require_spherical("x", CoordKind::Spherical).is_ok());
    }
}

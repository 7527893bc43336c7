//! The virtual camera: pixel grid, field of view, observer placement.
//!
//! `pixel_ray` maps a pixel index to the 4-position of the observer and
//! the covariant 4-momentum of the photon arriving there, null under the
//! active metric. The sky plane is rotated by the position angle of the
//! line of nodes and the argument; the observer sits at `distance` from
//! the origin at the given inclination.

use std::error::Error;
use std::fmt;

use umbra_core::{CoordKind, Pos4};
use umbra_metric::Metric;

/// A uniform spectrometer: `n_samples` channels spanning
/// `[nu_min, nu_max]` in the observer frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spectro {
    /// Channel count.
    pub n_samples: usize,
    /// Lower frequency bound.
    pub nu_min: f64,
    /// Upper frequency bound.
    pub nu_max: f64,
}

impl Spectro {
    /// Channel midpoints.
    pub fn channels(&self) -> Vec<f64> {
        let dnu = (self.nu_max - self.nu_min) / self.n_samples as f64;
        (0..self.n_samples)
            .map(|c| self.nu_min + dnu * (c as f64 + 0.5))
            .collect()
    }

    /// Bin boundaries, `n_samples + 1` entries.
    pub fn bounds(&self) -> Vec<f64> {
        let dnu = (self.nu_max - self.nu_min) / self.n_samples as f64;
        (0..=self.n_samples)
            .map(|c| self.nu_min + dnu * c as f64)
            .collect()
    }
}

/// Pixel index outside the screen resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenError {
    /// Offending column.
    pub i: usize,
    /// Offending row.
    pub j: usize,
    /// Screen resolution.
    pub resolution: usize,
}

impl fmt::Display for ScreenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pixel ({}, {}) out of range for resolution {}",
            self.i, self.j, self.resolution
        )
    }
}

impl Error for ScreenError {}

/// The virtual camera.
#[derive(Clone, Debug)]
pub struct Screen {
    /// Pixels per side of the (square) grid.
    pub resolution: usize,
    /// Full field of view, radians.
    pub field_of_view: f64,
    /// Observer distance from the origin, geometrical units.
    pub distance: f64,
    /// Observer inclination (colatitude), radians.
    pub inclination: f64,
    /// Position angle of the line of nodes, radians.
    pub paln: f64,
    /// Azimuthal rotation of the sky plane, radians.
    pub argument: f64,
    /// Observation date, geometrical units.
    pub observation_time: f64,
    /// Optional spectrometer for the spectral quantities.
    pub spectro: Option<Spectro>,
}

impl Screen {
    /// A face-on screen with sensible defaults; adjust fields directly.
    pub fn new(resolution: usize, field_of_view: f64, distance: f64) -> Self {
        Self {
            resolution,
            field_of_view,
            distance,
            inclination: std::f64::consts::FRAC_PI_2,
            paln: 0.0,
            argument: 0.0,
            observation_time: 0.0,
            spectro: None,
        }
    }

    /// Observer 4-position in the metric's chart.
    pub fn observer_position(&self, kind: CoordKind) -> Pos4 {
        match kind {
            CoordKind::Spherical => [
                self.observation_time,
                self.distance,
                self.inclination,
                0.0,
            ],
            CoordKind::Cartesian => [
                self.observation_time,
                self.distance * self.inclination.sin(),
                0.0,
                self.distance * self.inclination.cos(),
            ],
        }
    }

    /// Initial photon 4-position and covariant null 4-momentum for a
    /// pixel.
    ///
    /// The returned momentum is future-pointing and outgoing: the photon
    /// *arrives* at the observer, so backward integration walks it into
    /// the scene.
    pub fn pixel_ray(
        &self,
        i: usize,
        j: usize,
        metric: &dyn Metric,
    ) -> Result<(Pos4, [f64; 4]), ScreenError> {
        if i >= self.resolution || j >= self.resolution {
            return Err(ScreenError {
                i,
                j,
                resolution: self.resolution,
            });
        }

        // Sky-plane angles of this pixel, rotated by argument + PALN.
        let res = self.resolution as f64;
        let alpha = self.field_of_view * ((i as f64 + 0.5) / res - 0.5);
        let delta = self.field_of_view * ((j as f64 + 0.5) / res - 0.5);
        let chi = self.paln + self.argument;
        let a = alpha * chi.cos() - delta * chi.sin();
        let d = alpha * chi.sin() + delta * chi.cos();

        // Cartesian frame at the observer: n points from origin to
        // observer, e_alpha east, e_delta north.
        let (si, ci) = (self.inclination.sin(), self.inclination.cos());
        let n = [si, 0.0, ci];
        let e_alpha = [0.0, 1.0, 0.0];
        let e_delta = [-ci, 0.0, si];

        // Arrival direction: outgoing, tilted off the line of sight.
        let rho = (a * a + d * d).sqrt();
        let (cr, sr_over_rho) = if rho > 0.0 {
            (rho.cos(), rho.sin() / rho)
        } else {
            (1.0, 1.0)
        };
        let mut dir = [0.0f64; 3];
        for k in 0..3 {
            dir[k] = cr * n[k] + sr_over_rho * (a * e_alpha[k] + d * e_delta[k]);
        }

        let pos = self.observer_position(metric.coord_kind());
        let k_spatial = match metric.coord_kind() {
            CoordKind::Cartesian => dir,
            CoordKind::Spherical => {
                // Orthonormal frame components scaled into chart
                // components.
                let r_hat = n;
                let theta_hat = [ci, 0.0, -si];
                let phi_hat = [0.0, 1.0, 0.0];
                let dot = |u: &[f64; 3], v: &[f64; 3]| {
                    u[0] * v[0] + u[1] * v[1] + u[2] * v[2]
                };
                let g = metric.gmunu(&pos);
                [
                    dot(&dir, &r_hat) / g[1][1].sqrt(),
                    dot(&dir, &theta_hat) / g[2][2].sqrt(),
                    dot(&dir, &phi_hat) / g[3][3].sqrt(),
                ]
            }
        };

        let kt = metric.null_tdot(&pos, &k_spatial);
        let k = [kt, k_spatial[0], k_spatial[1], k_spatial[2]];
        Ok((pos, metric.lower(&pos, &k)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use umbra_metric::{KerrBL, Minkowski};

    #[test]
    fn out_of_range_pixel_rejected() {
        let screen = Screen::new(8, 1e-3, 100.0);
        let metric = Minkowski::new(CoordKind::Spherical);
        assert!(screen.pixel_ray(8, 0, &metric).is_err());
        assert!(screen.pixel_ray(0, 8, &metric).is_err());
        assert!(screen.pixel_ray(7, 7, &metric).is_ok());
    }

    #[test]
    fn pixel_rays_are_null() {
        let screen = Screen::new(16, 5e-4, 1000.0);
        for metric in [
            Minkowski::new(CoordKind::Spherical),
            Minkowski::new(CoordKind::Cartesian),
        ] {
            for (i, j) in [(0, 0), (8, 8), (15, 3)] {
                let (pos, p) = screen.pixel_ray(i, j, &metric).unwrap();
                let norm = metric.norm_p(&pos, &p);
                assert!(
                    norm.abs() < 1e-12,
                    "{}: g(k,k) = {norm} at pixel ({i},{j})",
                    metric.coord_kind()
                );
            }
        }
    }

    #[test]
    fn pixel_rays_are_null_in_kerr() {
        let mut screen = Screen::new(8, 1e-2, 500.0);
        screen.inclination = PI / 3.0;
        let metric = KerrBL::new(1.0, 0.9);
        let (pos, p) = screen.pixel_ray(2, 5, &metric).unwrap();
        assert!(metric.norm_p(&pos, &p).abs() < 1e-12);
    }

    #[test]
    fn central_ray_is_radial_outgoing() {
        // Odd resolution: the central pixel looks straight down the line
        // of sight.
        let screen = Screen::new(9, 1e-3, 100.0);
        let metric = Minkowski::new(CoordKind::Spherical);
        let (_, p) = screen.pixel_ray(4, 4, &metric).unwrap();
        assert!(p[1] > 0.999, "radial momentum expected, got {}", p[1]);
        assert!(p[2].abs() < 1e-6);
        assert!(p[3].abs() < 1e-6);
    }

    #[test]
    fn spectro_channels_are_centred() {
        let sp = Spectro {
            n_samples: 4,
            nu_min: 1.0,
            nu_max: 3.0,
        };
        let ch = sp.channels();
        assert_eq!(ch.len(), 4);
        assert!((ch[0] - 1.25).abs() < 1e-12);
        assert!((ch[3] - 2.75).abs() < 1e-12);
        let b = sp.bounds();
        assert_eq!(b.len(), 5);
        assert_eq!(b[0], 1.0);
        assert_eq!(b[4], 3.0);
    }
}

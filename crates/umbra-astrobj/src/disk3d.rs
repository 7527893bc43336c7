//! Tabulated 3-D disk: emission and matter velocity on a dense
//! cylindrical (ν, φ, z, r) grid.
//!
//! The grid covers `[r_in, r_out] × [z_min, z_max] × [0, 2π/repeat_φ)`
//! with `repeat_φ`-fold azimuthal periodicity. A non-negative `z_min`
//! declares the disk symmetric about the equatorial plane: negative
//! heights are folded before indexing.

use log::trace;

use umbra_core::{
    cylindrical, radius, require_spherical, CoordKind, GridError, InvariantError, PixelProps,
    Pos4, State8, StepGovernor, Vel4,
};
use umbra_metric::Metric;
use umbra_photon::Photon;

use crate::astrobj::{Astrobj, RadiativeEmitter};
use crate::error::AstrobjError;
use crate::hit::{self, ObsInfo, TRANSMISSION_FLOOR};
use crate::table::{Extension, Table};

/// Geometric and spectral layout of a [`Disk3D`].
#[derive(Clone, Copy, Debug)]
pub struct Disk3DConfig {
    /// Chart of the metric this disk will be traced under.
    pub kind: CoordKind,
    /// Inner cylindrical radius of the grid.
    pub rin: f64,
    /// Outer cylindrical radius of the grid.
    pub rout: f64,
    /// Lower height bound; non-negative means equatorial symmetry.
    pub zmin: f64,
    /// Upper height bound.
    pub zmax: f64,
    /// Azimuthal fold count (grid covers `2π/repeat_phi`).
    pub repeat_phi: usize,
    /// Frequency of the first spectral cell.
    pub nu0: f64,
    /// Spectral cell width.
    pub dnu: f64,
    /// Whether radiative transfer integrates through the disk.
    pub optically_thin: bool,
}

/// Tabulated 3-D disk emitter.
#[derive(Clone, Debug)]
pub struct Disk3D {
    cfg: Disk3DConfig,
    nnu: usize,
    nphi: usize,
    nz: usize,
    nr: usize,
    dphi: f64,
    dz: f64,
    dr: f64,
    /// Emission quantity, axis order (ν, φ, z, r), ν fastest.
    emissquant: Vec<f64>,
    /// Matter velocity (φ′, z′, r′), component fastest.
    velocity: Vec<f64>,
}

impl Disk3D {
    /// Build a disk from its config, grid dimensions `(n_ν, n_φ, n_z,
    /// n_r)`, emission table and velocity table.
    pub fn new(
        cfg: Disk3DConfig,
        dims: [usize; 4],
        emissquant: Vec<f64>,
        velocity: Vec<f64>,
    ) -> Result<Self, InvariantError> {
        let [nnu, nphi, nz, nr] = dims;
        if nnu == 0 || nphi == 0 || nz == 0 || nr == 0 {
            return Err(InvariantError::new("grid dimensions can't be null"));
        }
        if emissquant.len() != nnu * nphi * nz * nr {
            return Err(InvariantError::new(format!(
                "emission array has {} cells, dims imply {}",
                emissquant.len(),
                nnu * nphi * nz * nr
            )));
        }
        if velocity.len() != 3 * nphi * nz * nr {
            return Err(InvariantError::new(
                "velocity array not conformable with emission array",
            ));
        }
        Ok(Self {
            cfg,
            nnu,
            nphi,
            nz,
            nr,
            dphi: 2.0 * std::f64::consts::PI / (nphi * cfg.repeat_phi.max(1)) as f64,
            dz: (cfg.zmax - cfg.zmin) / nz as f64,
            dr: (cfg.rout - cfg.rin) / nr as f64,
            emissquant,
            velocity,
        })
    }

    /// Grid dimensions `(n_ν, n_φ, n_z, n_r)`.
    pub fn dims(&self) -> [usize; 4] {
        [self.nnu, self.nphi, self.nz, self.nr]
    }

    /// The layout this disk was built with.
    pub fn config(&self) -> &Disk3DConfig {
        &self.cfg
    }

    /// Grid cell of a position and emitted frequency: `(i_ν, i_φ, i_z,
    /// i_r)`.
    ///
    /// Frequencies at or below ν₀ clamp to the first cell; the top cells
    /// absorb boundary values one cell past the end, anything further out
    /// on z or r is a fatal indexing error.
    pub fn get_indices(&self, pos: &Pos4, nu: f64) -> Result<[usize; 4], AstrobjError> {
        let i_nu = if nu <= self.cfg.nu0 {
            0
        } else {
            (((nu - self.cfg.nu0) / self.cfg.dnu) as usize).min(self.nnu - 1)
        };

        let (rcyl, mut z, mut phi) = cylindrical(self.cfg.kind, pos);

        while phi < 0.0 {
            phi += 2.0 * std::f64::consts::PI;
        }
        let i_phi = (phi / self.dphi) as usize % self.nphi;

        if z < 0.0 && self.cfg.zmin >= 0.0 {
            // Symmetric disk: fold below the equatorial plane.
            z = -z;
        }
        let i_z = Self::axis_index("z", z - self.cfg.zmin, self.dz, self.nz)?;
        let i_r = Self::axis_index("r", rcyl - self.cfg.rin, self.dr, self.nr)?;
        Ok([i_nu, i_phi, i_z, i_r])
    }

    fn axis_index(
        axis: &'static str,
        offset: f64,
        delta: f64,
        len: usize,
    ) -> Result<usize, AstrobjError> {
        let idx = (offset / delta).floor();
        if idx < 0.0 {
            return Ok(0);
        }
        let idx = idx as usize;
        if idx == len {
            Ok(len - 1)
        } else if idx > len {
            Err(GridError::IndexOutOfRange {
                axis,
                index: idx,
                len,
            }
            .into())
        } else {
            Ok(idx)
        }
    }

    fn cell_offset(&self, i: &[usize; 4]) -> usize {
        i[1] + self.nphi * (i[2] + self.nz * i[3])
    }

    /// Emission value at a grid cell.
    fn emissquant_at(&self, i: &[usize; 4]) -> f64 {
        self.emissquant[i[0] + self.nnu * self.cell_offset(i)]
    }

    /// Velocity components `(φ′, z′, r′)` at a grid cell.
    fn velocity_at(&self, i: &[usize; 4]) -> [f64; 3] {
        let base = 3 * self.cell_offset(i);
        [
            self.velocity[base],
            self.velocity[base + 1],
            self.velocity[base + 2],
        ]
    }

    /// Whether a cylindrical point lies inside the grid box.
    fn contains(&self, rcyl: f64, z: f64) -> bool {
        let below = if self.cfg.zmin < 0.0 {
            z < self.cfg.zmin
        } else {
            z < -self.cfg.zmax
        };
        !(below || z > self.cfg.zmax || rcyl > self.cfg.rout || rcyl < self.cfg.rin)
    }

    fn cyl_of_state(&self, state: &State8) -> (f64, f64) {
        let pos = [state[0], state[1], state[2], state[3]];
        let (rcyl, z, _) = cylindrical(self.cfg.kind, &pos);
        (rcyl, z)
    }

    // ── Grid-table round trip ───────────────────────────────────

    /// Read a disk from a grid-table container.
    ///
    /// `RepeatPhi` defaults to 1 when absent; `Rin`, `Rout`, `Zmin`,
    /// `Zmax`, the `emissquant` extension (with `CRVAL1`/`CDELT1`/
    /// `CRPIX1`) and the `velocity` extension are mandatory. A reference
    /// pixel other than 1 rebases ν₀ by `−Δν·(CRPIX1 − 1)`.
    pub fn from_table(
        kind: CoordKind,
        optically_thin: bool,
        table: &Table,
    ) -> Result<Self, AstrobjError> {
        let repeat_phi = table.header.get("RepeatPhi").copied().unwrap_or(1.0) as usize;
        let rin = table.require("Rin")?;
        let rout = table.require("Rout")?;
        let zmin = table.require("Zmin")?;
        let zmax = table.require("Zmax")?;

        let em = table.require_extension("emissquant")?;
        let mut nu0 = em
            .header
            .get("CRVAL1")
            .copied()
            .ok_or_else(|| crate::error::TableError::MissingKey {
                name: "CRVAL1".into(),
            })?;
        let dnu = em
            .header
            .get("CDELT1")
            .copied()
            .ok_or_else(|| crate::error::TableError::MissingKey {
                name: "CDELT1".into(),
            })?;
        let crpix1 = em.header.get("CRPIX1").copied().unwrap_or(1.0);
        if crpix1 != 1.0 {
            nu0 -= dnu * (crpix1 - 1.0);
        }

        let vel = table.require_extension("velocity")?;
        if vel.dims[0] != 3
            || vel.dims[1] != em.dims[1]
            || vel.dims[2] != em.dims[2]
            || vel.dims[3] != em.dims[3]
        {
            return Err(InvariantError::new(
                "velocity array not conformable with emission array",
            )
            .into());
        }

        let cfg = Disk3DConfig {
            kind,
            rin,
            rout,
            zmin,
            zmax,
            repeat_phi,
            nu0,
            dnu,
            optically_thin,
        };
        Self::new(cfg, em.dims, em.data.clone(), vel.data.clone()).map_err(AstrobjError::from)
    }

    /// Serialize the disk to a grid-table container. The writer always
    /// emits `CRPIX1 = 1`, making read-write round trips exact.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        if self.cfg.repeat_phi != 1 {
            table
                .header
                .insert("RepeatPhi".into(), self.cfg.repeat_phi as f64);
        }
        table.header.insert("Rin".into(), self.cfg.rin);
        table.header.insert("Rout".into(), self.cfg.rout);
        table.header.insert("Zmin".into(), self.cfg.zmin);
        table.header.insert("Zmax".into(), self.cfg.zmax);

        let mut em = Extension::new(
            "emissquant",
            [self.nnu, self.nphi, self.nz, self.nr],
            self.emissquant.clone(),
        );
        em.header.insert("CRVAL1".into(), self.cfg.nu0);
        em.header.insert("CDELT1".into(), self.cfg.dnu);
        em.header.insert("CRPIX1".into(), 1.0);
        table.extensions.push(em);

        table.extensions.push(Extension::new(
            "velocity",
            [3, self.nphi, self.nz, self.nr],
            self.velocity.clone(),
        ));
        table
    }
}

impl StepGovernor for Disk3D {
    fn delta_max(&self, _state: &State8) -> f64 {
        f64::INFINITY
    }
}

impl RadiativeEmitter for Disk3D {
    fn emission(&self, nu_em: f64, coord_obj: &State8) -> f64 {
        let pos = [coord_obj[0], coord_obj[1], coord_obj[2], coord_obj[3]];
        match self.get_indices(&pos, nu_em) {
            Ok(i) => self.emissquant_at(&i),
            Err(_) => 0.0,
        }
    }

    fn absorption(&self, _nu_em: f64, _coord_obj: &State8) -> f64 {
        // No opacity table; thick mode degenerates to an opaque surface.
        0.0
    }

    fn integrate_emission(&self, nu1: f64, nu2: f64, coord_obj: &State8) -> f64 {
        self.emission(0.5 * (nu1 + nu2), coord_obj) * (nu2 - nu1)
    }
}

impl Astrobj for Disk3D {
    fn name(&self) -> &'static str {
        "Disk3D"
    }

    fn r_max(&self) -> f64 {
        let half_height = self.cfg.zmax.abs().max(self.cfg.zmin.abs());
        3.0 * self.cfg.rout.hypot(half_height)
    }

    fn optically_thin(&self) -> bool {
        self.cfg.optically_thin
    }

    fn chart(&self) -> Option<CoordKind> {
        Some(self.cfg.kind)
    }

    fn emitter_velocity(
        &self,
        metric: &dyn Metric,
        pos: &Pos4,
        vel: &mut Vel4,
    ) -> Result<(), AstrobjError> {
        require_spherical("Disk3D::emitter_velocity", self.cfg.kind)?;
        let i = self.get_indices(pos, self.cfg.nu0)?;
        let [phiprime, zprime, rprime] = self.velocity_at(&i);

        // From r_sph² = r_cyl² + z² and r_sph·cos θ = z.
        let rsph = pos[1];
        let th = pos[2];
        let zz = rsph * th.cos();
        let rcyl = (rsph * rsph - zz * zz).max(0.0).sqrt();
        vel[1] = (rcyl * rprime + zz * zprime) / rsph;
        vel[2] = (vel[1] * th.cos() - zprime) / (rsph * th.sin());
        vel[3] = phiprime;
        vel[0] = metric.sys_prime_to_tdot(pos, &[vel[1], vel[2], vel[3]]);
        vel[1] *= vel[0];
        vel[2] *= vel[0];
        vel[3] *= vel[0];
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
        let (coord2, coord1) =
            match (photon.get_coord(segment), photon.get_coord(segment + 1)) {
                (Some(c2), Some(c1)) => (*c2, *c1),
                _ => return Ok(false),
            };
        let t2 = coord2[0];
        let t1 = coord1[0];

        // Cheap reject: both samples far outside the bounding cylinder and
        // on the same side of the equatorial plane.
        let kind = self.cfg.kind;
        let r2 = radius(kind, &[coord2[0], coord2[1], coord2[2], coord2[3]]);
        let r1 = radius(kind, &[coord1[0], coord1[1], coord1[2], coord1[3]]);
        let (_, z2) = self.cyl_of_state(&coord2);
        let (_, z1) = self.cyl_of_state(&coord1);
        let rtol = 2.0 * self.cfg.rout;
        if r1 > rtol && r2 > rtol && z1 * z2 > 0.0 {
            return Ok(false);
        }

        // Break the segment into pieces of width Δt.
        let deltat = 0.1f64.min(0.1 * (t2 - t1));
        let mut tcur = t2;
        let (mut rcyl, mut z) = self.cyl_of_state(&coord2);

        // Entry search: walk backward from t2 until inside the box.
        while tcur > t1 + deltat && !self.contains(rcyl, z) {
            tcur -= deltat;
            match photon.interpolate(tcur) {
                Some(state) => {
                    let c = self.cyl_of_state(&state);
                    rcyl = c.0;
                    z = c.1;
                }
                None => return Ok(false),
            }
        }
        if tcur <= t1 + deltat {
            // No point inside the box between t1 and t2.
            return Ok(false);
        }
        trace!("disk entry at t={tcur} (segment {segment})");

        // Accumulate emission along the path inside the box.
        let mut processed = false;
        while tcur > t1 + deltat {
            tcur -= deltat;
            let state = match photon.interpolate(tcur) {
                Some(s) => s,
                None => break,
            };
            let (rcyl, z) = self.cyl_of_state(&state);
            if !self.contains(rcyl, z) {
                break;
            }
            let pos = [state[0], state[1], state[2], state[3]];
            let mut vel = [0.0; 4];
            self.emitter_velocity(metric, &pos, &mut vel)?;
            let coord_obj = [
                pos[0], pos[1], pos[2], pos[3], vel[0], vel[1], vel[2], vel[3],
            ];
            hit::process_hit_quantities(
                metric,
                &state,
                &coord_obj,
                deltat,
                obs,
                self,
                self.cfg.optically_thin,
                props,
            );
            processed = true;
            if props.max_transmission() < TRANSMISSION_FLOOR {
                break;
            }
        }

        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn disk(zmin: f64) -> Disk3D {
        let cfg = Disk3DConfig {
            kind: CoordKind::Spherical,
            rin: 4.0,
            rout: 10.0,
            zmin,
            zmax: 2.0,
            repeat_phi: 1,
            nu0: 1.0e17,
            dnu: 1.0e15,
            optically_thin: true,
        };
        let dims = [4usize, 8, 4, 6];
        let n = dims.iter().product::<usize>();
        let emiss: Vec<f64> = (0..n).map(|k| k as f64).collect();
        let vel = vec![0.01; 3 * 8 * 4 * 6];
        Disk3D::new(cfg, dims, emiss, vel).unwrap()
    }

    #[test]
    fn frequency_index_clamps_both_ends() {
        let d = disk(0.0);
        let pos = [0.0, 5.0, PI / 2.0, 0.0];
        assert_eq!(d.get_indices(&pos, 0.5e17).unwrap()[0], 0);
        assert_eq!(d.get_indices(&pos, 1.0e17).unwrap()[0], 0);
        assert_eq!(d.get_indices(&pos, 1.0e17 + 2.5e15).unwrap()[0], 2);
        assert_eq!(d.get_indices(&pos, 9.0e17).unwrap()[0], 3);
    }

    #[test]
    fn phi_wraps_modularly() {
        let d = disk(0.0);
        // dphi = 2π/8.
        let i_a = d.get_indices(&[0.0, 5.0, PI / 2.0, 0.1], 1.0e17).unwrap()[1];
        let i_b = d
            .get_indices(&[0.0, 5.0, PI / 2.0, 0.1 - 2.0 * PI], 1.0e17)
            .unwrap()[1];
        assert_eq!(i_a, i_b);
        assert_eq!(i_a, 0);
        let i_c = d.get_indices(&[0.0, 5.0, PI / 2.0, PI], 1.0e17).unwrap()[1];
        assert_eq!(i_c, 4);
    }

    #[test]
    fn symmetric_disk_folds_negative_heights() {
        let d = disk(0.0);
        // θ below the equator gives z < 0; zmin ≥ 0 folds it.
        let above = d.get_indices(&[0.0, 5.0, 1.3, 0.0], 1.0e17).unwrap();
        let below = d.get_indices(&[0.0, 5.0, PI - 1.3, 0.0], 1.0e17).unwrap();
        assert_eq!(above[2], below[2]);
    }

    #[test]
    fn boundary_lands_in_last_cell_and_beyond_is_fatal() {
        let d = disk(0.0);
        // Exactly on the outer radius: one past the end, clamped.
        let on_edge = d
            .get_indices(&[0.0, 10.0, PI / 2.0, 0.0], 1.0e17)
            .unwrap();
        assert_eq!(on_edge[3], 5);
        // Strictly beyond: fatal.
        let err = d
            .get_indices(&[0.0, 14.0, PI / 2.0, 0.0], 1.0e17)
            .unwrap_err();
        assert!(matches!(err, AstrobjError::Grid(_)));
    }

    #[test]
    fn velocity_not_conformable_is_invariant_error() {
        let cfg = disk(0.0).cfg;
        let dims = [4usize, 8, 4, 6];
        let n = dims.iter().product::<usize>();
        let err = Disk3D::new(cfg, dims, vec![0.0; n], vec![0.0; 7]).unwrap_err();
        assert!(err.to_string().contains("not conformable"));
    }

    #[test]
    fn zero_dimension_rejected() {
        let cfg = disk(0.0).cfg;
        let err = Disk3D::new(cfg, [0, 8, 4, 6], vec![], vec![]).unwrap_err();
        assert!(err.to_string().contains("null"));
    }

    #[test]
    fn contains_honours_symmetry_convention() {
        let sym = disk(0.0);
        assert!(sym.contains(5.0, -1.5), "symmetric disk spans negative z");
        assert!(!sym.contains(5.0, -2.5));
        assert!(!sym.contains(11.0, 0.5));
        assert!(!sym.contains(3.0, 0.5));
        // zmin ≥ 0 still means symmetric: only |z| beyond zmax is outside.
        let asym = disk(0.5);
        assert!(asym.contains(5.0, -1.0));
        assert!(!asym.contains(5.0, -2.5));
    }
}

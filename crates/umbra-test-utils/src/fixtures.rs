//! Ready-made emitters for integration tests.

use umbra_astrobj::{Disk3D, Disk3DConfig, FixedStar, PowerLawSpectrum, Spectrum};
use umbra_core::CoordKind;

/// A uniform-emission disk spanning radii 4–10 at heights |z| ≤ 1.5,
/// matter at rest, symmetric about the equatorial plane.
pub fn uniform_disk(optically_thin: bool) -> Disk3D {
    let cfg = Disk3DConfig {
        kind: CoordKind::Spherical,
        rin: 4.0,
        rout: 10.0,
        zmin: 0.0,
        zmax: 1.5,
        repeat_phi: 1,
        nu0: 0.5,
        dnu: 0.25,
        optically_thin,
    };
    let dims = [4usize, 8, 4, 6];
    let n: usize = dims.iter().product();
    Disk3D::new(cfg, dims, vec![1.0; n], vec![0.0; 3 * 8 * 4 * 6]).unwrap()
}

/// An origin-centred optically thin star with flat power-law emission
/// and opacity, the classic blob scene.
pub fn blob_star(radius: f64, emission: f64, opacity: f64) -> FixedStar {
    FixedStar::new(CoordKind::Spherical, [0.0; 3], radius)
        .with_spectrum(Spectrum::PowerLaw(PowerLawSpectrum::flat(emission)))
        .with_opacity(PowerLawSpectrum::flat(opacity))
}

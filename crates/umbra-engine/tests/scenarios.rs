//! End-to-end scenes: flat-space blob, horizon capture, fast escape,
//! optically-thick re-render, disk symmetry, thread parity.

use std::f64::consts::PI;
use std::sync::Arc;

use umbra_astrobj::{Astrobj, FixedStar, PowerLawSpectrum, Spectrum, Torus};
use umbra_core::{CoordKind, Quantity, QuantitySet, TraceBuffer};
use umbra_engine::{PixelRange, Scenery, SceneryConfig, Screen};
use umbra_metric::{KerrBL, Metric, Minkowski};
use umbra_photon::{StopReason, Tuning};
use umbra_test_utils::fixtures::{blob_star, uniform_disk};
use umbra_test_utils::MockMetric;

/// Geometrical observer distance of Sgr A*-like scenery: 8 kpc over
/// GM/c² for 4·10⁶ solar masses.
const BLOB_DISTANCE: f64 = 4.1794e10;
/// 150 µas in radians.
const BLOB_FOV: f64 = 7.2722e-10;
/// 30 kyr in units of GM/c³.
const BLOB_TIME: f64 = 4.807e10;

fn blob_scenery(resolution: usize, n_threads: usize) -> Scenery {
    let mut screen = Screen::new(resolution, BLOB_FOV, BLOB_DISTANCE);
    screen.inclination = PI / 2.0;
    screen.observation_time = BLOB_TIME;
    Scenery::new(SceneryConfig {
        metric: Arc::new(Minkowski::new(CoordKind::Spherical)),
        screen,
        astrobj: Arc::new(blob_star(12.0, 1e-3, 1e-2)),
        quantities: "Intensity".parse().unwrap(),
        n_threads,
        tuning: Tuning {
            delta: 1.0,
            maxiter: 1_000_000,
            ..Tuning::default()
        },
    })
    .unwrap()
}

fn intensity_bits(buffer: &TraceBuffer) -> Vec<u64> {
    let mut bits = Vec::new();
    for j in 0..buffer.height() {
        for i in 0..buffer.width() {
            bits.push(buffer.scalar(Quantity::Intensity, i, j).unwrap().to_bits());
        }
    }
    bits
}

#[test]
fn flat_space_blob_renders_centred_disk() {
    let scenery = blob_scenery(32, 1);
    let range = PixelRange::full(32);
    let mut buffer = TraceBuffer::new(scenery.quantities(), 32, 32, 0);
    let metrics = scenery.ray_trace(&range, &mut buffer, None, None).unwrap();
    assert_eq!(metrics.pixels, 1024);
    assert!(metrics.hits > 0, "the star subtends many pixels");

    let mut centre_hits = 0;
    for j in 0..32 {
        for i in 0..32 {
            let v = buffer.scalar(Quantity::Intensity, i, j).unwrap();
            assert!(v.is_finite(), "non-finite intensity at ({i},{j})");
            assert!(v >= 0.0);
            let du = i as f64 - 15.5;
            let dv = j as f64 - 15.5;
            let rho = (du * du + dv * dv).sqrt();
            // Star angular radius: 12 units over a 30.4-unit field of
            // view, i.e. ~12.6 pixels.
            if rho < 10.0 {
                assert!(v > 0.0, "pixel ({i},{j}) inside the blob is dark");
                centre_hits += 1;
            }
            if rho > 15.0 {
                assert_eq!(v, 0.0, "pixel ({i},{j}) outside the blob is lit");
            }
        }
    }
    assert!(centre_hits > 200);

    // Rough photometric check: a central chord of 24 units at j = 10⁻³.
    let centre = buffer.scalar(Quantity::Intensity, 16, 16).unwrap();
    assert!(
        centre > 0.01 && centre < 0.03,
        "central intensity {centre} outside the expected band"
    );
}

#[test]
fn ray_into_kerr_horizon_reports_capture() {
    let mut screen = Screen::new(8, 0.1, 100.0);
    screen.inclination = PI / 2.0;
    // Star far off the line of sight so nothing is hit on the way in.
    let star = FixedStar::new(CoordKind::Spherical, [30.0, PI / 2.0, PI / 2.0], 2.0);
    let scenery = Scenery::new(SceneryConfig {
        metric: Arc::new(KerrBL::new(1.0, 0.5)),
        screen,
        astrobj: Arc::new(star),
        quantities: "Intensity".parse().unwrap(),
        n_threads: 1,
        tuning: Tuning {
            delta: 0.1,
            delta_max: 1.0,
            maxiter: 200_000,
            ..Tuning::default()
        },
    })
    .unwrap();

    let mut props =
        umbra_core::PixelProps::new(scenery.quantities(), scenery.n_spectral());
    // Central-ish pixel: impact parameter far below the critical one.
    let outcome = scenery.trace_pixel(4, 4, &mut props, None).unwrap();
    assert_eq!(outcome.stop, Some(StopReason::Horizon));
    assert!(!outcome.hit);
    assert_eq!(props.intensity, 0.0, "sentinel intensity for captured ray");
}

#[test]
fn missing_ray_escapes_quickly() {
    let mut screen = Screen::new(8, 0.6, 200.0);
    screen.inclination = 0.2;
    let scenery = Scenery::new(SceneryConfig {
        metric: Arc::new(Minkowski::new(CoordKind::Spherical)),
        screen,
        astrobj: Arc::new(uniform_disk(true)),
        quantities: "Intensity".parse().unwrap(),
        n_threads: 1,
        tuning: Tuning {
            delta: 0.5,
            maxiter: 100_000,
            ..Tuning::default()
        },
    })
    .unwrap();

    // An edge pixel: perihelion stays outside twice the disk radius.
    let mut props =
        umbra_core::PixelProps::new(scenery.quantities(), scenery.n_spectral());
    let outcome = scenery.trace_pixel(7, 4, &mut props, None).unwrap();
    assert_eq!(outcome.stop, Some(StopReason::Escape));
    assert!(!outcome.hit);
    assert_eq!(props.intensity, 0.0);
    assert!(
        outcome.steps < 100_000 / 10,
        "escape took {} steps",
        outcome.steps
    );
}

#[test]
fn optically_thick_rerender_scales_with_emissivity() {
    fn thick_scenery(emission: f64) -> Scenery {
        let mut screen = Screen::new(8, 0.06, 200.0);
        screen.inclination = PI / 2.0;
        let star = FixedStar::new(CoordKind::Spherical, [0.0; 3], 4.0)
            .with_spectrum(Spectrum::PowerLaw(PowerLawSpectrum::flat(emission)))
            .optically_thin(false);
        Scenery::new(SceneryConfig {
            metric: Arc::new(Minkowski::new(CoordKind::Spherical)),
            screen,
            astrobj: Arc::new(star),
            quantities: "Intensity ImpactCoords".parse().unwrap(),
            n_threads: 1,
            tuning: Tuning {
                delta: 0.5,
                delta_max: 2.0,
                ..Tuning::default()
            },
        })
        .unwrap()
    }

    let range = PixelRange::full(8);
    let base = thick_scenery(1.5);
    let quantities: QuantitySet = "Intensity ImpactCoords".parse().unwrap();
    let mut traced = TraceBuffer::new(quantities, 8, 8, 0);
    base.ray_trace(&range, &mut traced, None, None).unwrap();

    // Idempotence: re-rendering the same scenery from its own impact
    // coordinates reproduces the intensity.
    let mut replay = TraceBuffer::new(quantities, 8, 8, 0);
    base.ray_trace(&range, &mut replay, Some(&traced), None)
        .unwrap();
    // Doubled emissivity at frozen geometry doubles intensity.
    let doubled = thick_scenery(3.0);
    let mut rerendered = TraceBuffer::new(quantities, 8, 8, 0);
    doubled
        .ray_trace(&range, &mut rerendered, Some(&traced), None)
        .unwrap();

    let mut hit_pixels = 0;
    for j in 0..8 {
        for i in 0..8 {
            let full = traced.scalar(Quantity::Intensity, i, j).unwrap();
            let re = replay.scalar(Quantity::Intensity, i, j).unwrap();
            let re2 = rerendered.scalar(Quantity::Intensity, i, j).unwrap();
            if traced.block(Quantity::ImpactCoords, i, j).unwrap()[0].is_nan() {
                assert_eq!(full, 0.0);
                assert_eq!(re2, 0.0);
                continue;
            }
            hit_pixels += 1;
            assert!(
                (re - full).abs() <= 1e-12 * full.abs().max(1.0),
                "replay {re} vs traced {full} at ({i},{j})"
            );
            assert!(
                (re2 - 2.0 * full).abs() <= 1e-12 * full.abs().max(1.0),
                "re-render {re2} vs 2x{full} at ({i},{j})"
            );
        }
    }
    assert!(hit_pixels > 4, "the star must cover the screen centre");
}

#[test]
fn symmetric_disk_mirrors_across_equator() {
    let mut screen = Screen::new(16, 0.12, 200.0);
    screen.inclination = PI / 2.0;
    let scenery = Scenery::new(SceneryConfig {
        metric: Arc::new(Minkowski::new(CoordKind::Spherical)),
        screen,
        astrobj: Arc::new(uniform_disk(true)),
        quantities: "Intensity".parse().unwrap(),
        n_threads: 1,
        tuning: Tuning {
            delta: 0.2,
            delta_max: 0.5,
            ..Tuning::default()
        },
    })
    .unwrap();
    let range = PixelRange::full(16);
    let mut buffer = TraceBuffer::new(scenery.quantities(), 16, 16, 0);
    let metrics = scenery.ray_trace(&range, &mut buffer, None, None).unwrap();
    assert!(metrics.hits > 0, "edge-on disk must be visible");

    for j in 0..8 {
        for i in 0..16 {
            let a = buffer.scalar(Quantity::Intensity, i, j).unwrap();
            let b = buffer.scalar(Quantity::Intensity, i, 15 - j).unwrap();
            let scale = a.abs().max(b.abs()).max(1e-3);
            assert!(
                (a - b).abs() <= 0.05 * scale,
                "mirror pixels ({i},{j})/({i},{}) differ: {a} vs {b}",
                15 - j
            );
        }
    }
}

#[test]
fn thread_count_does_not_change_output() {
    let reference = {
        let scenery = blob_scenery(16, 1);
        let mut buffer = TraceBuffer::new(scenery.quantities(), 16, 16, 0);
        scenery
            .ray_trace(&PixelRange::full(16), &mut buffer, None, None)
            .unwrap();
        intensity_bits(&buffer)
    };
    for n_threads in [2, 4, 8] {
        let scenery = blob_scenery(16, n_threads);
        let mut buffer = TraceBuffer::new(scenery.quantities(), 16, 16, 0);
        scenery
            .ray_trace(&PixelRange::full(16), &mut buffer, None, None)
            .unwrap();
        assert_eq!(
            intensity_bits(&buffer),
            reference,
            "bitwise mismatch at {n_threads} threads"
        );
    }
}

#[test]
fn thread_unsafe_metric_falls_back_to_single_thread() {
    let mut screen = Screen::new(8, 0.06, 200.0);
    screen.inclination = PI / 2.0;
    let build = |metric: Arc<dyn Metric>, n_threads| {
        Scenery::new(SceneryConfig {
            metric,
            screen: screen.clone(),
            astrobj: Arc::new(blob_star(4.0, 1e-3, 0.0)),
            quantities: "Intensity".parse().unwrap(),
            n_threads,
            tuning: Tuning {
                delta: 0.5,
                delta_max: 2.0,
                ..Tuning::default()
            },
        })
        .unwrap()
    };

    let unsafe_scenery = build(Arc::new(MockMetric::thread_unsafe(CoordKind::Spherical)), 8);
    let safe_scenery = build(Arc::new(MockMetric::new(CoordKind::Spherical)), 1);

    let range = PixelRange::full(8);
    let mut a = TraceBuffer::new(unsafe_scenery.quantities(), 8, 8, 0);
    let mut b = TraceBuffer::new(safe_scenery.quantities(), 8, 8, 0);
    unsafe_scenery.ray_trace(&range, &mut a, None, None).unwrap();
    safe_scenery.ray_trace(&range, &mut b, None, None).unwrap();
    assert_eq!(intensity_bits(&a), intensity_bits(&b));
}

#[test]
fn spectral_quantities_fill_every_channel() {
    let mut screen = Screen::new(8, 0.06, 200.0);
    screen.inclination = PI / 2.0;
    screen.spectro = Some(umbra_engine::Spectro {
        n_samples: 3,
        nu_min: 0.5,
        nu_max: 2.0,
    });
    let scenery = Scenery::new(SceneryConfig {
        metric: Arc::new(Minkowski::new(CoordKind::Spherical)),
        screen,
        astrobj: Arc::new(blob_star(4.0, 1e-3, 0.0)),
        quantities: "Intensity Spectrum BinSpectrum Redshift".parse().unwrap(),
        n_threads: 1,
        tuning: Tuning {
            delta: 0.5,
            delta_max: 2.0,
            ..Tuning::default()
        },
    })
    .unwrap();
    let range = PixelRange::full(8);
    let mut buffer = TraceBuffer::new(scenery.quantities(), 8, 8, 3);
    scenery.ray_trace(&range, &mut buffer, None, None).unwrap();

    // Central pixel hits the star dead on.
    let intensity = buffer.scalar(Quantity::Intensity, 4, 4).unwrap();
    assert!(intensity > 0.0);
    let spectrum = buffer.block(Quantity::Spectrum, 4, 4).unwrap();
    for (c, &v) in spectrum.iter().enumerate() {
        // Flat emission law: every channel integrates like Intensity.
        assert!(
            (v - intensity).abs() < 1e-9 * intensity,
            "channel {c}: {v} vs {intensity}"
        );
    }
    let bins = buffer.block(Quantity::BinSpectrum, 4, 4).unwrap();
    assert!(bins.iter().all(|&v| v > 0.0));
    let redshift = buffer.scalar(Quantity::Redshift, 4, 4).unwrap();
    assert!(
        (redshift - 1.0).abs() < 1e-6,
        "flat static scene: frequency ratio must be 1, got {redshift}"
    );
}

#[test]
fn preset_cancel_flag_stops_before_any_pixel() {
    use std::sync::atomic::AtomicBool;

    let scenery = blob_scenery(16, 1);
    let range = PixelRange::full(16);
    let mut buffer = TraceBuffer::new(scenery.quantities(), 16, 16, 0);
    let cancel = AtomicBool::new(true);
    let metrics = scenery
        .ray_trace(&range, &mut buffer, None, Some(&cancel))
        .unwrap();
    assert_eq!(metrics.pixels, 0);
    assert!(buffer.scalar(Quantity::Intensity, 0, 0).unwrap().is_nan());
}

#[test]
fn torus_scene_hits_both_limbs() {
    // An edge-on torus shows two bright limbs left and right of centre.
    let mut screen = Screen::new(16, 0.06, 400.0);
    screen.inclination = PI / 2.0;
    let torus = Torus::new(CoordKind::Spherical, 8.0, 1.0)
        .with_spectrum(Spectrum::PowerLaw(PowerLawSpectrum::flat(1e-2)));
    let scenery = Scenery::new(SceneryConfig {
        metric: Arc::new(Minkowski::with_mass(CoordKind::Spherical, 1.0)),
        screen,
        astrobj: Arc::new(torus),
        quantities: "Intensity MinDistance".parse().unwrap(),
        n_threads: 1,
        tuning: Tuning {
            delta: 0.2,
            delta_max: 1.0,
            ..Tuning::default()
        },
    })
    .unwrap();
    let range = PixelRange::full(16);
    let mut buffer = TraceBuffer::new(scenery.quantities(), 16, 16, 0);
    let metrics = scenery.ray_trace(&range, &mut buffer, None, None).unwrap();
    assert!(metrics.hits > 0);

    // The equatorial row crosses both limbs.
    let row = 8;
    let left: f64 = (0..8)
        .map(|i| buffer.scalar(Quantity::Intensity, i, row).unwrap())
        .sum();
    let right: f64 = (8..16)
        .map(|i| buffer.scalar(Quantity::Intensity, i, row).unwrap())
        .sum();
    assert!(left > 0.0 && right > 0.0, "limbs: left={left} right={right}");
    // MinDistance is finite everywhere the worldline was examined.
    let md = buffer.scalar(Quantity::MinDistance, 8, 8).unwrap();
    assert!(md.is_finite());
}

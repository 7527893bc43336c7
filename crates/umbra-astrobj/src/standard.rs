//! Standard-mode emitter machinery.
//!
//! A standard emitter describes its body by a signed squared-distance
//! function: `d² < critical_value` is inside, `d² < safety_value` is the
//! buffer shell where the integrator must slow down. The shared impact
//! walk here locates the inside interval of a worldline segment and drives
//! the radiative-transfer fold over it.

use umbra_core::{PixelProps, Pos4, State8};
use umbra_metric::Metric;
use umbra_photon::Photon;

use crate::astrobj::Astrobj;
use crate::error::AstrobjError;
use crate::hit::{self, ObsInfo, TRANSMISSION_FLOOR};

/// The geometric capability of a standard-mode emitter.
pub trait StandardShape {
    /// Signed squared distance to the body at a position.
    fn distance2(&self, pos: &Pos4) -> f64;

    /// `d²` below which a point is inside the body.
    fn critical_value(&self) -> f64;

    /// `d²` below which the integrator step must be bounded.
    fn safety_value(&self) -> f64;
}

/// Maximum integrator step at a state, for standard shapes:
/// `0.1·√d²`, floored at the critical shell so steps never collapse to
/// zero inside the body.
pub fn shell_delta_max<S: StandardShape + ?Sized>(shape: &S, state: &State8) -> f64 {
    let pos = [state[0], state[1], state[2], state[3]];
    let d2 = shape.distance2(&pos).max(shape.critical_value());
    0.1 * d2.sqrt()
}

/// Shared impact walk for standard-mode emitters.
///
/// Examines the worldline segment `(segment, segment + 1)`, records the
/// distance quantities, and accumulates radiative transfer over the
/// interpolated samples inside the body. The governor guarantees the
/// integrator cannot tunnel through the safety shell, so a segment with
/// both ends outside it cannot contain the body.
pub fn standard_impact<A>(
    body: &A,
    metric: &dyn Metric,
    photon: &Photon,
    segment: usize,
    obs: &ObsInfo,
    props: &mut PixelProps,
) -> Result<bool, AstrobjError>
where
    A: Astrobj + StandardShape + ?Sized,
{
    let (coord2, coord1) = match (photon.get_coord(segment), photon.get_coord(segment + 1)) {
        (Some(c2), Some(c1)) => (*c2, *c1),
        _ => return Ok(false),
    };
    let t2 = coord2[0];
    let t1 = coord1[0];

    let d2_late = body.distance2(&[coord2[0], coord2[1], coord2[2], coord2[3]]);
    let d2_early = body.distance2(&[coord1[0], coord1[1], coord1[2], coord1[3]]);
    if segment == 0 {
        props.record_distance(d2_late);
    }
    props.record_distance(d2_early);

    if d2_late > body.safety_value() && d2_early > body.safety_value() {
        return Ok(false);
    }

    let deltat = 0.1f64.min(0.1 * (t2 - t1));
    let mut tcur = t2;
    let mut hit_any = false;

    while tcur - deltat > t1 {
        tcur -= deltat;
        let state = match photon.interpolate(tcur) {
            Some(s) => s,
            None => break,
        };
        let pos = [state[0], state[1], state[2], state[3]];
        let d2 = body.distance2(&pos);
        props.record_distance(d2);
        if d2 >= body.critical_value() {
            continue;
        }

        let mut vel = [0.0; 4];
        body.emitter_velocity(metric, &pos, &mut vel)?;
        let coord_obj = [
            pos[0], pos[1], pos[2], pos[3], vel[0], vel[1], vel[2], vel[3],
        ];
        hit::process_hit_quantities(
            metric,
            &state,
            &coord_obj,
            deltat,
            obs,
            body,
            body.optically_thin(),
            props,
        );
        hit_any = true;
        if props.max_transmission() < TRANSMISSION_FLOOR {
            break;
        }
    }

    Ok(hit_any)
}

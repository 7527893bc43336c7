//! Worldline storage: the ordered 8-states of one traced photon.
//!
//! Backward tracing makes coordinate time strictly decreasing along the
//! storage order. Interpolated lookup at an arbitrary intermediate time is
//! linear between the bracketing samples; callers renormalize angles on the
//! result when the chart is spherical.

use umbra_core::State8;

/// The ordered sequence of integrated 8-states for one traced photon.
#[derive(Clone, Debug, Default)]
pub struct Worldline {
    states: Vec<State8>,
}

impl Worldline {
    /// Empty worldline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no state has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The k-th recorded state (0 is the seed, i.e. the latest time).
    pub fn get(&self, index: usize) -> Option<&State8> {
        self.states.get(index)
    }

    /// The most recently recorded state.
    pub fn last(&self) -> Option<&State8> {
        self.states.last()
    }

    /// Iterate over recorded states in storage (decreasing-time) order.
    pub fn iter(&self) -> impl Iterator<Item = &State8> {
        self.states.iter()
    }

    /// Coordinate-time span `(earliest, latest)` of the traced leg.
    pub fn span(&self) -> Option<(f64, f64)> {
        match (self.states.last(), self.states.first()) {
            (Some(last), Some(first)) => Some((last[0], first[0])),
            _ => None,
        }
    }

    /// Drop all recorded states (re-seeding).
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Append an accepted state.
    ///
    /// Coordinate time must strictly decrease; a non-decreasing push is
    /// rejected so a misbehaving stepper cannot corrupt interpolation.
    pub fn push(&mut self, state: State8) -> bool {
        if let Some(prev) = self.states.last() {
            if state[0] >= prev[0] {
                return false;
            }
        }
        self.states.push(state);
        true
    }

    /// Interpolated full 8-state at coordinate time `t` within the span.
    ///
    /// Returns `None` outside the traced span. Exact sample times return
    /// the recorded state.
    pub fn interpolate(&self, t: f64) -> Option<State8> {
        let (earliest, latest) = self.span()?;
        if t > latest || t < earliest {
            return None;
        }
        // Times decrease with index: binary search with reversed ordering.
        let idx = self
            .states
            .partition_point(|s| s[0] > t);
        if idx == 0 {
            return Some(self.states[0]);
        }
        let after = &self.states[idx - 1]; // later time
        let before = match self.states.get(idx) {
            Some(s) => s, // earlier time
            None => return Some(*after),
        };
        if (after[0] - before[0]).abs() < f64::EPSILON {
            return Some(*after);
        }
        let w = (t - before[0]) / (after[0] - before[0]);
        let mut out = [0.0; 8];
        for i in 0..8 {
            out[i] = before[i] + w * (after[i] - before[i]);
        }
        Some(out)
    }

    /// Number of sign changes of `f` over consecutive samples.
    ///
    /// Drives the equatorial-plane crossing count: pass the signed height
    /// above the plane.
    pub fn count_sign_changes(&self, f: impl Fn(&State8) -> f64) -> usize {
        let mut count = 0;
        let mut prev: Option<f64> = None;
        for s in &self.states {
            let v = f(s);
            if v == 0.0 {
                continue;
            }
            if let Some(p) = prev {
                if p * v < 0.0 {
                    count += 1;
                }
            }
            prev = Some(v);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(t: f64, r: f64) -> State8 {
        [t, r, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn push_enforces_decreasing_time() {
        let mut wl = Worldline::new();
        assert!(wl.push(state(10.0, 1.0)));
        assert!(wl.push(state(9.0, 2.0)));
        assert!(!wl.push(state(9.5, 3.0)), "non-decreasing push accepted");
        assert_eq!(wl.len(), 2);
    }

    #[test]
    fn interpolate_midpoint() {
        let mut wl = Worldline::new();
        wl.push(state(10.0, 100.0));
        wl.push(state(8.0, 80.0));
        wl.push(state(4.0, 60.0));
        let s = wl.interpolate(9.0).unwrap();
        assert!((s[1] - 90.0).abs() < 1e-12);
        let s = wl.interpolate(6.0).unwrap();
        assert!((s[1] - 70.0).abs() < 1e-12);
    }

    #[test]
    fn interpolate_at_samples_and_bounds() {
        let mut wl = Worldline::new();
        wl.push(state(10.0, 100.0));
        wl.push(state(8.0, 80.0));
        assert_eq!(wl.interpolate(10.0).unwrap()[1], 100.0);
        assert_eq!(wl.interpolate(8.0).unwrap()[1], 80.0);
        assert!(wl.interpolate(10.5).is_none());
        assert!(wl.interpolate(7.9).is_none());
    }

    #[test]
    fn span_reports_traced_leg() {
        let mut wl = Worldline::new();
        assert!(wl.span().is_none());
        wl.push(state(5.0, 1.0));
        wl.push(state(2.0, 1.0));
        assert_eq!(wl.span(), Some((2.0, 5.0)));
    }

    #[test]
    fn sign_change_count_skips_zeros() {
        let mut wl = Worldline::new();
        for (t, z) in [(5.0, 1.0), (4.0, 0.0), (3.0, -1.0), (2.0, -0.5), (1.0, 2.0)] {
            let mut s = state(t, 1.0);
            s[2] = z;
            wl.push(s);
        }
        assert_eq!(wl.count_sign_changes(|s| s[2]), 2);
    }
}

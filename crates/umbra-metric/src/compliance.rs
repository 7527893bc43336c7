//! Metric trait compliance test helpers.
//!
//! These functions verify that a [`Metric`] implementation satisfies the
//! invariants required by the trait contract. Reused across all backend
//! test modules (Minkowski, KerrBL) and available to downstream metrics.

use umbra_core::Pos4;

use crate::metric::Metric;

/// Assert that `g_{μν}` is symmetric at every probe position.
pub fn assert_gmunu_symmetric(metric: &dyn Metric, probes: &[Pos4]) {
    for pos in probes {
        let g = metric.gmunu(pos);
        for mu in 0..4 {
            for nu in 0..4 {
                assert!(
                    (g[mu][nu] - g[nu][mu]).abs() < 1e-12,
                    "{}: g[{mu}][{nu}] != g[{nu}][{mu}] at {pos:?}",
                    metric.name()
                );
            }
        }
    }
}

/// Assert that `g · g⁻¹ = 1` at every probe position.
pub fn assert_inverse_consistent(metric: &dyn Metric, probes: &[Pos4]) {
    for pos in probes {
        let g = metric.gmunu(pos);
        let gup = metric.gmunu_up(pos);
        for i in 0..4 {
            for j in 0..4 {
                let p: f64 = (0..4).map(|k| g[i][k] * gup[k][j]).sum();
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (p - expect).abs() < 1e-9,
                    "{}: (g·g⁻¹)[{i}][{j}] = {p} at {pos:?}",
                    metric.name()
                );
            }
        }
    }
}

/// Assert that [`Metric::null_tdot`] solutions actually have zero norm.
pub fn assert_null_tdot_consistent(metric: &dyn Metric, probes: &[(Pos4, [f64; 3])]) {
    for (pos, spatial) in probes {
        let kt = metric.null_tdot(pos, spatial);
        let k = [kt, spatial[0], spatial[1], spatial[2]];
        let norm = metric.scalar_prod(pos, &k, &k);
        assert!(
            norm.abs() < 1e-9,
            "{}: g(k,k) = {norm} for null-completed {k:?} at {pos:?}",
            metric.name()
        );
        assert!(kt > 0.0, "{}: non-future-pointing k^t = {kt}", metric.name());
    }
}

/// Assert that [`Metric::sys_prime_to_tdot`] solutions are unit timelike.
pub fn assert_tdot_normalization(metric: &dyn Metric, probes: &[(Pos4, [f64; 3])]) {
    for (pos, v) in probes {
        let tdot = metric.sys_prime_to_tdot(pos, v);
        if tdot == 0.0 {
            continue; // superluminal request, correctly rejected
        }
        let u = [tdot, v[0] * tdot, v[1] * tdot, v[2] * tdot];
        let norm = metric.scalar_prod(pos, &u, &u);
        assert!(
            (norm + 1.0).abs() < 1e-9,
            "{}: g(u,u) = {norm} for promoted {u:?} at {pos:?}",
            metric.name()
        );
    }
}

/// Assert that the right-hand side conserves the null norm over a short
/// fixed-step RK4 integration.
pub fn assert_rhs_conserves_null_norm(
    metric: &dyn Metric,
    seed: [f64; 8],
    steps: usize,
    h: f64,
    tol: f64,
) {
    let mut state = seed;
    for _ in 0..steps {
        state = metric.rk4_step(&state, h);
    }
    let pos = [state[0], state[1], state[2], state[3]];
    let p = [state[4], state[5], state[6], state[7]];
    let norm = metric.norm_p(&pos, &p);
    assert!(
        norm.abs() < tol,
        "{}: null norm {norm} after {steps} steps of {h}",
        metric.name()
    );
}

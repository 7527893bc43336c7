//! Embedded Runge-Kutta Butcher tableaus and the generic stepper.
//!
//! Each tableau carries the weights of the propagated (higher-order)
//! solution and of the embedded lower-order solution; the difference gives
//! the local error estimate. Coefficients are the published classic values.

use smallvec::SmallVec;
use umbra_core::State8;
use umbra_metric::Metric;

/// An embedded Runge-Kutta pair.
pub(crate) struct Tableau {
    /// Stage count.
    pub stages: usize,
    /// Node coefficients (unused by autonomous systems but kept for the
    /// record and for dense-output extensions).
    #[allow(dead_code)]
    pub c: &'static [f64],
    /// Stage coupling matrix, row `i` holding `a[i][0..i]`.
    pub a: &'static [&'static [f64]],
    /// Propagated (higher-order) solution weights.
    pub b_high: &'static [f64],
    /// Embedded lower-order solution weights.
    pub b_low: &'static [f64],
    /// Step-size control exponent `1/(q+1)` with `q` the lower order.
    pub error_exponent: f64,
}

/// Cash-Karp 5(4).
pub(crate) static CASH_KARP_54: Tableau = Tableau {
    stages: 6,
    c: &[0.0, 0.2, 0.3, 0.6, 1.0, 0.875],
    a: &[
        &[],
        &[0.2],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[0.3, -0.9, 1.2],
        &[-11.0 / 54.0, 2.5, -70.0 / 27.0, 35.0 / 27.0],
        &[
            1631.0 / 55296.0,
            175.0 / 512.0,
            575.0 / 13824.0,
            44275.0 / 110592.0,
            253.0 / 4096.0,
        ],
    ],
    b_high: &[
        37.0 / 378.0,
        0.0,
        250.0 / 621.0,
        125.0 / 594.0,
        0.0,
        512.0 / 1771.0,
    ],
    b_low: &[
        2825.0 / 27648.0,
        0.0,
        18575.0 / 48384.0,
        13525.0 / 55296.0,
        277.0 / 14336.0,
        0.25,
    ],
    error_exponent: 0.2,
};

/// Dormand-Prince 5(4).
pub(crate) static DOPRI_5: Tableau = Tableau {
    stages: 7,
    c: &[0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0, 1.0],
    a: &[
        &[],
        &[0.2],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
        &[
            19372.0 / 6561.0,
            -25360.0 / 2187.0,
            64448.0 / 6561.0,
            -212.0 / 729.0,
        ],
        &[
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
        ],
        &[
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
        ],
    ],
    b_high: &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
        0.0,
    ],
    b_low: &[
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        0.025,
    ],
    error_exponent: 0.2,
};

/// Fehlberg 7(8), the high-order workhorse.
pub(crate) static FEHLBERG_78: Tableau = Tableau {
    stages: 13,
    c: &[
        0.0,
        2.0 / 27.0,
        1.0 / 9.0,
        1.0 / 6.0,
        5.0 / 12.0,
        0.5,
        5.0 / 6.0,
        1.0 / 6.0,
        2.0 / 3.0,
        1.0 / 3.0,
        1.0,
        0.0,
        1.0,
    ],
    a: &[
        &[],
        &[2.0 / 27.0],
        &[1.0 / 36.0, 1.0 / 12.0],
        &[1.0 / 24.0, 0.0, 1.0 / 8.0],
        &[5.0 / 12.0, 0.0, -25.0 / 16.0, 25.0 / 16.0],
        &[0.05, 0.0, 0.0, 0.25, 0.2],
        &[
            -25.0 / 108.0,
            0.0,
            0.0,
            125.0 / 108.0,
            -65.0 / 27.0,
            125.0 / 54.0,
        ],
        &[
            31.0 / 300.0,
            0.0,
            0.0,
            0.0,
            61.0 / 225.0,
            -2.0 / 9.0,
            13.0 / 900.0,
        ],
        &[
            2.0,
            0.0,
            0.0,
            -53.0 / 6.0,
            704.0 / 45.0,
            -107.0 / 9.0,
            67.0 / 90.0,
            3.0,
        ],
        &[
            -91.0 / 108.0,
            0.0,
            0.0,
            23.0 / 108.0,
            -976.0 / 135.0,
            311.0 / 54.0,
            -19.0 / 60.0,
            17.0 / 6.0,
            -1.0 / 12.0,
        ],
        &[
            2383.0 / 4100.0,
            0.0,
            0.0,
            -341.0 / 164.0,
            4496.0 / 1025.0,
            -301.0 / 82.0,
            2133.0 / 4100.0,
            45.0 / 82.0,
            45.0 / 164.0,
            18.0 / 41.0,
        ],
        &[
            3.0 / 205.0,
            0.0,
            0.0,
            0.0,
            0.0,
            -6.0 / 41.0,
            -3.0 / 205.0,
            -3.0 / 41.0,
            3.0 / 41.0,
            6.0 / 41.0,
            0.0,
        ],
        &[
            -1777.0 / 4100.0,
            0.0,
            0.0,
            -341.0 / 164.0,
            4496.0 / 1025.0,
            -289.0 / 82.0,
            2193.0 / 4100.0,
            51.0 / 82.0,
            33.0 / 164.0,
            12.0 / 41.0,
            0.0,
            1.0,
        ],
    ],
    b_high: &[
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        34.0 / 105.0,
        9.0 / 35.0,
        9.0 / 35.0,
        9.0 / 280.0,
        9.0 / 280.0,
        0.0,
        41.0 / 840.0,
        41.0 / 840.0,
    ],
    b_low: &[
        41.0 / 840.0,
        0.0,
        0.0,
        0.0,
        0.0,
        34.0 / 105.0,
        9.0 / 35.0,
        9.0 / 35.0,
        9.0 / 280.0,
        9.0 / 280.0,
        41.0 / 840.0,
        0.0,
        0.0,
    ],
    error_exponent: 0.125,
};

/// One embedded step of size `h` (sign carries the integration direction).
///
/// Returns the higher-order solution and the infinity norm of the local
/// error estimate.
pub(crate) fn embedded_step(
    metric: &dyn Metric,
    state: &State8,
    h: f64,
    tab: &Tableau,
) -> (State8, f64) {
    let mut ks: SmallVec<[State8; 13]> = SmallVec::new();
    for stage in 0..tab.stages {
        let mut probe = *state;
        for (j, k) in ks.iter().enumerate() {
            let a = tab.a[stage][j];
            if a != 0.0 {
                for i in 0..8 {
                    probe[i] += h * a * k[i];
                }
            }
        }
        let mut k = [0.0; 8];
        metric.rhs(&probe, &mut k);
        ks.push(k);
    }

    let mut out = *state;
    let mut err = 0.0f64;
    for i in 0..8 {
        let mut high = 0.0;
        let mut low = 0.0;
        for (j, k) in ks.iter().enumerate() {
            high += tab.b_high[j] * k[i];
            low += tab.b_low[j] * k[i];
        }
        out[i] += h * high;
        err = err.max((h * (high - low)).abs());
    }
    (out, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight_sum(tab: &Tableau) -> (f64, f64) {
        (tab.b_high.iter().sum(), tab.b_low.iter().sum())
    }

    #[test]
    fn tableau_weights_are_consistent() {
        for tab in [&CASH_KARP_54, &DOPRI_5, &FEHLBERG_78] {
            assert_eq!(tab.b_high.len(), tab.stages);
            assert_eq!(tab.b_low.len(), tab.stages);
            assert_eq!(tab.a.len(), tab.stages);
            for (i, row) in tab.a.iter().enumerate() {
                assert_eq!(row.len(), i, "row {i} of coupling matrix");
            }
            let (high, low) = weight_sum(tab);
            assert!((high - 1.0).abs() < 1e-12, "b_high sums to {high}");
            assert!((low - 1.0).abs() < 1e-12, "b_low sums to {low}");
        }
    }

    #[test]
    fn stage_nodes_match_row_sums() {
        // Consistency condition c_i = Σ_j a_ij.
        for tab in [&CASH_KARP_54, &DOPRI_5, &FEHLBERG_78] {
            for (i, row) in tab.a.iter().enumerate() {
                let sum: f64 = row.iter().sum();
                assert!(
                    (sum - tab.c[i]).abs() < 1e-12,
                    "stage {i}: Σa = {sum}, c = {}",
                    tab.c[i]
                );
            }
        }
    }
}

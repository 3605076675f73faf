//! MacKinnon response surfaces for Dickey-Fuller type statistics.
//!
//! P-values follow MacKinnon (1994), "Approximate asymptotic distribution
//! functions for unit-root and cointegration tests"; finite-sample critical
//! values follow MacKinnon (2010), "Critical values for cointegration tests".
//! `n_vars` is the number of I(1) variables: 1 for a plain ADF test, 2 for a
//! pairwise Engle-Granger test.

use crate::application::statistics::normal_cdf;
use crate::domain::diagnostics::{CriticalValues, Deterministic};
use crate::domain::errors::AnalysisError;

struct PValueSurface {
    max_stat: f64,
    min_stat: f64,
    star_stat: f64,
    small_p: [f64; 3],
    large_p: [f64; 4],
}

// Large-p coefficients are stored already scaled by [1, 1e-1, 1e-1, 1e-2].
const SURFACE_N_1: PValueSurface = PValueSurface {
    max_stat: f64::INFINITY,
    min_stat: -19.04,
    star_stat: -1.04,
    small_p: [0.6344, 1.2378, 3.2496e-2],
    large_p: [0.4797, 0.93557, -0.06999, 0.033066],
};

const SURFACE_C_1: PValueSurface = PValueSurface {
    max_stat: 2.74,
    min_stat: -18.83,
    star_stat: -1.61,
    small_p: [2.1659, 1.4412, 3.8269e-2],
    large_p: [1.7339, 0.93202, -0.12745, -0.010368],
};

const SURFACE_C_2: PValueSurface = PValueSurface {
    max_stat: 0.92,
    min_stat: -18.86,
    star_stat: -2.62,
    small_p: [2.92, 1.5012, 3.9796e-2],
    large_p: [2.1945, 0.64695, -0.29198, -0.042377],
};

// Rows are 1%, 5%, 10%; columns are the 1, 1/T, 1/T^2, 1/T^3 coefficients.
const CRIT_N_1: [[f64; 4]; 3] = [
    [-2.56574, -2.2358, -3.627, 0.0],
    [-1.94100, -0.2686, -3.365, 31.223],
    [-1.61682, 0.2656, -2.714, 25.364],
];

const CRIT_C_1: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

const CRIT_C_2: [[f64; 4]; 3] = [
    [-3.89644, -10.9519, -33.527, 0.0],
    [-3.33613, -6.1101, -6.823, 0.0],
    [-3.04445, -4.2412, -2.720, 0.0],
];

fn surface(regression: Deterministic, n_vars: usize) -> Result<&'static PValueSurface, AnalysisError> {
    match (regression, n_vars) {
        (Deterministic::None, 1) => Ok(&SURFACE_N_1),
        (Deterministic::Constant, 1) => Ok(&SURFACE_C_1),
        (Deterministic::Constant, 2) => Ok(&SURFACE_C_2),
        _ => Err(AnalysisError::UnsupportedTableEntry {
            regression: regression.to_string(),
            n_vars,
        }),
    }
}

fn crit_table(regression: Deterministic, n_vars: usize) -> Result<&'static [[f64; 4]; 3], AnalysisError> {
    match (regression, n_vars) {
        (Deterministic::None, 1) => Ok(&CRIT_N_1),
        (Deterministic::Constant, 1) => Ok(&CRIT_C_1),
        (Deterministic::Constant, 2) => Ok(&CRIT_C_2),
        _ => Err(AnalysisError::UnsupportedTableEntry {
            regression: regression.to_string(),
            n_vars,
        }),
    }
}

fn polyval(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Approximate asymptotic p-value of a Dickey-Fuller type statistic.
///
/// Statistics beyond the tabulated range saturate at 0 or 1; `-inf` maps to 0.
pub fn mackinnon_p_value(
    statistic: f64,
    regression: Deterministic,
    n_vars: usize,
) -> Result<f64, AnalysisError> {
    let table = surface(regression, n_vars)?;
    if statistic.is_nan() {
        return Err(AnalysisError::NonFiniteLikelihood);
    }
    if statistic > table.max_stat {
        return Ok(1.0);
    }
    if statistic < table.min_stat {
        return Ok(0.0);
    }
    let z = if statistic <= table.star_stat {
        polyval(&table.small_p, statistic)
    } else {
        polyval(&table.large_p, statistic)
    };
    Ok(normal_cdf(z))
}

/// Finite-sample critical values at 1%, 5% and 10%.
pub fn mackinnon_critical_values(
    regression: Deterministic,
    n_vars: usize,
    nobs: usize,
) -> Result<CriticalValues, AnalysisError> {
    let table = crit_table(regression, n_vars)?;
    let inv = 1.0 / nobs.max(1) as f64;
    let eval = |row: &[f64; 4]| row[0] + row[1] * inv + row[2] * inv.powi(2) + row[3] * inv.powi(3);
    Ok(CriticalValues {
        one_pct: eval(&table[0]),
        five_pct: eval(&table[1]),
        ten_pct: eval(&table[2]),
    })
}

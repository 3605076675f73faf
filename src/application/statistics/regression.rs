//! Ordinary least squares for the small regressions behind the unit-root tests.

use crate::domain::errors::AnalysisError;
use std::f64::consts::PI;

/// Fitted OLS regression.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub params: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub resid: Vec<f64>,
    pub ssr: f64,
    pub nobs: usize,
    /// Centered when the design has a constant column, uncentered otherwise.
    pub rsquared: f64,
}

impl OlsFit {
    pub fn n_params(&self) -> usize {
        self.params.len()
    }

    pub fn t_value(&self, index: usize) -> f64 {
        self.params[index] / self.std_errors[index]
    }

    /// Gaussian log-likelihood evaluated at the OLS estimates.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.n_params() as f64
    }
}

/// Regresses `y` on the columns of `design` (row-major, one row per observation).
///
/// `has_constant` only affects how R² is centered.
pub fn ols(y: &[f64], design: &[Vec<f64>], has_constant: bool) -> Result<OlsFit, AnalysisError> {
    let nobs = y.len();
    if design.len() != nobs {
        return Err(AnalysisError::LengthMismatch {
            left: nobs,
            right: design.len(),
        });
    }
    let k = design.first().map_or(0, |row| row.len());
    if k == 0 || nobs <= k {
        return Err(AnalysisError::InsufficientObservations {
            required: k + 1,
            actual: nobs,
        });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yi) in design.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in 0..=i {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
    }

    let chol = cholesky(&xtx)?;
    let params = cholesky_solve(&chol, &xty);

    let resid: Vec<f64> = design
        .iter()
        .zip(y)
        .map(|(row, &yi)| yi - row.iter().zip(&params).map(|(x, b)| x * b).sum::<f64>())
        .collect();
    let ssr: f64 = resid.iter().map(|e| e * e).sum();

    let sigma2 = ssr / (nobs - k) as f64;
    let inverse = cholesky_inverse(&chol);
    let std_errors = (0..k).map(|i| (sigma2 * inverse[i][i]).sqrt()).collect();

    let tss = if has_constant {
        let mean = y.iter().sum::<f64>() / nobs as f64;
        y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
    } else {
        y.iter().map(|v| v * v).sum::<f64>()
    };
    let rsquared = if tss > 0.0 { 1.0 - ssr / tss } else { 0.0 };

    Ok(OlsFit {
        params,
        std_errors,
        resid,
        ssr,
        nobs,
        rsquared,
    })
}

/// Lower-triangular Cholesky factor of a symmetric positive definite matrix.
pub fn cholesky(a: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, AnalysisError> {
    let n = a.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|m| l[i][m] * l[j][m]).sum();
            if i == j {
                let pivot = a[i][i] - sum;
                if !pivot.is_finite() || pivot <= scale * 1e-13 {
                    return Err(AnalysisError::SingularMatrix);
                }
                l[i][i] = pivot.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }
    Ok(l)
}

fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = l.len();
    // Forward: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|m| l[i][m] * z[m]).sum();
        z[i] = (b[i] - sum) / l[i][i];
    }
    // Backward: L' x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|m| l[m][i] * x[m]).sum();
        x[i] = (z[i] - sum) / l[i][i];
    }
    x
}

/// Inverse of `L L'` given its Cholesky factor.
pub fn cholesky_inverse(l: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = l.len();
    let mut inverse = vec![vec![0.0; n]; n];
    for col in 0..n {
        let mut unit = vec![0.0; n];
        unit[col] = 1.0;
        let solved = cholesky_solve(l, &unit);
        for row in 0..n {
            inverse[row][col] = solved[row];
        }
    }
    inverse
}

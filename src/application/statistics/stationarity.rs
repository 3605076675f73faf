//! Augmented Dickey-Fuller unit-root test.
//!
//! The regression is
//!
//! ```text
//! Δx_t = [c] + γ x_{t-1} + Σ_{i=1..k} β_i Δx_{t-i} + e_t
//! ```
//!
//! and the statistic is the t-value of γ. The lag count `k` is chosen by AIC
//! over `0..=maxlag` on a common sample, then the chosen regression is
//! re-estimated on every observation it can use.

use crate::application::statistics::mackinnon::{mackinnon_critical_values, mackinnon_p_value};
use crate::application::statistics::regression::{OlsFit, ols};
use crate::domain::diagnostics::{AdfResult, Deterministic};
use crate::domain::errors::AnalysisError;
use crate::domain::series::difference;
use tracing::debug;

/// Default significance level for the stationarity decision.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Lag selection for the ADF regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagSelection {
    /// Pick the lag count in `0..=maxlag` minimising AIC.
    Aic,
    /// Use exactly `maxlag` lagged differences.
    Fixed,
}

/// Options for [`adf_test_with`].
#[derive(Debug, Clone, Copy)]
pub struct AdfOptions {
    pub regression: Deterministic,
    /// Upper bound on lagged differences; `None` uses `ceil(12 (n/100)^(1/4))`.
    pub max_lag: Option<usize>,
    pub lag_selection: LagSelection,
    pub significance: f64,
}

impl Default for AdfOptions {
    fn default() -> Self {
        Self {
            regression: Deterministic::Constant,
            max_lag: None,
            lag_selection: LagSelection::Aic,
            significance: DEFAULT_SIGNIFICANCE,
        }
    }
}

/// ADF test with a constant and AIC lag selection.
pub fn adf_test(series: &[f64], significance: f64) -> Result<AdfResult, AnalysisError> {
    adf_test_with(
        series,
        AdfOptions {
            significance,
            ..AdfOptions::default()
        },
    )
}

/// ADF test with explicit options.
pub fn adf_test_with(series: &[f64], options: AdfOptions) -> Result<AdfResult, AnalysisError> {
    let n = series.len();
    let ntrend = options.regression.count();

    if n < 3 {
        return Err(AnalysisError::InsufficientObservations {
            required: 3,
            actual: n,
        });
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidParameter {
            name: "series".to_string(),
            reason: "contains NaN or infinite values".to_string(),
        });
    }
    let (min, max) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if max == min {
        return Err(AnalysisError::ConstantSeries);
    }

    // maxlag must leave room for the deterministic terms and the level
    let cap = (n / 2) as isize - ntrend as isize - 1;
    if cap < 0 {
        return Err(AnalysisError::InsufficientObservations {
            required: 2 * (ntrend + 1),
            actual: n,
        });
    }
    let default_max = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let max_lag = options.max_lag.unwrap_or(default_max).min(cap as usize);

    let xdiff = difference(series, 1);

    let (used_lag, ic_best) = match options.lag_selection {
        LagSelection::Fixed => (max_lag, f64::NAN),
        LagSelection::Aic => select_lag_by_aic(series, &xdiff, max_lag, options.regression)?,
    };

    let (y, design) = build_regression(series, &xdiff, used_lag, used_lag, options.regression);
    let nobs = y.len();
    let fit = ols(&y, &design, options.regression != Deterministic::None)?;
    let statistic = fit.t_value(0);
    if !statistic.is_finite() {
        return Err(AnalysisError::SingularMatrix);
    }

    let p_value = mackinnon_p_value(statistic, options.regression, 1)?;
    let critical_values = mackinnon_critical_values(options.regression, 1, nobs)?;

    debug!(
        "ADF: stat={:.4} p={:.4} lag={} nobs={}",
        statistic, p_value, used_lag, nobs
    );

    Ok(AdfResult {
        statistic,
        p_value,
        used_lag,
        nobs,
        critical_values,
        ic_best: if ic_best.is_nan() { fit.aic() } else { ic_best },
        is_stationary: p_value < options.significance,
    })
}

/// Returns the lag count with the smallest AIC and that AIC.
///
/// All candidate regressions share the sample implied by `max_lag` so their
/// likelihoods are comparable. Ties keep the shorter lag; lags too long for
/// the common sample are skipped.
fn select_lag_by_aic(
    series: &[f64],
    xdiff: &[f64],
    max_lag: usize,
    regression: Deterministic,
) -> Result<(usize, f64), AnalysisError> {
    let mut best: Option<(usize, f64)> = None;
    for lags in 0..=max_lag {
        let (y, design) = build_regression(series, xdiff, max_lag, lags, regression);
        let fit: OlsFit = match ols(&y, &design, regression != Deterministic::None) {
            Ok(fit) => fit,
            // Lags that leave no residual degrees of freedom are not candidates
            Err(AnalysisError::SingularMatrix | AnalysisError::InsufficientObservations { .. }) => {
                continue;
            }
            Err(e) => return Err(e),
        };
        let aic = fit.aic();
        if !aic.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, best_aic)| aic < best_aic) {
            best = Some((lags, aic));
        }
    }
    best.ok_or(AnalysisError::SingularMatrix)
}

/// Builds `(Δx_t, [x_{t-1}, Δx_{t-1}..Δx_{t-lags}, const?])` for `t` starting
/// after `offset` lagged differences.
///
/// `offset` fixes the sample start; `lags <= offset` picks how many lagged
/// differences enter the design.
fn build_regression(
    series: &[f64],
    xdiff: &[f64],
    offset: usize,
    lags: usize,
    regression: Deterministic,
) -> (Vec<f64>, Vec<Vec<f64>>) {
    let nobs = xdiff.len() - offset;
    let mut y = Vec::with_capacity(nobs);
    let mut design = Vec::with_capacity(nobs);
    for t in 0..nobs {
        let idx = offset + t;
        y.push(xdiff[idx]);
        let mut row = Vec::with_capacity(lags + 2);
        row.push(series[idx]);
        for i in 1..=lags {
            row.push(xdiff[idx - i]);
        }
        if regression == Deterministic::Constant {
            row.push(1.0);
        }
        design.push(row);
    }
    (y, design)
}

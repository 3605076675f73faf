//! Result types produced by the statistical steps.
//!
//! All of these are plain values: transient, process-local, and serialisable
//! for the JSON report.

use serde::Serialize;
use std::fmt;

/// Deterministic terms included in a unit-root regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Deterministic {
    /// No constant, no trend.
    None,
    /// Constant only.
    Constant,
}

impl Deterministic {
    /// Number of deterministic regressors.
    pub fn count(self) -> usize {
        match self {
            Deterministic::None => 0,
            Deterministic::Constant => 1,
        }
    }
}

impl fmt::Display for Deterministic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deterministic::None => write!(f, "n"),
            Deterministic::Constant => write!(f, "c"),
        }
    }
}

/// Critical values at the 1%, 5% and 10% levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Outcome of an Augmented Dickey-Fuller test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Number of lagged differences in the chosen regression.
    pub used_lag: usize,
    /// Observations used by the chosen regression.
    pub nobs: usize,
    pub critical_values: CriticalValues,
    /// Best information criterion found during lag selection.
    pub ic_best: f64,
    pub is_stationary: bool,
}

/// Autocorrelation and partial autocorrelation up to `nlags`.
///
/// Vectors are indexed by lag and include lag 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlogram {
    pub nlags: usize,
    pub nobs: usize,
    pub acf: Vec<f64>,
    pub pacf: Vec<f64>,
    /// Half-width of the confidence band around zero, per lag (Bartlett).
    pub acf_band: Vec<f64>,
    pub pacf_band: Vec<f64>,
}

/// Engle-Granger cointegration test between two series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CointegrationResult {
    pub first: String,
    pub second: String,
    pub statistic: f64,
    pub p_value: f64,
    pub critical_values: CriticalValues,
    pub is_cointegrated: bool,
}

/// ARIMA(p, d, q) orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// One estimated parameter with its inference statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientEstimate {
    pub name: String,
    pub value: f64,
    pub std_error: f64,
    pub z: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Estimation summary of a fitted ARIMA model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArimaSummary {
    pub order: ArimaOrder,
    pub coefficients: Vec<CoefficientEstimate>,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub hqic: f64,
    pub nobs: usize,
    pub converged: bool,
    pub iterations: usize,
}

/// Point forecasts with symmetric confidence bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub horizon: usize,
    pub confidence_level: f64,
    pub mean: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

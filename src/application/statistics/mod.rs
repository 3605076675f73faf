//! Time-series statistics: unit roots, correlograms, cointegration, ARIMA.
//!
//! Everything here is a pure function of its inputs. Distribution tails come
//! from `statrs`; the estimators follow their textbook definitions.

pub mod arima;
pub mod cointegration;
pub mod correlogram;
pub mod mackinnon;
pub mod optimizer;
pub mod regression;
pub mod stationarity;

use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::SQRT_2;

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal quantile for `p` in (0, 1).
pub fn normal_quantile(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Two-sided critical value for a confidence level, e.g. 1.96 for 0.95.
pub fn two_sided_z(confidence_level: f64) -> f64 {
    normal_quantile(1.0 - (1.0 - confidence_level) / 2.0)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

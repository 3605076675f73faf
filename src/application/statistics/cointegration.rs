//! Engle-Granger two-step cointegration test.
//!
//! Step one regresses the first series on the second plus a constant; step
//! two runs an ADF test without deterministic terms on the residuals. The
//! statistic is judged against the two-variable MacKinnon surface.

use crate::application::statistics::mackinnon::{mackinnon_critical_values, mackinnon_p_value};
use crate::application::statistics::regression::ols;
use crate::application::statistics::stationarity::{AdfOptions, adf_test_with};
use crate::domain::diagnostics::{CointegrationResult, Deterministic};
use crate::domain::errors::AnalysisError;
use tracing::debug;

/// Fewest paired observations accepted.
pub const MIN_COINTEGRATION_OBSERVATIONS: usize = 5;

/// Tests whether `first` and `second` are cointegrated at `significance`.
///
/// The series must be aligned and of equal length. A perfect linear fit
/// yields a statistic of `-inf` and a p-value of 0.
pub fn engle_granger(
    first_name: &str,
    first: &[f64],
    second_name: &str,
    second: &[f64],
    significance: f64,
) -> Result<CointegrationResult, AnalysisError> {
    if first.len() != second.len() {
        return Err(AnalysisError::LengthMismatch {
            left: first.len(),
            right: second.len(),
        });
    }
    let nobs = first.len();
    if nobs < MIN_COINTEGRATION_OBSERVATIONS {
        return Err(AnalysisError::InsufficientObservations {
            required: MIN_COINTEGRATION_OBSERVATIONS,
            actual: nobs,
        });
    }

    let design: Vec<Vec<f64>> = second.iter().map(|&x| vec![x, 1.0]).collect();
    let cointegrating = ols(first, &design, true)?;

    let statistic = if cointegrating.rsquared < 1.0 - 100.0 * f64::EPSILON.sqrt() {
        let residual_test = adf_test_with(
            &cointegrating.resid,
            AdfOptions {
                regression: Deterministic::None,
                significance,
                ..AdfOptions::default()
            },
        )?;
        residual_test.statistic
    } else {
        f64::NEG_INFINITY
    };

    let p_value = mackinnon_p_value(statistic, Deterministic::Constant, 2)?;
    let critical_values = mackinnon_critical_values(Deterministic::Constant, 2, nobs - 1)?;

    debug!(
        "Engle-Granger {} ~ {}: beta={:.4} stat={:.4} p={:.4}",
        first_name, second_name, cointegrating.params[0], statistic, p_value
    );

    Ok(CointegrationResult {
        first: first_name.to_string(),
        second: second_name.to_string(),
        statistic,
        p_value,
        critical_values,
        is_cointegrated: p_value < significance,
    })
}

//! Sample ACF and PACF with their confidence bands.

use crate::application::statistics::{mean, two_sided_z};
use crate::domain::diagnostics::Correlogram;
use crate::domain::errors::AnalysisError;

/// Fewest observations for which a correlogram is drawn.
pub const MIN_CORRELOGRAM_OBSERVATIONS: usize = 4;

/// Number of lags to show: `min(max_lags, n/2 - 1)`, or `None` when the
/// series is too short for any.
pub fn correlogram_lags(n_obs: usize, max_lags: usize) -> Option<usize> {
    if n_obs < MIN_CORRELOGRAM_OBSERVATIONS {
        return None;
    }
    let nlags = max_lags.min((n_obs / 2).saturating_sub(1));
    (nlags >= 1).then_some(nlags)
}

/// Biased (divide-by-n) sample autocorrelations for lags `0..=nlags`.
pub fn acf(series: &[f64], nlags: usize) -> Result<Vec<f64>, AnalysisError> {
    let n = series.len();
    if n <= nlags {
        return Err(AnalysisError::InsufficientObservations {
            required: nlags + 1,
            actual: n,
        });
    }
    let m = mean(series);
    let centered: Vec<f64> = series.iter().map(|v| v - m).collect();
    let denom: f64 = centered.iter().map(|v| v * v).sum();
    if denom <= 0.0 {
        return Err(AnalysisError::ConstantSeries);
    }
    Ok((0..=nlags)
        .map(|k| {
            centered[k..]
                .iter()
                .zip(&centered[..n - k])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / denom
        })
        .collect())
}

/// Partial autocorrelations from Yule-Walker equations solved by
/// Levinson-Durbin on the biased autocorrelations.
pub fn pacf(series: &[f64], nlags: usize) -> Result<Vec<f64>, AnalysisError> {
    let r = acf(series, nlags)?;
    let mut out = vec![1.0];
    if nlags == 0 {
        return Ok(out);
    }

    let mut phi = vec![r[1]];
    out.push(r[1]);
    for k in 2..=nlags {
        let num = r[k] - (1..k).map(|j| phi[j - 1] * r[k - j]).sum::<f64>();
        let den = 1.0 - (1..k).map(|j| phi[j - 1] * r[j]).sum::<f64>();
        if den.abs() < 1e-12 {
            return Err(AnalysisError::SingularMatrix);
        }
        let phi_kk = num / den;
        let mut next: Vec<f64> = (1..k).map(|j| phi[j - 1] - phi_kk * phi[k - j - 1]).collect();
        next.push(phi_kk);
        phi = next;
        out.push(phi_kk);
    }
    Ok(out)
}

/// Bartlett half-widths for the ACF: zero at lag 0, `z/sqrt(n)` at lag 1,
/// then `z * sqrt((1 + 2 Σ_{j<k} r_j²) / n)`.
pub fn bartlett_band(acf: &[f64], nobs: usize, confidence_level: f64) -> Vec<f64> {
    let z = two_sided_z(confidence_level);
    let n = nobs as f64;
    let mut cumulative = 0.0;
    acf.iter()
        .enumerate()
        .map(|(k, _)| match k {
            0 => 0.0,
            1 => z / n.sqrt(),
            _ => {
                cumulative += acf[k - 1].powi(2);
                z * ((1.0 + 2.0 * cumulative) / n).sqrt()
            }
        })
        .collect()
}

/// Computes the full correlogram for `nlags` lags.
pub fn correlogram(
    series: &[f64],
    nlags: usize,
    confidence_level: f64,
) -> Result<Correlogram, AnalysisError> {
    let nobs = series.len();
    if nlags >= nobs / 2 {
        return Err(AnalysisError::InsufficientObservations {
            required: 2 * (nlags + 1),
            actual: nobs,
        });
    }
    let acf_values = acf(series, nlags)?;
    let pacf_values = pacf(series, nlags)?;
    let acf_band = bartlett_band(&acf_values, nobs, confidence_level);
    let z = two_sided_z(confidence_level);
    let pacf_band = (0..=nlags)
        .map(|k| if k == 0 { 0.0 } else { z / (nobs as f64).sqrt() })
        .collect();

    Ok(Correlogram {
        nlags,
        nobs,
        acf: acf_values,
        pacf: pacf_values,
        acf_band,
        pacf_band,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlogram_lags() {
        assert_eq!(correlogram_lags(3, 20), None);
        assert_eq!(correlogram_lags(4, 20), Some(1));
        assert_eq!(correlogram_lags(5, 20), Some(1));
        assert_eq!(correlogram_lags(10, 20), Some(4));
        assert_eq!(correlogram_lags(1000, 20), Some(20));
    }

    #[test]
    fn test_acf_lag_zero_is_one() {
        let series = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0];
        let values = acf(&series, 2).unwrap();
        assert_eq!(values.len(), 3);
        assert!((values[0] - 1.0).abs() < 1e-12);
        assert!(values.iter().all(|v| v.abs() <= 1.0 + 1e-12));
    }

    #[test]
    fn test_acf_alternating_series() {
        let series: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let values = acf(&series, 2).unwrap();
        assert!((values[1] + 0.99).abs() < 1e-9);
        assert!((values[2] - 0.98).abs() < 1e-9);
    }

    #[test]
    fn test_pacf_of_ar1_cuts_off() {
        // x_t = 0.8 x_{t-1}, started away from zero: the lag-1 PACF dominates
        let mut x = 1.0;
        let mut series = Vec::new();
        let mut s: u64 = 42;
        for _ in 0..2000 {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
            let e = ((s >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
            x = 0.8 * x + e;
            series.push(x);
        }
        let values = pacf(&series, 5).unwrap();
        assert!((values[1] - 0.8).abs() < 0.05, "pacf[1] = {}", values[1]);
        for v in &values[2..] {
            assert!(v.abs() < 0.1, "pacf = {:?}", values);
        }
    }

    #[test]
    fn test_pacf_lag_one_equals_acf_lag_one() {
        let series = [2.0, 4.0, 3.0, 6.0, 5.0, 7.0, 6.5, 8.0];
        let a = acf(&series, 3).unwrap();
        let p = pacf(&series, 3).unwrap();
        assert!((a[1] - p[1]).abs() < 1e-12);
    }

    #[test]
    fn test_bartlett_band_widens() {
        let acf_values = [1.0, 0.5, 0.3, 0.1];
        let band = bartlett_band(&acf_values, 100, 0.95);
        assert_eq!(band[0], 0.0);
        assert!((band[1] - 0.196).abs() < 1e-3);
        assert!(band[2] > band[1]);
        assert!(band[3] > band[2]);
    }

    #[test]
    fn test_constant_series_is_rejected() {
        assert_eq!(acf(&[3.0; 10], 2).unwrap_err(), AnalysisError::ConstantSeries);
    }
}

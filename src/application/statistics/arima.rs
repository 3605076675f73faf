//! ARIMA(1,d,1) by exact Gaussian maximum likelihood.
//!
//! The d-times differenced series `w_t` follows
//!
//! ```text
//! (w_t - μ) = φ (w_{t-1} - μ) + ε_t + θ ε_{t-1},   ε_t ~ N(0, σ²)
//! ```
//!
//! with `μ` estimated only when `d = 0`. The likelihood is evaluated with a
//! Kalman filter on the state `[w_t - μ, θ ε_t]`, initialised at its
//! stationary covariance; σ² is concentrated out while optimising and then
//! reported at its closed-form estimate. `φ = tanh(u)` and `θ = tanh(v)` keep
//! the search inside the stationary and invertible region.

use crate::application::statistics::optimizer::{Minimum, NelderMead, NelderMeadConfig};
use crate::application::statistics::regression::{cholesky, cholesky_inverse};
use crate::application::statistics::{mean, normal_cdf, two_sided_z};
use crate::domain::diagnostics::{ArimaOrder, ArimaSummary, CoefficientEstimate, Forecast};
use crate::domain::errors::AnalysisError;
use crate::domain::series::difference;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Fewest observations accepted for fitting.
pub const MIN_MODEL_OBSERVATIONS: usize = 5;

/// Highest supported differencing order.
pub const MAX_DIFFERENCING: usize = 2;

const BOUNDARY: f64 = 0.9999;

/// Kalman filter output for one parameter set (σ² = 1 units).
struct FilterOutput {
    sum_log_f: f64,
    sum_sq: f64,
    n: usize,
    /// Per-observation `(ln f_t, v_t² / f_t)`.
    terms: Vec<(f64, f64)>,
    /// One-step prediction of `w_{n+1} - μ`.
    next_prediction: f64,
}

impl FilterOutput {
    fn sigma2(&self) -> f64 {
        self.sum_sq / self.n as f64
    }

    fn concentrated_llf(&self) -> f64 {
        let n = self.n as f64;
        -n / 2.0 * ((2.0 * PI).ln() + 1.0 + self.sigma2().ln()) - 0.5 * self.sum_log_f
    }

    fn llf(&self, sigma2: f64) -> f64 {
        let n = self.n as f64;
        -n / 2.0 * (2.0 * PI * sigma2).ln() - 0.5 * self.sum_log_f - self.sum_sq / (2.0 * sigma2)
    }

    /// Log-likelihood contribution of each observation; sums to `llf`.
    fn llf_terms(&self, sigma2: f64) -> Vec<f64> {
        let base = (2.0 * PI * sigma2).ln();
        self.terms
            .iter()
            .map(|(log_f, sq)| -0.5 * (base + log_f + sq / sigma2))
            .collect()
    }
}

fn arma11_filter(z: &[f64], phi: f64, theta: f64) -> Result<FilterOutput, AnalysisError> {
    if !phi.is_finite() || !theta.is_finite() || phi.abs() >= 1.0 {
        return Err(AnalysisError::NonFiniteLikelihood);
    }
    let theta2 = theta * theta;

    // Stationary covariance of [w_t, θ ε_t]
    let mut p00 = (1.0 + 2.0 * phi * theta + theta2) / (1.0 - phi * phi);
    let mut a0 = 0.0;
    let mut a1 = 0.0;
    let mut sum_log_f = 0.0;
    let mut sum_sq = 0.0;
    let mut next_prediction = 0.0;
    let mut terms = Vec::with_capacity(z.len());

    for &obs in z {
        let f = p00;
        if !(f > 0.0 && f.is_finite()) {
            return Err(AnalysisError::NonFiniteLikelihood);
        }
        let v = obs - a0;
        sum_log_f += f.ln();
        sum_sq += v * v / f;
        terms.push((f.ln(), v * v / f));

        // Filtered state: first component is observed exactly
        let filtered0 = obs;
        let filtered1 = a1 + theta / f * v;
        let filtered_p11 = theta2 - theta2 / f;

        // Predict
        a0 = phi * filtered0 + filtered1;
        a1 = 0.0;
        p00 = filtered_p11 + 1.0;
        next_prediction = a0;
    }

    if !sum_sq.is_finite() || !sum_log_f.is_finite() {
        return Err(AnalysisError::NonFiniteLikelihood);
    }

    Ok(FilterOutput {
        sum_log_f,
        sum_sq,
        n: z.len(),
        terms,
        next_prediction,
    })
}

/// A fitted ARIMA(1,d,1) model able to forecast.
#[derive(Debug, Clone)]
pub struct FittedArima {
    summary: ArimaSummary,
    mu: f64,
    phi: f64,
    theta: f64,
    sigma2: f64,
    next_prediction: f64,
    /// Last value of each difference level `0..d` of the original series.
    level_tails: Vec<f64>,
}

impl FittedArima {
    pub fn summary(&self) -> &ArimaSummary {
        &self.summary
    }

    pub fn order(&self) -> ArimaOrder {
        self.summary.order
    }

    /// Mean of the differenced series (zero when `d > 0`).
    pub fn constant(&self) -> f64 {
        self.mu
    }

    pub fn ar(&self) -> f64 {
        self.phi
    }

    pub fn ma(&self) -> f64 {
        self.theta
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// MA(∞) weights of the integrated model, `ψ_0 .. ψ_{steps-1}`.
    fn psi_weights(&self, steps: usize) -> Vec<f64> {
        // (1 - φB)(1 - B)^d
        let mut poly = vec![1.0, -self.phi];
        for _ in 0..self.summary.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let ar_star: Vec<f64> = poly.iter().skip(1).map(|c| -c).collect();

        let mut psi = vec![1.0];
        for j in 1..steps {
            let ma = if j == 1 { self.theta } else { 0.0 };
            let ar: f64 = ar_star
                .iter()
                .enumerate()
                .take(j)
                .map(|(i, coef)| coef * psi[j - 1 - i])
                .sum();
            psi.push(ma + ar);
        }
        psi
    }

    /// Point forecasts and confidence bounds for the next `steps` observations.
    pub fn forecast(&self, steps: usize, confidence_level: f64) -> Result<Forecast, AnalysisError> {
        if steps == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "steps".to_string(),
                reason: "forecast horizon must be at least 1".to_string(),
            });
        }
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "confidence_level".to_string(),
                reason: format!("must be in (0, 1), got {}", confidence_level),
            });
        }

        let mut tails = self.level_tails.clone();
        let mut deviation = self.next_prediction;
        let mut mean_path = Vec::with_capacity(steps);
        for _ in 0..steps {
            let mut value = self.mu + deviation;
            for tail in tails.iter_mut().rev() {
                value += *tail;
                *tail = value;
            }
            mean_path.push(value);
            deviation *= self.phi;
        }

        let z = two_sided_z(confidence_level);
        let mut cumulative = 0.0;
        let std_errors: Vec<f64> = self
            .psi_weights(steps)
            .iter()
            .map(|psi| {
                cumulative += psi * psi;
                (self.sigma2 * cumulative).sqrt()
            })
            .collect();

        let lower = mean_path.iter().zip(&std_errors).map(|(m, s)| m - z * s).collect();
        let upper = mean_path.iter().zip(&std_errors).map(|(m, s)| m + z * s).collect();

        Ok(Forecast {
            horizon: steps,
            confidence_level,
            mean: mean_path,
            std_errors,
            lower,
            upper,
        })
    }
}

/// Maps unconstrained search coordinates to (μ, φ, θ).
struct Parameterisation {
    include_mean: bool,
    location: f64,
    scale: f64,
}

impl Parameterisation {
    fn natural(&self, x: &[f64]) -> (f64, f64, f64) {
        if self.include_mean {
            (self.location + self.scale * x[0], x[1].tanh(), x[2].tanh())
        } else {
            (0.0, x[0].tanh(), x[1].tanh())
        }
    }

    fn search(&self, mu: f64, phi: f64, theta: f64) -> Vec<f64> {
        let u = phi.clamp(-0.99, 0.99).atanh();
        let v = theta.clamp(-0.99, 0.99).atanh();
        if self.include_mean {
            vec![(mu - self.location) / self.scale, u, v]
        } else {
            vec![u, v]
        }
    }
}

/// Fits ARIMA(1,d,1) to `series` (undifferenced).
pub fn fit_arima(series: &[f64], d: usize) -> Result<FittedArima, AnalysisError> {
    fit_arima_with(series, d, NelderMeadConfig::default())
}

pub fn fit_arima_with(
    series: &[f64],
    d: usize,
    optimizer_config: NelderMeadConfig,
) -> Result<FittedArima, AnalysisError> {
    let order = ArimaOrder { p: 1, d, q: 1 };
    if d > MAX_DIFFERENCING {
        return Err(AnalysisError::InvalidParameter {
            name: "d".to_string(),
            reason: format!("differencing order must be <= {}", MAX_DIFFERENCING),
        });
    }
    if series.len() < MIN_MODEL_OBSERVATIONS {
        return Err(AnalysisError::InsufficientObservations {
            required: MIN_MODEL_OBSERVATIONS,
            actual: series.len(),
        });
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidParameter {
            name: "series".to_string(),
            reason: "contains NaN or infinite values".to_string(),
        });
    }

    let w = difference(series, d);
    if w.len() < 3 {
        return Err(AnalysisError::InsufficientObservations {
            required: d + 3,
            actual: series.len(),
        });
    }
    let w_mean = mean(&w);
    let w_var = w.iter().map(|v| (v - w_mean).powi(2)).sum::<f64>() / w.len() as f64;
    if w_var <= f64::EPSILON * w_mean.abs().max(1.0) {
        return Err(AnalysisError::ConstantSeries);
    }

    let include_mean = d == 0;
    let params = Parameterisation {
        include_mean,
        location: if include_mean { w_mean } else { 0.0 },
        scale: w_var.sqrt(),
    };

    let objective = |x: &[f64]| -> f64 {
        let (mu, phi, theta) = params.natural(x);
        let z: Vec<f64> = w.iter().map(|v| v - mu).collect();
        match arma11_filter(&z, phi, theta) {
            Ok(out) => -out.concentrated_llf() / out.n as f64,
            Err(_) => f64::INFINITY,
        }
    };

    // Coarse grid for the starting point, then Nelder-Mead with restarts
    let mut start = params.search(w_mean, 0.0, 0.0);
    let mut start_value = objective(&start);
    for phi in [-0.5, 0.0, 0.5] {
        for theta in [-0.5, 0.0, 0.5] {
            let candidate = params.search(w_mean, phi, theta);
            let value = objective(&candidate);
            if value < start_value {
                start = candidate;
                start_value = value;
            }
        }
    }

    let optimizer = NelderMead::new(optimizer_config);
    let steps: Vec<f64> = vec![0.2; start.len()];
    let mut best: Minimum = optimizer.minimize(objective, &start, &steps);
    let mut iterations = best.iterations;
    for _ in 0..2 {
        let restart = optimizer.minimize(objective, &best.x, &steps);
        iterations += restart.iterations;
        let improved = restart.value < best.value - 1e-10;
        if restart.value <= best.value {
            best = restart;
        }
        if !improved {
            break;
        }
    }
    if !best.value.is_finite() {
        return Err(AnalysisError::NonFiniteLikelihood);
    }
    if !best.converged {
        warn!("ARIMA optimiser stopped after {} iterations without converging", iterations);
    }

    let (mu, mut phi, mut theta) = params.natural(&best.x);
    phi = phi.clamp(-BOUNDARY, BOUNDARY);
    theta = theta.clamp(-BOUNDARY, BOUNDARY);
    let z: Vec<f64> = w.iter().map(|v| v - mu).collect();
    let output = arma11_filter(&z, phi, theta)?;
    let sigma2 = output.sigma2();
    let log_likelihood = output.llf(sigma2);

    debug!(
        "ARIMA fit: mu={:.6} phi={:.4} theta={:.4} sigma2={:.6} llf={:.3}",
        mu, phi, theta, sigma2, log_likelihood
    );

    let mut names = Vec::new();
    let mut estimates = Vec::new();
    if include_mean {
        names.push("const");
        estimates.push(mu);
    }
    names.extend(["ar.L1", "ma.L1", "sigma2"]);
    estimates.extend([phi, theta, sigma2]);

    let std_errors = standard_errors(&w, include_mean, &estimates);
    let z_crit = two_sided_z(0.95);
    let coefficients = names
        .iter()
        .zip(&estimates)
        .zip(&std_errors)
        .map(|((name, &value), &se)| {
            let z_stat = value / se;
            CoefficientEstimate {
                name: name.to_string(),
                value,
                std_error: se,
                z: z_stat,
                p_value: 2.0 * (1.0 - normal_cdf(z_stat.abs())),
                ci_lower: value - z_crit * se,
                ci_upper: value + z_crit * se,
            }
        })
        .collect();

    let k = estimates.len() as f64;
    let nobs_effective = w.len() as f64;
    let summary = ArimaSummary {
        order,
        coefficients,
        log_likelihood,
        aic: -2.0 * log_likelihood + 2.0 * k,
        bic: -2.0 * log_likelihood + k * nobs_effective.ln(),
        hqic: -2.0 * log_likelihood + 2.0 * k * nobs_effective.ln().ln(),
        nobs: series.len(),
        converged: best.converged,
        iterations,
    };

    let level_tails = (0..d)
        .map(|k| *difference(series, k).last().unwrap_or(&0.0))
        .collect();

    Ok(FittedArima {
        summary,
        mu,
        phi,
        theta,
        sigma2,
        next_prediction: output.next_prediction,
        level_tails,
    })
}

/// Per-observation log-likelihoods in natural parameters `[μ?, φ, θ, σ²]`.
fn observation_log_likelihoods(w: &[f64], include_mean: bool, x: &[f64]) -> Option<Vec<f64>> {
    let (mu, rest) = if include_mean { (x[0], &x[1..]) } else { (0.0, x) };
    let (phi, theta, sigma2) = (rest[0], rest[1], rest[2]);
    if sigma2.is_nan() || sigma2 <= 0.0 {
        return None;
    }
    let z: Vec<f64> = w.iter().map(|v| v - mu).collect();
    arma11_filter(&z, phi, theta).ok().map(|out| out.llf_terms(sigma2))
}

/// Standard errors from the outer product of per-observation scores
/// (OPG); NaN when that matrix is not positive definite.
fn standard_errors(w: &[f64], include_mean: bool, estimates: &[f64]) -> Vec<f64> {
    let k = estimates.len();
    let mut scores = vec![vec![0.0; k]; w.len()];
    for i in 0..k {
        let value = estimates[i];
        let is_coefficient = i + 1 < k && (!include_mean || i > 0);
        let step = if is_coefficient {
            // keep φ ± h and θ ± h inside (-1, 1)
            (1e-5_f64).min((1.0 - value.abs()) / 4.0).max(1e-8)
        } else {
            1e-5 * value.abs().max(1e-2)
        };
        let mut plus = estimates.to_vec();
        let mut minus = estimates.to_vec();
        plus[i] += step;
        minus[i] -= step;
        let (Some(up), Some(down)) = (
            observation_log_likelihoods(w, include_mean, &plus),
            observation_log_likelihoods(w, include_mean, &minus),
        ) else {
            return vec![f64::NAN; k];
        };
        for (t, (u, d)) in up.iter().zip(&down).enumerate() {
            scores[t][i] = (u - d) / (2.0 * step);
        }
    }

    let mut information = vec![vec![0.0; k]; k];
    for score in &scores {
        for i in 0..k {
            for j in 0..=i {
                information[i][j] += score[i] * score[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            information[j][i] = information[i][j];
        }
    }

    if information.iter().flatten().any(|v| !v.is_finite()) {
        return vec![f64::NAN; k];
    }
    match cholesky(&information) {
        Ok(l) => {
            let covariance = cholesky_inverse(&l);
            (0..k).map(|i| covariance[i][i].sqrt()).collect()
        }
        Err(_) => vec![f64::NAN; k],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 11) as f64 + 0.5) / (1u64 << 53) as f64
        };
        (0..n)
            .map(|_| {
                let u1 = next();
                let u2 = next();
                (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
            })
            .collect()
    }

    fn simulate_arma11(n: usize, mu: f64, phi: f64, theta: f64, seed: u64) -> Vec<f64> {
        let e = noise(n + 201, seed);
        let mut w = 0.0;
        let mut out = Vec::with_capacity(n);
        for t in 1..e.len() {
            w = phi * w + e[t] + theta * e[t - 1];
            if t > 200 {
                out.push(mu + w);
            }
        }
        out
    }

    #[test]
    fn test_filter_of_white_noise_matches_iid_likelihood() {
        let z = noise(50, 1);
        let out = arma11_filter(&z, 0.0, 0.0).unwrap();
        let iid: f64 = z
            .iter()
            .map(|v| -0.5 * (2.0 * PI).ln() - 0.5 * v * v)
            .sum();
        assert!((out.llf(1.0) - iid).abs() < 1e-9);
    }

    #[test]
    fn test_observation_terms_sum_to_likelihood() {
        let z = simulate_arma11(120, 0.0, 0.5, -0.3, 3);
        let out = arma11_filter(&z, 0.5, -0.3).unwrap();
        let terms = out.llf_terms(1.7);
        assert_eq!(terms.len(), 120);
        assert!((terms.iter().sum::<f64>() - out.llf(1.7)).abs() < 1e-8);
    }

    #[test]
    fn test_opg_standard_errors_match_asymptotic_values() {
        let (n, phi, theta) = (2000.0, 0.6, 0.3);
        let series = simulate_arma11(2000, 50.0, phi, theta, 17);
        let fit = fit_arima(&series, 0).unwrap();
        let se = |name: &str| {
            fit.summary()
                .coefficients
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.std_error)
                .unwrap()
        };

        // var(φ̂) = (1 + φθ)² (1 - φ²) / ((φ + θ)² n), var(σ̂²) = 2σ⁴ / n
        let phi_se = ((1.0_f64 + phi * theta).powi(2) * (1.0 - phi * phi)
            / ((phi + theta).powi(2) * n))
            .sqrt();
        let sigma2_se = (2.0 / n).sqrt();
        assert!((se("ar.L1") / phi_se - 1.0).abs() < 0.3, "se = {}", se("ar.L1"));
        assert!((se("sigma2") / sigma2_se - 1.0).abs() < 0.3, "se = {}", se("sigma2"));
    }

    #[test]
    fn test_recovers_arma11_parameters() {
        let series = simulate_arma11(2000, 50.0, 0.6, 0.3, 17);
        let fit = fit_arima(&series, 0).unwrap();

        assert!((fit.ar() - 0.6).abs() < 0.1, "phi = {}", fit.ar());
        assert!((fit.ma() - 0.3).abs() < 0.1, "theta = {}", fit.ma());
        assert!((fit.constant() - 50.0).abs() < 0.3, "mu = {}", fit.constant());
        assert!((fit.sigma2() - 1.0).abs() < 0.1, "sigma2 = {}", fit.sigma2());

        let summary = fit.summary();
        assert_eq!(summary.coefficients.len(), 4);
        assert_eq!(summary.coefficients[0].name, "const");
        assert!(summary.coefficients.iter().all(|c| c.std_error.is_finite() && c.std_error > 0.0));
        assert!(summary.aic > -2.0 * summary.log_likelihood);
        assert!(summary.bic > summary.aic);
    }

    #[test]
    fn test_differenced_model_has_no_constant() {
        let increments = simulate_arma11(500, 0.0, 0.4, 0.2, 23);
        let mut level = 100.0;
        let series: Vec<f64> = increments
            .iter()
            .map(|dw| {
                level += dw;
                level
            })
            .collect();

        let fit = fit_arima(&series, 1).unwrap();
        assert_eq!(fit.order(), ArimaOrder { p: 1, d: 1, q: 1 });
        assert_eq!(fit.constant(), 0.0);
        let names: Vec<&str> = fit.summary().coefficients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ar.L1", "ma.L1", "sigma2"]);
        assert_eq!(fit.summary().nobs, 500);
    }

    #[test]
    fn test_forecast_intervals_contain_mean_and_widen() {
        let increments = simulate_arma11(400, 0.0, 0.3, 0.1, 5);
        let mut level = 20.0;
        let series: Vec<f64> = increments
            .iter()
            .map(|dw| {
                level += dw;
                level
            })
            .collect();
        let fit = fit_arima(&series, 1).unwrap();
        let forecast = fit.forecast(10, 0.95).unwrap();

        assert_eq!(forecast.horizon, 10);
        assert_eq!(forecast.mean.len(), 10);
        for h in 0..10 {
            assert!(forecast.lower[h] < forecast.mean[h]);
            assert!(forecast.mean[h] < forecast.upper[h]);
        }
        for h in 1..10 {
            assert!(forecast.std_errors[h] > forecast.std_errors[h - 1]);
        }
        // One-step standard error is the innovation standard deviation
        assert!((forecast.std_errors[0] - fit.sigma2().sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_stationary_forecast_reverts_to_mean() {
        let series = simulate_arma11(1000, 10.0, 0.5, 0.0, 31);
        let fit = fit_arima(&series, 0).unwrap();
        let forecast = fit.forecast(60, 0.95).unwrap();
        let last = *forecast.mean.last().unwrap();
        assert!((last - fit.constant()).abs() < 1e-6);
    }

    #[test]
    fn test_psi_weights_for_integrated_model() {
        let fit = FittedArima {
            summary: ArimaSummary {
                order: ArimaOrder { p: 1, d: 1, q: 1 },
                coefficients: Vec::new(),
                log_likelihood: 0.0,
                aic: 0.0,
                bic: 0.0,
                hqic: 0.0,
                nobs: 0,
                converged: true,
                iterations: 0,
            },
            mu: 0.0,
            phi: 0.5,
            theta: 0.2,
            sigma2: 1.0,
            next_prediction: 0.0,
            level_tails: vec![0.0],
        };
        let psi = fit.psi_weights(3);
        // (1 + 0.2B) / ((1 - 0.5B)(1 - B)) = 1 + 1.7B + 2.05B² + ...
        assert!((psi[0] - 1.0).abs() < 1e-12);
        assert!((psi[1] - 1.7).abs() < 1e-12);
        assert!((psi[2] - 2.05).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_short_and_constant_series() {
        assert!(matches!(
            fit_arima(&[1.0, 2.0, 3.0, 4.0], 0),
            Err(AnalysisError::InsufficientObservations { .. })
        ));
        assert_eq!(
            fit_arima(&[7.0; 20], 0).unwrap_err(),
            AnalysisError::ConstantSeries
        );
        // A straight line is constant after differencing
        let line: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(fit_arima(&line, 1).unwrap_err(), AnalysisError::ConstantSeries);
    }

    #[test]
    fn test_forecast_rejects_zero_horizon() {
        let series = simulate_arma11(200, 0.0, 0.2, 0.1, 3);
        let fit = fit_arima(&series, 0).unwrap();
        assert!(matches!(
            fit.forecast(0, 0.95),
            Err(AnalysisError::InvalidParameter { .. })
        ));
    }
}

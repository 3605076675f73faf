use closecast::application::statistics::arima::fit_arima;
use closecast::application::statistics::cointegration::engle_granger;
use closecast::application::statistics::correlogram::{correlogram, correlogram_lags};
use closecast::application::statistics::stationarity::{DEFAULT_SIGNIFICANCE, adf_test};
use closecast::domain::errors::AnalysisError;
use closecast::domain::series::{PriceSeries, difference};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn white_noise(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| gaussian(rng)).collect()
}

fn arma11(rng: &mut StdRng, n: usize, phi: f64, theta: f64) -> Vec<f64> {
    let mut w = 0.0;
    let mut previous = 0.0;
    let mut out = Vec::with_capacity(n);
    for t in 0..n + 200 {
        let e = gaussian(rng);
        w = phi * w + e + theta * previous;
        previous = e;
        if t >= 200 {
            out.push(w);
        }
    }
    out
}

fn integrate(increments: &[f64], start: f64) -> Vec<f64> {
    let mut level = start;
    increments
        .iter()
        .map(|d| {
            level += d;
            level
        })
        .collect()
}

#[test]
fn test_adf_p_values_are_probabilities() {
    let mut rng = StdRng::seed_from_u64(1);
    for n in [40, 60, 250] {
        let noise = white_noise(&mut rng, n);
        let walk = integrate(&white_noise(&mut rng, n), 50.0);
        for series in [&noise, &walk] {
            let result = adf_test(series, DEFAULT_SIGNIFICANCE).unwrap();
            assert!((0.0..=1.0).contains(&result.p_value), "p = {}", result.p_value);
            assert_eq!(result.is_stationary, result.p_value < DEFAULT_SIGNIFICANCE);
        }
    }
}

#[test]
fn test_white_noise_stationary_and_trending_walk_not() {
    let mut rng = StdRng::seed_from_u64(99);
    let noise = white_noise(&mut rng, 500);
    assert!(adf_test(&noise, DEFAULT_SIGNIFICANCE).unwrap().is_stationary);

    let drifting: Vec<f64> = white_noise(&mut rng, 500).iter().map(|e| 0.5 + e).collect();
    let walk = integrate(&drifting, 100.0);
    assert!(!adf_test(&walk, DEFAULT_SIGNIFICANCE).unwrap().is_stationary);
}

#[test]
fn test_differencing_shortens_by_order() {
    let mut rng = StdRng::seed_from_u64(3);
    let values = white_noise(&mut rng, 40);
    for order in 0..=3 {
        assert_eq!(difference(&values, order).len(), 40 - order);
    }
    let series = PriceSeries::new("AAPL", values);
    assert_eq!(series.differenced(2).len(), 38);
    assert_eq!(difference(&[1.0], 1).len(), 0);
}

#[test]
fn test_correlogram_lag_rule() {
    assert_eq!(correlogram_lags(3, 20), None);
    assert_eq!(correlogram_lags(4, 20), Some(1));
    assert_eq!(correlogram_lags(30, 20), Some(14));
    assert_eq!(correlogram_lags(500, 20), Some(20));

    let mut rng = StdRng::seed_from_u64(5);
    let values = white_noise(&mut rng, 200);
    let result = correlogram(&values, 20, 0.95).unwrap();
    assert_eq!(result.acf.len(), 21);
    assert_eq!(result.pacf.len(), 21);
    // White noise: nearly all lags inside the band
    let outside = (1..=20)
        .filter(|&k| result.acf[k].abs() > result.acf_band[k])
        .count();
    assert!(outside <= 4, "{} lags outside the band", outside);
}

#[test]
fn test_arima_recovers_signs_and_magnitudes() {
    let mut rng = StdRng::seed_from_u64(11);
    let increments = arma11(&mut rng, 1500, 0.7, 0.4);
    let prices = integrate(&increments, 250.0);

    let model = fit_arima(&prices, 1).unwrap();
    assert!(model.ar() > 0.5 && model.ar() < 0.85, "phi = {}", model.ar());
    assert!(model.ma() > 0.2 && model.ma() < 0.6, "theta = {}", model.ma());
    assert!((model.sigma2() - 1.0).abs() < 0.15);

    let ar = &model.summary().coefficients[0];
    assert_eq!(ar.name, "ar.L1");
    assert!(ar.p_value < 0.05);
    assert!(ar.ci_lower < ar.value && ar.value < ar.ci_upper);
}

#[test]
fn test_forecast_intervals_widen_with_horizon() {
    let mut rng = StdRng::seed_from_u64(21);
    let prices = integrate(&arma11(&mut rng, 400, 0.2, 0.1), 100.0);
    let model = fit_arima(&prices, 1).unwrap();
    let forecast = model.forecast(10, 0.95).unwrap();

    let widths: Vec<f64> = forecast
        .upper
        .iter()
        .zip(&forecast.lower)
        .map(|(u, l)| u - l)
        .collect();
    for h in 1..widths.len() {
        assert!(widths[h] > widths[h - 1]);
    }
    for h in 0..10 {
        assert!(forecast.lower[h] < forecast.mean[h] && forecast.mean[h] < forecast.upper[h]);
    }
}

#[test]
fn test_arima_needs_five_observations() {
    assert!(matches!(
        fit_arima(&[1.0, 2.0, 1.5, 2.5], 1),
        Err(AnalysisError::InsufficientObservations { .. })
    ));
}

#[test]
fn test_cointegration_detection_and_guards() {
    let mut rng = StdRng::seed_from_u64(8);
    let trend = integrate(&white_noise(&mut rng, 400), 50.0);
    let follower: Vec<f64> = trend.iter().map(|t| 1.5 * t + 0.5 * gaussian(&mut rng)).collect();
    let result = engle_granger("F", &follower, "T", &trend, 0.05).unwrap();
    assert!(result.is_cointegrated);

    assert!(matches!(
        engle_granger("A", &[1.0, 2.0, 3.0, 4.0], "B", &[2.0, 1.0, 3.0, 5.0], 0.05),
        Err(AnalysisError::InsufficientObservations { .. })
    ));
    assert!(matches!(
        engle_granger("A", &trend, "B", &follower[..300], 0.05),
        Err(AnalysisError::LengthMismatch { .. })
    ));
}

//! PNG rendering of correlograms and forecasts with `plotters`.

use crate::domain::diagnostics::{Correlogram, Forecast};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt::Display;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

const PINK: RGBColor = RGBColor(255, 182, 193);

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Chart drawing failed: {0}")]
    Drawing(String),

    #[error("Nothing to plot: {0}")]
    NoData(String),
}

fn drawing_error<E: Display>(error: E) -> ChartError {
    ChartError::Drawing(error.to_string())
}

/// Renders analysis charts into bitmap files.
pub struct ChartRenderer {
    correlogram_size: (u32, u32),
    forecast_size: (u32, u32),
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self {
            correlogram_size: (1200, 500),
            forecast_size: (1000, 600),
        }
    }
}

impl ChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// ACF on the left, PACF on the right, each with its confidence band.
    pub fn render_correlogram(
        &self,
        symbol: &str,
        correlogram: &Correlogram,
        path: &Path,
    ) -> Result<(), ChartError> {
        if correlogram.nlags == 0 {
            return Err(ChartError::NoData(format!("no lags for {}", symbol)));
        }
        let root = BitMapBackend::new(path, self.correlogram_size).into_drawing_area();
        root.fill(&WHITE).map_err(drawing_error)?;
        let (left, right) = root.split_horizontally(self.correlogram_size.0 / 2);

        draw_stem_panel(
            &left,
            &format!("ACF for {}", symbol),
            &correlogram.acf,
            &correlogram.acf_band,
        )?;
        draw_stem_panel(
            &right,
            &format!("PACF for {}", symbol),
            &correlogram.pacf,
            &correlogram.pacf_band,
        )?;
        root.present().map_err(drawing_error)
    }

    /// Last actual observations followed by the forecast path and its interval.
    ///
    /// `history_start` is the index of `history[0]` in the full series, so the
    /// forecast continues the same x axis.
    pub fn render_forecast(
        &self,
        symbol: &str,
        history: &[f64],
        history_start: usize,
        forecast: &Forecast,
        path: &Path,
    ) -> Result<(), ChartError> {
        if history.is_empty() || forecast.mean.is_empty() {
            return Err(ChartError::NoData(format!("empty forecast input for {}", symbol)));
        }
        let root = BitMapBackend::new(path, self.forecast_size).into_drawing_area();
        root.fill(&WHITE).map_err(drawing_error)?;

        let first_forecast = history_start + history.len();
        let x_range = history_start as f64..(first_forecast + forecast.horizon) as f64;
        let y_range = value_range(history, forecast);
        let title = forecast_title(symbol, forecast.horizon);

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(drawing_error)?;
        chart
            .configure_mesh()
            .x_desc("Time (Minute)")
            .y_desc("Closing Price")
            .draw()
            .map_err(drawing_error)?;

        let interval_label = format!(
            "{:.0}% Confidence Interval",
            forecast.confidence_level * 100.0
        );
        let forecast_x = |i: usize| (first_forecast + i) as f64;

        if forecast.horizon > 1 {
            chart
                .draw_series(std::iter::once(Polygon::new(
                    band_outline(first_forecast, &forecast.lower, &forecast.upper),
                    PINK.mix(0.3).filled(),
                )))
                .map_err(drawing_error)?
                .label(interval_label)
                .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], PINK.mix(0.3).filled()));
        } else {
            chart
                .draw_series(std::iter::once(ErrorBar::new_vertical(
                    forecast_x(0),
                    forecast.lower[0],
                    forecast.mean[0],
                    forecast.upper[0],
                    PINK.filled(),
                    12,
                )))
                .map_err(drawing_error)?
                .label(interval_label)
                .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], PINK.filled()));
        }

        chart
            .draw_series(LineSeries::new(
                history
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| ((history_start + i) as f64, v)),
                &BLUE,
            ))
            .map_err(drawing_error)?
            .label("Actual")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

        chart
            .draw_series(LineSeries::new(
                forecast.mean.iter().enumerate().map(|(i, &v)| (forecast_x(i), v)),
                &RED,
            ))
            .map_err(drawing_error)?
            .label("Forecast")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
        chart
            .draw_series(
                forecast
                    .mean
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| Circle::new((forecast_x(i), v), 4, RED.filled())),
            )
            .map_err(drawing_error)?;

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(drawing_error)?;

        root.present().map_err(drawing_error)
    }
}

fn draw_stem_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    values: &[f64],
    band: &[f64],
) -> Result<(), ChartError> {
    let nlags = values.len().saturating_sub(1);
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(-0.5f64..nlags as f64 + 0.5, -1.1f64..1.1f64)
        .map_err(drawing_error)?;
    chart
        .configure_mesh()
        .x_desc("Lag")
        .draw()
        .map_err(drawing_error)?;

    chart
        .draw_series(std::iter::once(Polygon::new(
            band_outline(1, &band[1..], &negated(&band[1..])),
            BLUE.mix(0.15).filled(),
        )))
        .map_err(drawing_error)?;
    chart
        .draw_series(LineSeries::new(
            vec![(-0.5, 0.0), (nlags as f64 + 0.5, 0.0)],
            &BLACK,
        ))
        .map_err(drawing_error)?;
    chart
        .draw_series(values.iter().enumerate().map(|(lag, &v)| {
            PathElement::new(vec![(lag as f64, 0.0), (lag as f64, v)], BLUE.stroke_width(2))
        }))
        .map_err(drawing_error)?;
    chart
        .draw_series(
            values
                .iter()
                .enumerate()
                .map(|(lag, &v)| Circle::new((lag as f64, v), 4, BLUE.filled())),
        )
        .map_err(drawing_error)?;
    Ok(())
}

fn negated(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| -v).collect()
}

/// Closed outline of a band: `upper` left to right, then `lower` back.
/// Either argument may be the lower edge; only the traversal order matters.
fn band_outline(first_x: usize, lower: &[f64], upper: &[f64]) -> Vec<(f64, f64)> {
    let forward = upper
        .iter()
        .enumerate()
        .map(|(i, &v)| ((first_x + i) as f64, v));
    let backward = lower
        .iter()
        .enumerate()
        .rev()
        .map(|(i, &v)| ((first_x + i) as f64, v));
    forward.chain(backward).collect()
}

fn forecast_title(symbol: &str, horizon: usize) -> String {
    format!(
        "{} Closing Price Forecast ({} step{} ahead)",
        symbol,
        horizon,
        if horizon == 1 { "" } else { "s" }
    )
}

/// Vertical range covering the history and the whole interval, padded by 5%.
fn value_range(history: &[f64], forecast: &Forecast) -> Range<f64> {
    let (lo, hi) = history
        .iter()
        .chain(&forecast.lower)
        .chain(&forecast.upper)
        .chain(&forecast.mean)
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(hi.abs().max(1.0) * 1e-6);
    (lo - pad)..(hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_forecast(horizon: usize) -> Forecast {
        let mean: Vec<f64> = (0..horizon).map(|i| 100.0 + i as f64).collect();
        Forecast {
            horizon,
            confidence_level: 0.95,
            std_errors: vec![1.0; horizon],
            lower: mean.iter().map(|m| m - 2.0).collect(),
            upper: mean.iter().map(|m| m + 2.0).collect(),
            mean,
        }
    }

    #[test]
    fn test_band_outline_is_closed_loop() {
        let outline = band_outline(10, &[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert_eq!(
            outline,
            vec![
                (10.0, 4.0),
                (11.0, 5.0),
                (12.0, 6.0),
                (12.0, 3.0),
                (11.0, 2.0),
                (10.0, 1.0)
            ]
        );
    }

    #[test]
    fn test_forecast_title_pluralises_steps() {
        assert_eq!(
            forecast_title("AAPL", 1),
            "AAPL Closing Price Forecast (1 step ahead)"
        );
        assert_eq!(
            forecast_title("NVDA", 10),
            "NVDA Closing Price Forecast (10 steps ahead)"
        );
    }

    #[test]
    fn test_value_range_covers_interval() {
        let forecast = sample_forecast(3);
        let range = value_range(&[99.0, 100.5], &forecast);
        assert!(range.start < 98.0);
        assert!(range.end > 104.0);
    }

    #[test]
    fn test_value_range_of_flat_data_is_not_empty() {
        let forecast = Forecast {
            horizon: 1,
            confidence_level: 0.95,
            mean: vec![5.0],
            std_errors: vec![0.0],
            lower: vec![5.0],
            upper: vec![5.0],
        };
        let range = value_range(&[5.0, 5.0], &forecast);
        assert!(range.end > range.start);
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ChartRenderer::new();
        let err = renderer
            .render_forecast("AAPL", &[], 0, &sample_forecast(2), &dir.path().join("f.png"))
            .unwrap_err();
        assert!(matches!(err, ChartError::NoData(_)));
    }

    #[test]
    fn test_forecast_chart_writes_png_or_reports_drawing_error() {
        // Text rendering depends on system fonts being present
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL_forecast.png");
        let history: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        match ChartRenderer::new().render_forecast("AAPL", &history, 150, &sample_forecast(10), &path) {
            Ok(()) => assert!(path.exists()),
            Err(e) => assert!(matches!(e, ChartError::Drawing(_))),
        }
    }
}

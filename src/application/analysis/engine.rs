//! The per-run analysis pipeline.
//!
//! Steps run in a fixed order over all symbols at once: validity check and
//! cleaning, ADF, differencing and re-test, correlograms, ARIMA fits,
//! pairwise cointegration, forecasts. Only data problems abort the run;
//! every statistical or plotting failure is reported and the step yields
//! nothing for that symbol.

use crate::application::analysis::reporting::{
    AnalysisReport, AnalysisReporter, PairReport, SymbolReport,
};
use crate::application::statistics::arima::{FittedArima, MIN_MODEL_OBSERVATIONS, fit_arima};
use crate::application::statistics::cointegration::{
    MIN_COINTEGRATION_OBSERVATIONS, engle_granger,
};
use crate::application::statistics::correlogram::{correlogram, correlogram_lags};
use crate::application::statistics::stationarity::adf_test;
use crate::config::{AnalysisConfig, Config, OutputConfig};
use crate::domain::diagnostics::AdfResult;
use crate::domain::errors::DataError;
use crate::domain::series::PriceSeries;
use crate::infrastructure::charts::ChartRenderer;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

pub struct AnalysisEngine<W: Write> {
    analysis: AnalysisConfig,
    output: OutputConfig,
    charts: ChartRenderer,
    reporter: AnalysisReporter<W>,
}

impl AnalysisEngine<io::Stdout> {
    pub fn new(config: &Config) -> Self {
        Self::with_reporter(config, AnalysisReporter::stdout())
    }
}

impl<W: Write> AnalysisEngine<W> {
    pub fn with_reporter(config: &Config, reporter: AnalysisReporter<W>) -> Self {
        Self {
            analysis: config.analysis.clone(),
            output: config.output.clone(),
            charts: ChartRenderer::new(),
            reporter,
        }
    }

    pub fn into_reporter(self) -> AnalysisReporter<W> {
        self.reporter
    }

    /// Runs every step over `inputs` (one series per symbol, in order).
    pub fn run(&mut self, inputs: Vec<PriceSeries>) -> Result<AnalysisReport> {
        if self.output.plots_enabled || self.output.json_report {
            fs::create_dir_all(&self.output.output_dir).context(format!(
                "Failed to create output directory {}",
                self.output.output_dir.display()
            ))?;
        }

        let mut reports: Vec<SymbolReport> = inputs
            .iter()
            .map(|series| SymbolReport {
                symbol: series.symbol().to_string(),
                raw_observations: series.len(),
                invalid_values: series.invalid_counts(),
                observations: series.len(),
                adf: None,
                differencing_order: 0,
                differenced_observations: series.len(),
                differenced_adf: None,
                correlogram: None,
                arima: None,
                forecast: None,
                charts: Vec::new(),
            })
            .collect();

        let series = self.validate_and_clean(inputs, &reports)?;
        for (report, s) in reports.iter_mut().zip(&series) {
            report.observations = s.len();
        }

        // Stationarity of the levels
        for (report, s) in reports.iter_mut().zip(&series) {
            report.adf = self.run_adf(s.symbol(), s.values())?;
        }
        self.reporter
            .unit_root_interpretation(self.analysis.significance)?;

        // Differencing
        let differenced: Vec<PriceSeries> = reports
            .iter_mut()
            .zip(&series)
            .map(|(report, s)| {
                report.differencing_order = self.differencing_order(s.symbol(), report.adf.as_ref());
                let diff = s.differenced(report.differencing_order);
                report.differenced_observations = diff.len();
                diff
            })
            .collect();
        self.reporter.lengths(
            "\nDifferenced series lengths",
            &differenced
                .iter()
                .map(|d| (d.symbol(), d.len()))
                .collect::<Vec<_>>(),
        )?;
        self.reporter
            .line("\nVerifying stationarity of differenced series (if applicable):")?;
        for (report, d) in reports.iter_mut().zip(&differenced) {
            let name = format!("{} Differenced", d.symbol());
            report.differenced_adf = self.run_adf(&name, d.values())?;
        }

        self.run_correlograms(&mut reports, &differenced)?;
        let models = self.run_models(&mut reports, &series)?;
        let pairs = self.run_cointegration(&series)?;
        self.run_forecasts(&mut reports, &series, &models)?;

        let report = AnalysisReport {
            timestamp: Utc::now(),
            configuration: format!(
                "horizon={} significance={} confidence={} max_lags={}",
                self.analysis.horizon,
                self.analysis.significance,
                self.analysis.confidence_level,
                self.analysis.max_lags
            ),
            symbols: reports,
            cointegration: pairs,
        };

        self.reporter.print_summary(&report)?;
        if self.output.json_report {
            self.reporter
                .write_json(&report, &self.output.report_path())?;
        }
        Ok(report)
    }

    /// Reports invalid counts; when any series has them, every series is
    /// cleaned so the symbols stay comparable.
    fn validate_and_clean(
        &mut self,
        inputs: Vec<PriceSeries>,
        reports: &[SymbolReport],
    ) -> Result<Vec<PriceSeries>> {
        for report in reports {
            self.reporter
                .invalid_values(&report.symbol, &report.invalid_values)?;
            if report.invalid_values.needs_cleaning() {
                warn!(
                    "{} has {} NaN and {} inf values",
                    report.symbol, report.invalid_values.nan_count, report.invalid_values.inf_count
                );
            }
        }

        let needs_cleaning = reports.iter().any(|r| r.invalid_values.needs_cleaning());
        let series: Vec<PriceSeries> = if needs_cleaning {
            self.reporter.cleaning()?;
            inputs.iter().map(PriceSeries::cleaned).collect()
        } else {
            inputs
        };

        let label = if needs_cleaning {
            "Remaining lengths"
        } else {
            "\nSeries lengths"
        };
        self.reporter.lengths(
            label,
            &series.iter().map(|s| (s.symbol(), s.len())).collect::<Vec<_>>(),
        )?;

        if let Some(dirty) = series.iter().find(|s| s.invalid_counts().needs_cleaning()) {
            return Err(DataError::InvalidValuesRemain {
                symbol: dirty.symbol().to_string(),
            }
            .into());
        }
        Ok(series)
    }

    fn run_adf(&mut self, name: &str, values: &[f64]) -> Result<Option<AdfResult>> {
        match adf_test(values, self.analysis.significance) {
            Ok(result) => {
                info!(
                    "ADF {}: stat={:.4} p={:.4} stationary={}",
                    name, result.statistic, result.p_value, result.is_stationary
                );
                self.reporter.adf(name, &result)?;
                Ok(Some(result))
            }
            Err(e) => {
                warn!("ADF test failed for {}: {}", name, e);
                self.reporter.failed("ADF test", name, &e)?;
                Ok(None)
            }
        }
    }

    /// Configured override, else 0 for a stationary series and 1 otherwise.
    /// A failed ADF test counts as non-stationary.
    fn differencing_order(&self, symbol: &str, adf: Option<&AdfResult>) -> usize {
        self.analysis
            .differencing_for(symbol)
            .unwrap_or_else(|| match adf {
                Some(result) if result.is_stationary => 0,
                _ => 1,
            })
    }

    fn run_correlograms(
        &mut self,
        reports: &mut [SymbolReport],
        differenced: &[PriceSeries],
    ) -> Result<()> {
        self.reporter.correlogram_interpretation()?;
        let mut saved = Vec::new();
        for (report, d) in reports.iter_mut().zip(differenced) {
            let Some(nlags) = correlogram_lags(d.len(), self.analysis.max_lags) else {
                self.reporter.skipped(
                    "correlogram",
                    d.symbol(),
                    &format!("too few observations ({})", d.len()),
                )?;
                continue;
            };
            let result = match correlogram(d.values(), nlags, self.analysis.confidence_level) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Correlogram failed for {}: {}", d.symbol(), e);
                    self.reporter.failed("Correlogram", d.symbol(), &e)?;
                    continue;
                }
            };
            self.reporter.correlogram(d.symbol(), &result)?;

            if self.output.plots_enabled {
                let path = self.output.correlogram_path(d.symbol());
                match self.charts.render_correlogram(d.symbol(), &result, &path) {
                    Ok(()) => {
                        report.charts.push(path.clone());
                        saved.push(path);
                    }
                    Err(e) => {
                        warn!("Correlogram plot failed for {}: {}", d.symbol(), e);
                        self.reporter.failed("Correlogram plot", d.symbol(), &e)?;
                    }
                }
            }
            report.correlogram = Some(result);
        }
        if self.output.plots_enabled {
            self.reporter.saved("correlograms", &saved)?;
        }
        Ok(())
    }

    fn run_models(
        &mut self,
        reports: &mut [SymbolReport],
        series: &[PriceSeries],
    ) -> Result<Vec<Option<FittedArima>>> {
        self.reporter.arima_interpretation()?;
        let mut models = Vec::with_capacity(series.len());
        for (report, s) in reports.iter_mut().zip(series) {
            if s.len() < MIN_MODEL_OBSERVATIONS {
                self.reporter.skipped(
                    "ARIMA",
                    s.symbol(),
                    &format!("too few observations ({})", s.len()),
                )?;
                models.push(None);
                continue;
            }
            match fit_arima(s.values(), report.differencing_order) {
                Ok(model) => {
                    info!(
                        "{} fitted for {}: aic={:.3} converged={}",
                        model.order(),
                        s.symbol(),
                        model.summary().aic,
                        model.summary().converged
                    );
                    self.reporter.arima_summary(s.symbol(), model.summary())?;
                    report.arima = Some(model.summary().clone());
                    models.push(Some(model));
                }
                Err(e) => {
                    warn!("ARIMA fitting failed for {}: {}", s.symbol(), e);
                    self.reporter.failed("ARIMA fitting", s.symbol(), &e)?;
                    models.push(None);
                }
            }
        }
        Ok(models)
    }

    /// Every unordered pair, in configuration order.
    fn run_cointegration(&mut self, series: &[PriceSeries]) -> Result<Vec<PairReport>> {
        self.reporter.cointegration_interpretation()?;
        let mut pairs = Vec::new();
        for (i, first) in series.iter().enumerate() {
            for second in &series[i + 1..] {
                let mut pair = PairReport {
                    first: first.symbol().to_string(),
                    second: second.symbol().to_string(),
                    is_cointegrated: false,
                    result: None,
                };
                let name = format!("{}-{}", first.symbol(), second.symbol());
                if first.len() < MIN_COINTEGRATION_OBSERVATIONS
                    || second.len() < MIN_COINTEGRATION_OBSERVATIONS
                {
                    self.reporter
                        .skipped("cointegration test", &name, "too few observations")?;
                    pairs.push(pair);
                    continue;
                }
                match engle_granger(
                    first.symbol(),
                    first.values(),
                    second.symbol(),
                    second.values(),
                    self.analysis.significance,
                ) {
                    Ok(result) => {
                        self.reporter.cointegration(&result)?;
                        pair.is_cointegrated = result.is_cointegrated;
                        pair.result = Some(result);
                    }
                    Err(e) => {
                        warn!("Cointegration test failed for {}: {}", name, e);
                        self.reporter.failed("Cointegration test", &name, &e)?;
                    }
                }
                pairs.push(pair);
            }
        }
        Ok(pairs)
    }

    fn run_forecasts(
        &mut self,
        reports: &mut [SymbolReport],
        series: &[PriceSeries],
        models: &[Option<FittedArima>],
    ) -> Result<()> {
        let horizon = self.analysis.horizon;
        self.reporter
            .forecast_interpretation(horizon, self.analysis.confidence_level)?;
        let mut saved: Vec<PathBuf> = Vec::new();

        for ((report, s), model) in reports.iter_mut().zip(series).zip(models) {
            let Some(model) = model else {
                self.reporter
                    .skipped("forecast", s.symbol(), "no valid ARIMA model")?;
                continue;
            };
            if s.len() < MIN_MODEL_OBSERVATIONS {
                self.reporter.skipped(
                    "forecast",
                    s.symbol(),
                    &format!("too few observations ({})", s.len()),
                )?;
                continue;
            }
            let forecast = match model.forecast(horizon, self.analysis.confidence_level) {
                Ok(forecast) => forecast,
                Err(e) => {
                    warn!("Forecasting failed for {}: {}", s.symbol(), e);
                    self.reporter.failed("Forecasting", s.symbol(), &e)?;
                    continue;
                }
            };
            self.reporter.forecast(s.symbol(), &forecast)?;

            if self.output.plots_enabled {
                let history = s.tail(self.analysis.history_points);
                let history_start = s.len() - history.len();
                let path = self.output.forecast_path(s.symbol());
                match self
                    .charts
                    .render_forecast(s.symbol(), history, history_start, &forecast, &path)
                {
                    Ok(()) => {
                        self.reporter.forecast_plot_saved(s.symbol(), &path)?;
                        report.charts.push(path.clone());
                        saved.push(path);
                    }
                    Err(e) => {
                        warn!("Forecast plot failed for {}: {}", s.symbol(), e);
                        self.reporter.failed("Forecasting", s.symbol(), &e)?;
                    }
                }
            }
            report.forecast = Some(forecast);
        }
        if self.output.plots_enabled {
            self.reporter.saved("forecast plots", &saved)?;
        }
        Ok(())
    }
}

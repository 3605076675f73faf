use crate::domain::diagnostics::{
    AdfResult, ArimaSummary, CointegrationResult, Correlogram, Forecast,
};
use crate::domain::series::InvalidValueCounts;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Everything one run produced, in a form suitable for JSON export.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub timestamp: DateTime<Utc>,
    pub configuration: String,
    pub symbols: Vec<SymbolReport>,
    pub cointegration: Vec<PairReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub raw_observations: usize,
    pub invalid_values: InvalidValueCounts,
    pub observations: usize,
    pub adf: Option<AdfResult>,
    pub differencing_order: usize,
    pub differenced_observations: usize,
    pub differenced_adf: Option<AdfResult>,
    pub correlogram: Option<Correlogram>,
    pub arima: Option<ArimaSummary>,
    pub forecast: Option<Forecast>,
    pub charts: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    pub first: String,
    pub second: String,
    pub is_cointegrated: bool,
    pub result: Option<CointegrationResult>,
}

/// Console output of an analysis run.
///
/// Every method writes one block of text; the engine decides the order.
pub struct AnalysisReporter<W: Write> {
    out: W,
}

impl AnalysisReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> AnalysisReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    fn interpretation(&mut self, title: &str, lines: &[&str]) -> io::Result<()> {
        writeln!(self.out, "\n=== {} ===", title)?;
        for line in lines {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    pub fn invalid_values(&mut self, symbol: &str, counts: &InvalidValueCounts) -> io::Result<()> {
        writeln!(self.out, "\nChecking {} for invalid values:", symbol)?;
        writeln!(self.out, "NaN count: {}", counts.nan_count)?;
        writeln!(self.out, "Inf count: {}", counts.inf_count)
    }

    pub fn cleaning(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "\nCleaning data by dropping rows with NaN or inf values..."
        )
    }

    /// `"<label>: AAPL=10, NVDA=12"`
    pub fn lengths(&mut self, label: &str, lengths: &[(&str, usize)]) -> io::Result<()> {
        let joined = lengths
            .iter()
            .map(|(symbol, n)| format!("{}={}", symbol, n))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(self.out, "{}: {}", label, joined)
    }

    pub fn adf(&mut self, name: &str, result: &AdfResult) -> io::Result<()> {
        writeln!(self.out, "\nADF Test for {}:", name)?;
        writeln!(self.out, "ADF Statistic: {:.4}", result.statistic)?;
        writeln!(self.out, "p-value: {:.4}", result.p_value)?;
        writeln!(
            self.out,
            "Critical values: 1%={:.4}, 5%={:.4}, 10%={:.4} (lags used: {}, nobs: {})",
            result.critical_values.one_pct,
            result.critical_values.five_pct,
            result.critical_values.ten_pct,
            result.used_lag,
            result.nobs
        )?;
        writeln!(
            self.out,
            "{}",
            if result.is_stationary {
                "Stationary"
            } else {
                "Non-Stationary"
            }
        )
    }

    pub fn unit_root_interpretation(&mut self, significance: f64) -> io::Result<()> {
        let threshold = format!(
            "A p-value < {} indicates stationarity, meaning no differencing is needed.",
            significance
        );
        self.interpretation(
            "Unit Root Test Interpretation",
            &[
                "The ADF test checks if the series is stationary (no unit root).",
                &threshold,
            ],
        )
    }

    pub fn failed(&mut self, step: &str, name: &str, error: &dyn std::fmt::Display) -> io::Result<()> {
        writeln!(self.out, "{} failed for {}: {}", step, name, error)
    }

    pub fn skipped(&mut self, step: &str, name: &str, reason: &str) -> io::Result<()> {
        writeln!(self.out, "Skipping {} for {}: {}.", step, name, reason)
    }

    pub fn correlogram_interpretation(&mut self) -> io::Result<()> {
        self.interpretation(
            "Correlogram Interpretation",
            &[
                "ACF shows autocorrelation at different lags; PACF shows partial autocorrelation.",
                "Significant spikes at lag k suggest AR(k) or MA(k) terms for ARIMA.",
                "Here, ARIMA(1,d,1) is used, but correlograms may suggest other orders.",
            ],
        )
    }

    pub fn correlogram(&mut self, name: &str, correlogram: &Correlogram) -> io::Result<()> {
        writeln!(
            self.out,
            "Generating correlogram for {} with {} lags.",
            name, correlogram.nlags
        )?;
        writeln!(
            self.out,
            "{:>5} {:>9} {:>9} {:>9} {:>9}",
            "lag", "ACF", "ACF band", "PACF", "PACF band"
        )?;
        for lag in 1..=correlogram.nlags {
            let marker = if correlogram.acf[lag].abs() > correlogram.acf_band[lag]
                || correlogram.pacf[lag].abs() > correlogram.pacf_band[lag]
            {
                " *"
            } else {
                ""
            };
            writeln!(
                self.out,
                "{:>5} {:>9.4} {:>9.4} {:>9.4} {:>9.4}{}",
                lag,
                correlogram.acf[lag],
                correlogram.acf_band[lag],
                correlogram.pacf[lag],
                correlogram.pacf_band[lag],
                marker
            )?;
        }
        Ok(())
    }

    pub fn saved(&mut self, what: &str, paths: &[PathBuf]) -> io::Result<()> {
        if paths.is_empty() {
            return writeln!(self.out, "\nNo {} were generated.", what);
        }
        let names = paths
            .iter()
            .map(|p| format!("'{}'", p.display()))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(self.out, "\n{} saved as {}.", capitalize(what), names)
    }

    pub fn arima_interpretation(&mut self) -> io::Result<()> {
        self.interpretation(
            "ARIMA Model Interpretation",
            &[
                "ARIMA(p,d,q) models forecast time series. Here, p=1 (AR), q=1 (MA), d=0 or 1.",
                "Check coefficients' p-values (< 0.05 for significance) and AIC (lower is better).",
            ],
        )
    }

    pub fn arima_summary(&mut self, name: &str, summary: &ArimaSummary) -> io::Result<()> {
        writeln!(self.out, "\n{} Model Summary for {}:", summary.order, name)?;
        writeln!(self.out, "{}", "=".repeat(80))?;
        writeln!(
            self.out,
            "{:<20} {:>18}   {:<20} {:>16}",
            "Dep. Variable:", name, "No. Observations:", summary.nobs
        )?;
        writeln!(
            self.out,
            "{:<20} {:>18}   {:<20} {:>16.3}",
            "Model:",
            summary.order.to_string(),
            "Log Likelihood:",
            summary.log_likelihood
        )?;
        writeln!(
            self.out,
            "{:<20} {:>18}   {:<20} {:>16.3}",
            "Converged:",
            if summary.converged { "yes" } else { "no" },
            "AIC:",
            summary.aic
        )?;
        writeln!(
            self.out,
            "{:<20} {:>18}   {:<20} {:>16.3}",
            "Iterations:", summary.iterations, "BIC:", summary.bic
        )?;
        writeln!(self.out, "{:<20} {:>18}   {:<20} {:>16.3}", "", "", "HQIC:", summary.hqic)?;
        writeln!(self.out, "{}", "-".repeat(80))?;
        writeln!(
            self.out,
            "{:<10} {:>12} {:>10} {:>9} {:>8} {:>12} {:>12}",
            "", "coef", "std err", "z", "P>|z|", "[0.025", "0.975]"
        )?;
        writeln!(self.out, "{}", "-".repeat(80))?;
        for c in &summary.coefficients {
            writeln!(
                self.out,
                "{:<10} {:>12.4} {:>10.4} {:>9.3} {:>8.3} {:>12.4} {:>12.4}",
                c.name, c.value, c.std_error, c.z, c.p_value, c.ci_lower, c.ci_upper
            )?;
        }
        writeln!(self.out, "{}", "=".repeat(80))
    }

    pub fn cointegration_interpretation(&mut self) -> io::Result<()> {
        self.interpretation(
            "Cointegration Test Interpretation",
            &[
                "Cointegration tests check if two series have a stable long-run relationship.",
                "A p-value < 0.05 suggests cointegration (series move together over time).",
            ],
        )
    }

    pub fn cointegration(&mut self, result: &CointegrationResult) -> io::Result<()> {
        writeln!(
            self.out,
            "\nCointegration Test between {} and {}:",
            result.first, result.second
        )?;
        writeln!(self.out, "Test Statistic: {:.4}", result.statistic)?;
        writeln!(self.out, "p-value: {:.4}", result.p_value)?;
        writeln!(
            self.out,
            "{}",
            if result.is_cointegrated {
                "Cointegrated"
            } else {
                "Not Cointegrated"
            }
        )
    }

    pub fn forecast_interpretation(&mut self, horizon: usize, confidence_level: f64) -> io::Result<()> {
        let scope = format!(
            "Forecasts predict the next {} step{} of closing prices based on 3-minute data.",
            horizon,
            if horizon == 1 { "" } else { "s" }
        );
        let band = format!(
            "Red line shows the forecast, the pink band (error bar for one step) shows the {:.0}% confidence interval.",
            confidence_level * 100.0
        );
        self.interpretation(
            "Forecast Interpretation",
            &[
                &scope,
                &band,
                "Narrow intervals suggest higher confidence in the forecast.",
            ],
        )
    }

    pub fn forecast(&mut self, name: &str, forecast: &Forecast) -> io::Result<()> {
        writeln!(
            self.out,
            "\nForecast for {} ({:.0}% interval):",
            name,
            forecast.confidence_level * 100.0
        )?;
        writeln!(
            self.out,
            "{:>5} {:>14} {:>14} {:>14} {:>10}",
            "step", "forecast", "lower", "upper", "std err"
        )?;
        for step in 0..forecast.horizon {
            writeln!(
                self.out,
                "{:>5} {:>14.4} {:>14.4} {:>14.4} {:>10.4}",
                step + 1,
                forecast.mean[step],
                forecast.lower[step],
                forecast.upper[step],
                forecast.std_errors[step]
            )?;
        }
        Ok(())
    }

    pub fn forecast_plot_saved(&mut self, name: &str, path: &Path) -> io::Result<()> {
        writeln!(
            self.out,
            "Forecast plot generated and saved for {} as '{}'.",
            name,
            path.display()
        )
    }

    /// One row per symbol; the run's bottom line.
    pub fn print_summary(&mut self, report: &AnalysisReport) -> io::Result<()> {
        writeln!(self.out, "\n{}", "=".repeat(80))?;
        writeln!(self.out, "📊 ANALYSIS SUMMARY")?;
        writeln!(self.out, "{}", "=".repeat(80))?;
        writeln!(
            self.out,
            "{:<8} | {:>6} | {:>8} | {:>2} | {:<13} | {:>12} | {:>14}",
            "Symbol", "Obs", "ADF p", "d", "Model", "AIC", "Next forecast"
        )?;
        writeln!(self.out, "{}", "-".repeat(80))?;
        for symbol in &report.symbols {
            let adf_p = symbol
                .adf
                .as_ref()
                .map_or("n/a".to_string(), |a| format!("{:.4}", a.p_value));
            let (model, aic) = symbol.arima.as_ref().map_or(
                ("none".to_string(), "n/a".to_string()),
                |m| (m.order.to_string(), format!("{:.2}", m.aic)),
            );
            let next = symbol
                .forecast
                .as_ref()
                .and_then(|f| f.mean.first())
                .map_or("n/a".to_string(), |v| format!("{:.4}", v));
            writeln!(
                self.out,
                "{:<8} | {:>6} | {:>8} | {:>2} | {:<13} | {:>12} | {:>14}",
                symbol.symbol,
                symbol.observations,
                adf_p,
                symbol.differencing_order,
                model,
                aic,
                next
            )?;
        }
        if !report.cointegration.is_empty() {
            writeln!(self.out, "{}", "-".repeat(80))?;
            for pair in &report.cointegration {
                let verdict = if pair.is_cointegrated { "✅ cointegrated" } else { "❌ not cointegrated" };
                writeln!(self.out, "{}-{}: {}", pair.first, pair.second, verdict)?;
            }
        }
        writeln!(self.out, "{}", "=".repeat(80))
    }

    pub fn write_json(&mut self, report: &AnalysisReport, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        fs::write(path, json).context(format!("Failed to write report {}", path.display()))?;
        writeln!(self.out, "📝 Report saved to: {}", path.display())?;
        Ok(())
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

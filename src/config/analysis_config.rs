//! Analysis configuration: thresholds, lag counts and forecast horizon.

use super::{EnvLookup, parse_f64, parse_usize};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Analysis environment configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Significance level for ADF and cointegration decisions.
    pub significance: f64,
    /// Upper bound on correlogram lags.
    pub max_lags: usize,
    /// Forecast steps ahead.
    pub horizon: usize,
    /// Coverage of forecast and correlogram bands.
    pub confidence_level: f64,
    /// Actual observations shown before the forecast on the chart.
    pub history_points: usize,
    /// Per-symbol differencing order replacing the ADF-driven choice.
    pub differencing_overrides: BTreeMap<String, usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance: 0.05,
            max_lags: 20,
            horizon: 10,
            confidence_level: 0.95,
            history_points: 50,
            differencing_overrides: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn apply_env(&mut self, lookup: EnvLookup<'_>) -> Result<()> {
        self.significance = parse_f64(lookup, "CLOSECAST_SIGNIFICANCE", self.significance)?;
        self.max_lags = parse_usize(lookup, "CLOSECAST_MAX_LAGS", self.max_lags)?;
        self.horizon = parse_usize(lookup, "CLOSECAST_HORIZON", self.horizon)?;
        self.confidence_level =
            parse_f64(lookup, "CLOSECAST_CONFIDENCE_LEVEL", self.confidence_level)?;
        self.history_points = parse_usize(lookup, "CLOSECAST_HISTORY_POINTS", self.history_points)?;

        if let Some(raw) = lookup("CLOSECAST_DIFFERENCING") {
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (symbol, order) = part
                    .split_once('=')
                    .context(format!("CLOSECAST_DIFFERENCING entry '{}' must be SYMBOL=D", part))?;
                let order = order
                    .trim()
                    .parse::<usize>()
                    .context(format!("Failed to parse differencing order in '{}'", part))?;
                self.differencing_overrides
                    .insert(symbol.trim().to_uppercase(), order);
            }
        }
        Ok(())
    }

    /// Forced differencing order for `symbol`, if any.
    pub fn differencing_for(&self, symbol: &str) -> Option<usize> {
        self.differencing_overrides.get(symbol).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.significance, 0.05);
        assert_eq!(config.max_lags, 20);
        assert_eq!(config.horizon, 10);
        assert_eq!(config.confidence_level, 0.95);
        assert_eq!(config.history_points, 50);
        assert_eq!(config.differencing_for("GOOGL"), None);
    }

    #[test]
    fn test_env_overrides() {
        let lookup = |key: &str| match key {
            "CLOSECAST_HORIZON" => Some("1".to_string()),
            "CLOSECAST_DIFFERENCING" => Some("googl=2, NVDA=0".to_string()),
            _ => None,
        };
        let mut config = AnalysisConfig::default();
        config.apply_env(&lookup).unwrap();
        assert_eq!(config.horizon, 1);
        assert_eq!(config.differencing_for("GOOGL"), Some(2));
        assert_eq!(config.differencing_for("NVDA"), Some(0));
        assert_eq!(config.max_lags, 20);
    }

    #[test]
    fn test_malformed_env_value_is_rejected() {
        let lookup = |key: &str| (key == "CLOSECAST_HORIZON").then(|| "ten".to_string());
        let mut config = AnalysisConfig::default();
        let err = config.apply_env(&lookup).unwrap_err();
        assert!(err.to_string().contains("CLOSECAST_HORIZON"));
    }
}

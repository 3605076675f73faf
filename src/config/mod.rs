//! Configuration module for closecast.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `CLOSECAST_*` environment variables (including a `.env` file loaded by the
//! binary). Command-line flags are applied last by the binary itself.

mod analysis_config;
mod input_config;
mod output_config;

pub use analysis_config::AnalysisConfig;
pub use input_config::{InputConfig, SYMBOL_PLACEHOLDER, parse_file_assignment, parse_symbol_list};
pub use output_config::OutputConfig;

use crate::application::statistics::arima::MAX_DIFFERENCING;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Source of environment values; `env::var` in production, a closure in tests.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load_with(None, &|key: &str| env::var(key).ok())
    }

    /// Reads a TOML file; missing sections and keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .context(format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw).context(format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(raw)?;
        config.normalize();
        Ok(config)
    }

    /// TOML file (when given) overridden by the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, &|key: &str| env::var(key).ok())
    }

    pub fn load_with(path: Option<&Path>, lookup: EnvLookup<'_>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: EnvLookup<'_>) -> Result<()> {
        self.input
            .apply_env(lookup)
            .context("Failed to load input config")?;
        self.analysis
            .apply_env(lookup)
            .context("Failed to load analysis config")?;
        self.output.apply_env(lookup);
        self.normalize();
        Ok(())
    }

    /// Symbols and override keys are upper-case throughout.
    fn normalize(&mut self) {
        for symbol in &mut self.input.symbols {
            *symbol = symbol.trim().to_uppercase();
        }
        self.input.files = std::mem::take(&mut self.input.files)
            .into_iter()
            .map(|(symbol, path)| (symbol.trim().to_uppercase(), path))
            .collect();
        self.analysis.differencing_overrides =
            std::mem::take(&mut self.analysis.differencing_overrides)
                .into_iter()
                .map(|(symbol, d)| (symbol.trim().to_uppercase(), d))
                .collect();
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.symbols.is_empty() {
            anyhow::bail!("At least one symbol must be configured");
        }
        if self.input.close_column.trim().is_empty() {
            anyhow::bail!("Close column name must not be empty");
        }
        if !self.input.file_pattern.contains(SYMBOL_PLACEHOLDER) {
            anyhow::bail!(
                "File pattern '{}' must contain {}",
                self.input.file_pattern,
                SYMBOL_PLACEHOLDER
            );
        }
        let significance = self.analysis.significance;
        if !(significance > 0.0 && significance < 1.0) {
            anyhow::bail!("Significance must be in (0, 1), got {}", significance);
        }
        let confidence = self.analysis.confidence_level;
        if !(confidence > 0.0 && confidence < 1.0) {
            anyhow::bail!("Confidence level must be in (0, 1), got {}", confidence);
        }
        if self.analysis.horizon == 0 {
            anyhow::bail!("Forecast horizon must be at least 1");
        }
        if self.analysis.max_lags == 0 {
            anyhow::bail!("Max lags must be at least 1");
        }
        for (symbol, d) in &self.analysis.differencing_overrides {
            if *d > MAX_DIFFERENCING {
                anyhow::bail!(
                    "Differencing order for {} must be at most {}, got {}",
                    symbol,
                    MAX_DIFFERENCING,
                    d
                );
            }
        }
        Ok(())
    }
}

fn parse_usize(lookup: EnvLookup<'_>, key: &str, default: usize) -> Result<usize> {
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<usize>()
        .context(format!("Failed to parse {}", key))
}

fn parse_f64(lookup: EnvLookup<'_>, key: &str, default: f64) -> Result<f64> {
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<f64>()
        .context(format!("Failed to parse {}", key))
}

fn parse_bool(lookup: EnvLookup<'_>, key: &str, default: bool) -> bool {
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<bool>()
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::load_with(None, &no_env).expect("Should load with defaults");
        assert_eq!(config, Config::default());
        assert_eq!(config.output.output_dir, PathBuf::from("."));
        assert!(config.output.plots_enabled);
        assert!(!config.output.json_report);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
            [input]
            symbols = ["msft", "AAPL"]

            [analysis]
            horizon = 1
            differencing_overrides = { googl = 2 }

            [output]
            json_report = true
            "#,
        )
        .unwrap();
        assert_eq!(config.input.symbols, vec!["MSFT", "AAPL"]);
        assert_eq!(config.input.close_column, "CLOSE");
        assert_eq!(config.analysis.horizon, 1);
        assert_eq!(config.analysis.differencing_for("GOOGL"), Some(2));
        assert_eq!(config.analysis.significance, 0.05);
        assert!(config.output.json_report);
    }

    #[test]
    fn test_env_takes_precedence_over_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("closecast.toml");
        fs::write(&path, "[analysis]\nhorizon = 3\nmax_lags = 5\n").unwrap();

        let lookup = |key: &str| (key == "CLOSECAST_HORIZON").then(|| "7".to_string());
        let config = Config::load_with(Some(&path), &lookup).unwrap();
        assert_eq!(config.analysis.horizon, 7);
        assert_eq!(config.analysis.max_lags, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.analysis.horizon = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.differencing_overrides.insert("AAPL".to_string(), 3);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.input.symbols.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.confidence_level = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_matches_load_without_file() {
        let from_env = Config::from_env().map_err(|e| e.to_string());
        let loaded = Config::load(None).map_err(|e| e.to_string());
        assert_eq!(from_env, loaded);
    }

    #[test]
    fn test_missing_toml_file_is_an_error() {
        let err = Config::load_with(Some(Path::new("/nonexistent/closecast.toml")), &no_env)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

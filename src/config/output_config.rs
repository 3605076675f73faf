//! Output configuration: chart and report destinations.

use super::{EnvLookup, parse_bool};
use serde::Deserialize;
use std::path::PathBuf;

/// Output environment configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub plots_enabled: bool,
    pub json_report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            plots_enabled: true,
            json_report: false,
        }
    }
}

impl OutputConfig {
    pub fn apply_env(&mut self, lookup: EnvLookup<'_>) {
        if let Some(dir) = lookup("CLOSECAST_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        self.plots_enabled = parse_bool(lookup, "CLOSECAST_PLOTS", self.plots_enabled);
        self.json_report = parse_bool(lookup, "CLOSECAST_JSON_REPORT", self.json_report);
    }

    pub fn correlogram_path(&self, symbol: &str) -> PathBuf {
        self.output_dir.join(format!("{}_correlogram.png", symbol))
    }

    pub fn forecast_path(&self, symbol: &str) -> PathBuf {
        self.output_dir.join(format!("{}_forecast.png", symbol))
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("analysis_report.json")
    }
}

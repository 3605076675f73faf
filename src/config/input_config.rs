//! Input configuration: which symbols to load and where their files live.

use super::EnvLookup;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Placeholder substituted with the symbol in [`InputConfig::file_pattern`].
pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";

/// Input environment configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory searched for spreadsheets when no explicit file is given.
    pub input_dir: PathBuf,
    /// Symbols to analyse, in reporting order.
    pub symbols: Vec<String>,
    /// Header of the closing-price column.
    pub close_column: String,
    /// Substring a file name must contain to match a symbol.
    pub file_pattern: String,
    /// Explicit `symbol -> path` assignments, bypassing discovery.
    pub files: BTreeMap<String, PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            symbols: vec!["AAPL".to_string(), "NVDA".to_string(), "GOOGL".to_string()],
            close_column: "CLOSE".to_string(),
            file_pattern: format!("{} 3min", SYMBOL_PLACEHOLDER),
            files: BTreeMap::new(),
        }
    }
}

impl InputConfig {
    pub fn apply_env(&mut self, lookup: EnvLookup<'_>) -> Result<()> {
        if let Some(dir) = lookup("CLOSECAST_INPUT_DIR") {
            self.input_dir = PathBuf::from(dir);
        }
        if let Some(symbols) = lookup("CLOSECAST_SYMBOLS") {
            self.symbols = parse_symbol_list(&symbols);
        }
        if let Some(column) = lookup("CLOSECAST_CLOSE_COLUMN") {
            self.close_column = column;
        }
        if let Some(pattern) = lookup("CLOSECAST_FILE_PATTERN") {
            self.file_pattern = pattern;
        }
        if let Some(files) = lookup("CLOSECAST_FILES") {
            for part in files.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (symbol, path) =
                    parse_file_assignment(part).context("Failed to parse CLOSECAST_FILES")?;
                self.files.insert(symbol, path);
            }
        }
        Ok(())
    }

    /// The discovery pattern for one symbol, e.g. `"AAPL 3min"`.
    pub fn pattern_for(&self, symbol: &str) -> String {
        self.file_pattern.replace(SYMBOL_PLACEHOLDER, symbol)
    }
}

/// Splits `"AAPL, nvda ,GOOGL"` into upper-cased, non-empty symbols.
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses `SYMBOL=path`.
pub fn parse_file_assignment(raw: &str) -> Result<(String, PathBuf)> {
    let (symbol, path) = raw
        .split_once('=')
        .context(format!("expected SYMBOL=PATH, got '{}'", raw))?;
    let symbol = symbol.trim().to_uppercase();
    let path = path.trim();
    if symbol.is_empty() || path.is_empty() {
        anyhow::bail!("expected SYMBOL=PATH, got '{}'", raw);
    }
    Ok((symbol, PathBuf::from(path)))
}

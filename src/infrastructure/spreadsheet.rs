//! Loading closing-price columns from Excel/ODS workbooks and CSV files.

use crate::config::InputConfig;
use crate::domain::errors::DataError;
use crate::domain::series::PriceSeries;
use calamine::{Data, Reader, open_workbook_auto};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extensions handled by `calamine`.
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Workbook,
    Csv,
}

fn input_format(path: &Path) -> Option<InputFormat> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    if extension == "csv" {
        Some(InputFormat::Csv)
    } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        Some(InputFormat::Workbook)
    } else {
        None
    }
}

/// Reads one numeric column, located by its header, from the first sheet.
pub struct SpreadsheetLoader {
    close_column: String,
}

impl SpreadsheetLoader {
    pub fn new(close_column: impl Into<String>) -> Self {
        Self {
            close_column: close_column.into(),
        }
    }

    /// Loads `symbol`'s closing prices from `path`.
    ///
    /// Empty or non-numeric cells become NaN so they are counted as missing
    /// by the validity check rather than silently dropped here.
    pub fn load(&self, symbol: &str, path: &Path) -> Result<PriceSeries, DataError> {
        let values = match input_format(path) {
            Some(InputFormat::Csv) => self.read_csv(path)?,
            Some(InputFormat::Workbook) => self.read_workbook(path)?,
            None => {
                return Err(DataError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };
        info!("Loaded {} rows for {} from {}", values.len(), symbol, path.display());
        Ok(PriceSeries::new(symbol, values))
    }

    fn read_csv(&self, path: &Path) -> Result<Vec<f64>, DataError> {
        let file = File::open(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(BufReader::new(file));
        let csv_error = |source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let headers = reader.headers().map_err(csv_error)?.clone();
        if headers.is_empty() {
            return Err(DataError::EmptySheet {
                path: path.to_path_buf(),
            });
        }
        let column = headers
            .iter()
            .position(|h| h.trim() == self.close_column)
            .ok_or_else(|| DataError::MissingColumn {
                column: self.close_column.clone(),
                path: path.to_path_buf(),
            })?;

        let mut values = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            values.push(record.get(column).map_or(f64::NAN, parse_price));
        }
        Ok(values)
    }

    fn read_workbook(&self, path: &Path) -> Result<Vec<f64>, DataError> {
        let spreadsheet_error = |reason: String| DataError::Spreadsheet {
            path: path.to_path_buf(),
            reason,
        };
        let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_error(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| DataError::EmptySheet {
                path: path.to_path_buf(),
            })?
            .map_err(|e| spreadsheet_error(e.to_string()))?;

        let mut rows = range.rows();
        let header = rows.next().ok_or_else(|| DataError::EmptySheet {
            path: path.to_path_buf(),
        })?;
        let column = header
            .iter()
            .position(|cell| cell.to_string().trim() == self.close_column)
            .ok_or_else(|| DataError::MissingColumn {
                column: self.close_column.clone(),
                path: path.to_path_buf(),
            })?;

        Ok(rows
            .map(|row| row.get(column).map_or(f64::NAN, cell_value))
            .collect())
    }
}

fn parse_price(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn cell_value(cell: &Data) -> f64 {
    match cell {
        Data::Float(v) => *v,
        Data::Int(v) => *v as f64,
        Data::String(s) => parse_price(s),
        _ => f64::NAN,
    }
}

/// Finds the input file for `symbol`: the first file, by name, in `dir`
/// whose name contains `pattern` and has a supported extension.
pub fn discover_file(dir: &Path, symbol: &str, pattern: &str) -> Result<PathBuf, DataError> {
    let entries = fs::read_dir(dir).map_err(|source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && input_format(path).is_some())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.contains(pattern))
        })
        .collect();
    candidates.sort();

    debug!("Candidates for {}: {:?}", symbol, candidates);
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| DataError::FileNotFound {
            symbol: symbol.to_string(),
            pattern: pattern.to_string(),
            dir: dir.to_path_buf(),
        })
}

/// Resolves every configured symbol to a file, explicit assignments first.
pub fn resolve_inputs(config: &InputConfig) -> Result<Vec<(String, PathBuf)>, DataError> {
    config
        .symbols
        .iter()
        .map(|symbol| {
            let path = match config.files.get(symbol) {
                Some(path) if path.is_file() => path.clone(),
                Some(path) => {
                    return Err(DataError::FileNotFound {
                        symbol: symbol.clone(),
                        pattern: path.display().to_string(),
                        dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                    });
                }
                None => discover_file(&config.input_dir, symbol, &config.pattern_for(symbol))?,
            };
            Ok((symbol.clone(), path))
        })
        .collect()
}

/// Loads every configured symbol in order.
pub fn load_all(config: &InputConfig) -> Result<Vec<PriceSeries>, DataError> {
    let loader = SpreadsheetLoader::new(&config.close_column);
    resolve_inputs(config)?
        .iter()
        .map(|(symbol, path)| loader.load(symbol, path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_csv_close_column_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "AAPL 3min.csv",
            "TIME,OPEN,CLOSE\n1,1.0,10.5\n2,1.0,\n3,1.0,inf\n4,1.0,n/a\n5,1.0,11\n",
        );

        let series = SpreadsheetLoader::new("CLOSE").load("AAPL", &path).unwrap();
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.len(), 5);
        let counts = series.invalid_counts();
        assert_eq!(counts.nan_count, 2);
        assert_eq!(counts.inf_count, 1);
        assert_eq!(series.values()[4], 11.0);
    }

    fn write_workbook(path: &Path, header: &str) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "TIME").unwrap();
        sheet.write_string(0, 1, header).unwrap();
        for row in 1..=4 {
            sheet.write_number(row, 0, row as f64).unwrap();
        }
        sheet.write_number(1, 1, 187.5).unwrap();
        // row 2 left empty
        sheet.write_string(3, 1, "n/a").unwrap();
        sheet.write_number(4, 1, 188.25).unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_workbook_close_column_with_empty_and_text_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL 3min.xlsx");
        write_workbook(&path, "CLOSE");

        let series = SpreadsheetLoader::new("CLOSE").load("AAPL", &path).unwrap();
        let values = series.values();
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], 187.5);
        assert!(values[1].is_nan());
        assert!(values[2].is_nan());
        assert_eq!(values[3], 188.25);
        let counts = series.invalid_counts();
        assert_eq!(counts.nan_count, 2);
        assert_eq!(counts.inf_count, 0);
    }

    #[test]
    fn test_workbook_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL 3min.xlsx");
        write_workbook(&path, "PRICE");

        let err = SpreadsheetLoader::new("CLOSE").load("AAPL", &path).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column, .. } if column == "CLOSE"));
    }

    #[test]
    fn test_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "x.csv", "OPEN,HIGH\n1,2\n");
        let err = SpreadsheetLoader::new("CLOSE").load("X", &path).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "x.txt", "CLOSE\n1\n");
        let err = SpreadsheetLoader::new("CLOSE").load("X", &path).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_discovery_matches_renamed_copies() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "NVDA 3min (10).csv", "CLOSE\n1\n");
        write(dir.path(), "NVDA 3min (2).csv", "CLOSE\n1\n");
        write(dir.path(), "NVDA 3min notes.txt", "ignored");

        let found = discover_file(dir.path(), "NVDA", "NVDA 3min").unwrap();
        assert_eq!(found.file_name().unwrap(), "NVDA 3min (10).csv");

        let err = discover_file(dir.path(), "AAPL", "AAPL 3min").unwrap_err();
        assert!(matches!(err, DataError::FileNotFound { .. }));
    }

    #[test]
    fn test_explicit_files_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "prices.csv", "CLOSE\n1\n2\n");
        write(dir.path(), "AAPL 3min.csv", "CLOSE\n9\n");

        let mut config = InputConfig {
            input_dir: dir.path().to_path_buf(),
            symbols: vec!["AAPL".to_string()],
            ..InputConfig::default()
        };
        config.files.insert("AAPL".to_string(), explicit.clone());

        let resolved = resolve_inputs(&config).unwrap();
        assert_eq!(resolved, vec![("AAPL".to_string(), explicit)]);

        config.files.insert("AAPL".to_string(), dir.path().join("missing.csv"));
        assert!(matches!(
            resolve_inputs(&config),
            Err(DataError::FileNotFound { .. })
        ));
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading and validating price data.
///
/// Every variant here aborts the run: without clean input there is nothing to analyse.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("No input file found for {symbol} (looked for '{pattern}' in {dir})")]
    FileNotFound {
        symbol: String,
        pattern: String,
        dir: PathBuf,
    },

    #[error("Column '{column}' not found in {path}. Please verify the column name.")]
    MissingColumn { column: String, path: PathBuf },

    #[error("Sheet in {path} is empty")]
    EmptySheet { path: PathBuf },

    #[error("Unsupported input format for {path}: expected .xlsx, .xlsm, .xls, .ods or .csv")]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to read spreadsheet {path}: {reason}")]
    Spreadsheet { path: PathBuf, reason: String },

    #[error("Failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{symbol} data still contains NaN or inf values after cleaning.")]
    InvalidValuesRemain { symbol: String },
}

/// Errors raised by the statistical routines.
///
/// These are reported per step and never abort the run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("too few observations: need {required}, got {actual}")]
    InsufficientObservations { required: usize, actual: usize },

    #[error("Invalid input, series is constant")]
    ConstantSeries,

    #[error("design matrix is singular or ill-conditioned")]
    SingularMatrix,

    #[error("series lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("likelihood evaluation produced a non-finite value")]
    NonFiniteLikelihood,

    #[error("no MacKinnon table entry for regression '{regression}' with {n_vars} variable(s)")]
    UnsupportedTableEntry { regression: String, n_vars: usize },
}

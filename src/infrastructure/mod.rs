pub mod charts;
pub mod spreadsheet;

pub use charts::{ChartError, ChartRenderer};
pub use spreadsheet::{SpreadsheetLoader, discover_file, load_all, resolve_inputs};

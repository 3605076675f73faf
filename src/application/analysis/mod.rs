// Analysis pipeline and its console/JSON output
pub mod engine;
pub mod reporting;

pub use engine::AnalysisEngine;
pub use reporting::{AnalysisReport, AnalysisReporter, PairReport, SymbolReport};

// Price series and cleaning
pub mod series;

// Statistical result types
pub mod diagnostics;

// Domain-specific error types
pub mod errors;

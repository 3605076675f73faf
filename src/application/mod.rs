// Pure statistical routines
pub mod statistics;

// Pipeline orchestration and reporting
pub mod analysis;

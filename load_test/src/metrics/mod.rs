// Metrics module
// Collection, console reporting and run summaries

pub mod collector;
pub mod reporter;
pub mod summary;
pub mod types;

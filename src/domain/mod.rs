// Domain layer - Time series core and dashboard models
pub mod chart;
pub mod dashboard;
pub mod error;
pub mod ingest;
pub mod series;

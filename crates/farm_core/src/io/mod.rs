//! Input ingestion (farm JSON document, weather CSV) and buffered
//! per-year report emission.

pub mod config;
pub mod report;
pub mod weather;

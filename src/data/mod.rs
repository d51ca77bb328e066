//! Data module - accident file loading and aggregation

mod loader;
mod processor;
mod year;

pub use loader::{DataLoader, LoaderError, YearLoadFailure};
pub use processor::{DataProcessor, MonthCounts, MonthlySummary, ProcessorError};
pub use year::{make_filename, ConversionError, StateCode, Year};

/// Source columns used by the analysis.
pub const MONTH: &str = "MONTH";
pub const STATE: &str = "STATE";
pub const LATITUDE: &str = "LATITUDE";
pub const LONGITUDE: &str = "LONGITUD";

/// Column injected when tagging rows with their source year.
pub const YEAR: &str = "year";

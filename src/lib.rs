//! FARS Analysis - yearly traffic accident files, monthly summaries and state maps
//!
//! Loads `accident_<year>.csv.bz2` files with Polars, counts accidents per
//! month across years, and renders per-state location maps with plotters.

pub mod charts;
pub mod config;
pub mod data;
pub mod logging;

#[cfg(test)]
mod test_support;

pub use charts::{
    AccidentLocations, BoundaryError, PlotError, PlotOutcome, StateBoundaries, StateMapPlotter,
};
pub use config::{AnalysisConfig, CsvOptions, PlotSettings};
pub use data::{
    make_filename, ConversionError, DataLoader, DataProcessor, LoaderError, MonthlySummary,
    ProcessorError, StateCode, Year, YearLoadFailure,
};

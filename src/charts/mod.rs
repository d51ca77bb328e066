//! Charts module - static map rendering

mod boundaries;
mod state_map;

pub use boundaries::{BoundaryError, StateBoundaries, StateBoundary};
pub use state_map::{
    AccidentLocations, PlotError, PlotOutcome, StateMapPlotter, LATITUDE_SENTINEL,
    LONGITUDE_SENTINEL,
};

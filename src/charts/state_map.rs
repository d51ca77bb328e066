//! State Map Renderer
//! Scatter plot of one state's accident locations for one year.
//!
//! Layout:
//! 1. Title: "<state name> accidents, <year>" centered
//! 2. Longitude/latitude graticule covering the outline and the accidents
//! 3. State outline from the configured boundary file
//! 4. One filled dot per accident with both coordinates known

use super::boundaries::{BoundaryError, StateBoundaries, StateBoundary};
use crate::config::{AnalysisConfig, PlotSettings};
use crate::data::{DataLoader, LoaderError, StateCode, Year, LATITUDE, LONGITUDE, STATE};
use plotters::prelude::{
    BitMapBackend, ChartBuilder, Circle, Color, IntoDrawingArea, PathElement, RGBColor, BLACK,
    WHITE,
};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Longitudes above this mark an unknown location in the source files.
pub const LONGITUDE_SENTINEL: f64 = 900.0;
/// Latitudes above this mark an unknown location in the source files.
pub const LATITUDE_SENTINEL: f64 = 90.0;

const POINT_COLOR: RGBColor = RGBColor(231, 76, 60);

#[derive(Error, Debug)]
pub enum PlotError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error("invalid STATE number: {0}")]
    InvalidState(StateCode),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Boundaries(#[from] BoundaryError),
    #[error("Failed to write map: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to render map: {0}")]
    Render(String),
}

fn render_error<E: Display>(err: E) -> PlotError {
    PlotError::Render(err.to_string())
}

/// What a call to [`StateMapPlotter::map_state`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotOutcome {
    Rendered {
        path: PathBuf,
        points: usize,
        /// Outline rings drawn under the points.
        outline_rings: usize,
    },
    /// The state had no accident rows.
    NoAccidents,
    /// Rows matched but none had both coordinates known.
    NoLocations,
}

/// Plottable coordinates after sentinel values are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccidentLocations {
    points: Vec<(f64, f64)>,
    longitude_range: Option<(f64, f64)>,
    latitude_range: Option<(f64, f64)>,
}

impl AccidentLocations {
    /// Read `LONGITUD`/`LATITUDE`, treating sentinel, NaN and null cells as
    /// missing. Each axis range covers that axis' known values only.
    pub fn from_frame(df: &DataFrame) -> Result<Self, PolarsError> {
        let lon = df.column(LONGITUDE)?.cast(&DataType::Float64)?;
        let lat = df.column(LATITUDE)?.cast(&DataType::Float64)?;
        let lon_ca = lon.f64()?;
        let lat_ca = lat.f64()?;

        let mut locations = Self::default();
        for i in 0..df.height() {
            let x = lon_ca
                .get(i)
                .filter(|v| !v.is_nan() && *v <= LONGITUDE_SENTINEL);
            let y = lat_ca
                .get(i)
                .filter(|v| !v.is_nan() && *v <= LATITUDE_SENTINEL);

            if let Some(x) = x {
                locations.longitude_range = Some(extend(locations.longitude_range, x));
            }
            if let Some(y) = y {
                locations.latitude_range = Some(extend(locations.latitude_range, y));
            }
            if let (Some(x), Some(y)) = (x, y) {
                locations.points.push((x, y));
            }
        }
        Ok(locations)
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn longitude_range(&self) -> Option<(f64, f64)> {
        self.longitude_range
    }

    pub fn latitude_range(&self) -> Option<(f64, f64)> {
        self.latitude_range
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn extend(range: Option<(f64, f64)>, v: f64) -> (f64, f64) {
    match range {
        Some((lo, hi)) => (lo.min(v), hi.max(v)),
        None => (v, v),
    }
}

fn union((lo, hi): (f64, f64), (other_lo, other_hi): (f64, f64)) -> (f64, f64) {
    (lo.min(other_lo), hi.max(other_hi))
}

/// Widen a (min, max) pair a little so edge points stay inside the frame.
fn padded((lo, hi): (f64, f64)) -> Range<f64> {
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { 0.5 };
    (lo - pad)..(hi + pad)
}

/// Renders accident location maps as PNG files.
pub struct StateMapPlotter {
    loader: DataLoader,
    settings: PlotSettings,
}

impl StateMapPlotter {
    pub fn new(loader: DataLoader, settings: PlotSettings) -> Self {
        Self { loader, settings }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(DataLoader::from_config(config), config.plot.clone())
    }

    pub fn output_path(&self, state: StateCode, year: Year) -> PathBuf {
        self.settings
            .output_dir
            .join(format!("accidents_{}_{}.png", state, year))
    }

    /// Plot every located accident for `state` in `year`.
    ///
    /// A missing data file or a state number absent from that year's data is
    /// an error. A state with nothing to draw is not.
    pub fn map_state(&self, state: StateCode, year: Year) -> Result<PlotOutcome, PlotError> {
        let df = self.loader.load_year(year)?;

        if !Self::distinct_states(&df)?.contains(&state) {
            return Err(PlotError::InvalidState(state));
        }

        let rows = df
            .lazy()
            .filter(col(STATE).cast(DataType::Int64).eq(lit(state.get())))
            .collect()?;
        self.plot_rows(state, year, &rows)
    }

    /// Plot rows already narrowed to one state.
    pub fn plot_rows(
        &self,
        state: StateCode,
        year: Year,
        rows: &DataFrame,
    ) -> Result<PlotOutcome, PlotError> {
        if rows.height() == 0 {
            info!(%state, %year, "no accidents to plot");
            return Ok(PlotOutcome::NoAccidents);
        }

        let locations = AccidentLocations::from_frame(rows)?;
        let ranges = locations
            .longitude_range()
            .zip(locations.latitude_range())
            .filter(|_| !locations.is_empty());
        let Some((mut lon, mut lat)) = ranges else {
            info!(%state, %year, rows = rows.height(), "no accident locations to plot");
            return Ok(PlotOutcome::NoLocations);
        };

        let outline = self.load_outline(state)?;
        if let Some((outline_lon, outline_lat)) =
            outline.as_ref().and_then(StateBoundary::extent)
        {
            lon = union(lon, outline_lon);
            lat = union(lat, outline_lat);
        }
        let rings = outline.as_ref().map(StateBoundary::rings).unwrap_or_default();

        let name = outline
            .and_then(|b| b.name)
            .unwrap_or_else(|| format!("State {}", state));
        let path = self.output_path(state, year);
        let title = format!("{} accidents, {}", name, year);
        self.render(&path, &title, &rings, &locations, padded(lon), padded(lat))?;

        debug!(path = %path.display(), points = locations.points().len(), "rendered state map");
        Ok(PlotOutcome::Rendered {
            path,
            points: locations.points().len(),
            outline_rings: rings.len(),
        })
    }

    /// The state's outline from `PlotSettings::boundaries_path`, read per call.
    fn load_outline(&self, state: StateCode) -> Result<Option<StateBoundary>, PlotError> {
        let Some(path) = &self.settings.boundaries_path else {
            warn!(%state, "no boundary file configured, drawing accidents without an outline");
            return Ok(None);
        };
        let outline = StateBoundaries::from_geojson_file(path)?.get(state).cloned();
        if outline.is_none() {
            warn!(%state, path = %path.display(), "no outline for state in boundary file");
        }
        Ok(outline)
    }

    fn distinct_states(df: &DataFrame) -> Result<BTreeSet<StateCode>, PolarsError> {
        let states = df.column(STATE)?.cast(&DataType::Int64)?;
        Ok(states
            .i64()?
            .into_iter()
            .flatten()
            .map(StateCode::new)
            .collect())
    }

    fn render(
        &self,
        path: &Path,
        title: &str,
        rings: &[Vec<(f64, f64)>],
        locations: &AccidentLocations,
        x_range: Range<f64>,
        y_range: Range<f64>,
    ) -> Result<(), PlotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let root = BitMapBackend::new(path, (self.settings.width, self.settings.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(x_range, y_range)
            .map_err(render_error)?;

        chart
            .configure_mesh()
            .x_desc("Longitude")
            .y_desc("Latitude")
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(
                rings
                    .iter()
                    .map(|ring| PathElement::new(ring.clone(), BLACK.stroke_width(1))),
            )
            .map_err(render_error)?;

        let radius = self.settings.point_radius as i32;
        chart
            .draw_series(
                locations
                    .points()
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), radius, POINT_COLOR.filled())),
            )
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
        Ok(())
    }
}

//! State Boundaries
//! State outlines read from a GeoJSON feature collection, keyed by FIPS code.
//!
//! A feature's code comes from its `STATEFP` or `STATE` property, falling
//! back to the feature id. `NAME` is used for map titles when present.

use crate::data::StateCode;
use geo::{BoundingRect, Geometry, MultiPolygon};
use geojson::feature::Id;
use geojson::{Feature, GeoJson};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("Failed to read boundaries: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("boundaries must be a GeoJSON FeatureCollection")]
    NotFeatureCollection,
}

#[derive(Debug, Clone)]
pub struct StateBoundary {
    pub name: Option<String>,
    pub shape: MultiPolygon<f64>,
}

impl StateBoundary {
    /// Every exterior and interior ring as a closed path of (lon, lat).
    pub fn rings(&self) -> Vec<Vec<(f64, f64)>> {
        self.shape
            .0
            .iter()
            .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
            .map(|ring| ring.coords().map(|c| (c.x, c.y)).collect())
            .collect()
    }

    /// (min lon, max lon), (min lat, max lat) of the outline.
    pub fn extent(&self) -> Option<((f64, f64), (f64, f64))> {
        let rect = self.shape.bounding_rect()?;
        Some((
            (rect.min().x, rect.max().x),
            (rect.min().y, rect.max().y),
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateBoundaries {
    states: HashMap<StateCode, StateBoundary>,
}

impl StateBoundaries {
    pub fn from_geojson_file(path: &Path) -> Result<Self, BoundaryError> {
        Self::from_geojson_str(&fs::read_to_string(path)?)
    }

    /// Features without a usable code or polygon geometry are skipped.
    pub fn from_geojson_str(text: &str) -> Result<Self, BoundaryError> {
        let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
            return Err(BoundaryError::NotFeatureCollection);
        };

        let mut states = HashMap::new();
        for feature in collection.features {
            let Some(code) = state_code(&feature) else {
                continue;
            };
            let name = feature
                .property("NAME")
                .and_then(Value::as_str)
                .map(str::to_string);
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let shape = match Geometry::<f64>::try_from(geometry.value)? {
                Geometry::Polygon(polygon) => MultiPolygon(vec![polygon]),
                Geometry::MultiPolygon(shape) => shape,
                _ => continue,
            };
            states.insert(code, StateBoundary { name, shape });
        }
        Ok(Self { states })
    }

    pub fn get(&self, state: StateCode) -> Option<&StateBoundary> {
        self.states.get(&state)
    }
}

fn state_code(feature: &Feature) -> Option<StateCode> {
    let from_value = |value: &Value| match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64().map(StateCode::new),
        _ => None,
    };

    feature
        .property("STATEFP")
        .and_then(from_value)
        .or_else(|| feature.property("STATE").and_then(from_value))
        .or_else(|| match feature.id.as_ref()? {
            Id::String(s) => s.parse().ok(),
            Id::Number(n) => n.as_i64().map(StateCode::new),
        })
}

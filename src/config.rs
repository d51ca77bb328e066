//! Configuration Module
//! Explicit CSV parsing and plot output settings, loadable from JSON.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How accident files are parsed. Nothing is taken from ambient defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub separator: char,
    pub has_header: bool,
    /// Rows scanned to infer column types; `None` scans the whole file.
    pub infer_schema_length: Option<usize>,
    /// Cell values read as missing.
    pub null_values: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            has_header: true,
            infer_schema_length: Some(10000),
            null_values: vec![String::new(), "NA".to_string()],
        }
    }
}

/// Where and how big state maps are rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSettings {
    pub output_dir: PathBuf,
    /// GeoJSON FeatureCollection of state outlines keyed by FIPS code.
    pub boundaries_path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub point_radius: u32,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            boundaries_path: None,
            width: 800,
            height: 600,
            point_radius: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory holding the `accident_<year>.csv.bz2` files.
    pub data_dir: PathBuf,
    pub csv: CsvOptions,
    pub plot: PlotSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            csv: CsvOptions::default(),
            plot: PlotSettings::default(),
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file; missing fields fall back to defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

//! Fixtures shared by the unit tests.

use anyhow::Result;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

pub const HEADER: &str = "ST_CASE,STATE,MONTH,DAY,LATITUDE,LONGITUD";

/// California as a box, Hawaii as two triangles, and one feature with no code.
pub const BOUNDARIES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": { "STATEFP": "06", "NAME": "California" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-125.0, 32.0], [-114.0, 32.0], [-114.0, 42.0], [-125.0, 42.0], [-125.0, 32.0]]]
            }
        },
        {
            "type": "Feature",
            "properties": { "STATE": 15 },
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [
                    [[[-156.0, 20.0], [-155.0, 20.0], [-155.0, 21.0], [-156.0, 20.0]]],
                    [[[-158.3, 21.2], [-157.6, 21.2], [-157.6, 21.7], [-158.3, 21.2]]]
                ]
            }
        },
        {
            "type": "Feature",
            "properties": { "NAME": "Nowhere" },
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
        }
    ]
}"#;

/// Write `rows` under the standard header as a bzip2 file named for `year`.
pub fn write_year(dir: &Path, year: i32, rows: &[&str]) -> Result<PathBuf> {
    let path = dir.join(format!("accident_{year}.csv.bz2"));
    let mut encoder = BzEncoder::new(File::create(&path)?, Compression::default());
    writeln!(encoder, "{HEADER}")?;
    for row in rows {
        writeln!(encoder, "{row}")?;
    }
    encoder.finish()?;
    Ok(path)
}

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        let buf = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Run `f` with a subscriber that writes into this buffer.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

pub struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter(Arc::clone(&self.0))
    }
}

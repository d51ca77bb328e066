//! Accident File Loader Module
//! Reads yearly accident files (bzip2 or plain CSV) into Polars frames.

use super::year::{make_filename, Year};
use super::{MONTH, YEAR};
use crate::config::{AnalysisConfig, CsvOptions};
use bzip2::read::MultiBzDecoder;
use polars::prelude::*;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const BZIP2_MAGIC: &[u8] = b"BZh";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("file '{}' does not exist", path.display())]
    FileNotFound { path: PathBuf },
    #[error("separator {0:?} is not a single-byte character")]
    InvalidSeparator(char),
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to load CSV: {0}")]
    Polars(#[from] PolarsError),
}

/// One year that could not be loaded by [`DataLoader::read_years`].
#[derive(Error, Debug)]
#[error("invalid year: {year}")]
pub struct YearLoadFailure {
    pub year: Year,
    #[source]
    pub source: LoaderError,
}

/// Loads accident files from a data directory with explicit parse options.
#[derive(Debug, Clone)]
pub struct DataLoader {
    data_dir: PathBuf,
    options: CsvOptions,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_options(data_dir, CsvOptions::default())
    }

    pub fn with_options(data_dir: impl Into<PathBuf>, options: CsvOptions) -> Self {
        Self {
            data_dir: data_dir.into(),
            options,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::with_options(config.data_dir.clone(), config.csv.clone())
    }

    /// Full path of the canonical file for `year`.
    pub fn year_path(&self, year: Year) -> PathBuf {
        self.data_dir.join(make_filename(year))
    }

    /// Read a whole accident file.
    ///
    /// Columns come back exactly as named in the header, rows in file order,
    /// with types inferred by the CSV reader.
    pub fn fars_read(&self, path: impl AsRef<Path>) -> Result<DataFrame, LoaderError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(LoaderError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let raw = fs::read(path)?;
        let bytes = if raw.starts_with(BZIP2_MAGIC) {
            let mut decoded = Vec::with_capacity(raw.len() * 8);
            MultiBzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
            decoded
        } else {
            raw
        };

        let df = CsvReadOptions::default()
            .with_has_header(self.options.has_header)
            .with_infer_schema_length(self.options.infer_schema_length)
            .with_parse_options(self.parse_options()?)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        debug!(path = %path.display(), rows = df.height(), "loaded accident file");
        Ok(df)
    }

    /// Read the canonical file for one year.
    pub fn load_year(&self, year: Year) -> Result<DataFrame, LoaderError> {
        self.fars_read(self.year_path(year))
    }

    /// Load each year and keep only `MONTH` plus an injected `year` column.
    ///
    /// One entry per input year, in input order. A year that fails to load
    /// becomes an `Err` and a warning; the remaining years are still read.
    pub fn read_years(&self, years: &[Year]) -> Vec<Result<DataFrame, YearLoadFailure>> {
        years
            .iter()
            .map(|&year| {
                self.load_year(year)
                    .and_then(|df| tag_with_year(&df, year))
                    .map_err(|source| {
                        warn!(%year, error = %source, "invalid year: {}", year);
                        YearLoadFailure { year, source }
                    })
            })
            .collect()
    }

    fn parse_options(&self) -> Result<CsvParseOptions, LoaderError> {
        let separator = self.options.separator;
        if !separator.is_ascii() {
            return Err(LoaderError::InvalidSeparator(separator));
        }

        let null_values = if self.options.null_values.is_empty() {
            None
        } else {
            Some(NullValues::AllColumns(
                self.options
                    .null_values
                    .iter()
                    .map(|v| PlSmallStr::from(v.as_str()))
                    .collect(),
            ))
        };

        Ok(CsvParseOptions::default()
            .with_separator(separator as u8)
            .with_null_values(null_values))
    }
}

/// Project to `MONTH` and a constant `year` column covering every row.
fn tag_with_year(df: &DataFrame, year: Year) -> Result<DataFrame, LoaderError> {
    let month = df.column(MONTH)?.cast(&DataType::Int64)?;
    let year_col = Column::new(YEAR.into(), vec![year.get(); df.height()]);
    Ok(DataFrame::new(vec![month, year_col])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_year, CapturedLogs, HEADER};
    use anyhow::Result;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn missing_file_names_the_path() {
        let loader = DataLoader::new("/definitely/not/here");
        let err = loader.load_year(Year::new(2013)).unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound { .. }));
        assert!(err
            .to_string()
            .contains("/definitely/not/here/accident_2013.csv.bz2"));
    }

    #[test]
    fn reads_bzip2_file_with_all_columns() -> Result<()> {
        let dir = tempdir()?;
        let path = write_year(
            dir.path(),
            2013,
            &[
                "10001,1,1,5,32.64,-85.35",
                "10002,1,2,9,31.10,-88.01",
                "10003,6,2,11,34.05,-118.24",
            ],
        )?;

        let df = DataLoader::new(dir.path()).fars_read(&path)?;
        assert_eq!(df.height(), 3);
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names.join(","), HEADER);
        assert_eq!(df.column("STATE")?.dtype(), &DataType::Int64);
        assert_eq!(df.column("LATITUDE")?.dtype(), &DataType::Float64);

        let cases: Vec<i64> = df
            .column("ST_CASE")?
            .i64()?
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(cases, vec![10001, 10002, 10003]);
        Ok(())
    }

    #[test]
    fn reads_plain_csv_too() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{HEADER}")?;
        writeln!(file, "1,4,7,1,33.4,-112.0")?;
        writeln!(file, "2,4,8,2,NA,-111.9")?;

        let df = DataLoader::new(".").fars_read(file.path())?;
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("LATITUDE")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn custom_separator_is_honoured() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "MONTH;STATE")?;
        writeln!(file, "3;12")?;

        let options = CsvOptions {
            separator: ';',
            ..CsvOptions::default()
        };
        let df = DataLoader::with_options(".", options).fars_read(file.path())?;
        assert_eq!(df.width(), 2);
        assert_eq!(df.column("STATE")?.i64()?.get(0), Some(12));
        Ok(())
    }

    #[test]
    fn filename_round_trip_matches_literal_read() -> Result<()> {
        let dir = tempdir()?;
        write_year(dir.path(), 2014, &["1,1,1,1,30.0,-87.0", "2,2,5,3,61.2,-149.9"])?;
        let loader = DataLoader::new(dir.path());

        let by_year = loader.fars_read(dir.path().join(make_filename(Year::new(2014))))?;
        let literal = loader.fars_read(dir.path().join("accident_2014.csv.bz2"))?;
        assert!(by_year.equals_missing(&literal));
        Ok(())
    }

    #[test]
    fn read_years_isolates_failures() -> Result<()> {
        let dir = tempdir()?;
        write_year(dir.path(), 2013, &["1,1,1,1,30.0,-87.0", "2,1,3,1,30.5,-87.2"])?;
        let loader = DataLoader::new(dir.path());

        let logs = CapturedLogs::default();
        let results = logs.capture(|| loader.read_years(&[Year::new(2013), Year::new(2099)]));

        assert_eq!(results.len(), 2);
        let tagged = results[0].as_ref().expect("2013 should load");
        let names: Vec<String> = tagged
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["MONTH", "year"]);
        assert_eq!(tagged.height(), 2);
        let years: Vec<i32> = tagged.column("year")?.i32()?.into_iter().flatten().collect();
        assert_eq!(years, vec![2013, 2013]);

        let failure = results[1].as_ref().unwrap_err();
        assert_eq!(failure.year, Year::new(2099));
        assert!(matches!(failure.source, LoaderError::FileNotFound { .. }));

        let output = logs.contents();
        assert_eq!(output.matches("WARN").count(), 1);
        assert!(output.contains("invalid year: 2099"));
        Ok(())
    }

    #[test]
    fn duplicate_years_load_independently() -> Result<()> {
        let dir = tempdir()?;
        write_year(dir.path(), 2015, &["1,1,4,1,30.0,-87.0"])?;
        let results = DataLoader::new(dir.path()).read_years(&[Year::new(2015), Year::new(2015)]);
        assert_eq!(results.len(), 2);
        for result in &results {
            let df = result.as_ref().expect("2015 should load");
            assert_eq!(df.height(), 1);
        }
        Ok(())
    }

    #[test]
    fn file_without_month_column_is_a_per_year_failure() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("accident_2016.csv.bz2");
        let mut encoder = bzip2::write::BzEncoder::new(
            std::fs::File::create(&path)?,
            bzip2::Compression::default(),
        );
        writeln!(encoder, "STATE,LATITUDE")?;
        writeln!(encoder, "1,30.0")?;
        encoder.finish()?;

        let results = DataLoader::new(dir.path()).read_years(&[Year::new(2016)]);
        assert!(matches!(
            results[0],
            Err(YearLoadFailure {
                source: LoaderError::Polars(_),
                ..
            })
        ));
        Ok(())
    }
}

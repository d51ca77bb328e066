//! Year and state identifiers
//! Integer normalization of loosely typed inputs and the canonical file naming.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("cannot convert {0:?} to an integer")]
    NotNumeric(String),
    #[error("{0} is outside the integer range")]
    OutOfRange(f64),
}

/// Truncate toward zero, rejecting NaN, infinities and values that do not fit.
fn truncate(value: f64, min: f64, max: f64) -> Result<f64, ConversionError> {
    if !value.is_finite() {
        return Err(ConversionError::NotNumeric(value.to_string()));
    }
    let truncated = value.trunc();
    if truncated < min || truncated > max {
        return Err(ConversionError::OutOfRange(value));
    }
    Ok(truncated)
}

fn parse_number(text: &str) -> Result<f64, ConversionError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ConversionError::NotNumeric(text.to_string()))
}

/// A data year, always held as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Year(i32);

impl Year {
    pub fn new(year: i32) -> Self {
        Self(year)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<f64> for Year {
    type Error = ConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        truncate(value, i32::MIN as f64, i32::MAX as f64).map(|v| Self(v as i32))
    }
}

impl FromStr for Year {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i32>() {
            Ok(year) => Ok(Self(year)),
            Err(_) => Self::try_from(parse_number(s)?),
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric state code as used in the `STATE` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateCode(i64);

impl StateCode {
    pub fn new(code: i64) -> Self {
        Self(code)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<f64> for StateCode {
    type Error = ConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        // i64::MAX is not representable as f64; stay strictly inside it.
        truncate(value, -9.0e18, 9.0e18).map(|v| Self(v as i64))
    }
}

impl FromStr for StateCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(code) => Ok(Self(code)),
            Err(_) => Self::try_from(parse_number(s)?),
        }
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical data file name for a year, e.g. `accident_2013.csv.bz2`.
pub fn make_filename(year: Year) -> String {
    format!("accident_{}.csv.bz2", year.get())
}

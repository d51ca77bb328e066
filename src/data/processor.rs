//! Data Processor Module
//! Combines per-year month tags and pivots them into monthly counts.

use super::loader::DataLoader;
use super::year::Year;
use super::{MONTH, YEAR};
use polars::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Accident counts for one month, aligned with [`MonthlySummary::years`].
/// Rows whose `MONTH` was empty are collected under `month: None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthCounts {
    pub month: Option<i64>,
    pub counts: Vec<Option<u32>>,
}

/// Months as rows, years as columns. Only months and years that were
/// observed appear; a month/year pair with no rows is `None`. The unknown
/// month row, if any, comes last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlySummary {
    pub years: Vec<Year>,
    pub rows: Vec<MonthCounts>,
}

impl MonthlySummary {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn months(&self) -> Vec<Option<i64>> {
        self.rows.iter().map(|r| r.month).collect()
    }

    /// Count for a month/year cell, `None` when nothing was observed.
    pub fn count(&self, month: Option<i64>, year: Year) -> Option<u32> {
        let idx = self.years.iter().position(|y| *y == year)?;
        self.rows
            .iter()
            .find(|r| r.month == month)
            .and_then(|r| r.counts[idx])
    }

    /// Sum of a year's column, `None` when the year has no column.
    pub fn year_total(&self, year: Year) -> Option<u64> {
        let idx = self.years.iter().position(|y| *y == year)?;
        Some(
            self.rows
                .iter()
                .filter_map(|r| r.counts[idx])
                .map(u64::from)
                .sum(),
        )
    }

    /// Render as a frame: `MONTH` plus one nullable column per year.
    pub fn to_dataframe(&self) -> Result<DataFrame, ProcessorError> {
        let mut columns = Vec::with_capacity(self.years.len() + 1);
        columns.push(Column::new(MONTH.into(), self.months()));

        for (idx, year) in self.years.iter().enumerate() {
            let counts: Vec<Option<u32>> = self.rows.iter().map(|r| r.counts[idx]).collect();
            columns.push(Column::new(year.to_string().into(), counts));
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// Handles aggregation across yearly accident files.
pub struct DataProcessor;

impl DataProcessor {
    /// Monthly accident counts for each year that could be loaded.
    ///
    /// Years that fail to load contribute no column; if none load the result
    /// is empty. Repeated years add into the same column.
    pub fn summarize_years(
        loader: &DataLoader,
        years: &[Year],
    ) -> Result<MonthlySummary, ProcessorError> {
        let tagged: Vec<DataFrame> = loader
            .read_years(years)
            .into_iter()
            .filter_map(Result::ok)
            .collect();

        let Some(combined) = Self::concat(tagged)? else {
            return Ok(MonthlySummary::default());
        };

        let grouped = Self::count_by_year_month(&combined)?;
        let summary = Self::pivot_counts(&grouped)?;
        debug!(
            years = summary.years.len(),
            months = summary.rows.len(),
            "summarized accident counts"
        );
        Ok(summary)
    }

    /// Stack tagged frames; `None` when there is nothing to stack.
    fn concat(frames: Vec<DataFrame>) -> Result<Option<DataFrame>, ProcessorError> {
        let mut frames = frames.into_iter();
        let Some(mut combined) = frames.next() else {
            return Ok(None);
        };
        for df in frames {
            combined.vstack_mut(&df)?;
        }
        Ok(Some(combined))
    }

    /// One row per observed (year, MONTH) with its row count in `n`.
    fn count_by_year_month(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let grouped = df
            .clone()
            .lazy()
            .group_by([col(YEAR), col(MONTH)])
            .agg([len().alias("n")])
            .collect()?;
        Ok(grouped)
    }

    /// Spread grouped counts into month rows and year columns.
    fn pivot_counts(grouped: &DataFrame) -> Result<MonthlySummary, ProcessorError> {
        let year_col = grouped.column(YEAR)?.cast(&DataType::Int64)?;
        let month_col = grouped.column(MONTH)?.cast(&DataType::Int64)?;
        let n_col = grouped.column("n")?.cast(&DataType::UInt32)?;
        let year_ca = year_col.i64()?;
        let month_ca = month_col.i64()?;
        let n_ca = n_col.u32()?;

        // Keyed so that known months sort first and the null month last.
        let mut cells: BTreeMap<(bool, Option<i64>), BTreeMap<Year, u32>> = BTreeMap::new();
        let mut years: Vec<Year> = Vec::new();

        for i in 0..grouped.height() {
            // `year` is injected per loaded row and `n` is a count; neither is null.
            if let (Some(y), Some(n)) = (year_ca.get(i), n_ca.get(i)) {
                let year = Year::new(y as i32);
                if !years.contains(&year) {
                    years.push(year);
                }
                let month = month_ca.get(i);
                *cells
                    .entry((month.is_none(), month))
                    .or_default()
                    .entry(year)
                    .or_default() += n;
            }
        }
        years.sort();

        let rows = cells
            .into_iter()
            .map(|((_, month), by_year)| MonthCounts {
                month,
                counts: years.iter().map(|y| by_year.get(y).copied()).collect(),
            })
            .collect();

        Ok(MonthlySummary { years, rows })
    }
}

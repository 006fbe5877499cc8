//! Outlier handling module.
//!
//! Numeric columns are clipped to `[Q1 - k*IQR, Q3 + k*IQR]`. Values are
//! never removed, so row counts are unaffected.

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::CleaningLogEntry;
use crate::utils::is_numeric_dtype;

/// Quartiles and clip bounds for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Compute bounds from the non-null values of a column.
    ///
    /// Quartiles use linear interpolation between closest ranks
    /// (position `q * (n - 1)` in the sorted values).
    pub fn from_values(values: &[f64], multiplier: f64) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile_linear(&sorted, 0.25);
        let q3 = quantile_linear(&sorted, 0.75);
        let iqr = q3 - q1;

        Some(Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    /// `[lower, upper]` with two decimals, as used in log messages.
    pub fn display(&self) -> String {
        format!("[{:.2}, {:.2}]", self.lower, self.upper)
    }
}

/// Linear-interpolated quantile of already sorted, non-empty values.
pub fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Result of clipping one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipOutcome {
    pub clipped: usize,
    pub bounds: OutlierBounds,
}

/// Handles outlier detection and treatment.
pub struct OutlierHandler;

impl OutlierHandler {
    /// Clip every numeric column of `df` to its IQR bounds and return the
    /// matching log entries. Columns with nothing to clip are left untouched.
    pub fn cap_outliers(df: &mut DataFrame, multiplier: f64) -> Result<Vec<CleaningLogEntry>> {
        let numeric_columns: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|col| is_numeric_dtype(col.dtype()))
            .map(|col| col.name().to_string())
            .collect();

        let mut entries = Vec::new();
        for col_name in numeric_columns {
            if let Some(outcome) = Self::clip_column(df, &col_name, multiplier)? {
                let bounds = outcome.bounds.display();
                entries.push(CleaningLogEntry::issue(
                    &col_name,
                    format!("{} outliers outside {}", outcome.clipped, bounds),
                    outcome.clipped,
                ));
                entries.push(CleaningLogEntry::action(
                    &col_name,
                    format!("Clipped {} outliers to {}", outcome.clipped, bounds),
                    outcome.clipped,
                ));
                debug!("Clipped {} outliers in '{}' to {}", outcome.clipped, col_name, bounds);
            }
        }

        Ok(entries)
    }

    /// Clip one column. Returns `None` when no value lies outside the bounds.
    pub fn clip_column(
        df: &mut DataFrame,
        col_name: &str,
        multiplier: f64,
    ) -> Result<Option<ClipOutcome>> {
        let float_series = df
            .column(col_name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = float_series.f64()?.into_iter().collect();
        let observed: Vec<f64> = values.iter().flatten().copied().collect();

        let Some(bounds) = OutlierBounds::from_values(&observed, multiplier) else {
            return Ok(None);
        };

        let clipped = observed
            .iter()
            .filter(|v| **v < bounds.lower || **v > bounds.upper)
            .count();
        if clipped == 0 {
            return Ok(None);
        }

        let capped: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.map(|val| val.clamp(bounds.lower, bounds.upper)))
            .collect();
        df.replace(col_name, Series::new(col_name.into(), capped))?;

        Ok(Some(ClipOutcome { clipped, bounds }))
    }
}

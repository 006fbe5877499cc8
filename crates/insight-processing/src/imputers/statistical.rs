//! Statistical imputation methods.
//!
//! Provides mean and mode imputation plus the constant fallback used when a
//! column has no observed values at all.

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::{fill_numeric_nulls, fill_string_nulls, mean_of, string_mode};

/// How a column's missing values were filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "value", rename_all = "snake_case")]
pub enum ImputationMethod {
    Mean(f64),
    Mode(String),
    /// Constant used because the column had no values to take a mode from.
    Fallback(String),
}

/// Result of imputing one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputation {
    pub column: String,
    pub filled: usize,
    pub method: ImputationMethod,
}

impl Imputation {
    /// Log line describing the fill, e.g. `"Filled 2 missing values with mean (15.00)"`.
    pub fn description(&self) -> String {
        match &self.method {
            ImputationMethod::Mean(mean) => {
                format!("Filled {} missing values with mean ({:.2})", self.filled, mean)
            }
            ImputationMethod::Mode(mode) => {
                format!("Filled {} missing values with mode ('{}')", self.filled, mode)
            }
            ImputationMethod::Fallback(value) => format!(
                "Filled {} missing values with '{}' (column had no values)",
                self.filled, value
            ),
        }
    }
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill the nulls of a numeric column with its mean. The column becomes Float64.
    ///
    /// Returns `None` when there is nothing to fill or no value to take a mean of.
    pub fn apply_numeric_mean(df: &mut DataFrame, col_name: &str) -> Result<Option<Imputation>> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let missing = series.null_count();
        if missing == 0 {
            return Ok(None);
        }

        let values: Vec<Option<f64>> = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect();
        let Some(mean) = mean_of(&values) else {
            return Ok(None);
        };

        let filled = fill_numeric_nulls(&series, mean)?;
        df.replace(col_name, filled)?;

        Ok(Some(Imputation {
            column: col_name.to_string(),
            filled: missing,
            method: ImputationMethod::Mean(mean),
        }))
    }

    /// Fill the nulls of a column with its most frequent value, or with
    /// `fallback` when the column has no values. The column becomes String.
    pub fn apply_mode_imputation(
        df: &mut DataFrame,
        col_name: &str,
        fallback: &str,
    ) -> Result<Option<Imputation>> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let missing = series.null_count();
        if missing == 0 {
            return Ok(None);
        }

        let method = match string_mode(&series) {
            Some(mode) => ImputationMethod::Mode(mode),
            None => ImputationMethod::Fallback(fallback.to_string()),
        };
        let fill_value = match &method {
            ImputationMethod::Mode(v) | ImputationMethod::Fallback(v) => v.as_str(),
            ImputationMethod::Mean(_) => fallback,
        };

        let filled = fill_string_nulls(&series, fill_value)?;
        df.replace(col_name, filled)?;

        Ok(Some(Imputation {
            column: col_name.to_string(),
            filled: missing,
            method,
        }))
    }

    /// Replace nulls in an already-extracted numeric vector with the mean of
    /// its non-null entries. Returns the mean used, or `None` (vector untouched)
    /// when there are no values.
    pub fn fill_values_with_mean(values: &mut [Option<f64>]) -> Option<f64> {
        let mean = mean_of(values)?;
        for value in values.iter_mut().filter(|v| v.is_none()) {
            *value = Some(mean);
        }
        Some(mean)
    }
}

//! Data cleaning module for uploaded datasets.
//!
//! This module provides functionality for:
//! - Filling missing values (mean for numbers, mode for everything else)
//! - Coercing date-named columns to datetimes, flagging unparseable cells
//! - Coercing currency-named columns to numbers
//! - Removing exact duplicate rows
//! - Clipping numeric outliers
//!
//! Every change is reported as log entries; the raw frame passed in is never
//! modified.

mod converters;
mod duplicates;

use anyhow::Result;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::imputers::{Imputation, ImputationMethod, StatisticalImputer};
use crate::pipeline::outliers::OutlierHandler;
use crate::pipeline::progress::{ProcessingStage, ProgressReporter, ProgressUpdate};
use crate::profiler::has_date_name;
use crate::types::{
    CleanedDataset, CleaningLogEntry, ColumnRole, DATASET_TARGET, DateCoercion, RoleAssignment,
};
use crate::utils::{is_numeric_dtype, is_string_dtype};

use converters::{coerce_currency, coerce_to_datetime};
use duplicates::{filter_rows, filter_vec, keep_first_mask};

/// Exact lowercase names of columns that hold formatted currency amounts.
pub const CURRENCY_COLUMN_NAMES: &[&str] = &["price", "cost", "amount", "value", "quantity", "qty"];

/// Whether a column name is one of the currency names (case-insensitive, exact).
pub fn is_currency_column(col_name: &str) -> bool {
    let lower = col_name.to_lowercase();
    CURRENCY_COLUMN_NAMES.contains(&lower.as_str())
}

/// Data cleaner for the repair and deduplication stages.
pub struct DataCleaner {
    config: PipelineConfig,
    reporter: Option<Arc<dyn ProgressReporter>>,
}

impl DataCleaner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            reporter: None,
        }
    }

    /// Receive one progress update per repaired column.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Fill missing values and coerce date and currency columns.
    ///
    /// Pass 1 works on the original dtypes: numeric columns get their mean
    /// (except DATE columns such as integer years, left for pass 2a), other
    /// columns their mode (or the configured fallback when empty).
    /// Currency-named text columns keep their nulls until pass 2b, where they
    /// are filled together with unparseable values. Pass 2a coerces
    /// date-named columns; unparseable values become null and are flagged in
    /// [`CleanedDataset::invalid_dates`].
    pub fn repair(
        &self,
        df: &DataFrame,
        roles: &RoleAssignment,
    ) -> Result<(CleanedDataset, Vec<CleaningLogEntry>)> {
        info!("Repairing missing values and types...");
        let mut frame = df.clone();
        let mut entries = Vec::new();

        let col_names: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let total = col_names.len();

        // Pass 1: missing values, on the original dtypes
        let mut deferred_nulls: BTreeMap<String, usize> = BTreeMap::new();
        for (idx, col_name) in col_names.iter().enumerate() {
            self.report_column(col_name, idx, total);
            let series = frame.column(col_name)?.as_materialized_series();
            let missing = series.null_count();
            if missing == 0 {
                continue;
            }
            let dtype = series.dtype().clone();

            entries.push(CleaningLogEntry::issue(
                col_name,
                format!("{} missing values", missing),
                missing,
            ));

            if roles.role_of(col_name) == Some(ColumnRole::Date) && is_numeric_dtype(&dtype) {
                // counted as originally null by date coercion
                debug!("Leaving {} nulls in date column '{}' for coercion", missing, col_name);
            } else if is_numeric_dtype(&dtype) {
                if let Some(imputation) = StatisticalImputer::apply_numeric_mean(&mut frame, col_name)? {
                    push_imputation(&mut entries, &imputation);
                }
            } else if is_currency_column(col_name) && is_string_dtype(&dtype) {
                debug!("Deferring {} nulls in '{}' to currency coercion", missing, col_name);
                deferred_nulls.insert(col_name.clone(), missing);
            } else if let Some(imputation) = StatisticalImputer::apply_mode_imputation(
                &mut frame,
                col_name,
                &self.config.unknown_fill_value,
            )? {
                if matches!(imputation.method, ImputationMethod::Fallback(_)) {
                    warn!("Column '{}' has no values; filled with '{}'", col_name, self.config.unknown_fill_value);
                }
                push_imputation(&mut entries, &imputation);
            }
        }

        // Pass 2a: date-named columns
        let mut invalid_dates = BTreeMap::new();
        let mut date_coercions = Vec::new();
        for col_name in &col_names {
            if !should_coerce_dates(&frame, col_name, roles)? {
                continue;
            }

            let series = frame.column(col_name)?.as_materialized_series();
            let conversion = coerce_to_datetime(series)?;
            if conversion.invalid > 0 {
                entries.push(CleaningLogEntry::issue(
                    col_name,
                    format!("{} invalid date values", conversion.invalid),
                    conversion.invalid,
                ));
                entries.push(CleaningLogEntry::action(
                    col_name,
                    format!(
                        "Marked {} unparseable values as invalid dates",
                        conversion.invalid
                    ),
                    conversion.invalid,
                ));
            }
            debug!(
                "Coerced '{}' to datetime: {} parsed, {} invalid",
                col_name, conversion.parsed, conversion.invalid
            );

            date_coercions.push(DateCoercion {
                column: col_name.clone(),
                parsed: conversion.parsed,
                invalid: conversion.invalid,
                originally_null: conversion.originally_null,
                total: conversion.series.len(),
            });
            invalid_dates.insert(col_name.clone(), conversion.invalid_mask);
            frame.replace(col_name, conversion.series)?;
        }

        // Pass 2b: currency-named columns
        for col_name in &col_names {
            if !is_currency_column(col_name) {
                continue;
            }

            let series = frame.column(col_name)?.as_materialized_series();
            let mut conversion = coerce_currency(series)?;
            if conversion.failures > 0 {
                entries.push(CleaningLogEntry::issue(
                    col_name,
                    format!(
                        "{} non-numeric values in numeric column",
                        conversion.failures
                    ),
                    conversion.failures,
                ));
            }

            let to_fill = conversion.failures + deferred_nulls.get(col_name).copied().unwrap_or(0);
            if to_fill > 0 {
                match StatisticalImputer::fill_values_with_mean(&mut conversion.values) {
                    Some(mean) => entries.push(CleaningLogEntry::action(
                        col_name,
                        format!("Filled {} values with mean ({:.2})", to_fill, mean),
                        to_fill,
                    )),
                    None => warn!("Column '{}' has no numeric values to fill from", col_name),
                }
            }

            frame.replace(col_name, Series::new(col_name.as_str().into(), conversion.values))?;
        }

        let cleaned = CleanedDataset {
            frame,
            invalid_dates,
            date_coercions,
        };
        Ok((cleaned, entries))
    }

    /// Drop exact duplicate rows (keep first) and clip numeric outliers.
    pub fn deduplicate_and_cap(
        &self,
        dataset: CleanedDataset,
    ) -> Result<(CleanedDataset, Vec<CleaningLogEntry>)> {
        info!("Removing duplicates and capping outliers...");
        let CleanedDataset {
            mut frame,
            mut invalid_dates,
            date_coercions,
        } = dataset;
        let mut entries = Vec::new();

        if self.config.remove_duplicates {
            let mask = keep_first_mask(&frame)?;
            let duplicates = mask.iter().filter(|keep| !**keep).count();
            if duplicates > 0 {
                frame = filter_rows(&frame, &mask)?;
                for flags in invalid_dates.values_mut() {
                    *flags = filter_vec(flags, &mask);
                }
                entries.push(CleaningLogEntry::issue(
                    DATASET_TARGET,
                    format!("{} duplicate rows", duplicates),
                    duplicates,
                ));
                entries.push(CleaningLogEntry::action(
                    DATASET_TARGET,
                    format!("Removed {} duplicate rows", duplicates),
                    duplicates,
                ));
                debug!("Removed {} duplicate rows", duplicates);
            } else {
                debug!("No duplicate rows found");
            }
        }

        if self.config.cap_outliers {
            entries.extend(OutlierHandler::cap_outliers(
                &mut frame,
                self.config.iqr_multiplier,
            )?);
        }

        let cleaned = CleanedDataset {
            frame,
            invalid_dates,
            date_coercions,
        };
        Ok((cleaned, entries))
    }

    fn report_column(&self, col_name: &str, idx: usize, total: usize) {
        if let Some(reporter) = &self.reporter {
            reporter.report(ProgressUpdate::with_items(
                ProcessingStage::Repair,
                format!("Column: {}", col_name),
                idx,
                total,
                format!("Repairing column {}", col_name),
            ));
        }
    }
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

/// Repair with the default settings.
pub fn repair(
    df: &DataFrame,
    roles: &RoleAssignment,
) -> crate::Result<(CleanedDataset, Vec<CleaningLogEntry>)> {
    DataCleaner::default()
        .repair(df, roles)
        .map_err(|e| crate::ProcessingError::CleaningFailed(e.to_string()))
}

/// Deduplicate and clip with the default settings.
pub fn deduplicate_and_cap(
    dataset: CleanedDataset,
) -> crate::Result<(CleanedDataset, Vec<CleaningLogEntry>)> {
    DataCleaner::default()
        .deduplicate_and_cap(dataset)
        .map_err(|e| crate::ProcessingError::CleaningFailed(e.to_string()))
}

fn push_imputation(entries: &mut Vec<CleaningLogEntry>, imputation: &Imputation) {
    debug!("{}: {}", imputation.column, imputation.description());
    entries.push(CleaningLogEntry::action(
        &imputation.column,
        imputation.description(),
        imputation.filled,
    ));
}

/// Date coercion applies to date-named columns unless they hold plain
/// numbers that were not recognised as dates (e.g. `time_spent` in minutes).
fn should_coerce_dates(df: &DataFrame, col_name: &str, roles: &RoleAssignment) -> Result<bool> {
    if !has_date_name(col_name) {
        return Ok(false);
    }
    let dtype = df.column(col_name)?.dtype().clone();
    Ok(!is_numeric_dtype(&dtype) || roles.role_of(col_name) == Some(ColumnRole::Date))
}

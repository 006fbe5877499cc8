//! Per-column role rules.
//!
//! Each rule is a pure function of the column name, its dtype and its
//! values, so rules can be tested without building a whole dataset.

use polars::prelude::*;

use crate::config::PipelineConfig;
use crate::types::ColumnRole;
use crate::utils::{
    collect_sample_values, distinct_non_null, is_datetime_dtype, is_numeric_dtype,
    is_string_dtype, name_contains_any, parse_datetime_str,
};

/// Name fragments that make a column a date candidate.
pub const DATE_KEYWORDS: &[&str] = &["date", "time", "day", "month", "year"];

/// Name fragments that make a column MONEY outright.
pub const MONEY_KEYWORDS: &[&str] = &[
    "money", "price", "cost", "amount", "revenue", "sales", "value",
];

/// Name fragments that make a column CATEGORY outright.
pub const CATEGORY_KEYWORDS: &[&str] = &["type", "category", "name", "kind", "status"];

/// Infer the role of one column. Rules are tried in precedence order.
pub(crate) fn infer_column_role(
    col_name: &str,
    series: &Series,
    config: &PipelineConfig,
) -> PolarsResult<ColumnRole> {
    if is_date_column(col_name, series, config.date_sample_size) {
        return Ok(ColumnRole::Date);
    }

    if is_money_column(col_name, series)? {
        return Ok(ColumnRole::Money);
    }

    if is_category_column(
        col_name,
        series,
        config.category_ratio_threshold,
        config.max_category_cardinality,
    )? {
        return Ok(ColumnRole::Category);
    }

    Ok(ColumnRole::Unclassified)
}

/// Whether the column name looks like a date field.
pub fn has_date_name(col_name: &str) -> bool {
    name_contains_any(col_name, DATE_KEYWORDS)
}

/// DATE rule: a date-like name, plus values that parse as dates.
///
/// When parsing fails the column still counts as a date if any sampled
/// text value contains `/` or `-`. An all-null column with a date-like name
/// is a date.
pub(crate) fn is_date_column(col_name: &str, series: &Series, sample_size: usize) -> bool {
    if !has_date_name(col_name) {
        return false;
    }

    if is_datetime_dtype(series.dtype()) {
        return true;
    }

    let samples = collect_sample_values(series, sample_size);
    if samples.iter().all(|s| parse_datetime_str(s).is_some()) {
        return true;
    }

    is_string_dtype(series.dtype()) && samples.iter().any(|s| s.contains('/') || s.contains('-'))
}

/// MONEY rule: a money-like name, or a numeric column without negatives.
pub(crate) fn is_money_column(col_name: &str, series: &Series) -> PolarsResult<bool> {
    if name_contains_any(col_name, MONEY_KEYWORDS) {
        return Ok(true);
    }

    if !is_numeric_dtype(series.dtype()) {
        return Ok(false);
    }

    let values = series.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().flatten().all(|v| v >= 0.0))
}

/// CATEGORY rule: few distinct values relative to the row count, or a
/// category-like name.
pub(crate) fn is_category_column(
    col_name: &str,
    series: &Series,
    ratio_threshold: f64,
    max_cardinality: usize,
) -> PolarsResult<bool> {
    let total = series.len();
    if total > 0 {
        let unique = distinct_non_null(series)?;
        let ratio = unique as f64 / total as f64;
        if ratio < ratio_threshold && unique > 1 && unique <= max_cardinality {
            return Ok(true);
        }
    }

    Ok(name_contains_any(col_name, CATEGORY_KEYWORDS))
}

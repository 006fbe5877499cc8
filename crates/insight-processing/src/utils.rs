//! Shared utilities for the cleaning pipeline.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::{HashMap, HashSet};

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a date or datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Check if a DataType holds text.
#[inline]
pub fn is_string_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String)
}

/// Check whether a lowercase column name contains any of the keywords.
pub fn name_contains_any(name: &str, keywords: &[&str]) -> bool {
    let lower = name.to_lowercase();
    keywords.iter().any(|keyword| lower.contains(keyword))
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust,ignore
/// use insight_processing::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// assert_eq!(clean_numeric_string("  42%  "), "42");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Strip only the dollar sign and thousands separator, then parse.
///
/// This is the strict coercion applied to currency-named columns: `"12%"`
/// or `"€5"` are failures here, unlike [`parse_numeric_string`].
pub fn parse_currency_string(s: &str) -> Option<f64> {
    let stripped: String = s.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    if stripped.is_empty() {
        return None;
    }
    stripped.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Try to parse a string as a numeric value (f64).
///
/// Handles common formatting like currency symbols, percentages, and thousands separators.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Date Parsing Utilities
// =============================================================================

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)(st|nd|rd|th)\b").expect("Invalid regex: ordinal suffix"));

static BARE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(1[5-9]|2[0-9])\d{2}$").expect("Invalid regex: bare year"));

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Parse a date or datetime string in any of the common spreadsheet shapes.
///
/// Month-first is tried before day-first for slash dates, so `01/02/2024`
/// is January 2nd. A bare four-digit year maps to January 1st.
pub fn parse_datetime_str(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    let normalized = ORDINAL_SUFFIX.replace_all(trimmed, "$1");
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    if BARE_YEAR.is_match(trimmed) {
        let year = trimmed.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0));
    }

    None
}

/// Milliseconds since the Unix epoch for a naive (UTC) datetime.
#[inline]
pub fn datetime_to_millis(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

/// Inverse of [`datetime_to_millis`].
pub fn millis_to_datetime(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Render every cell of a Series as an optional string.
///
/// Goes through a String cast so text cells come back unquoted.
pub fn series_to_strings(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let as_str = series.cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Extract numeric values from a Series.
///
/// Numeric columns are cast directly; text columns are parsed leniently.
/// Anything else yields nulls.
pub fn series_to_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    if is_numeric_dtype(series.dtype()) {
        let cast = series.cast(&DataType::Float64)?;
        return Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect());
    }

    if is_string_dtype(series.dtype()) {
        return Ok(series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_numeric_string))
            .collect());
    }

    Ok(vec![None; series.len()])
}

/// Calculate the mode (most frequent value) of a Series, as a string.
///
/// Ties go to the lexicographically smallest value so repeated runs agree.
pub fn string_mode(series: &Series) -> Option<String> {
    let values = series_to_strings(series).ok()?;

    let mut value_counts: HashMap<String, usize> = HashMap::new();
    for val in values.into_iter().flatten() {
        *value_counts.entry(val).or_insert(0) += 1;
    }

    value_counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(val, _)| val)
}

/// Mean of the non-null values, or None when there are none.
pub fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Fill null values in a numeric Series with a specific value (result is Float64).
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let cast = series.cast(&DataType::Float64)?;
    let filled: Vec<Option<f64>> = cast
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a Series with a string value (result is String).
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let filled: Vec<Option<String>> = series_to_strings(series)?
        .into_iter()
        .map(|v| Some(v.unwrap_or_else(|| fill_value.to_string())))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Collect the first `max_samples` non-null values of a Series as strings.
pub fn collect_sample_values(series: &Series, max_samples: usize) -> Vec<String> {
    match series_to_strings(series) {
        Ok(values) => values.into_iter().flatten().take(max_samples).collect(),
        Err(_) => Vec::new(),
    }
}

/// Number of distinct non-null values in a Series.
pub fn distinct_non_null(series: &Series) -> PolarsResult<usize> {
    let distinct: HashSet<String> = series_to_strings(series)?.into_iter().flatten().collect();
    Ok(distinct.len())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_is_datetime_dtype() {
        assert!(is_datetime_dtype(&DataType::Date));
        assert!(is_datetime_dtype(&DataType::Datetime(
            TimeUnit::Milliseconds,
            None
        )));
        assert!(!is_datetime_dtype(&DataType::String));
    }

    #[test]
    fn test_name_contains_any() {
        assert!(name_contains_any("Order_Date", &["date"]));
        assert!(name_contains_any("TOTAL PRICE", &["price", "cost"]));
        assert!(!name_contains_any("region", &["date", "time"]));
    }

    #[test]
    fn test_clean_numeric_string() {
        assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
        assert_eq!(clean_numeric_string("  42%  "), "42");
        assert_eq!(clean_numeric_string("€100"), "100");
        assert_eq!(clean_numeric_string("1 000"), "1000");
    }

    #[test]
    fn test_parse_currency_string() {
        assert_eq!(parse_currency_string("$10"), Some(10.0));
        assert_eq!(parse_currency_string("$1,250.50"), Some(1250.5));
        assert_eq!(parse_currency_string(" 7 "), Some(7.0));
        assert_eq!(parse_currency_string("abc"), None);
        assert_eq!(parse_currency_string("12%"), None);
        assert_eq!(parse_currency_string(""), None);
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string("$1,234.56"), Some(1234.56));
        assert_eq!(parse_numeric_string("-100"), Some(-100.0));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("hello"), None);
        assert_eq!(parse_numeric_string("NaN"), None);
    }

    // ==================== date parsing tests ====================

    #[test]
    fn test_parse_iso_dates() {
        let dt = parse_datetime_str("2024-01-15").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 15));

        let dt = parse_datetime_str("2024-01-15 13:45:00").unwrap();
        assert_eq!(dt.hour(), 13);

        let dt = parse_datetime_str("2024-01-15T08:00:00Z").unwrap();
        assert_eq!(dt.hour(), 8);
    }

    #[test]
    fn test_parse_slash_dates() {
        let dt = parse_datetime_str("01/02/2024").unwrap();
        assert_eq!((dt.month(), dt.day()), (1, 2));

        // day-first fallback when the first field cannot be a month
        let dt = parse_datetime_str("25/12/2023").unwrap();
        assert_eq!((dt.month(), dt.day()), (12, 25));

        let dt = parse_datetime_str("2024/3/9").unwrap();
        assert_eq!((dt.month(), dt.day()), (3, 9));
    }

    #[test]
    fn test_parse_text_month_dates() {
        let dt = parse_datetime_str("Jan 5, 2024").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 5));

        let dt = parse_datetime_str("March 1st, 2024").unwrap();
        assert_eq!((dt.month(), dt.day()), (3, 1));

        let dt = parse_datetime_str("15 Feb 2023").unwrap();
        assert_eq!((dt.month(), dt.day()), (2, 15));
    }

    #[test]
    fn test_parse_bare_year() {
        let dt = parse_datetime_str("2021").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2021, 1, 1));
        assert!(parse_datetime_str("42").is_none());
    }

    #[test]
    fn test_parse_invalid_dates() {
        assert!(parse_datetime_str("not a date").is_none());
        assert!(parse_datetime_str("").is_none());
        assert!(parse_datetime_str("2024-13-45").is_none());
        assert!(parse_datetime_str("1-2").is_none());
    }

    #[test]
    fn test_millis_roundtrip() {
        let dt = parse_datetime_str("2024-06-15").unwrap();
        let ms = datetime_to_millis(&dt);
        assert_eq!(millis_to_datetime(ms), Some(dt));
    }

    // ==================== series helper tests ====================

    #[test]
    fn test_series_to_strings_unquoted() {
        let series = Series::new("s".into(), &[Some("north"), None]);
        let values = series_to_strings(&series).unwrap();
        assert_eq!(values, vec![Some("north".to_string()), None]);

        let series = Series::new("n".into(), &[1i64, 2]);
        let values = series_to_strings(&series).unwrap();
        assert_eq!(values[1].as_deref(), Some("2"));
    }

    #[test]
    fn test_series_to_f64() {
        let series = Series::new("n".into(), &[Some(1i32), None, Some(3)]);
        assert_eq!(
            series_to_f64(&series).unwrap(),
            vec![Some(1.0), None, Some(3.0)]
        );

        let series = Series::new("s".into(), &["$5", "x", "1,000"]);
        assert_eq!(
            series_to_f64(&series).unwrap(),
            vec![Some(5.0), None, Some(1000.0)]
        );

        let series = Series::new("b".into(), &[true, false]);
        assert_eq!(series_to_f64(&series).unwrap(), vec![None, None]);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();

        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 0.0);
        assert_eq!(filled.get(2).unwrap().try_extract::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_fill_numeric_nulls_integer_column() {
        let series = Series::new("qty".into(), &[Some(1i64), None, Some(4)]);
        let filled = fill_numeric_nulls(&series, 2.5).unwrap();
        assert_eq!(filled.dtype(), &DataType::Float64);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 2.5);
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("region".into(), &[Some("north"), None]);
        let filled = fill_string_nulls(&series, "Unknown").unwrap();
        let values = series_to_strings(&filled).unwrap();
        assert_eq!(
            values,
            vec![Some("north".to_string()), Some("Unknown".to_string())]
        );
    }

    #[test]
    fn test_string_mode() {
        let series = Series::new("test".into(), &["a", "b", "a", "c", "a"]);
        assert_eq!(string_mode(&series), Some("a".to_string()));
    }

    #[test]
    fn test_string_mode_tie_is_deterministic() {
        let series = Series::new("test".into(), &["pear", "apple", "pear", "apple"]);
        assert_eq!(string_mode(&series), Some("apple".to_string()));
    }

    #[test]
    fn test_string_mode_all_null() {
        let series = Series::new("test".into(), &[None::<&str>, None]);
        assert_eq!(string_mode(&series), None);
    }

    #[test]
    fn test_mean_of() {
        assert_eq!(mean_of(&[Some(10.0), None, Some(20.0)]), Some(15.0));
        assert_eq!(mean_of(&[None, None]), None);
    }

    #[test]
    fn test_collect_sample_values() {
        let series = Series::new("test".into(), &[Some("a"), None, Some("b"), Some("c")]);
        let samples = collect_sample_values(&series, 2);
        assert_eq!(samples, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_distinct_non_null() {
        let series = Series::new("test".into(), &[Some("a"), None, Some("b"), Some("a")]);
        assert_eq!(distinct_non_null(&series).unwrap(), 2);
    }
}

//! Type conversion functions for data cleaning.

use anyhow::Result;
use polars::prelude::*;

use crate::utils::{
    datetime_to_millis, is_datetime_dtype, parse_currency_string, parse_datetime_str,
    series_to_strings,
};

/// Outcome of coercing a column to `Datetime(ms)`.
#[derive(Debug, Clone)]
pub(crate) struct DateConversion {
    pub series: Series,
    /// `true` where a non-null input value could not be parsed.
    pub invalid_mask: Vec<bool>,
    pub parsed: usize,
    pub invalid: usize,
    pub originally_null: usize,
}

/// Coerce every value of a column to a datetime. Values that do not parse
/// become null and are flagged in the returned mask.
pub(crate) fn coerce_to_datetime(series: &Series) -> Result<DateConversion> {
    let target = DataType::Datetime(TimeUnit::Milliseconds, None);
    let len = series.len();
    let originally_null = series.null_count();

    if is_datetime_dtype(series.dtype()) {
        return Ok(DateConversion {
            series: series.cast(&target)?,
            invalid_mask: vec![false; len],
            parsed: len - originally_null,
            invalid: 0,
            originally_null,
        });
    }

    let mut millis: Vec<Option<i64>> = Vec::with_capacity(len);
    let mut invalid_mask = Vec::with_capacity(len);

    for value in date_text_values(series)? {
        match value {
            Some(text) => match parse_datetime_str(&text) {
                Some(dt) => {
                    millis.push(Some(datetime_to_millis(&dt)));
                    invalid_mask.push(false);
                }
                None => {
                    millis.push(None);
                    invalid_mask.push(true);
                }
            },
            None => {
                millis.push(None);
                invalid_mask.push(false);
            }
        }
    }

    let invalid = invalid_mask.iter().filter(|flag| **flag).count();
    let converted = Series::new(series.name().clone(), millis).cast(&target)?;

    Ok(DateConversion {
        series: converted,
        invalid_mask,
        parsed: len - originally_null - invalid,
        invalid,
        originally_null,
    })
}

/// Text form of each value for date parsing. Whole floats such as `2021.0`
/// render as `2021` so they read as bare years.
fn date_text_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    if !matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
        return series_to_strings(series);
    }
    Ok(series
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|value| {
            value.map(|v| {
                if v.is_finite() && v.fract() == 0.0 {
                    format!("{:.0}", v)
                } else {
                    v.to_string()
                }
            })
        })
        .collect())
}

/// Outcome of coercing a currency-named column to Float64.
#[derive(Debug, Clone)]
pub(crate) struct CurrencyConversion {
    pub values: Vec<Option<f64>>,
    /// Non-null inputs that did not parse once `$` and `,` were stripped.
    pub failures: usize,
}

/// Strip `$` and `,` from every value and parse as f64. Numeric columns are
/// cast as they are.
pub(crate) fn coerce_currency(series: &Series) -> Result<CurrencyConversion> {
    if crate::utils::is_numeric_dtype(series.dtype()) {
        let values = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect();
        return Ok(CurrencyConversion {
            values,
            failures: 0,
        });
    }

    let mut failures = 0;
    let values = series_to_strings(series)?
        .into_iter()
        .map(|value| {
            let text = value?;
            let parsed = parse_currency_string(&text);
            if parsed.is_none() {
                failures += 1;
            }
            parsed
        })
        .collect();

    Ok(CurrencyConversion { values, failures })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_null_at(series: &Series, idx: usize) -> bool {
        matches!(series.get(idx).unwrap(), AnyValue::Null)
    }

    // ========================================================================
    // coerce_to_datetime() tests
    // ========================================================================

    #[test]
    fn test_coerce_dates_basic() {
        let series = Series::new("date".into(), &["2024-01-01", "01/15/2024", "Mar 3, 2024"]);
        let result = coerce_to_datetime(&series).unwrap();

        assert!(matches!(result.series.dtype(), DataType::Datetime(TimeUnit::Milliseconds, _)));
        assert_eq!(result.parsed, 3);
        assert_eq!(result.invalid, 0);
        assert_eq!(result.series.null_count(), 0);
    }

    #[test]
    fn test_coerce_dates_marks_invalid() {
        let series = Series::new(
            "date".into(),
            &[Some("2024-01-01"), Some("not a date"), None, Some("2024-02-30")],
        );
        let result = coerce_to_datetime(&series).unwrap();

        assert_eq!(result.parsed, 1);
        assert_eq!(result.invalid, 2);
        assert_eq!(result.originally_null, 1);
        assert_eq!(result.invalid_mask, vec![false, true, false, true]);
        assert!(is_null_at(&result.series, 1));
        assert!(is_null_at(&result.series, 2));
        assert_eq!(result.series.null_count(), 3);
    }

    #[test]
    fn test_coerce_dates_accounting() {
        let series = Series::new("day".into(), &[Some("2024-01-01"), None, Some("??"), None]);
        let result = coerce_to_datetime(&series).unwrap();
        assert_eq!(
            result.parsed + result.invalid + result.originally_null,
            series.len()
        );
    }

    #[test]
    fn test_coerce_dates_already_datetime() {
        let series = Series::new("created_date".into(), &[Some(0i64), None])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let result = coerce_to_datetime(&series).unwrap();
        assert_eq!(result.parsed, 1);
        assert_eq!(result.invalid, 0);
        assert_eq!(result.originally_null, 1);
    }

    #[test]
    fn test_coerce_dates_numeric_years() {
        let series = Series::new("year".into(), &[2021i64, 2022]);
        let result = coerce_to_datetime(&series).unwrap();
        assert_eq!(result.parsed, 2);
    }

    #[test]
    fn test_coerce_dates_whole_float_years() {
        let series = Series::new("Year".into(), &[Some(2021.0), None, Some(2022.5)]);
        let result = coerce_to_datetime(&series).unwrap();
        assert_eq!(result.parsed, 1);
        assert_eq!(result.invalid, 1);
        assert_eq!(result.originally_null, 1);
        assert_eq!(result.invalid_mask, vec![false, false, true]);
    }

    // ========================================================================
    // coerce_currency() tests
    // ========================================================================

    #[test]
    fn test_coerce_currency() {
        let series = Series::new("price".into(), &[Some("$10"), Some("$20"), Some("abc"), None]);
        let result = coerce_currency(&series).unwrap();

        assert_eq!(result.values, vec![Some(10.0), Some(20.0), None, None]);
        assert_eq!(result.failures, 1);
    }

    #[test]
    fn test_coerce_currency_thousands() {
        let series = Series::new("amount".into(), &["$1,200.50", "3,000", "7"]);
        let result = coerce_currency(&series).unwrap();
        assert_eq!(result.values, vec![Some(1200.5), Some(3000.0), Some(7.0)]);
        assert_eq!(result.failures, 0);
    }

    #[test]
    fn test_coerce_currency_numeric_passthrough() {
        let series = Series::new("qty".into(), &[Some(1i64), None, Some(3)]);
        let result = coerce_currency(&series).unwrap();
        assert_eq!(result.values, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(result.failures, 0);
    }
}

//! Aggregation helpers for chart data: time bucketing, grouped sums,
//! value counts and the least-squares trend fit.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::utils::{is_datetime_dtype, millis_to_datetime, parse_datetime_str, series_to_strings};

/// Spans longer than this many days are bucketed by month.
pub const MONTHLY_SPAN_DAYS: i64 = 90;

/// Spans longer than this many days (and up to the monthly limit) are bucketed by week.
pub const WEEKLY_SPAN_DAYS: i64 = 30;

/// Time bucket used for the line chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Pick a granularity from the span between the earliest and latest date.
    pub fn from_span_days(days: i64) -> Self {
        if days > MONTHLY_SPAN_DAYS {
            Self::Month
        } else if days > WEEKLY_SPAN_DAYS {
            Self::Week
        } else {
            Self::Day
        }
    }

    /// First day of the period containing `date`. Weeks start on Monday.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            Self::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Axis label for a period start.
    pub fn label(&self, period: NaiveDate) -> String {
        match self {
            Self::Month => period.format("%Y-%m").to_string(),
            Self::Day | Self::Week => period.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "daily",
            Self::Week => "weekly",
            Self::Month => "monthly",
        }
    }
}

/// Read a column as datetimes. Datetime columns are read directly, anything
/// else is parsed from its string rendering.
pub fn date_values(series: &Series) -> PolarsResult<Vec<Option<NaiveDateTime>>> {
    if is_datetime_dtype(series.dtype()) {
        let millis = series
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .cast(&DataType::Int64)?;
        return Ok(millis
            .i64()?
            .into_iter()
            .map(|v| v.and_then(millis_to_datetime))
            .collect());
    }

    Ok(series_to_strings(series)?
        .into_iter()
        .map(|v| v.and_then(|s| parse_datetime_str(&s)))
        .collect())
}

/// Sum of `values` per time period, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub granularity: Granularity,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Bucket `(date, value)` pairs by period and sum each bucket. Rows where
/// either side is null are skipped. Returns `None` when no row is usable.
pub fn bucket_by_period(
    dates: &[Option<NaiveDateTime>],
    values: &[Option<f64>],
) -> Option<TimeSeries> {
    let pairs: Vec<(NaiveDate, f64)> = dates
        .iter()
        .zip(values)
        .filter_map(|(date, value)| Some((date.as_ref()?.date(), (*value)?)))
        .collect();

    let min = pairs.iter().map(|(d, _)| *d).min()?;
    let max = pairs.iter().map(|(d, _)| *d).max()?;
    let granularity = Granularity::from_span_days((max - min).num_days());

    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, value) in pairs {
        *buckets.entry(granularity.period_start(date)).or_insert(0.0) += value;
    }

    let (labels, values) = buckets
        .into_iter()
        .map(|(period, sum)| (granularity.label(period), sum))
        .unzip();

    Some(TimeSeries {
        granularity,
        labels,
        values,
    })
}

/// Degree-1 least-squares fit of `values` against their index 0..N-1.
///
/// Returns `(slope, intercept)`. A single point yields a flat line, and a
/// slope within rounding noise of zero is reported as exactly zero.
pub fn linear_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    match n {
        0 => return (0.0, 0.0),
        1 => return (0.0, values[0]),
        _ => {}
    }

    let x = DMatrix::from_fn(n, 2, |row, col| if col == 0 { 1.0 } else { row as f64 });
    let y = DVector::from_column_slice(values);
    let mean = values.iter().sum::<f64>() / n as f64;

    let Some(beta) = solve_least_squares(&x, &y) else {
        return (0.0, mean);
    };

    let scale = values.iter().map(|v| v.abs()).fold(1.0, f64::max);
    let slope = if beta[1].abs() < SLOPE_EPSILON * scale {
        0.0
    } else {
        beta[1]
    };
    (slope, beta[0])
}

/// Relative slope below which a fitted line counts as flat.
const SLOPE_EPSILON: f64 = 1e-9;

/// SVD least-squares solve, loosening the tolerance until a finite
/// solution comes out.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol)
            && beta.iter().all(|v| v.is_finite())
        {
            return Some(beta);
        }
    }
    None
}

/// Fitted values of a line at indices 0..len-1.
pub fn trend_line(slope: f64, intercept: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| intercept + slope * i as f64).collect()
}

/// Sum `values` per category. Nulls on either side are skipped.
pub fn grouped_sums(categories: &[Option<String>], values: &[Option<f64>]) -> Vec<(String, f64)> {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for (category, value) in categories.iter().zip(values) {
        if let (Some(category), Some(value)) = (category, value) {
            *sums.entry(category.as_str()).or_insert(0.0) += value;
        }
    }
    sums.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Mean of `values` per category. Nulls on either side are skipped.
pub fn grouped_means(categories: &[Option<String>], values: &[Option<f64>]) -> Vec<(String, f64)> {
    let mut acc: HashMap<&str, (f64, usize)> = HashMap::new();
    for (category, value) in categories.iter().zip(values) {
        if let (Some(category), Some(value)) = (category, value) {
            let entry = acc.entry(category.as_str()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    acc.into_iter()
        .map(|(k, (sum, n))| (k.to_string(), sum / n as f64))
        .collect()
}

/// Occurrences of each non-null category.
pub fn value_counts(categories: &[Option<String>]) -> Vec<(String, f64)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for category in categories.iter().flatten() {
        *counts.entry(category.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v as f64))
        .collect()
}

/// Sort descending by value (ties by name) and keep the first `n`.
pub fn top_n(mut pairs: Vec<(String, f64)>, n: usize) -> Vec<(String, f64)> {
    pairs.sort_by(|(a_name, a), (b_name, b)| b.total_cmp(a).then_with(|| a_name.cmp(b_name)));
    pairs.truncate(n);
    pairs
}

/// `value` as a percentage of `total`, or 0 when the total is zero.
pub fn share_pct(value: f64, total: f64) -> f64 {
    if total == 0.0 { 0.0 } else { value / total * 100.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> Option<NaiveDateTime> {
        parse_datetime_str(s)
    }

    #[test]
    fn test_granularity_thresholds() {
        assert_eq!(Granularity::from_span_days(0), Granularity::Day);
        assert_eq!(Granularity::from_span_days(30), Granularity::Day);
        assert_eq!(Granularity::from_span_days(31), Granularity::Week);
        assert_eq!(Granularity::from_span_days(90), Granularity::Week);
        assert_eq!(Granularity::from_span_days(91), Granularity::Month);
    }

    #[test]
    fn test_week_starts_monday() {
        // 2024-01-03 is a Wednesday
        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(Granularity::Week.period_start(wednesday), monday);
        assert_eq!(Granularity::Week.period_start(monday), monday);
    }

    #[test]
    fn test_bucket_by_week_and_month() {
        let dates = vec![dt("2024-03-10"), dt("2024-01-05"), dt("2024-01-20"), None];
        let values = vec![Some(5.0), Some(1.0), Some(2.0), Some(100.0)];
        let series = bucket_by_period(&dates, &values).unwrap();

        assert_eq!(series.granularity, Granularity::Week);
        // 2024-01-05 .. 2024-03-10 is 65 days
        assert_eq!(series.labels.len(), 3);
        assert_eq!(series.values, vec![1.0, 2.0, 5.0]);

        let dates = vec![dt("2024-06-10"), dt("2024-01-05"), dt("2024-01-20")];
        let series = bucket_by_period(&dates, &values[..3]).unwrap();
        assert_eq!(series.granularity, Granularity::Month);
        assert_eq!(series.labels, vec!["2024-01", "2024-06"]);
        assert_eq!(series.values, vec![3.0, 5.0]);
    }

    #[test]
    fn test_bucket_by_day_is_chronological() {
        let dates = vec![dt("2024-01-03"), dt("2024-01-01"), dt("2024-01-03")];
        let values = vec![Some(1.0), Some(2.0), Some(4.0)];
        let series = bucket_by_period(&dates, &values).unwrap();
        assert_eq!(series.granularity, Granularity::Day);
        assert_eq!(series.labels, vec!["2024-01-01", "2024-01-03"]);
        assert_eq!(series.values, vec![2.0, 5.0]);
    }

    #[test]
    fn test_bucket_empty() {
        assert!(bucket_by_period(&[None], &[Some(1.0)]).is_none());
        assert!(bucket_by_period(&[dt("2024-01-01")], &[None]).is_none());
    }

    #[test]
    fn test_linear_fit() {
        let (slope, intercept) = linear_fit(&[1.0, 3.0, 5.0]);
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
        for (fitted, expected) in trend_line(slope, intercept, 3).iter().zip([1.0, 3.0, 5.0]) {
            assert!((fitted - expected).abs() < 1e-9);
        }

        let (flat, level) = linear_fit(&[4.0, 4.0, 4.0]);
        assert_eq!(flat, 0.0);
        assert!((level - 4.0).abs() < 1e-9);
        assert_eq!(linear_fit(&[7.0]), (0.0, 7.0));
        assert_eq!(linear_fit(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_linear_fit_noisy() {
        let values = [11.0, 8.5, 11.0, 7.5, 9.0, 6.5];
        let (slope, intercept) = linear_fit(&values);
        assert!(slope < 0.0);
        assert!((slope + 0.7).abs() < 1e-9);
        assert!((intercept - 10.666666666666666).abs() < 1e-9);
    }

    #[test]
    fn test_grouped_means() {
        let categories = vec![Some("x".to_string()), Some("y".to_string()), Some("x".to_string()), None];
        let values = vec![Some(2.0), Some(5.0), Some(4.0), Some(100.0)];
        let means = top_n(grouped_means(&categories, &values), 5);
        assert_eq!(means, vec![("y".to_string(), 5.0), ("x".to_string(), 3.0)]);
    }

    #[test]
    fn test_top_n_and_counts() {
        let categories: Vec<Option<String>> = ["b", "a", "b", "c"]
            .iter()
            .map(|s| Some(s.to_string()))
            .chain(std::iter::once(None))
            .collect();

        let counts = top_n(value_counts(&categories), 2);
        assert_eq!(counts, vec![("b".to_string(), 2.0), ("a".to_string(), 1.0)]);

        let values = vec![Some(1.0), Some(10.0), Some(2.0), None, Some(50.0)];
        let sums = top_n(grouped_sums(&categories, &values), 10);
        assert_eq!(sums, vec![("a".to_string(), 10.0), ("b".to_string(), 3.0)]);
    }

    #[test]
    fn test_date_values_from_datetime_column() {
        let series = Series::new("d".into(), &[Some(0i64), None])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let values = date_values(&series).unwrap();
        assert_eq!(values[0], dt("1970-01-01"));
        assert_eq!(values[1], None);
    }

    #[test]
    fn test_share_pct() {
        assert_eq!(share_pct(25.0, 100.0), 25.0);
        assert_eq!(share_pct(1.0, 0.0), 0.0);
    }
}

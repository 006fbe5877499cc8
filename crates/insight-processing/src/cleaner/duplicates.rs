//! Exact duplicate row detection.

use anyhow::Result;
use polars::prelude::*;
use std::collections::HashSet;

use crate::utils::series_to_strings;

/// Mask that keeps the first occurrence of every distinct row.
///
/// Rows are compared on the string rendering of every column, with nulls
/// equal to each other.
pub(crate) fn keep_first_mask(df: &DataFrame) -> Result<Vec<bool>> {
    let columns: Vec<Vec<Option<String>>> = df
        .get_columns()
        .iter()
        .map(|col| series_to_strings(col.as_materialized_series()))
        .collect::<PolarsResult<_>>()?;

    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(df.height());
    let mask = (0..df.height())
        .map(|row| {
            let key: Vec<Option<&str>> = columns.iter().map(|col| col[row].as_deref()).collect();
            seen.insert(key)
        })
        .collect();

    Ok(mask)
}

/// Keep only the rows flagged in `mask`, preserving order.
pub(crate) fn filter_rows(df: &DataFrame, mask: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), mask);
    Ok(df.filter(&mask)?)
}

/// Apply a keep mask to a per-row vector.
pub(crate) fn filter_vec<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(v, _)| v.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_first_mask() {
        let df = df!(
            "a" => [1, 2, 1, 3, 2],
            "b" => ["x", "y", "x", "z", "q"]
        )
        .unwrap();
        let mask = keep_first_mask(&df).unwrap();
        assert_eq!(mask, vec![true, true, false, true, true]);
    }

    #[test]
    fn test_nulls_compare_equal() {
        let df = df!(
            "a" => [Some(1), None, None],
            "b" => [Some("x"), None, None]
        )
        .unwrap();
        let mask = keep_first_mask(&df).unwrap();
        assert_eq!(mask, vec![true, true, false]);
    }

    #[test]
    fn test_filter_rows_preserves_order() {
        let df = df!("a" => [3, 1, 3, 2]).unwrap();
        let mask = keep_first_mask(&df).unwrap();
        let filtered = filter_rows(&df, &mask).unwrap();
        let values: Vec<Option<i32>> = filtered
            .column("a")
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(3), Some(1), Some(2)]);
    }

    #[test]
    fn test_filter_vec() {
        assert_eq!(
            filter_vec(&[true, false, true], &[true, false, true]),
            vec![true, true]
        );
    }
}

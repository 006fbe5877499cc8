//! Pearson correlation over numeric columns.

use anofox_statistics::correlation;
use polars::prelude::*;

use crate::utils::is_numeric_dtype;

/// Names and values of every numeric column, in column order.
pub fn numeric_columns(df: &DataFrame) -> PolarsResult<Vec<(String, Vec<Option<f64>>)>> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| {
            let values = col
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .collect();
            Ok((col.name().to_string(), values))
        })
        .collect()
}

/// Pearson correlation over the rows where both values are present.
///
/// `None` when fewer than three such rows exist or either side is constant.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for (left, right) in a.iter().zip(b) {
        if let (Some(left), Some(right)) = (left, right)
            && left.is_finite()
            && right.is_finite()
        {
            x.push(*left);
            y.push(*right);
        }
    }

    if x.len() < 3 {
        return None;
    }

    let estimate = correlation::pearson(&x, &y, None).ok()?.estimate;
    estimate.is_finite().then(|| estimate.clamp(-1.0, 1.0))
}

/// Full pairwise correlation matrix, symmetric, in the order of `columns`.
pub fn correlation_matrix(columns: &[(String, Vec<Option<f64>>)]) -> Vec<Vec<Option<f64>>> {
    let n = columns.len();
    let mut matrix = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&columns[i].1, &columns[j].1);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

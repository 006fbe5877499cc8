//! Column role inference.
//!
//! Each column gets exactly one [`ColumnRole`] (DATE, MONEY, CATEGORY or
//! UNCLASSIFIED) from its name, dtype and a small sample of its values.
//! Inference is a pure function of the input, so running it twice on the
//! same dataset gives the same assignment.

mod role_inference;

pub use role_inference::{CATEGORY_KEYWORDS, DATE_KEYWORDS, MONEY_KEYWORDS, has_date_name};

pub(crate) use role_inference::infer_column_role;

use polars::prelude::*;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::types::{ColumnRole, RoleAssignment};

/// Profiler that assigns semantic roles to columns.
pub struct DataProfiler;

impl DataProfiler {
    /// Assign a role to every column of `df`, in column order.
    pub fn infer_roles(df: &DataFrame, config: &PipelineConfig) -> Result<RoleAssignment> {
        let mut roles = RoleAssignment::new();

        for column in df.get_columns() {
            let name = column.name().as_str();
            let series = column.as_materialized_series();
            let role = infer_column_role(name, series, config)
                .context(format!("Inferring role of column '{}'", name))?;
            debug!("Column '{}' ({:?}) -> {}", name, series.dtype(), role);
            roles.push(name, role);
        }

        Ok(roles)
    }
}

/// Assign roles with the default thresholds.
pub fn infer_roles(df: &DataFrame) -> Result<RoleAssignment> {
    DataProfiler::infer_roles(df, &PipelineConfig::default())
}

/// Count columns per role, for log lines and summaries.
pub fn role_counts(roles: &RoleAssignment) -> [(ColumnRole, usize); 4] {
    [
        ColumnRole::Date,
        ColumnRole::Money,
        ColumnRole::Category,
        ColumnRole::Unclassified,
    ]
    .map(|role| (role, roles.columns_with(role).len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_frame() -> DataFrame {
        df!(
            "Date" => ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05", "2024-01-06"],
            "Revenue" => [100.0, 250.5, 80.0, 120.0, 95.0, 60.0],
            "Region" => ["North", "South", "North", "South", "North", "North"],
            "Notes" => ["a", "b", "c", "d", "e", "f"]
        )
        .unwrap()
    }

    #[test]
    fn test_infer_roles_in_column_order() {
        let roles = infer_roles(&sales_frame()).unwrap();
        let pairs: Vec<(&str, ColumnRole)> = roles.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("Date", ColumnRole::Date),
                ("Revenue", ColumnRole::Money),
                ("Region", ColumnRole::Category),
                ("Notes", ColumnRole::Unclassified),
            ]
        );
    }

    #[test]
    fn test_infer_roles_idempotent() {
        let df = sales_frame();
        let first = infer_roles(&df).unwrap();
        let second = infer_roles(&df).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_column_gets_one_role() {
        let df = sales_frame();
        let roles = infer_roles(&df).unwrap();
        assert_eq!(roles.len(), df.width());
        let total: usize = role_counts(&roles).iter().map(|(_, n)| n).sum();
        assert_eq!(total, df.width());
    }

    #[test]
    fn test_custom_thresholds() {
        let df = df!("segment" => ["a", "b", "a", "b", "a", "b"]).unwrap();
        let strict = PipelineConfig::builder()
            .category_ratio_threshold(0.2)
            .build()
            .unwrap();
        let roles = DataProfiler::infer_roles(&df, &strict).unwrap();
        assert_eq!(roles.role_of("segment"), Some(ColumnRole::Unclassified));

        let roles = infer_roles(&df).unwrap();
        assert_eq!(roles.role_of("segment"), Some(ColumnRole::Category));
    }

    #[test]
    fn test_empty_frame() {
        let roles = infer_roles(&DataFrame::empty()).unwrap();
        assert!(roles.is_empty());
    }
}

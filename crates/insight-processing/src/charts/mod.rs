//! Chart selection.
//!
//! Four rules decide which charts a cleaned dataset supports:
//!
//! | Rule | Needs                       | Chart   |
//! |------|-----------------------------|---------|
//! | R1   | DATE column + MONEY column  | Line    |
//! | R2   | CATEGORY + MONEY column     | Bar     |
//! | R3   | CATEGORY column             | Pie     |
//! | R4   | two or more numeric columns | Heatmap |
//!
//! After them come the supplementary charts for the dataset's domain (see
//! [`domain_charts`]).
//!
//! Selection is a pure function of the cleaned frame and the role
//! assignment: the same input always yields the same specs in the same order.

mod aggregation;
mod correlation;
mod domain_packs;

pub use aggregation::{
    Granularity, MONTHLY_SPAN_DAYS, TimeSeries, WEEKLY_SPAN_DAYS, bucket_by_period, date_values,
    linear_fit,
};
pub use correlation::{correlation_matrix, pearson};
pub use domain_packs::domain_charts;

use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::domain::{DataDomain, classify_domain};
use crate::types::{ChartSeries, ChartSpec, ChartType, CleanedDataset, ColumnRole, RoleAssignment, Trend};
use crate::utils::{series_to_f64, series_to_strings};

use aggregation::{grouped_sums, share_pct, top_n, trend_line, value_counts};
use correlation::numeric_columns;

/// Rule engine producing chart specifications.
pub struct ChartSelector {
    bar_top_n: usize,
    pie_top_n: usize,
}

impl ChartSelector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            bar_top_n: config.bar_top_n,
            pie_top_n: config.pie_top_n,
        }
    }

    /// Apply every rule in order and collect the charts that apply.
    pub fn select(&self, cleaned: &CleanedDataset, roles: &RoleAssignment) -> Result<Vec<ChartSpec>> {
        self.select_for_domain(cleaned, roles, classify_domain(&cleaned.frame))
    }

    /// Like [`select`](Self::select), with the domain already classified.
    pub fn select_for_domain(
        &self,
        cleaned: &CleanedDataset,
        roles: &RoleAssignment,
        domain: DataDomain,
    ) -> Result<Vec<ChartSpec>> {
        info!("Selecting charts...");
        let df = &cleaned.frame;
        let mut charts = Vec::new();

        if let Some(chart) = self.time_series_chart(df, roles)? {
            charts.push(chart);
        }
        if let Some(chart) = self.category_bar_chart(df, roles)? {
            charts.push(chart);
        }
        if let Some(chart) = self.category_pie_chart(df, roles)? {
            charts.push(chart);
        }
        if let Some(chart) = self.correlation_heatmap(df)? {
            charts.push(chart);
        }
        charts.extend(domain_charts(df, roles, domain)?);

        info!("Selected {} charts", charts.len());
        Ok(charts)
    }

    /// R1: money summed per day, week or month with a fitted trend.
    fn time_series_chart(&self, df: &DataFrame, roles: &RoleAssignment) -> Result<Option<ChartSpec>> {
        let Some(date_col) = roles.first(ColumnRole::Date) else {
            return Ok(None);
        };
        let Some((money_col, values)) = first_money_values(df, roles)? else {
            return Ok(None);
        };

        let dates = date_values(df.column(date_col)?.as_materialized_series())?;
        let Some(series) = bucket_by_period(&dates, &values) else {
            debug!("R1 skipped: no rows with both '{}' and '{}'", date_col, money_col);
            return Ok(None);
        };

        let (slope, intercept) = linear_fit(&series.values);
        let trend = Trend::from_slope(slope);
        let line = trend_line(slope, intercept, series.values.len());
        debug!(
            "R1: {} {} periods, slope {:.4}",
            series.labels.len(),
            series.granularity.as_str(),
            slope
        );

        let description = format!(
            "{} {} totals across {} periods; the trend is {}",
            capitalize(series.granularity.as_str()),
            money_col,
            series.labels.len(),
            trend.as_str()
        );
        let chart = ChartSpec::new(
            ChartType::Line,
            format!("{} Over Time", money_col),
            series.labels,
            ChartSeries::Values(series.values),
            description,
        )
        .with_trend(trend, line);

        Ok(Some(chart))
    }

    /// R2: money summed per category, largest first.
    fn category_bar_chart(&self, df: &DataFrame, roles: &RoleAssignment) -> Result<Option<ChartSpec>> {
        let Some(category_col) = roles.first(ColumnRole::Category) else {
            return Ok(None);
        };
        let Some((money_col, values)) = first_money_values(df, roles)? else {
            return Ok(None);
        };

        let categories = series_to_strings(df.column(category_col)?.as_materialized_series())?;
        let top = top_n(grouped_sums(&categories, &values), self.bar_top_n);
        let Some((top_name, top_value)) = top.first().cloned() else {
            return Ok(None);
        };

        let total: f64 = top.iter().map(|(_, v)| v).sum();
        let description = format!(
            "{} leads with {:.2} ({:.1}% of the top {} total)",
            top_name,
            top_value,
            share_pct(top_value, total),
            top.len()
        );
        let (labels, sums) = top.into_iter().unzip();

        Ok(Some(ChartSpec::new(
            ChartType::Bar,
            format!("{} by {}", money_col, category_col),
            labels,
            ChartSeries::Values(sums),
            description,
        )))
    }

    /// R3: category frequencies, most common first.
    fn category_pie_chart(&self, df: &DataFrame, roles: &RoleAssignment) -> Result<Option<ChartSpec>> {
        let Some(category_col) = roles.first(ColumnRole::Category) else {
            return Ok(None);
        };

        let categories = series_to_strings(df.column(category_col)?.as_materialized_series())?;
        let top = top_n(value_counts(&categories), self.pie_top_n);
        let Some((top_name, top_count)) = top.first().cloned() else {
            return Ok(None);
        };

        let total: f64 = top.iter().map(|(_, v)| v).sum();
        let description = format!(
            "{} is the largest segment at {:.1}% of the top {}",
            top_name,
            share_pct(top_count, total),
            top.len()
        );
        let (labels, counts) = top.into_iter().unzip();

        Ok(Some(ChartSpec::new(
            ChartType::Pie,
            format!("{} Distribution", category_col),
            labels,
            ChartSeries::Values(counts),
            description,
        )))
    }

    /// R4: Pearson correlation between every pair of numeric columns.
    fn correlation_heatmap(&self, df: &DataFrame) -> Result<Option<ChartSpec>> {
        let columns = numeric_columns(df)?;
        if columns.len() < 2 {
            return Ok(None);
        }

        let matrix = correlation_matrix(&columns);
        let names: Vec<String> = columns.into_iter().map(|(name, _)| name).collect();
        let description = format!("Pairwise correlation between {} numeric columns", names.len());

        Ok(Some(ChartSpec::new(
            ChartType::Heatmap,
            "Correlation Matrix",
            names,
            ChartSeries::Matrix(matrix),
            description,
        )))
    }
}

/// Select charts with the default top-N limits.
pub fn select_charts(cleaned: &CleanedDataset, roles: &RoleAssignment) -> crate::Result<Vec<ChartSpec>> {
    ChartSelector::new(&PipelineConfig::default())
        .select(cleaned, roles)
        .map_err(|e| crate::ProcessingError::ChartSelectionFailed(e.to_string()))
}

/// First MONEY column that yields at least one number, with its values.
fn first_money_values<'a>(
    df: &DataFrame,
    roles: &'a RoleAssignment,
) -> Result<Option<(&'a str, Vec<Option<f64>>)>> {
    for name in roles.columns_with(ColumnRole::Money) {
        let values = series_to_f64(df.column(name)?.as_materialized_series())?;
        if values.iter().any(|v| v.is_some()) {
            return Ok(Some((name, values)));
        }
        debug!("MONEY column '{}' has no numeric values", name);
    }
    Ok(None)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

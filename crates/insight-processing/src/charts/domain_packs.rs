//! Supplementary charts chosen by the data domain.
//!
//! These run after the four general rules and look for columns by name
//! fragment, the way a report for each kind of business data would.

use anyhow::Result;
use chrono::NaiveDateTime;
use polars::prelude::*;
use tracing::debug;

use crate::domain::DataDomain;
use crate::types::{ChartSeries, ChartSpec, ChartType, ColumnRole, NamedSeries, RoleAssignment};
use crate::utils::{is_numeric_dtype, series_to_f64, series_to_strings};

use super::aggregation::{
    bucket_by_period, date_values, grouped_means, grouped_sums, share_pct, top_n, value_counts,
};

/// Products shown in the top-products bar.
pub const TOP_PRODUCTS: usize = 10;

/// Slices in the payment method pie.
pub const PAYMENT_SLICES: usize = 6;

/// Slices in the content type pie.
pub const CONTENT_SLICES: usize = 8;

/// Bars in the cost breakdown.
pub const COST_BARS: usize = 8;

const COST_KEYWORDS: &[&str] = &[
    "ingredients",
    "packaging",
    "labor",
    "utilities",
    "opex",
    "operating_expenses",
    "salaries",
    "rent",
    "marketing",
    "maintenance",
    "supplies",
    "depreciation",
    "cogs",
];

const SALES_AMOUNT_NAMES: &[&str] = &["total_sales", "sales", "revenue", "amount", "unit_price"];

const ENGAGEMENT_METRICS: &[&str] = &["views", "likes", "shares", "comments"];

/// Charts specific to `domain`, in a fixed order. General data gets none.
pub fn domain_charts(
    df: &DataFrame,
    roles: &RoleAssignment,
    domain: DataDomain,
) -> Result<Vec<ChartSpec>> {
    let charts = match domain {
        DataDomain::Financial => vec![revenue_profit_trend(df, roles)?, cost_breakdown(df)?],
        DataDomain::Sales => vec![top_products(df, roles)?, payment_methods(df)?],
        DataDomain::SocialMedia => vec![platform_performance(df)?, content_types(df)?],
        DataDomain::General => Vec::new(),
    };
    let charts: Vec<ChartSpec> = charts.into_iter().flatten().collect();
    debug!("{} {} charts", charts.len(), domain);
    Ok(charts)
}

/// First column whose lowercase name satisfies `matches`.
fn find_column<'a>(df: &'a DataFrame, matches: impl Fn(&str) -> bool) -> Option<&'a str> {
    df.get_column_names()
        .into_iter()
        .find(|name| matches(&name.to_lowercase()))
        .map(|name| name.as_str())
}

fn strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    series_to_strings(df.column(name)?.as_materialized_series())
}

fn numbers(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    series_to_f64(df.column(name)?.as_materialized_series())
}

fn bar(title: String, pairs: Vec<(String, f64)>, description: String) -> ChartSpec {
    let (labels, values) = pairs.into_iter().unzip();
    ChartSpec::new(ChartType::Bar, title, labels, ChartSeries::Values(values), description)
}

fn pie(title: &str, pairs: Vec<(String, f64)>) -> Option<ChartSpec> {
    let (top_name, top_count) = pairs.first().cloned()?;
    let total: f64 = pairs.iter().map(|(_, v)| v).sum();
    let description = format!(
        "{} accounts for {:.1}% of the top {}",
        top_name,
        share_pct(top_count, total),
        pairs.len()
    );
    let (labels, counts) = pairs.into_iter().unzip();
    Some(ChartSpec::new(
        ChartType::Pie,
        title,
        labels,
        ChartSeries::Values(counts),
        description,
    ))
}

// ============================================================================
// Financial
// ============================================================================

/// Revenue and profit summed per period, over the rows that carry both.
fn revenue_profit_trend(df: &DataFrame, roles: &RoleAssignment) -> Result<Option<ChartSpec>> {
    let Some(date_col) = roles.first(ColumnRole::Date) else {
        return Ok(None);
    };
    let Some(revenue_col) = find_column(df, |name| name.contains("revenue")) else {
        return Ok(None);
    };
    let Some(profit_col) = find_column(df, |name| {
        name == "profit" || name.contains("net_profit") || name.contains("gross_profit")
    }) else {
        return Ok(None);
    };

    let revenue = numbers(df, revenue_col)?;
    let profit = numbers(df, profit_col)?;
    let dates: Vec<Option<NaiveDateTime>> = date_values(df.column(date_col)?.as_materialized_series())?
        .into_iter()
        .zip(revenue.iter().zip(&profit))
        .map(|(date, (r, p))| if r.is_some() && p.is_some() { date } else { None })
        .collect();

    let (Some(revenue_series), Some(profit_series)) =
        (bucket_by_period(&dates, &revenue), bucket_by_period(&dates, &profit))
    else {
        return Ok(None);
    };

    let description = format!(
        "{} {} and {} totals across {} periods",
        revenue_series.granularity.as_str(),
        revenue_col,
        profit_col,
        revenue_series.labels.len()
    );
    Ok(Some(ChartSpec::new(
        ChartType::Line,
        "Revenue vs Profit Trend",
        revenue_series.labels,
        ChartSeries::Named(vec![
            NamedSeries {
                name: revenue_col.to_string(),
                values: revenue_series.values,
            },
            NamedSeries {
                name: profit_col.to_string(),
                values: profit_series.values,
            },
        ]),
        description,
    )))
}

/// Column totals of the numeric cost columns, largest first. Needs two.
fn cost_breakdown(df: &DataFrame) -> Result<Option<ChartSpec>> {
    let mut totals = Vec::new();
    for column in df.get_columns() {
        let lower = column.name().to_lowercase();
        if !is_numeric_dtype(column.dtype()) || !COST_KEYWORDS.iter().any(|k| lower.contains(k)) {
            continue;
        }
        let values = series_to_f64(column.as_materialized_series())?;
        totals.push((column.name().to_string(), values.iter().flatten().sum::<f64>()));
    }
    if totals.len() < 2 {
        return Ok(None);
    }

    let totals = top_n(totals, COST_BARS);
    let description = format!("{} is the largest cost at {:.2}", totals[0].0, totals[0].1);
    Ok(Some(bar("Cost Breakdown".to_string(), totals, description)))
}

// ============================================================================
// Sales
// ============================================================================

/// Sales amount summed per product, best sellers first.
fn top_products(df: &DataFrame, roles: &RoleAssignment) -> Result<Option<ChartSpec>> {
    let Some(product_col) = find_column(df, |name| name.contains("product")) else {
        return Ok(None);
    };
    let amount_col = find_column(df, |name| SALES_AMOUNT_NAMES.contains(&name))
        .or_else(|| roles.first(ColumnRole::Money));
    let Some(amount_col) = amount_col.filter(|col| *col != product_col) else {
        return Ok(None);
    };

    let sums = grouped_sums(&strings(df, product_col)?, &numbers(df, amount_col)?);
    let top = top_n(sums, TOP_PRODUCTS);
    let Some((best, best_total)) = top.first().cloned() else {
        return Ok(None);
    };

    let description = format!("{} is the top product with {:.2} in {}", best, best_total, amount_col);
    Ok(Some(bar(
        format!("Top {} Products by Revenue", TOP_PRODUCTS),
        top,
        description,
    )))
}

fn payment_methods(df: &DataFrame) -> Result<Option<ChartSpec>> {
    let Some(payment_col) = find_column(df, |name| name.contains("payment")) else {
        return Ok(None);
    };
    let counts = top_n(value_counts(&strings(df, payment_col)?), PAYMENT_SLICES);
    Ok(pie("Payment Method Distribution", counts))
}

// ============================================================================
// Social media
// ============================================================================

/// Mean of the first engagement metric per platform.
fn platform_performance(df: &DataFrame) -> Result<Option<ChartSpec>> {
    let Some(platform_col) = find_column(df, |name| name == "platform") else {
        return Ok(None);
    };
    let Some(metric_col) = df
        .get_columns()
        .iter()
        .find(|col| {
            is_numeric_dtype(col.dtype())
                && ENGAGEMENT_METRICS.contains(&col.name().to_lowercase().as_str())
        })
        .map(|col| col.name().as_str())
    else {
        return Ok(None);
    };

    let means = grouped_means(&strings(df, platform_col)?, &numbers(df, metric_col)?);
    let top = top_n(means, usize::MAX);
    let Some((best, best_mean)) = top.first().cloned() else {
        return Ok(None);
    };

    let description = format!("{} averages the most {} at {:.2}", best, metric_col, best_mean);
    Ok(Some(bar(format!("Average {} by Platform", metric_col), top, description)))
}

fn content_types(df: &DataFrame) -> Result<Option<ChartSpec>> {
    let Some(content_col) = find_column(df, |name| name.contains("content")) else {
        return Ok(None);
    };
    let counts = top_n(value_counts(&strings(df, content_col)?), CONTENT_SLICES);
    Ok(pie("Content Type Distribution", counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classify_domain;
    use crate::profiler::infer_roles;
    use pretty_assertions::assert_eq;

    fn packs_for(df: &DataFrame) -> Vec<ChartSpec> {
        let roles = infer_roles(df).unwrap();
        domain_charts(df, &roles, classify_domain(df)).unwrap()
    }

    fn titles(charts: &[ChartSpec]) -> Vec<&str> {
        charts.iter().map(|c| c.title.as_str()).collect()
    }

    #[test]
    fn test_sales_pack() {
        let df = df!(
            "product" => ["tea", "cake", "tea", "juice", "cake", "tea"],
            "payment_method" => ["card", "cash", "card", "card", "cash", "wallet"],
            "sales" => [3.0, 10.0, 3.0, 4.0, 12.0, 3.0]
        )
        .unwrap();
        assert_eq!(classify_domain(&df), DataDomain::Sales);

        let charts = packs_for(&df);
        assert_eq!(
            titles(&charts),
            vec!["Top 10 Products by Revenue", "Payment Method Distribution"]
        );

        let products = &charts[0];
        assert_eq!(products.chart_type, ChartType::Bar);
        assert_eq!(products.x_axis_data, vec!["cake", "tea", "juice"]);
        assert_eq!(products.series_data, ChartSeries::Values(vec![22.0, 9.0, 4.0]));

        let payments = &charts[1];
        assert_eq!(payments.chart_type, ChartType::Pie);
        assert_eq!(payments.x_axis_data, vec!["card", "cash", "wallet"]);
        assert_eq!(payments.series_data, ChartSeries::Values(vec![3.0, 2.0, 1.0]));
    }

    #[test]
    fn test_financial_pack() {
        let df = df!(
            "date" => ["2024-01-01", "2024-01-02", "2024-01-03"],
            "revenue" => [100.0, 120.0, 150.0],
            "net_profit" => [10.0, 15.0, 30.0],
            "cogs" => [50.0, 60.0, 70.0],
            "marketing" => [5.0, 5.0, 5.0]
        )
        .unwrap();
        assert_eq!(classify_domain(&df), DataDomain::Financial);

        let charts = packs_for(&df);
        assert_eq!(titles(&charts), vec!["Revenue vs Profit Trend", "Cost Breakdown"]);

        let trend = &charts[0];
        assert_eq!(trend.x_axis_data, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(
            trend.series_data,
            ChartSeries::Named(vec![
                NamedSeries {
                    name: "revenue".to_string(),
                    values: vec![100.0, 120.0, 150.0],
                },
                NamedSeries {
                    name: "net_profit".to_string(),
                    values: vec![10.0, 15.0, 30.0],
                },
            ])
        );

        let costs = &charts[1];
        assert_eq!(costs.x_axis_data, vec!["cogs", "marketing"]);
        assert_eq!(costs.series_data, ChartSeries::Values(vec![180.0, 15.0]));
    }

    #[test]
    fn test_social_media_pack() {
        let df = df!(
            "platform" => ["x", "insta", "x", "insta"],
            "content_type" => ["video", "image", "video", "video"],
            "likes" => [10i64, 40, 20, 60]
        )
        .unwrap();
        assert_eq!(classify_domain(&df), DataDomain::SocialMedia);

        let charts = packs_for(&df);
        assert_eq!(
            titles(&charts),
            vec!["Average likes by Platform", "Content Type Distribution"]
        );
        assert_eq!(charts[0].x_axis_data, vec!["insta", "x"]);
        assert_eq!(charts[0].series_data, ChartSeries::Values(vec![50.0, 15.0]));
        assert_eq!(charts[1].series_data, ChartSeries::Values(vec![3.0, 1.0]));
    }

    #[test]
    fn test_pack_skips_missing_columns() {
        let df = df!(
            "Date" => ["2024-01-01", "2024-01-02"],
            "Category" => ["a", "b"],
            "Sales" => [1.0, 2.0]
        )
        .unwrap();
        assert_eq!(classify_domain(&df), DataDomain::Sales);
        assert!(packs_for(&df).is_empty());

        let general = df!("notes" => ["a", "b"]).unwrap();
        assert!(packs_for(&general).is_empty());
    }
}

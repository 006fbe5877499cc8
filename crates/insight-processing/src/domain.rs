//! Business domain detection from column names.
//!
//! The domain sets the report title and focus line and picks the
//! supplementary chart pack. It never changes cleaning.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

const FINANCIAL_KEYWORDS: &[&str] = &[
    "revenue",
    "profit",
    "margin",
    "expense",
    "cogs",
    "opex",
    "net_profit",
    "ebitda",
    "income",
    "budget",
    "cash",
    "liabilit",
    "asset",
];

const SALES_KEYWORDS: &[&str] = &[
    "product",
    "sales",
    "quantity",
    "qty",
    "payment",
    "unit_price",
    "store",
    "customer",
    "order",
    "discount",
    "sku",
];

const SOCIAL_MEDIA_KEYWORDS: &[&str] = &[
    "platform",
    "likes",
    "shares",
    "comments",
    "views",
    "followers",
    "engagement",
    "impressions",
    "reach",
    "post",
];

/// The kind of business data an upload most likely contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDomain {
    Financial,
    Sales,
    SocialMedia,
    General,
}

impl DataDomain {
    /// Report title for an uploaded file.
    pub fn report_title(&self, filename: &str) -> String {
        let base = match self {
            Self::Financial => "Financial Performance Report",
            Self::Sales => "Sales Performance Report",
            Self::SocialMedia => "Social Media Performance Report",
            Self::General => "Business Analysis Report",
        };
        format!("{} - {}", base, filename)
    }

    /// One-line focus statement shown under the title.
    pub fn subtitle(&self) -> &'static str {
        match self {
            Self::Financial => "Focus: Revenue, COGS, margins, OpEx, and profitability trends.",
            Self::Sales => "Focus: Revenue, product mix, volume trends, and customer behavior.",
            Self::SocialMedia => {
                "Focus: Engagement, platform effectiveness, content performance, and growth."
            }
            Self::General => "Focus: Executive-ready insights, trends, and recommendations.",
        }
    }
}

impl fmt::Display for DataDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Financial => "financial",
            Self::Sales => "sales",
            Self::SocialMedia => "social_media",
            Self::General => "general",
        };
        f.write_str(name)
    }
}

/// Classify a dataset by counting keyword hits in its column names.
///
/// The highest score wins; a tie for the top score or no hits at all gives
/// [`DataDomain::General`].
pub fn classify_domain(df: &DataFrame) -> DataDomain {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_lowercase())
        .collect();
    classify_columns(&names)
}

pub(crate) fn classify_columns(names: &[String]) -> DataDomain {
    let score = |keywords: &[&str]| -> usize {
        names
            .iter()
            .filter(|name| keywords.iter().any(|keyword| name.contains(keyword)))
            .count()
    };

    let mut scored = [
        (DataDomain::Financial, score(FINANCIAL_KEYWORDS)),
        (DataDomain::Sales, score(SALES_KEYWORDS)),
        (DataDomain::SocialMedia, score(SOCIAL_MEDIA_KEYWORDS)),
    ];
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    match scored {
        [(_, 0), ..] => DataDomain::General,
        [(_, top), (_, second), _] if top == second => DataDomain::General,
        [(domain, _), ..] => domain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_lowercase()).collect()
    }

    #[test]
    fn test_financial_domain() {
        let domain = classify_columns(&names(&["Month", "Revenue", "COGS", "Net_Profit", "OpEx"]));
        assert_eq!(domain, DataDomain::Financial);
    }

    #[test]
    fn test_sales_domain() {
        let domain = classify_columns(&names(&["Date", "Product", "Quantity", "Store", "Payment"]));
        assert_eq!(domain, DataDomain::Sales);
    }

    #[test]
    fn test_social_media_domain() {
        let df = df!(
            "Platform" => ["x", "y"],
            "Likes" => [1, 2],
            "Shares" => [0, 3],
            "Views" => [10, 20]
        )
        .unwrap();
        assert_eq!(classify_domain(&df), DataDomain::SocialMedia);
    }

    #[test]
    fn test_general_when_no_keywords() {
        let domain = classify_columns(&names(&["a", "b", "c"]));
        assert_eq!(domain, DataDomain::General);
    }

    #[test]
    fn test_general_on_tie() {
        // one financial hit, one sales hit
        let domain = classify_columns(&names(&["Revenue", "Product"]));
        assert_eq!(domain, DataDomain::General);
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            DataDomain::Sales.report_title("q1.csv"),
            "Sales Performance Report - q1.csv"
        );
        assert!(DataDomain::Financial.subtitle().contains("COGS"));
        assert_eq!(DataDomain::SocialMedia.to_string(), "social_media");
    }
}

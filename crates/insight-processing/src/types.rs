use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::DataDomain;
use crate::error::Result;
use crate::reporting::CleaningLog;

/// Column target used for log entries that concern the whole table.
pub const DATASET_TARGET: &str = "dataset";

// ============================================================================
// Column roles
// ============================================================================

/// Semantic role of a column, decided once per column by the profiler.
///
/// Precedence when several rules match: `Date`, then `Money`, then
/// `Category`, and `Unclassified` when nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnRole {
    Date,
    Money,
    Category,
    Unclassified,
}

impl ColumnRole {
    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Money => "Money",
            Self::Category => "Category",
            Self::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One role per column, in the column order of the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    roles: Vec<(String, ColumnRole)>,
}

impl RoleAssignment {
    /// Create an empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the role of the next column. A column that is already present
    /// keeps its first role.
    pub fn push(&mut self, column: impl Into<String>, role: ColumnRole) {
        let column = column.into();
        if self.role_of(&column).is_none() {
            self.roles.push((column, role));
        }
    }

    /// Role of a column, if the column was profiled.
    pub fn role_of(&self, column: &str) -> Option<ColumnRole> {
        self.roles
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, role)| *role)
    }

    /// First column (in column order) carrying `role`.
    pub fn first(&self, role: ColumnRole) -> Option<&str> {
        self.roles
            .iter()
            .find(|(_, r)| *r == role)
            .map(|(name, _)| name.as_str())
    }

    /// All columns carrying `role`, in column order.
    pub fn columns_with(&self, role: ColumnRole) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Iterate over `(column, role)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnRole)> {
        self.roles.iter().map(|(name, role)| (name.as_str(), *role))
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

// ============================================================================
// Cleaning log types
// ============================================================================

/// A single entry of the cleaning log.
///
/// Issues describe what was found, actions describe what was done about it.
/// Entries are kept in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CleaningLogEntry {
    IssueFound {
        column: String,
        description: String,
        count: usize,
    },
    ActionTaken {
        column: String,
        description: String,
        count: usize,
    },
}

impl CleaningLogEntry {
    pub fn issue(column: impl Into<String>, description: impl Into<String>, count: usize) -> Self {
        Self::IssueFound {
            column: column.into(),
            description: description.into(),
            count,
        }
    }

    pub fn action(column: impl Into<String>, description: impl Into<String>, count: usize) -> Self {
        Self::ActionTaken {
            column: column.into(),
            description: description.into(),
            count,
        }
    }

    /// Column (or `"dataset"`) the entry refers to.
    pub fn column(&self) -> &str {
        match self {
            Self::IssueFound { column, .. } | Self::ActionTaken { column, .. } => column,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Self::IssueFound { count, .. } | Self::ActionTaken { count, .. } => *count,
        }
    }

    pub fn is_issue(&self) -> bool {
        matches!(self, Self::IssueFound { .. })
    }

    /// Human-readable form, e.g. `"price: 2 missing values"`.
    pub fn message(&self) -> String {
        match self {
            Self::IssueFound {
                column,
                description,
                ..
            }
            | Self::ActionTaken {
                column,
                description,
                ..
            } => format!("{}: {}", column, description),
        }
    }
}

/// Aggregate view over a cleaning log, handed to the report renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// `(rows, columns)` of the raw dataset.
    pub original_shape: (usize, usize),
    /// `(rows, columns)` after cleaning.
    pub final_shape: (usize, usize),
    pub final_columns: Vec<String>,
    /// Signed so that the report renderer never has to special-case it.
    pub rows_removed: i64,
    /// Distinct columns touched by the log, excluding the `"dataset"` target.
    pub columns_cleaned: usize,
    pub total_issues_found: usize,
    pub total_actions_taken: usize,
}

/// Outcome of coercing one date-named column to datetimes.
///
/// `parsed + invalid + originally_null == total` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCoercion {
    pub column: String,
    pub parsed: usize,
    pub invalid: usize,
    pub originally_null: usize,
    pub total: usize,
}

// ============================================================================
// Cleaned dataset
// ============================================================================

/// The repaired table plus the bookkeeping needed to interpret it.
///
/// Cells whose date coercion failed are null in the datetime column and
/// flagged `true` in [`CleanedDataset::invalid_dates`].
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub frame: DataFrame,
    /// Column name to per-row "invalid date" mask. Masks stay aligned with
    /// `frame` rows through deduplication.
    pub invalid_dates: BTreeMap<String, Vec<bool>>,
    pub date_coercions: Vec<DateCoercion>,
}

impl CleanedDataset {
    /// Wrap a frame that has not been through date coercion yet.
    pub fn from_frame(frame: DataFrame) -> Self {
        Self {
            frame,
            invalid_dates: BTreeMap::new(),
            date_coercions: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Whether the cell at `row` of `column` failed date coercion.
    pub fn is_invalid_date(&self, column: &str, row: usize) -> bool {
        self.invalid_dates
            .get(column)
            .and_then(|mask| mask.get(row).copied())
            .unwrap_or(false)
    }

    /// Serialize the cleaned frame to CSV bytes with a header row.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut frame = self.frame.clone();
        let mut buf = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut frame)?;
        Ok(buf)
    }
}

// ============================================================================
// Chart specifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Pie,
    Heatmap,
}

/// Direction of a fitted linear trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Growing,
    Declining,
    Stable,
}

impl Trend {
    /// Classify a least-squares slope.
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Self::Growing
        } else if slope < 0.0 {
            Self::Declining
        } else {
            Self::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Growing => "growing",
            Self::Declining => "declining",
            Self::Stable => "stable",
        }
    }
}

/// Values plotted by a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartSeries {
    /// One value per x-axis label (line, bar, pie).
    Values(Vec<f64>),
    /// Square matrix (heatmap). `None` where a correlation is undefined.
    Matrix(Vec<Vec<Option<f64>>>),
    /// Several lines over the same x-axis labels.
    Named(Vec<NamedSeries>),
}

/// One line of a multi-line chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        match self {
            Self::Values(values) => values.len(),
            Self::Matrix(rows) => rows.len(),
            Self::Named(lines) => lines.first().map_or(0, |line| line.values.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_values(&self) -> Option<&[f64]> {
        match self {
            Self::Values(values) => Some(values),
            Self::Matrix(_) | Self::Named(_) => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&[Vec<Option<f64>>]> {
        match self {
            Self::Matrix(rows) => Some(rows),
            Self::Values(_) | Self::Named(_) => None,
        }
    }
}

/// Renderer-agnostic description of one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub title: String,
    pub x_axis_data: Vec<String>,
    pub series_data: ChartSeries,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_line: Option<Vec<f64>>,
}

impl ChartSpec {
    pub fn new(
        chart_type: ChartType,
        title: impl Into<String>,
        x_axis_data: Vec<String>,
        series_data: ChartSeries,
        description: impl Into<String>,
    ) -> Self {
        Self {
            chart_type,
            title: title.into(),
            x_axis_data,
            series_data,
            description: description.into(),
            trend: None,
            trend_line: None,
        }
    }

    /// Attach a fitted trend to a line chart.
    pub fn with_trend(mut self, trend: Trend, line: Vec<f64>) -> Self {
        self.trend = Some(trend);
        self.trend_line = Some(line);
        self
    }
}

// ============================================================================
// Pipeline result
// ============================================================================

/// Everything produced by one run of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Name of the uploaded file, when the run started from bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub roles: RoleAssignment,
    /// The cleaned table. Written separately as CSV.
    #[serde(skip)]
    pub cleaned: CleanedDataset,
    pub log: CleaningLog,
    pub summary: CleaningSummary,
    pub domain: DataDomain,
    pub charts: Vec<ChartSpec>,
    /// Advisory text; `None` when no provider was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Report title derived from the data domain and file name.
    pub fn report_title(&self) -> String {
        self.domain
            .report_title(self.filename.as_deref().unwrap_or("dataset"))
    }
}

// ============================================================================
// Tests
// ============================================================================

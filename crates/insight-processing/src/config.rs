//! Configuration types for the cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. The defaults reproduce the
//! heuristics the report service has always used.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of non-null values parsed by the date test.
pub const DEFAULT_DATE_SAMPLE_SIZE: usize = 5;

/// Default `unique / total` ratio below which a column may be categorical.
pub const DEFAULT_CATEGORY_RATIO: f64 = 0.5;

/// Default maximum number of distinct values for a categorical column.
pub const DEFAULT_MAX_CATEGORY_CARDINALITY: usize = 20;

/// Default multiplier applied to the IQR when computing outlier bounds.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Literal used to fill a categorical column that has no mode.
pub const DEFAULT_UNKNOWN_FILL: &str = "Unknown";

/// Configuration for the cleaning pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use insight_processing::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .bar_top_n(5)
///     .use_ai_guidance(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of leading non-null values parsed when testing a date-named column.
    /// Default: 5
    pub date_sample_size: usize,

    /// A column is categorical when `unique / total` is below this ratio
    /// (and its cardinality is within bounds).
    /// Default: 0.5
    pub category_ratio_threshold: f64,

    /// Upper bound (inclusive) on distinct values for a categorical column.
    /// Default: 20
    pub max_category_cardinality: usize,

    /// Multiplier for the interquartile range when computing clip bounds.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Value used when a non-numeric column with missing values has no mode.
    /// Default: "Unknown"
    pub unknown_fill_value: String,

    /// Whether to drop exact duplicate rows.
    /// Default: true
    pub remove_duplicates: bool,

    /// Whether to clip numeric outliers to the IQR bounds.
    /// Default: true
    pub cap_outliers: bool,

    /// Whether to run chart selection after cleaning.
    /// Default: true
    pub generate_charts: bool,

    /// Number of categories kept in the category/money bar chart.
    /// Default: 10
    pub bar_top_n: usize,

    /// Number of segments kept in the category pie chart.
    /// Default: 8
    pub pie_top_n: usize,

    /// Whether to ask the advisory provider (if any) for cleaning guidance.
    /// Default: true
    pub use_ai_guidance: bool,

    /// Output directory used by [`crate::ReportWriter`].
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Custom output file stem. If None, the input file stem is used.
    /// Default: None
    pub output_name: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            date_sample_size: DEFAULT_DATE_SAMPLE_SIZE,
            category_ratio_threshold: DEFAULT_CATEGORY_RATIO,
            max_category_cardinality: DEFAULT_MAX_CATEGORY_CARDINALITY,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            unknown_fill_value: DEFAULT_UNKNOWN_FILL.to_string(),
            remove_duplicates: true,
            cap_outliers: true,
            generate_charts: true,
            bar_top_n: 10,
            pie_top_n: 8,
            use_ai_guidance: true,
            output_dir: PathBuf::from("output"),
            output_name: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.category_ratio_threshold > 0.0 && self.category_ratio_threshold <= 1.0) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "category_ratio_threshold".to_string(),
                value: self.category_ratio_threshold,
            });
        }

        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier > 0.0) {
            return Err(ConfigValidationError::InvalidMultiplier(self.iqr_multiplier));
        }

        if self.date_sample_size == 0 {
            return Err(ConfigValidationError::InvalidCount {
                field: "date_sample_size".to_string(),
                value: self.date_sample_size,
                minimum: 1,
            });
        }

        // a category needs at least two distinct values
        if self.max_category_cardinality < 2 {
            return Err(ConfigValidationError::InvalidCount {
                field: "max_category_cardinality".to_string(),
                value: self.max_category_cardinality,
                minimum: 2,
            });
        }

        for (field, value) in [("bar_top_n", self.bar_top_n), ("pie_top_n", self.pie_top_n)] {
            if value == 0 {
                return Err(ConfigValidationError::InvalidCount {
                    field: field.to_string(),
                    value,
                    minimum: 1,
                });
            }
        }

        if self.unknown_fill_value.is_empty() {
            return Err(ConfigValidationError::EmptyFillValue);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be in (0.0, 1.0])")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid IQR multiplier: {0} (must be a positive number)")]
    InvalidMultiplier(f64),

    #[error("Invalid value for '{field}': {value} (must be at least {minimum})")]
    InvalidCount {
        field: String,
        value: usize,
        minimum: usize,
    },

    #[error("Fill value for empty columns must not be empty")]
    EmptyFillValue,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    date_sample_size: Option<usize>,
    category_ratio_threshold: Option<f64>,
    max_category_cardinality: Option<usize>,
    iqr_multiplier: Option<f64>,
    unknown_fill_value: Option<String>,
    remove_duplicates: Option<bool>,
    cap_outliers: Option<bool>,
    generate_charts: Option<bool>,
    bar_top_n: Option<usize>,
    pie_top_n: Option<usize>,
    use_ai_guidance: Option<bool>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
}

impl PipelineConfigBuilder {
    /// Set how many non-null values the date test parses.
    pub fn date_sample_size(mut self, size: usize) -> Self {
        self.date_sample_size = Some(size);
        self
    }

    /// Set the uniqueness ratio below which a column may be categorical.
    ///
    /// # Arguments
    /// * `ratio` - Value in (0.0, 1.0] (e.g., 0.5 = fewer distinct values than half the rows)
    pub fn category_ratio_threshold(mut self, ratio: f64) -> Self {
        self.category_ratio_threshold = Some(ratio);
        self
    }

    /// Set the maximum number of distinct values for a categorical column.
    pub fn max_category_cardinality(mut self, max: usize) -> Self {
        self.max_category_cardinality = Some(max);
        self
    }

    /// Set the IQR multiplier used for outlier bounds.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    /// Set the literal used for non-numeric columns without a mode.
    pub fn unknown_fill_value(mut self, value: impl Into<String>) -> Self {
        self.unknown_fill_value = Some(value.into());
        self
    }

    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Enable or disable outlier clipping.
    pub fn cap_outliers(mut self, cap: bool) -> Self {
        self.cap_outliers = Some(cap);
        self
    }

    /// Enable or disable chart selection.
    pub fn generate_charts(mut self, generate: bool) -> Self {
        self.generate_charts = Some(generate);
        self
    }

    /// Set how many categories the bar chart keeps.
    pub fn bar_top_n(mut self, n: usize) -> Self {
        self.bar_top_n = Some(n);
        self
    }

    /// Set how many segments the pie chart keeps.
    pub fn pie_top_n(mut self, n: usize) -> Self {
        self.pie_top_n = Some(n);
        self
    }

    /// Enable or disable the advisory guidance call.
    ///
    /// When disabled, or when no provider is configured, the pipeline uses
    /// the static fallback guidance text.
    pub fn use_ai_guidance(mut self, use_ai: bool) -> Self {
        self.use_ai_guidance = Some(use_ai);
        self
    }

    /// Set the output directory for written artifacts.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file stem (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            date_sample_size: self.date_sample_size.unwrap_or(defaults.date_sample_size),
            category_ratio_threshold: self
                .category_ratio_threshold
                .unwrap_or(defaults.category_ratio_threshold),
            max_category_cardinality: self
                .max_category_cardinality
                .unwrap_or(defaults.max_category_cardinality),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(defaults.iqr_multiplier),
            unknown_fill_value: self
                .unknown_fill_value
                .unwrap_or(defaults.unknown_fill_value),
            remove_duplicates: self.remove_duplicates.unwrap_or(defaults.remove_duplicates),
            cap_outliers: self.cap_outliers.unwrap_or(defaults.cap_outliers),
            generate_charts: self.generate_charts.unwrap_or(defaults.generate_charts),
            bar_top_n: self.bar_top_n.unwrap_or(defaults.bar_top_n),
            pie_top_n: self.pie_top_n.unwrap_or(defaults.pie_top_n),
            use_ai_guidance: self.use_ai_guidance.unwrap_or(defaults.use_ai_guidance),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            output_name: self.output_name,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.date_sample_size, 5);
        assert_eq!(config.category_ratio_threshold, 0.5);
        assert_eq!(config.max_category_cardinality, 20);
        assert_eq!(config.iqr_multiplier, 1.5);
        assert_eq!(config.unknown_fill_value, "Unknown");
        assert_eq!(config.bar_top_n, 10);
        assert_eq!(config.pie_top_n, 8);
        assert!(config.remove_duplicates);
        assert!(config.cap_outliers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::builder()
            .bar_top_n(5)
            .pie_top_n(3)
            .cap_outliers(false)
            .use_ai_guidance(false)
            .output_name("quarterly")
            .build()
            .unwrap();

        assert_eq!(config.bar_top_n, 5);
        assert_eq!(config.pie_top_n, 3);
        assert!(!config.cap_outliers);
        assert!(!config.use_ai_guidance);
        assert_eq!(config.output_name.as_deref(), Some("quarterly"));
        // untouched fields keep their defaults
        assert_eq!(config.iqr_multiplier, 1.5);
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let result = PipelineConfig::builder()
            .category_ratio_threshold(1.5)
            .build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidThreshold { .. })
        ));

        let result = PipelineConfig::builder()
            .category_ratio_threshold(0.0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_counts_rejected() {
        assert!(PipelineConfig::builder().bar_top_n(0).build().is_err());
        assert!(PipelineConfig::builder().pie_top_n(0).build().is_err());
        assert!(PipelineConfig::builder().date_sample_size(0).build().is_err());
        assert!(
            PipelineConfig::builder()
                .max_category_cardinality(1)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_invalid_multiplier_rejected() {
        assert!(matches!(
            PipelineConfig::builder().iqr_multiplier(-1.0).build(),
            Err(ConfigValidationError::InvalidMultiplier(_))
        ));
        assert!(PipelineConfig::builder().iqr_multiplier(f64::NAN).build().is_err());
    }

    #[test]
    fn test_empty_fill_value_rejected() {
        assert!(matches!(
            PipelineConfig::builder().unknown_fill_value("").build(),
            Err(ConfigValidationError::EmptyFillValue)
        ));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = PipelineConfig::builder().bar_top_n(7).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bar_top_n, 7);
        assert_eq!(back.unknown_fill_value, "Unknown");
    }
}

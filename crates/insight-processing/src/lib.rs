//! Insight Processing Library
//!
//! Turns an uploaded business spreadsheet (CSV or Excel) into a cleaned
//! table, an ordered cleaning log and a short list of chart specifications,
//! built with Rust and Polars.
//!
//! # Overview
//!
//! - **Role Inference**: Each column is tagged as DATE, MONEY, CATEGORY or OTHER
//! - **Repair**: Missing values are filled, date columns are coerced and
//!   currency strings are parsed
//! - **Deduplication**: Exact duplicate rows are removed, keeping the first
//! - **Outlier Clipping**: Numeric columns are clipped to their IQR fences
//! - **Chart Selection**: Line, bar, pie and heatmap charts chosen by rule
//! - **Advisory Guidance**: Optional natural-language cleaning notes from Gemini
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use insight_processing::{Pipeline, PipelineConfig, ReportWriter};
//!
//! let bytes = std::fs::read("sales.csv")?;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process_bytes(&bytes, "sales.csv")?;
//!
//! println!("{}", result.report_title());
//! for chart in &result.charts {
//!     println!("{:?}: {}", chart.chart_type, chart.title);
//! }
//!
//! ReportWriter::from_config(&PipelineConfig::default()).write_all(&result)?;
//! ```
//!
//! # Advisory Providers
//!
//! Guidance text comes from an [`ai::AdvisoryProvider`]. With the `ai`
//! feature enabled, [`ai::GeminiProvider`] calls the Google Gemini API.
//! A provider failure never fails the run; the pipeline falls back to
//! [`ai::FALLBACK_GUIDANCE`].
//!
//! ```rust,ignore
//! use insight_processing::ai::GeminiProvider;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(GeminiProvider::new(api_key)?);
//! let pipeline = Pipeline::builder().advisory_provider(provider).build()?;
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use insight_processing::PipelineConfig;
//!
//! let config = PipelineConfig::builder()
//!     .iqr_multiplier(3.0)
//!     .bar_top_n(5)
//!     .use_ai_guidance(false)
//!     .build()?;
//! ```
//!
//! # Individual Stages
//!
//! The stages are also available as free functions over a loaded frame:
//! [`load_dataset`], [`infer_roles`], [`repair`], [`deduplicate_and_cap`]
//! and [`select_charts`].

pub mod ai;
pub mod charts;
pub mod cleaner;
pub mod config;
pub mod domain;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use charts::{ChartSelector, select_charts};
pub use cleaner::{DataCleaner, deduplicate_and_cap, repair};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use domain::{DataDomain, classify_domain};
pub use error::{ProcessingError, Result, ResultExt};
pub use imputers::StatisticalImputer;
pub use loader::{FileFormat, load_dataset};
pub use pipeline::{
    ClosureProgressReporter, OutlierHandler, Pipeline, PipelineBuilder, ProcessingStage,
    ProgressReporter, ProgressUpdate,
};
pub use profiler::{DataProfiler, infer_roles};
pub use reporting::{CleaningLog, CleaningReport, ReportWriter};
pub use types::{
    ChartSeries, ChartSpec, ChartType, CleanedDataset, CleaningLogEntry, CleaningSummary,
    ColumnRole, DateCoercion, NamedSeries, PipelineResult, RoleAssignment, Trend,
};

//! Progress reporting for the cleaning pipeline.
//!
//! The pipeline runs synchronously; a [`ProgressReporter`] receives an
//! update at every stage boundary and once per column during repair.
//!
//! # Example
//!
//! ```rust,ignore
//! use insight_processing::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// Parsing the uploaded bytes
    Loading,
    /// Assigning DATE / MONEY / CATEGORY roles
    RoleInference,
    /// Missing-value and type repair
    Repair,
    /// Duplicate removal and outlier clipping
    Deduplication,
    /// Choosing chart specifications
    ChartSelection,
    /// Asking the advisory service for guidance
    Advisory,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl ProcessingStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::RoleInference => "Inferring Column Roles",
            Self::Repair => "Repairing Values",
            Self::Deduplication => "Removing Duplicates & Outliers",
            Self::ChartSelection => "Selecting Charts",
            Self::Advisory => "Requesting Guidance",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Returns the typical weight of this stage in the overall pipeline (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.10,
            Self::RoleInference => 0.10,
            Self::Repair => 0.35,
            Self::Deduplication => 0.15,
            Self::ChartSelection => 0.15,
            Self::Advisory => 0.15,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::RoleInference => 0.10,
            Self::Repair => 0.20,
            Self::Deduplication => 0.55,
            Self::ChartSelection => 0.70,
            Self::Advisory => 0.85,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// Detailed progress update with optional sub-stage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: ProcessingStage,

    /// Optional sub-stage description (e.g., "Column: price")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage without sub-stage info.
    pub fn new(stage: ProcessingStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a new progress update with item counts.
    pub fn with_items(
        stage: ProcessingStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            sub_stage: Some(sub_stage.into()),
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(ProcessingStage::Complete, 1.0, message)
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ProcessingStage::Failed, 0.0, message)
    }
}

/// Trait for receiving progress updates during processing.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved to a
/// worker thread while updates go elsewhere.
pub trait ProgressReporter: Send + Sync {
    /// Called at stage boundaries and once per column during repair.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(ProcessingStage::Repair, 0.5, "Repairing...");
        assert_eq!(update.stage, ProcessingStage::Repair);
        assert!(update.sub_stage.is_none());
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.375).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_with_items() {
        let update = ProgressUpdate::with_items(
            ProcessingStage::Repair,
            "Column: price",
            2,
            4,
            "Repairing column price",
        );
        assert_eq!(update.sub_stage, Some("Column: price".to_string()));
        assert_eq!(update.stage_progress, 0.5);
        assert_eq!(update.items_processed, Some(2));
        assert_eq!(update.items_total, Some(4));
    }

    #[test]
    fn test_progress_update_terminal_states() {
        let done = ProgressUpdate::complete("Done");
        assert_eq!(done.stage, ProcessingStage::Complete);
        assert_eq!(done.progress, 1.0);

        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, ProcessingStage::Failed);
        assert_eq!(failed.progress, 0.0);
    }

    #[test]
    fn test_stage_weights_sum() {
        let stages = [
            ProcessingStage::Loading,
            ProcessingStage::RoleInference,
            ProcessingStage::Repair,
            ProcessingStage::Deduplication,
            ProcessingStage::ChartSelection,
            ProcessingStage::Advisory,
        ];
        let total_weight: f32 = stages.iter().map(|s| s.weight()).sum();
        assert!((total_weight - 1.0).abs() < 0.01, "Weights should sum to ~1.0");

        // each stage starts where the previous one ends
        for pair in stages.windows(2) {
            let end = pair[0].base_progress() + pair[0].weight();
            assert!((end - pair[1].base_progress()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stage_json_values() {
        assert_eq!(
            serde_json::to_string(&ProcessingStage::RoleInference).unwrap(),
            "\"role_inference\""
        );
        assert_eq!(
            serde_json::to_string(&ProcessingStage::ChartSelection).unwrap(),
            "\"chart_selection\""
        );
    }

    #[test]
    fn test_closure_progress_reporter_across_threads() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let reporter_clone = reporter.clone();
        let handle = std::thread::spawn(move || {
            reporter_clone.report(ProgressUpdate::new(ProcessingStage::Loading, 0.0, "Loading"));
        });
        handle.join().expect("Thread should not panic");
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }
}

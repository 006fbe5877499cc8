//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating role inference, repair, deduplication, chart selection and
//! the optional advisory call.

use crate::ai::{AdvisoryProvider, FALLBACK_GUIDANCE, GuidanceRequest};
use crate::charts::ChartSelector;
use crate::cleaner::DataCleaner;
use crate::config::PipelineConfig;
use crate::domain::classify_domain;
use crate::error::{ProcessingError, Result};
use crate::loader::load_dataset;
use crate::pipeline::progress::{
    ClosureProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::{DataProfiler, role_counts};
use crate::reporting::CleaningLog;
use crate::types::{CleanedDataset, PipelineResult};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Rows of cleaned data shown to the advisory provider.
const GUIDANCE_SAMPLE_ROWS: usize = 10;

/// The main cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use insight_processing::{Pipeline, PipelineConfig};
/// use insight_processing::ai::GeminiProvider;
/// use std::sync::Arc;
///
/// // With guidance and progress reporting
/// let provider = Arc::new(GeminiProvider::new(api_key)?);
///
/// let result = Pipeline::builder()
///     .advisory_provider(provider)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process_bytes(&bytes, "sales.csv")?;
///
/// // Deterministic stages only
/// let result = Pipeline::builder()
///     .config(PipelineConfig::builder().use_ai_guidance(false).build()?)
///     .build()?
///     .process(dataframe)?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    advisory_provider: Option<Arc<dyn AdvisoryProvider>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
    chart_selector: ChartSelector,
}

// One pipeline may be shared between request handlers on different threads
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load an uploaded file and run it through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::UnsupportedFormat`] before any parsing when
    /// the extension is not `.csv`, `.xlsx` or `.xls`, and a load error when
    /// the bytes cannot be parsed.
    pub fn process_bytes(&self, bytes: &[u8], filename: &str) -> Result<PipelineResult> {
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Loading,
            0.0,
            format!("Loading {}...", filename),
        ));
        info!("Loading {} ({} bytes)", filename, bytes.len());

        let df = match load_dataset(bytes, filename) {
            Ok(df) => df,
            Err(e) => return Err(self.fail(e)),
        };
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Loading,
            1.0,
            format!("Loaded {} rows x {} columns", df.height(), df.width()),
        ));

        self.finish(self.process_internal(&df, Some(filename)))
    }

    /// Run an already loaded DataFrame through the pipeline.
    ///
    /// The frame is never modified; every stage works on its own copy.
    pub fn process(&self, df: DataFrame) -> Result<PipelineResult> {
        self.finish(self.process_internal(&df, None))
    }

    fn finish(&self, result: Result<PipelineResult>) -> Result<PipelineResult> {
        match result {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&self, e: ProcessingError) -> ProcessingError {
        self.report_progress(ProgressUpdate::failed(e.to_string()));
        error!("Pipeline error: {}", e);
        e
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, df: &DataFrame, filename: Option<&str>) -> Result<PipelineResult> {
        let start_time = Instant::now();
        info!("Starting cleaning pipeline...");

        if df.width() == 0 {
            return Err(ProcessingError::EmptyInput);
        }
        let mut log = CleaningLog::for_frame(df);

        // Step 1: Role inference
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::RoleInference,
            0.0,
            "Inferring column roles...",
        ));
        info!("Step 1: Inferring column roles...");
        let roles = DataProfiler::infer_roles(df, &self.config)?;
        let counts = role_counts(&roles)
            .iter()
            .map(|(role, count)| format!("{} {}", count, role))
            .collect::<Vec<_>>()
            .join(", ");
        info!("Roles: {}", counts);
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::RoleInference,
            1.0,
            format!("Roles inferred: {}", counts),
        ));

        // Step 2: Missing values and type repair
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Repair,
            0.0,
            "Repairing missing values and types...",
        ));
        info!("Step 2: Repairing values...");
        let (repaired, entries) = self
            .cleaner
            .repair(df, &roles)
            .map_err(|e| ProcessingError::CleaningFailed(e.to_string()))?;
        log.extend(entries);
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Repair,
            1.0,
            "Repair complete",
        ));

        // Step 3: Duplicates and outliers
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Deduplication,
            0.0,
            "Removing duplicates and clipping outliers...",
        ));
        info!("Step 3: Removing duplicates and clipping outliers...");
        let (cleaned, entries) = self
            .cleaner
            .deduplicate_and_cap(repaired)
            .map_err(|e| ProcessingError::CleaningFailed(e.to_string()))?;
        log.extend(entries);
        log.finish(&cleaned.frame);
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Deduplication,
            1.0,
            format!("{} rows remain", cleaned.height()),
        ));

        // Step 4: Domain and charts
        let domain = classify_domain(&cleaned.frame);
        debug!("Data domain: {}", domain);
        let charts = if self.config.generate_charts {
            self.report_progress(ProgressUpdate::new(
                ProcessingStage::ChartSelection,
                0.0,
                "Selecting charts...",
            ));
            info!("Step 4: Selecting charts...");
            let charts = self
                .chart_selector
                .select_for_domain(&cleaned, &roles, domain)
                .map_err(|e| ProcessingError::ChartSelectionFailed(e.to_string()))?;
            self.report_progress(ProgressUpdate::new(
                ProcessingStage::ChartSelection,
                1.0,
                format!("{} charts selected", charts.len()),
            ));
            charts
        } else {
            info!("Step 4: Skipping chart selection (disabled)");
            Vec::new()
        };

        let summary = log.summary();

        // Step 5: Optional guidance
        let guidance = match (&self.advisory_provider, self.config.use_ai_guidance) {
            (Some(provider), true) => {
                self.report_progress(ProgressUpdate::new(
                    ProcessingStage::Advisory,
                    0.0,
                    format!("Requesting guidance from {}...", provider.name()),
                ));
                info!("Step 5: Requesting guidance from {}...", provider.name());
                let request = GuidanceRequest {
                    filename: filename.unwrap_or("dataset").to_string(),
                    domain,
                    roles: roles
                        .iter()
                        .map(|(name, role)| (name.to_string(), role))
                        .collect(),
                    issues_found: log.issues_found(),
                    actions_taken: log.actions_taken(),
                    summary: summary.clone(),
                    sample_data: sample_csv(&cleaned),
                };
                let text = request_guidance(provider.as_ref(), &request);
                self.report_progress(ProgressUpdate::new(
                    ProcessingStage::Advisory,
                    1.0,
                    "Guidance received",
                ));
                Some(text)
            }
            _ => {
                debug!("Step 5: Skipping guidance (no provider or disabled)");
                None
            }
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Pipeline finished in {} ms: {} issues, {} actions, {} charts",
            duration_ms,
            summary.total_issues_found,
            summary.total_actions_taken,
            charts.len()
        );

        Ok(PipelineResult {
            filename: filename.map(str::to_string),
            roles,
            cleaned,
            log,
            summary,
            domain,
            charts,
            guidance,
            duration_ms,
        })
    }
}

/// Ask a provider for guidance, substituting the fallback text on failure.
pub fn request_guidance(provider: &dyn AdvisoryProvider, request: &GuidanceRequest) -> String {
    match provider.cleaning_guidance(request) {
        Ok(text) => text,
        Err(e) => {
            warn!("Guidance from {} failed, using fallback: {}", provider.name(), e);
            FALLBACK_GUIDANCE.to_string()
        }
    }
}

/// First rows of the cleaned data as CSV, or an empty string if they cannot
/// be written.
fn sample_csv(cleaned: &CleanedDataset) -> String {
    let sample = CleanedDataset::from_frame(cleaned.frame.head(Some(GUIDANCE_SAMPLE_ROWS)));
    match sample.to_csv_bytes() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("Could not render sample rows: {}", e);
            String::new()
        }
    }
}

/// Builder for creating a [`Pipeline`] with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::builder()
///     .config(PipelineConfig::default())
///     .on_progress(|update| println!("{}", update.message))
///     .build()?;
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    advisory_provider: Option<Arc<dyn AdvisoryProvider>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the provider used for cleaning guidance.
    ///
    /// Use `Arc` to share one provider between pipelines. Guidance is only
    /// requested when `use_ai_guidance` is set in the config.
    pub fn advisory_provider(mut self, provider: Arc<dyn AdvisoryProvider>) -> Self {
        self.advisory_provider = Some(provider);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let mut cleaner = DataCleaner::new(config.clone());
        if let Some(reporter) = &self.progress_reporter {
            cleaner = cleaner.with_reporter(reporter.clone());
        }

        Ok(Pipeline {
            chart_selector: ChartSelector::new(&config),
            config,
            advisory_provider: self.advisory_provider,
            progress_reporter: self.progress_reporter,
            cleaner,
        })
    }
}

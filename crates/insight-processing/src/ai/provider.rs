//! Advisory provider trait for abstracting LLM interactions.
//!
//! The cleaning pipeline is fully deterministic; an [`AdvisoryProvider`]
//! only adds free-text guidance next to the results. Any failure is
//! replaced by [`FALLBACK_GUIDANCE`] and never changes the cleaned data,
//! the log or the charts.
//!
//! # Implementing a New Provider
//!
//! 1. Create a new file in `src/ai/` (e.g., `openai.rs`)
//! 2. Implement the [`AdvisoryProvider`] trait for your provider struct
//! 3. Export the provider in `src/ai/mod.rs`
//!
//! # Example
//!
//! ```rust,ignore
//! use insight_processing::ai::GeminiProvider;
//! use insight_processing::Pipeline;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(GeminiProvider::new("your-api-key")?);
//! let pipeline = Pipeline::builder()
//!     .advisory_provider(provider)
//!     .build()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::DataDomain;
use crate::types::{CleaningSummary, ColumnRole};

/// Guidance used whenever the advisory service is unavailable or fails.
pub const FALLBACK_GUIDANCE: &str = "Automated guidance is unavailable. Review the cleaning log: \
check columns with many filled values before relying on their averages, and confirm that \
clipped outliers were data-entry errors rather than real events.";

/// Everything an advisor gets to see about a cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceRequest {
    pub filename: String,
    pub domain: DataDomain,
    pub roles: Vec<(String, ColumnRole)>,
    pub issues_found: Vec<String>,
    pub actions_taken: Vec<String>,
    pub summary: CleaningSummary,
    /// First rows of the cleaned data as CSV.
    pub sample_data: String,
}

/// Trait for services that turn a cleaning outcome into prose guidance.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one provider can be shared by
/// pipelines running on different threads.
pub trait AdvisoryProvider: Send + Sync {
    /// Produce guidance for the cleaned dataset described by `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached or returns no text.
    /// The pipeline logs the error and uses [`FALLBACK_GUIDANCE`].
    fn cleaning_guidance(&self, request: &GuidanceRequest) -> Result<String>;

    /// Get the provider name for logging and debugging.
    fn name(&self) -> &str;

    /// Get the model being used by this provider.
    fn model(&self) -> Option<&str> {
        None
    }
}

/// Provider that always returns the same text. Useful offline and in tests.
#[derive(Debug, Clone)]
pub struct StaticAdvisor {
    guidance: String,
}

impl StaticAdvisor {
    pub fn new(guidance: impl Into<String>) -> Self {
        Self {
            guidance: guidance.into(),
        }
    }
}

impl Default for StaticAdvisor {
    fn default() -> Self {
        Self::new(FALLBACK_GUIDANCE)
    }
}

impl AdvisoryProvider for StaticAdvisor {
    fn cleaning_guidance(&self, _request: &GuidanceRequest) -> Result<String> {
        Ok(self.guidance.clone())
    }

    fn name(&self) -> &str {
        "Static"
    }
}

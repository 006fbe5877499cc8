//! Pipeline module.
//!
//! This module provides the main cleaning pipeline and related components.

mod builder;
pub mod outliers;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder, request_guidance};
pub use outliers::{OutlierBounds, OutlierHandler};
pub use progress::{ClosureProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate};

//! Cleaning log and output writing.
//!
//! [`CleaningLog`] collects the issues and actions recorded while a dataset
//! is repaired. [`ReportWriter`] persists a finished [`PipelineResult`] as
//! cleaned CSV plus JSON documents for the report and chart renderers.
//!
//! [`PipelineResult`]: crate::types::PipelineResult

mod log;
mod writer;

pub use log::CleaningLog;
pub use writer::{CleaningReport, ReportWriter, WrittenFiles};

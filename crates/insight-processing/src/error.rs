//! Custom error types for the cleaning pipeline.
//!
//! Only a handful of conditions abort a processing request: an unsupported
//! file extension, unreadable source bytes, or a failure inside the dataframe
//! engine. Everything recoverable (a single unparseable cell, an all-null
//! categorical column, a failing advisory service) is handled locally and
//! recorded in the cleaning log instead of surfacing here.
//!
//! Errors are serializable so they can be handed to a frontend as
//! `{ "code": ..., "message": ... }`.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The filename extension does not map to a supported parser.
    #[error("Unsupported file format '{0}' (expected .csv, .xlsx or .xls)")]
    UnsupportedFormat(String),

    /// The source contained no bytes or no rows.
    #[error("Input file is empty")]
    EmptyInput,

    /// The source bytes could not be parsed into a table.
    #[error("Failed to load dataset: {0}")]
    LoadFailed(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A cleaning stage failed.
    #[error("Failed to clean data: {0}")]
    CleaningFailed(String),

    /// Chart selection failed.
    #[error("Failed to select charts: {0}")]
    ChartSelectionFailed(String),

    /// The advisory service failed. The pipeline never propagates this; it is
    /// exposed for providers that want to report failures with a stable code.
    #[error("Advisory service error: {0}")]
    AdvisoryFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Spreadsheet (xlsx/xls) reader error.
    #[error("Spreadsheet error: {0}")]
    Excel(#[from] calamine::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::EmptyInput => "EMPTY_INPUT",
            Self::LoadFailed(_) => "LOAD_FAILED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::CleaningFailed(_) => "CLEANING_FAILED",
            Self::ChartSelectionFailed(_) => "CHART_SELECTION_FAILED",
            Self::AdvisoryFailed(_) => "ADVISORY_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Excel(_) => "SPREADSHEET_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is the user's to fix (bad upload or bad settings)
    /// rather than a failure of the pipeline itself.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UnsupportedFormat(_) | Self::EmptyInput | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ProcessingError::UnsupportedFormat("report.pdf".to_string()).error_code(),
            "UNSUPPORTED_FORMAT"
        );
        assert_eq!(
            ProcessingError::ColumnNotFound("price".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(ProcessingError::EmptyInput.error_code(), "EMPTY_INPUT");
    }

    #[test]
    fn test_is_recoverable() {
        assert!(ProcessingError::UnsupportedFormat("x.txt".to_string()).is_recoverable());
        assert!(ProcessingError::EmptyInput.is_recoverable());
        assert!(!ProcessingError::CleaningFailed("boom".to_string()).is_recoverable());
        assert!(
            ProcessingError::EmptyInput
                .with_context("Loading upload")
                .is_recoverable()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = ProcessingError::UnsupportedFormat("notes.docx".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNSUPPORTED_FORMAT"));
        assert!(json.contains("notes.docx"));
    }

    #[test]
    fn test_with_context() {
        let error = ProcessingError::ColumnNotFound("Revenue".to_string())
            .with_context("During chart selection");
        assert!(error.to_string().contains("During chart selection"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }
}

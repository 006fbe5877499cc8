//! Writes pipeline output for the external renderers.
//!
//! Three files are produced per run, all named after a common stem:
//!
//! - `<stem>_cleaned.csv`: the cleaned table
//! - `<stem>_cleaning_log.json`: title, summary and every log entry
//! - `<stem>_charts.json`: the selected chart specifications

use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::domain::DataDomain;
use crate::types::{CleaningLogEntry, CleaningSummary, ColumnRole, DateCoercion, PipelineResult};

/// Cleaning report consumed by the report renderer.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub title: String,
    pub subtitle: String,
    pub domain: DataDomain,
    pub roles: Vec<(String, ColumnRole)>,
    pub summary: CleaningSummary,
    pub issues_found: Vec<String>,
    pub actions_taken: Vec<String>,
    pub entries: Vec<CleaningLogEntry>,
    pub date_coercions: Vec<DateCoercion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    pub duration_ms: u64,
}

impl CleaningReport {
    pub fn from_result(result: &PipelineResult) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            title: result.report_title(),
            subtitle: result.domain.subtitle().to_string(),
            domain: result.domain,
            roles: result
                .roles
                .iter()
                .map(|(name, role)| (name.to_string(), role))
                .collect(),
            summary: result.summary.clone(),
            issues_found: result.log.issues_found(),
            actions_taken: result.log.actions_taken(),
            entries: result.log.entries().to_vec(),
            date_coercions: result.cleaned.date_coercions.clone(),
            guidance: result.guidance.clone(),
            duration_ms: result.duration_ms,
        }
    }
}

/// Paths of the files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub cleaned_csv: PathBuf,
    pub cleaning_log: PathBuf,
    pub charts: PathBuf,
}

/// Writes cleaned data, the cleaning report and chart specs to a directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            output_name: None,
        }
    }
}

impl ReportWriter {
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self {
            output_dir,
            output_name,
        }
    }

    /// Writer using the output settings of a pipeline config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_name.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File stem for a run: the custom output name, else the input file
    /// stem, else `"dataset"`.
    pub fn stem_for(&self, filename: Option<&str>) -> String {
        if let Some(name) = &self.output_name {
            return name.clone();
        }
        filename
            .and_then(|f| Path::new(f).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "dataset".to_string())
    }

    /// Write all three outputs of `result`.
    pub fn write_all(&self, result: &PipelineResult) -> Result<WrittenFiles> {
        fs::create_dir_all(&self.output_dir)?;
        let stem = self.stem_for(result.filename.as_deref());

        let cleaned_csv = self.output_dir.join(format!("{}_cleaned.csv", stem));
        write_bytes(&cleaned_csv, &result.cleaned.to_csv_bytes()?)?;
        info!("Cleaned dataset saved: {}", cleaned_csv.display());

        let cleaning_log = self.output_dir.join(format!("{}_cleaning_log.json", stem));
        let report = CleaningReport::from_result(result);
        write_bytes(&cleaning_log, serde_json::to_string_pretty(&report)?.as_bytes())?;
        info!("Cleaning log saved: {}", cleaning_log.display());

        let charts = self.output_dir.join(format!("{}_charts.json", stem));
        write_bytes(&charts, serde_json::to_string_pretty(&result.charts)?.as_bytes())?;
        info!("Chart specs saved: {}", charts.display());

        Ok(WrittenFiles {
            cleaned_csv,
            cleaning_log,
            charts,
        })
    }
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    Ok(())
}

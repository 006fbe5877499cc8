//! The append-only cleaning log.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::types::{CleaningLogEntry, CleaningSummary, DATASET_TARGET};

/// Ordered record of every issue found and action taken while cleaning.
///
/// An action is only accepted for a column that already has an issue;
/// anything else is dropped with a warning so the log never claims a fix
/// for a problem it did not report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningLog {
    entries: Vec<CleaningLogEntry>,
    original_shape: (usize, usize),
    final_shape: (usize, usize),
    final_columns: Vec<String>,
}

impl CleaningLog {
    /// Start a log for a dataset of `(rows, columns)`.
    pub fn new(original_shape: (usize, usize)) -> Self {
        Self {
            original_shape,
            final_shape: original_shape,
            ..Self::default()
        }
    }

    /// Start a log for `df`, taking its shape and columns as the initial state.
    pub fn for_frame(df: &DataFrame) -> Self {
        let mut log = Self::new(df.shape());
        log.final_columns = column_names(df);
        log
    }

    /// Append an entry. Returns `false` if the entry was rejected.
    pub fn push(&mut self, entry: CleaningLogEntry) -> bool {
        if let CleaningLogEntry::ActionTaken {
            column,
            description,
            ..
        } = &entry
            && !self.has_issue(column)
        {
            warn!(
                "Dropping log action for '{}' without a prior issue: {}",
                column, description
            );
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Whether an issue has been recorded for `column`.
    pub fn has_issue(&self, column: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.is_issue() && e.column() == column)
    }

    pub fn record_issue(&mut self, column: &str, description: impl Into<String>, count: usize) {
        self.push(CleaningLogEntry::issue(column, description, count));
    }

    pub fn record_action(
        &mut self,
        column: &str,
        description: impl Into<String>,
        count: usize,
    ) -> bool {
        self.push(CleaningLogEntry::action(column, description, count))
    }

    /// Append entries produced by a stage, in order.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = CleaningLogEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    /// Record the shape and columns of the cleaned dataset.
    pub fn finish(&mut self, df: &DataFrame) {
        self.final_shape = df.shape();
        self.final_columns = column_names(df);
    }

    pub fn entries(&self) -> &[CleaningLogEntry] {
        &self.entries
    }

    /// Issue messages in discovery order.
    pub fn issues_found(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.is_issue())
            .map(CleaningLogEntry::message)
            .collect()
    }

    /// Action messages in the order they were taken.
    pub fn actions_taken(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.is_issue())
            .map(CleaningLogEntry::message)
            .collect()
    }

    pub fn original_shape(&self) -> (usize, usize) {
        self.original_shape
    }

    pub fn final_shape(&self) -> (usize, usize) {
        self.final_shape
    }

    pub fn final_columns(&self) -> &[String] {
        &self.final_columns
    }

    /// Entries that concern a single column (or `"dataset"`).
    pub fn entries_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a CleaningLogEntry> {
        self.entries.iter().filter(move |e| e.column() == column)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Aggregate counts for the report renderer.
    pub fn summary(&self) -> CleaningSummary {
        let columns_cleaned: BTreeSet<&str> = self
            .entries
            .iter()
            .map(CleaningLogEntry::column)
            .filter(|c| *c != DATASET_TARGET)
            .collect();
        let total_issues_found = self.entries.iter().filter(|e| e.is_issue()).count();

        CleaningSummary {
            original_shape: self.original_shape,
            final_shape: self.final_shape,
            final_columns: self.final_columns.clone(),
            rows_removed: self.original_shape.0 as i64 - self.final_shape.0 as i64,
            columns_cleaned: columns_cleaned.len(),
            total_issues_found,
            total_actions_taken: self.entries.len() - total_issues_found,
        }
    }
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

//! Imputation module for handling missing values.
//!
//! Numeric columns are filled with their mean, everything else with its
//! mode, and columns without any value with a configurable constant.

mod statistical;

pub use statistical::{Imputation, ImputationMethod, StatisticalImputer};

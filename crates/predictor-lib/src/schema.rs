//! Ordered feature schema
//!
//! The scaler is fit on every column of the historical frame, including the
//! `year` target. Preprocessing and inverse scaling both address columns by
//! position, so they share one `FeatureSchema` captured at fit time instead
//! of assuming a layout.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Stock price columns, in the order they are validated on input
pub const STOCK_COLUMNS: [&str; 5] = ["MSFT", "IBM", "SBUX", "AAPL", "GSPC"];

/// Day-of-month column derived from the date
pub const DAY_COLUMN: &str = "day";

/// Month column derived from the date
pub const MONTH_COLUMN: &str = "month";

/// The column the model predicts
pub const TARGET_COLUMN: &str = "year";

/// Schema construction and shape errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Missing column in schema: {0}")]
    MissingColumn(String),

    #[error("Duplicate column in schema: {0}")]
    DuplicateColumn(String),

    #[error("Unknown column in schema: {0}")]
    UnknownColumn(String),

    #[error("Row has {actual} values, schema expects {expected}")]
    WidthMismatch { expected: usize, actual: usize },
}

/// Ordered column layout of the fitted scaler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
    target_index: usize,
}

fn is_known_column(name: &str) -> bool {
    STOCK_COLUMNS.contains(&name)
        || name == DAY_COLUMN
        || name == MONTH_COLUMN
        || name == TARGET_COLUMN
}

impl FeatureSchema {
    /// Build a schema from an ordered column list.
    ///
    /// Every known column must appear exactly once and nothing else may
    /// appear, otherwise positional lookups would silently misalign.
    pub fn new<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();

        let mut seen = HashSet::new();
        for column in &columns {
            if !is_known_column(column) {
                return Err(SchemaError::UnknownColumn(column.clone()));
            }
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }

        let required = STOCK_COLUMNS
            .iter()
            .copied()
            .chain([DAY_COLUMN, MONTH_COLUMN, TARGET_COLUMN]);
        for name in required {
            if !seen.contains(name) {
                return Err(SchemaError::MissingColumn(name.to_string()));
            }
        }

        let target_index = columns
            .iter()
            .position(|c| c == TARGET_COLUMN)
            .ok_or_else(|| SchemaError::MissingColumn(TARGET_COLUMN.to_string()))?;

        Ok(Self {
            columns,
            target_index,
        })
    }

    /// The layout produced by the dataset loader for a CSV whose stock
    /// columns appear in `STOCK_COLUMNS` order
    pub fn standard() -> Self {
        let columns: Vec<String> = STOCK_COLUMNS
            .iter()
            .copied()
            .chain([DAY_COLUMN, MONTH_COLUMN, TARGET_COLUMN])
            .map(str::to_string)
            .collect();
        let target_index = columns.len() - 1;
        Self {
            columns,
            target_index,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns the scaler was fit on
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the `year` column
    pub fn target_index(&self) -> usize {
        self.target_index
    }

    /// Number of model inputs (every column except the target)
    pub fn input_len(&self) -> usize {
        self.columns.len() - 1
    }

    /// Model input column names, in scaler order
    pub fn input_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.target_index)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check that a full row matches the fitted column count
    pub fn check_width(&self, width: usize) -> Result<(), SchemaError> {
        if width != self.len() {
            return Err(SchemaError::WidthMismatch {
                expected: self.len(),
                actual: width,
            });
        }
        Ok(())
    }

    /// Check that a model input row matches the fitted column count minus the target
    pub fn check_input_width(&self, width: usize) -> Result<(), SchemaError> {
        if width != self.input_len() {
            return Err(SchemaError::WidthMismatch {
                expected: self.input_len(),
                actual: width,
            });
        }
        Ok(())
    }

    /// Remove the target column from a full-width row
    pub fn drop_target(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .filter(|(i, _)| *i != self.target_index)
            .map(|(_, v)| *v)
            .collect()
    }
}

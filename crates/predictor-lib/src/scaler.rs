//! Standardization scaler
//!
//! Per-column z-score transform fit on the historical dataset. Each column is
//! mapped independently (`(x - mean) / scale`), which is what lets a single
//! column be recovered from an otherwise zero-filled row.

use crate::schema::{FeatureSchema, SchemaError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScalerError {
    #[error("Cannot fit scaler on an empty dataset")]
    EmptyDataset,

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Fitted standardization transform plus the column layout it was fit on
#[derive(Debug, Clone, Serialize)]
pub struct StandardScaler {
    schema: FeatureSchema,
    mean: Vec<f64>,
    var: Vec<f64>,
    scale: Vec<f64>,
    n_samples_seen: usize,
}

impl StandardScaler {
    /// Fit on full-width rows laid out according to `schema`
    pub fn fit(schema: FeatureSchema, rows: &[Vec<f64>]) -> Result<Self, ScalerError> {
        if rows.is_empty() {
            return Err(ScalerError::EmptyDataset);
        }
        for row in rows {
            schema.check_width(row.len())?;
        }

        let width = schema.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        // Population variance, matching how the training pipeline scaled
        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }
        var.iter_mut().for_each(|v| *v /= n);

        let scale = var
            .iter()
            .map(|v| {
                let s = v.sqrt();
                // Constant columns pass through centred but unscaled
                if s < 10.0 * f64::EPSILON {
                    1.0
                } else {
                    s
                }
            })
            .collect();

        Ok(Self {
            schema,
            mean,
            var,
            scale,
            n_samples_seen: rows.len(),
        })
    }

    /// Scale one full-width row
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, SchemaError> {
        self.schema.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// Map one full-width scaled row back to original units
    pub fn inverse_transform(&self, row: &[f64]) -> Result<Vec<f64>, SchemaError> {
        self.schema.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(z, (m, s))| z * s + m)
            .collect())
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn variance(&self) -> &[f64] {
        &self.var
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }
}

//! Per-feature standardisation applied before the forest.

use serde::{Deserialize, Serialize};
use voxscreen_core::{Error, Result};

/// Subtracts the training mean and divides by the training standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl StandardScaler {
    /// Fit on training rows. Constant columns get a scale of 1.
    pub fn fit(rows: &[Vec<f32>]) -> Result<Self> {
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| Error::dataset("cannot fit a scaler on zero rows"))?;
        if rows.iter().any(|r| r.len() != width) {
            return Err(Error::dataset("rows have inconsistent widths"));
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0_f64; width];
        for row in rows {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v as f64;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0_f64; width];
        for row in rows {
            for ((acc, &v), m) in var.iter_mut().zip(row).zip(&mean) {
                let d = v as f64 - m;
                *acc += d * d;
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON {
                    std as f32
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            scale,
        })
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(Error::model(format!(
                "scaler has {}/{} entries, model expects {n_features}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(Error::model("scaler has a zero or non-finite scale"));
        }
        Ok(())
    }

    /// Standardise one row
    pub fn transform(&self, row: &[f32]) -> Result<Vec<f32>> {
        if row.len() != self.width() {
            return Err(Error::inference(format!(
                "scaler expects {} features, got {}",
                self.width(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }
}

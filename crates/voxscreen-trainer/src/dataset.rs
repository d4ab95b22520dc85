//! Tabular training data.

use tracing::{info, warn};
use voxscreen_core::{Error, Result};

use crate::table::Table;

/// Column names tried, in order, before falling back to the last column
pub const TARGET_CANDIDATES: &[&str] = &[
    "status",
    "label",
    "target",
    "y",
    "class",
    "diagnosis",
    "motor_UPDRS",
    "total_UPDRS",
];

/// Feature rows with binary labels
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f32>>,
    pub labels: Vec<i64>,
}

/// How a target column became binary labels
#[derive(Debug, Clone, PartialEq)]
pub enum TargetEncoding {
    /// Values were already 0 and 1
    Binary,
    /// Two distinct values, mapped to 0 (smaller) and 1 (larger)
    TwoValued { low: f64, high: f64 },
    /// Continuous values, 1 when `>= threshold`
    Median { threshold: f64 },
}

impl Dataset {
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<f32>>, labels: Vec<i64>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(Error::dataset(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != feature_names.len()) {
            return Err(Error::dataset(format!(
                "row {bad} has {} features, expected {}",
                rows[bad].len(),
                feature_names.len()
            )));
        }
        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    /// Split a table into numeric features and a binary target.
    ///
    /// With no explicit `target`, the column is chosen by
    /// [`find_target_column`]. Feature columns that are not entirely numeric
    /// are dropped, and rows with a blank cell are skipped.
    pub fn from_table(table: &Table, target: Option<&str>) -> Result<(Self, TargetEncoding)> {
        let columns = NumericColumns::read(table, target)?;
        let (labels, encoding) = binarize_target(&columns.target)?;
        Ok((Self::new(columns.feature_names, columns.rows, labels)?, encoding))
    }

    /// Like [`Dataset::from_table`], but the target holds integer class
    /// labels that are used as they are.
    ///
    /// A single class is accepted, which is what an MFCC dataset built from
    /// one folder of recordings looks like.
    pub fn from_labelled_table(table: &Table, target: Option<&str>) -> Result<Self> {
        let columns = NumericColumns::read(table, target)?;
        if columns.rows.is_empty() {
            return Err(Error::dataset("no complete rows to train on"));
        }

        let labels = columns
            .target
            .iter()
            .map(|&v| {
                if v.is_finite() && v.fract() == 0.0 {
                    Ok(v as i64)
                } else {
                    Err(Error::dataset(format!("label {v} is not an integer class")))
                }
            })
            .collect::<Result<Vec<i64>>>()?;

        Self::new(columns.feature_names, columns.rows, labels)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Count of label 0 and label 1
    pub fn class_counts(&self) -> (usize, usize) {
        let positive = self.labels.iter().filter(|&&l| l == 1).count();
        (self.labels.len() - positive, positive)
    }

    /// Rows and labels at the given indices
    pub fn subset(&self, indices: &[usize]) -> (Vec<Vec<f32>>, Vec<i64>) {
        indices
            .iter()
            .map(|&i| (self.rows[i].clone(), self.labels[i]))
            .unzip()
    }
}

/// Numeric feature columns and the raw target of a table
struct NumericColumns {
    feature_names: Vec<String>,
    rows: Vec<Vec<f32>>,
    target: Vec<f64>,
}

impl NumericColumns {
    fn read(table: &Table, target: Option<&str>) -> Result<Self> {
        let target_idx = match target {
            Some(name) => table
                .column_index(name)
                .ok_or_else(|| Error::dataset(format!("target column '{name}' not found")))?,
            None => find_target_column(&table.headers)
                .ok_or_else(|| Error::dataset("table has no columns"))?,
        };
        info!(target = %table.headers[target_idx], "using target column");

        let mut feature_idx = Vec::new();
        let mut dropped = Vec::new();
        for (idx, name) in table.headers.iter().enumerate() {
            if idx == target_idx {
                continue;
            }
            if table.column(idx).all(|cell| cell.trim().is_empty() || parse_number(cell).is_some()) {
                feature_idx.push(idx);
            } else {
                dropped.push(name.as_str());
            }
        }
        if !dropped.is_empty() {
            warn!(columns = ?dropped, "dropping non-numeric columns");
        }
        if feature_idx.is_empty() {
            return Err(Error::dataset("no numeric feature columns"));
        }

        let mut rows = Vec::new();
        let mut raw_target = Vec::new();
        let mut skipped = 0usize;
        for row in &table.rows {
            let Some(y) = parse_number(&row[target_idx]) else {
                skipped += 1;
                continue;
            };
            let features: Option<Vec<f32>> = feature_idx
                .iter()
                .map(|&i| parse_number(&row[i]).map(|v| v as f32))
                .collect();
            match features {
                Some(features) => {
                    rows.push(features);
                    raw_target.push(y);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "skipping rows with missing values");
        }

        Ok(Self {
            feature_names: feature_idx.iter().map(|&i| table.headers[i].clone()).collect(),
            rows,
            target: raw_target,
        })
    }
}

/// Index of the target column: the first known target name, else the last column.
pub fn find_target_column(headers: &[String]) -> Option<usize> {
    TARGET_CANDIDATES
        .iter()
        .find_map(|candidate| headers.iter().position(|h| h == candidate))
        .or_else(|| headers.len().checked_sub(1))
}

/// Turn raw target values into 0/1 labels.
///
/// # Errors
/// Fails when fewer than two classes remain.
pub fn binarize_target(values: &[f64]) -> Result<(Vec<i64>, TargetEncoding)> {
    let mut distinct = values.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    let (labels, encoding): (Vec<i64>, TargetEncoding) = match distinct.as_slice() {
        [] | [_] => {
            return Err(Error::dataset(
                "target has a single class; at least two are needed to train",
            ))
        }
        [low, high] if *low == 0.0 && *high == 1.0 => (
            values.iter().map(|&v| i64::from(v == 1.0)).collect(),
            TargetEncoding::Binary,
        ),
        [low, high] => (
            values.iter().map(|&v| i64::from(v == *high)).collect(),
            TargetEncoding::TwoValued {
                low: *low,
                high: *high,
            },
        ),
        _ => {
            let threshold = median(values);
            info!(threshold, "binarising continuous target at its median");
            (
                values.iter().map(|&v| i64::from(v >= threshold)).collect(),
                TargetEncoding::Median { threshold },
            )
        }
    };

    let positives = labels.iter().filter(|&&l| l == 1).count();
    if positives == 0 || positives == labels.len() {
        return Err(Error::dataset(
            "only one class remains after binarisation; cannot train",
        ));
    }
    Ok((labels, encoding))
}

/// Median with the mean of the two middle values for even lengths
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Parse a numeric cell; `true`/`false` count as 1 and 0.
fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    match cell {
        "" => None,
        "true" | "True" | "TRUE" => Some(1.0),
        "false" | "False" | "FALSE" => Some(0.0),
        _ => cell.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

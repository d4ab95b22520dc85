//! Held-out evaluation of a trained artifact.

use std::fmt;

use voxscreen_classifiers::ClassifierArtifact;
use voxscreen_core::{Error, Result};

/// Per-class precision, recall and F1
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub label: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Test-set metrics of one artifact
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    /// Rows are true classes, columns predicted classes, both in `classes` order
    pub confusion: Vec<Vec<usize>>,
    /// Only when both classes occur in the test labels
    pub roc_auc: Option<f64>,
}

/// Score `artifact` on held-out rows.
pub fn evaluate(
    artifact: &dyn ClassifierArtifact,
    rows: &[Vec<f32>],
    labels: &[i64],
    classes: &[i64],
) -> Result<EvaluationReport> {
    if rows.is_empty() || rows.len() != labels.len() {
        return Err(Error::dataset("evaluation needs matching, non-empty rows and labels"));
    }

    let mut predicted = Vec::with_capacity(rows.len());
    let mut scores = Vec::with_capacity(rows.len());
    for row in rows {
        predicted.push(artifact.predict(row)?);
        if let Some(proba) = artifact.predict_proba(row)? {
            if let Some(&p) = proba.get(1) {
                scores.push(p);
            }
        }
    }

    let mut report = classification_report(labels, &predicted, classes);
    if scores.len() == labels.len() {
        report.roc_auc = roc_auc(labels, &scores);
    }
    Ok(report)
}

/// Accuracy, per-class metrics and confusion matrix from label pairs
pub fn classification_report(truth: &[i64], predicted: &[i64], classes: &[i64]) -> EvaluationReport {
    let position = |label: i64| classes.iter().position(|&c| c == label);

    let mut confusion = vec![vec![0usize; classes.len()]; classes.len()];
    let mut correct = 0usize;
    for (&t, &p) in truth.iter().zip(predicted) {
        if t == p {
            correct += 1;
        }
        if let (Some(ti), Some(pi)) = (position(t), position(p)) {
            confusion[ti][pi] += 1;
        }
    }

    let metrics = classes
        .iter()
        .enumerate()
        .map(|(i, &label)| {
            let tp = confusion[i][i] as f64;
            let predicted_i: usize = confusion.iter().map(|row| row[i]).sum();
            let support: usize = confusion[i].iter().sum();
            let precision = ratio(tp, predicted_i as f64);
            let recall = ratio(tp, support as f64);
            ClassMetrics {
                label,
                precision,
                recall,
                f1: ratio(2.0 * precision * recall, precision + recall),
                support,
            }
        })
        .collect();

    EvaluationReport {
        accuracy: ratio(correct as f64, truth.len() as f64),
        classes: metrics,
        confusion,
        roc_auc: None,
    }
}

/// Area under the ROC curve for label 1, by average ranks.
///
/// `None` unless both label 0 and label 1 occur.
pub fn roc_auc(labels: &[i64], scores: &[f32]) -> Option<f64> {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 || scores.len() != labels.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0_f64; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // tied scores share the average of their 1-based ranks
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = rank;
        }
        start = end + 1;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|&(&l, _)| l == 1)
        .map(|(_, r)| r)
        .sum();
    let p = positives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for m in &self.classes {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        let total: usize = self.classes.iter().map(|m| m.support).sum();
        writeln!(f)?;
        writeln!(f, "{:>12} {:>10} {:>10} {:>10.2} {:>10}", "accuracy", "", "", self.accuracy, total)?;
        writeln!(f)?;

        writeln!(f, "Confusion matrix (rows: true, columns: predicted)")?;
        write!(f, "{:>8}", "")?;
        for m in &self.classes {
            write!(f, "{:>8}", m.label)?;
        }
        writeln!(f)?;
        for (m, row) in self.classes.iter().zip(&self.confusion) {
            write!(f, "{:>8}", m.label)?;
            for count in row {
                write!(f, "{count:>8}")?;
            }
            writeln!(f)?;
        }

        if let Some(auc) = self.roc_auc {
            writeln!(f)?;
            writeln!(f, "ROC AUC: {auc:.4}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_report() {
        let truth = [0, 0, 0, 1, 1];
        let predicted = [0, 0, 1, 1, 0];
        let report = classification_report(&truth, &predicted, &[0, 1]);

        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert_eq!(report.confusion, vec![vec![2, 1], vec![1, 1]]);

        let zero = &report.classes[0];
        assert!((zero.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((zero.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(zero.support, 3);

        let one = &report.classes[1];
        assert!((one.precision - 0.5).abs() < 1e-12);
        assert!((one.f1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let labels = [0, 0, 1, 1];
        assert_eq!(roc_auc(&labels, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&labels, &[0.9, 0.8, 0.2, 0.1]), Some(0.0));
    }

    #[test]
    fn test_roc_auc_ties_and_single_class() {
        assert_eq!(roc_auc(&[0, 1], &[0.5, 0.5]), Some(0.5));
        assert_eq!(roc_auc(&[0, 1, 0, 1], &[0.1, 0.4, 0.5, 0.8]), Some(0.75));
        assert_eq!(roc_auc(&[1, 1], &[0.2, 0.3]), None);
    }

    #[test]
    fn test_report_display() {
        let mut report = classification_report(&[0, 1], &[0, 1], &[0, 1]);
        report.roc_auc = Some(1.0);
        let text = report.to_string();

        assert!(text.contains("precision"));
        assert!(text.contains("accuracy"));
        assert!(text.contains("Confusion matrix"));
        assert!(text.contains("ROC AUC: 1.0000"));
    }
}

//! Classification Metrics

use crate::N_CLASSES;
use eeg_core::MentalState;
use serde::{Deserialize, Serialize};

/// Precision, recall and F1 for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: MentalState,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// True samples of this label
    pub support: usize,
}

/// Fraction of exact matches; 0 for empty input
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Counts indexed `[true][predicted]`, labels in `MentalState::ALL` order
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize]) -> [[usize; N_CLASSES]; N_CLASSES] {
    let mut matrix = [[0; N_CLASSES]; N_CLASSES];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        matrix[t][p] += 1;
    }
    matrix
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-label scores for every label seen in either `y_true` or `y_pred`.
/// Undefined precision or recall counts as 0.
pub fn classification_report(y_true: &[usize], y_pred: &[usize]) -> Vec<ClassReport> {
    let matrix = confusion_matrix(y_true, y_pred);

    MentalState::ALL
        .iter()
        .filter_map(|&label| {
            let c = label.index();
            let support: usize = matrix[c].iter().sum();
            let predicted: usize = matrix.iter().map(|row| row[c]).sum();
            if support == 0 && predicted == 0 {
                return None;
            }

            let hits = matrix[c][c];
            let precision = ratio(hits, predicted);
            let recall = ratio(hits, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            Some(ClassReport {
                label,
                precision,
                recall,
                f1,
                support,
            })
        })
        .collect()
}

/// Unweighted mean F1 over the labels in the report
pub fn macro_f1(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let report = classification_report(y_true, y_pred);
    if report.is_empty() {
        return 0.0;
    }
    report.iter().map(|r| r.f1).sum::<f64>() / report.len() as f64
}

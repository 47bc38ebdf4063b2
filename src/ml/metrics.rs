//! Evaluation metrics for cross-validated probability tables.

use serde::Serialize;

use crate::dataset::{Diagnosis, ResultTable};

/// Binary confusion counts with diabetic as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positive: u32,
    pub false_positive: u32,
    pub true_negative: u32,
    pub false_negative: u32,
}

impl ConfusionMatrix {
    pub fn add(&mut self, truth: Diagnosis, predicted: Diagnosis) {
        let slot = match (truth, predicted) {
            (Diagnosis::Diabetic, Diagnosis::Diabetic) => &mut self.true_positive,
            (Diagnosis::NonDiabetic, Diagnosis::Diabetic) => &mut self.false_positive,
            (Diagnosis::NonDiabetic, Diagnosis::NonDiabetic) => &mut self.true_negative,
            (Diagnosis::Diabetic, Diagnosis::NonDiabetic) => &mut self.false_negative,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u32 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// `(TP + TN) / total`, or 0 for an empty matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    ratio(cm.true_positive + cm.true_negative, cm.total())
}

/// Recall of the diabetic class.
pub fn sensitivity(cm: &ConfusionMatrix) -> f64 {
    ratio(cm.true_positive, cm.true_positive + cm.false_negative)
}

/// Recall of the non-diabetic class.
pub fn specificity(cm: &ConfusionMatrix) -> f64 {
    ratio(cm.true_negative, cm.true_negative + cm.false_positive)
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Metrics of one fold's held-out rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldMetrics {
    pub fold: usize,
    pub accuracy: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    /// Held-out rows scored in this fold.
    pub support: u32,
}

/// Threshold each fold column (`p > threshold` is diabetic) and score it against the labels.
pub fn fold_metrics(table: &ResultTable, threshold: f64) -> Vec<FoldMetrics> {
    (0..table.fold_count())
        .map(|fold| {
            let mut cm = ConfusionMatrix::default();
            for (row, &truth) in table.diagnoses().iter().enumerate() {
                if let Some(p) = table.probability(row, fold) {
                    let predicted = if p > threshold {
                        Diagnosis::Diabetic
                    } else {
                        Diagnosis::NonDiabetic
                    };
                    cm.add(truth, predicted);
                }
            }
            FoldMetrics {
                fold,
                accuracy: accuracy(&cm),
                sensitivity: sensitivity(&cm),
                specificity: specificity(&cm),
                support: cm.total(),
            }
        })
        .collect()
}

/// Mean and population standard deviation across folds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub std: f64,
}

impl MetricSummary {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        Self {
            mean,
            std: variance.sqrt(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValSummary {
    pub folds: Vec<FoldMetrics>,
    pub accuracy: MetricSummary,
    pub sensitivity: MetricSummary,
    pub specificity: MetricSummary,
}

pub fn summarize(table: &ResultTable, threshold: f64) -> CrossValSummary {
    let folds = fold_metrics(table, threshold);
    let collect = |pick: fn(&FoldMetrics) -> f64| -> MetricSummary {
        MetricSummary::from_values(&folds.iter().map(pick).collect::<Vec<_>>())
    };
    CrossValSummary {
        accuracy: collect(|m| m.accuracy),
        sensitivity: collect(|m| m.sensitivity),
        specificity: collect(|m| m.specificity),
        folds,
    }
}

//! Single-recording prediction without a training cohort.
//!
//! The classifiers need both classes to fit, so the feature vector is duplicated into a synthetic
//! two-row cohort labeled once per class and the pipeline trains and tests on those same rows.
//! The result carries no cross-validated meaning and is flagged as such.

use serde::Serialize;

use super::error::ClassificationError;
use super::model::ModelKind;
use super::pipeline::{FoldSplit, LabeledCohort, evaluate_resolved};
use crate::analysis::{FEATURE_NAMES, FeatureVector};
use crate::dataset::{CohortRecord, CohortTable, Diagnosis};

const REPORTED_ID: &str = "1";
const COUNTERPART_ID: &str = "2";
const SYNTHETIC_FOLD: usize = 1;

/// How much a prediction can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionValidity {
    /// Fitted on one duplicated sample per class; not statistically meaningful.
    SingleSampleDegenerate,
}

/// Thresholded reading of a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Likelihood {
    High,
    Low,
}

impl Likelihood {
    /// `High` when `probability` is strictly above `threshold`.
    pub fn at_threshold(probability: f64, threshold: f64) -> Self {
        if probability > threshold {
            Likelihood::High
        } else {
            Likelihood::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowConfidencePrediction {
    /// Probability of the diabetic class.
    pub probability: f64,
    pub likelihood: Likelihood,
    pub validity: PredictionValidity,
    /// The input was the all-zero vector the extractor returns for failed recordings.
    pub features_missing: bool,
}

/// Predict a diabetic probability for one unlabeled feature vector.
pub fn predict_single(
    features: &FeatureVector,
    model: ModelKind,
    threshold: f64,
) -> Result<LowConfidencePrediction, ClassificationError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ClassificationError::Schema(format!(
            "decision threshold must lie in [0, 1], got {threshold}"
        )));
    }
    let features_missing = features.is_zeroed();
    tracing::warn!(
        model = model.code(),
        features_missing,
        "single-sample prediction is low-confidence: the model is trained on one duplicated sample"
    );

    let records = [
        CohortRecord {
            id: REPORTED_ID.to_string(),
            diagnosis: Diagnosis::NonDiabetic,
            features: *features,
        },
        CohortRecord {
            id: COUNTERPART_ID.to_string(),
            diagnosis: Diagnosis::Diabetic,
            features: *features,
        },
    ];
    let cohort = LabeledCohort::resolve(&CohortTable::from_records(&records), &FEATURE_NAMES)?;
    let split = FoldSplit {
        train_non_diabetic: vec![REPORTED_ID.to_string()],
        train_diabetic: vec![COUNTERPART_ID.to_string()],
        test_non_diabetic: vec![REPORTED_ID.to_string()],
        test_diabetic: vec![COUNTERPART_ID.to_string()],
    };
    let result = evaluate_resolved(&cohort, &split, SYNTHETIC_FOLD, model)?;
    let probability = result
        .predictions
        .iter()
        .find(|prediction| prediction.id == REPORTED_ID)
        .map(|prediction| prediction.probability)
        .ok_or_else(|| {
            ClassificationError::InsufficientData(format!(
                "synthetic cohort produced no prediction for `{REPORTED_ID}`"
            ))
        })?;

    Ok(LowConfidencePrediction {
        probability,
        likelihood: Likelihood::at_threshold(probability, threshold),
        validity: PredictionValidity::SingleSampleDegenerate,
        features_missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector::from_array([
            180.0, 20.0, 65.0, 8.0, 14.0, 0.01, 5e-5, 0.005, 0.006, 0.05, 0.4, 0.02, 0.03, 0.04,
        ])
    }

    #[test]
    fn every_model_yields_a_flagged_probability() {
        for kind in ModelKind::ALL {
            let prediction = predict_single(&sample(), kind, 0.5).unwrap();
            assert!((0.0..=1.0).contains(&prediction.probability), "{kind}");
            assert_eq!(prediction.validity, PredictionValidity::SingleSampleDegenerate);
            assert!(!prediction.features_missing);
        }
    }

    #[test]
    fn identical_rows_leave_naive_bayes_undecided() {
        let prediction = predict_single(&sample(), ModelKind::NaiveBayes, 0.5).unwrap();
        assert!((prediction.probability - 0.5).abs() < 1e-9);
        assert_eq!(prediction.likelihood, Likelihood::Low);
    }

    #[test]
    fn zero_vector_is_flagged_missing() {
        let prediction =
            predict_single(&FeatureVector::zeroed(), ModelKind::LogisticRegression, 0.5).unwrap();
        assert!(prediction.features_missing);
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        assert!(matches!(
            predict_single(&sample(), ModelKind::NaiveBayes, 1.5),
            Err(ClassificationError::Schema(_))
        ));
    }

    #[test]
    fn likelihood_is_strictly_above_threshold() {
        assert_eq!(Likelihood::at_threshold(0.5, 0.5), Likelihood::Low);
        assert_eq!(Likelihood::at_threshold(0.51, 0.5), Likelihood::High);
    }
}

//! Stratified K-fold cross-validation producing one probability column per fold.

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::error::ClassificationError;
use super::folds::StratifiedFolds;
use super::model::ModelKind;
use super::pipeline::{LabeledCohort, evaluate_resolved};
use crate::dataset::{CohortTable, Diagnosis, ResultTable};

/// Parameters of one cross-validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValOptions {
    pub num_folds: usize,
    pub model: ModelKind,
    /// Seed of the fold shuffle; `None` draws a fresh partition every run.
    pub seed: Option<u64>,
}

impl Default for CrossValOptions {
    fn default() -> Self {
        Self {
            num_folds: 5,
            model: ModelKind::Svm,
            seed: None,
        }
    }
}

/// Run stratified cross-validation over `cohort`.
///
/// The cohort and fold count are validated before any fold is fitted. Every row of the returned
/// table carries a probability in exactly the fold that held its subject out.
pub fn cross_validate<S: AsRef<str>>(
    cohort: &CohortTable,
    feature_names: &[S],
    options: &CrossValOptions,
) -> Result<ResultTable, ClassificationError> {
    let labeled = LabeledCohort::resolve(cohort, feature_names)?;
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let folds = StratifiedFolds::new(
        labeled.unique_ids(Diagnosis::NonDiabetic),
        labeled.unique_ids(Diagnosis::Diabetic),
        options.num_folds,
        &mut rng,
    )?;
    tracing::info!(
        rows = labeled.row_count(),
        folds = options.num_folds,
        model = options.model.code(),
        "starting cross-validation"
    );

    let mut table = ResultTable::new(labeled.ids().to_vec(), labeled.diagnoses().to_vec());
    for fold in 0..folds.fold_count() {
        let split = folds.split(fold);
        let result = evaluate_resolved(&labeled, &split, fold, options.model)?;
        tracing::info!(
            fold,
            train_rows = result.train_rows,
            test_rows = result.predictions.len(),
            "fold complete"
        );
        table.push_fold_column(
            result
                .predictions
                .iter()
                .map(|prediction| (prediction.row, prediction.probability)),
        );
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ColumnData, DIAGNOSIS_COLUMN, ID_COLUMN};

    fn cohort(per_class: usize) -> CohortTable {
        let n = 2 * per_class;
        let ids = (0..n).map(|i| format!("s{i}")).collect();
        let labels = (0..n).map(|i| if i < per_class { 0.0 } else { 1.0 }).collect();
        let x = (0..n)
            .map(|i| (if i < per_class { -1.0 } else { 1.0 }) + 0.1 * i as f64)
            .collect();
        CohortTable::new()
            .with_column(ID_COLUMN, ColumnData::Text(ids))
            .unwrap()
            .with_column(DIAGNOSIS_COLUMN, ColumnData::Numeric(labels))
            .unwrap()
            .with_column("x", ColumnData::Numeric(x))
            .unwrap()
    }

    #[test]
    fn every_row_is_held_out_once() {
        let options = CrossValOptions {
            num_folds: 3,
            model: ModelKind::LogisticRegression,
            seed: Some(5),
        };
        let table = cross_validate(&cohort(6), &["x"], &options).unwrap();
        assert_eq!(table.fold_count(), 3);
        for row in 0..table.row_count() {
            let populated = (0..3).filter(|&f| table.probability(row, f).is_some()).count();
            assert_eq!(populated, 1, "row {row}");
        }
    }

    #[test]
    fn too_many_folds_fails_before_fitting() {
        let options = CrossValOptions {
            num_folds: 7,
            model: ModelKind::NaiveBayes,
            seed: Some(0),
        };
        assert_eq!(
            cross_validate(&cohort(6), &["x"], &options),
            Err(ClassificationError::InvalidFoldCount { folds: 7, max: 6 })
        );
    }

    #[test]
    fn seeded_runs_repeat() {
        let options = CrossValOptions {
            num_folds: 2,
            model: ModelKind::Svm,
            seed: Some(9),
        };
        let first = cross_validate(&cohort(4), &["x"], &options).unwrap();
        let second = cross_validate(&cohort(4), &["x"], &options).unwrap();
        assert_eq!(first, second);
    }
}

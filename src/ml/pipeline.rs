//! Single-fold evaluation: select rows by subject ID, standardize on the training rows, fit one
//! classifier, and score the held-out rows.

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, ArrayView1, Axis};

use super::error::ClassificationError;
use super::model::ModelKind;
use super::standardize::Standardizer;
use crate::dataset::{
    CohortTable, ColumnData, DIAGNOSIS_COLUMN, Diagnosis, ID_COLUMN, fold_column_name,
};

/// A cohort table checked against a feature list and reduced to what the classifiers need.
#[derive(Debug, Clone)]
pub struct LabeledCohort {
    ids: Vec<String>,
    diagnoses: Vec<Diagnosis>,
    features: Array2<f64>,
    feature_names: Vec<String>,
}

impl LabeledCohort {
    /// Validate `cohort` and extract `ID`, `Diagnosis` and the named feature columns.
    pub fn resolve<S: AsRef<str>>(
        cohort: &CohortTable,
        feature_names: &[S],
    ) -> Result<Self, ClassificationError> {
        if feature_names.is_empty() {
            return Err(ClassificationError::Schema(
                "at least one feature column is required".to_string(),
            ));
        }
        let ids: Vec<String> = match cohort.column(ID_COLUMN) {
            Some(ColumnData::Text(values)) => values.clone(),
            Some(ColumnData::Numeric(values)) => values.iter().map(f64::to_string).collect(),
            None => return Err(missing(ID_COLUMN)),
        };
        let labels = numeric_column(cohort, DIAGNOSIS_COLUMN)?;
        let diagnoses = labels
            .iter()
            .enumerate()
            .map(|(row, &value)| {
                Diagnosis::from_label(value).ok_or_else(|| {
                    ClassificationError::Schema(format!(
                        "row {row}: `{DIAGNOSIS_COLUMN}` must be 0 or 1, got {value}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = cohort.row_count();
        let mut features = Array2::<f64>::zeros((rows, feature_names.len()));
        for (col, name) in feature_names.iter().enumerate() {
            let name = name.as_ref();
            if name == ID_COLUMN || name == DIAGNOSIS_COLUMN {
                return Err(ClassificationError::Schema(format!(
                    "`{name}` cannot be used as a feature"
                )));
            }
            let values = numeric_column(cohort, name)?;
            if let Some(row) = values.iter().position(|v| !v.is_finite()) {
                return Err(ClassificationError::Schema(format!(
                    "row {row}: feature `{name}` is not a finite number"
                )));
            }
            features
                .column_mut(col)
                .assign(&ArrayView1::from(values));
        }

        let mut seen: HashMap<&str, Diagnosis> = HashMap::new();
        for (id, &diagnosis) in ids.iter().zip(&diagnoses) {
            if let Some(&previous) = seen.get(id.as_str()) {
                if previous != diagnosis {
                    return Err(ClassificationError::Schema(format!(
                        "subject `{id}` appears with both diagnoses"
                    )));
                }
            } else {
                seen.insert(id.as_str(), diagnosis);
            }
        }

        Ok(Self {
            ids,
            diagnoses,
            features,
            feature_names: feature_names.iter().map(|n| n.as_ref().to_string()).collect(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn diagnoses(&self) -> &[Diagnosis] {
        &self.diagnoses
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Distinct subject IDs with `diagnosis`, in order of first appearance.
    pub fn unique_ids(&self, diagnosis: Diagnosis) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for (id, d) in self.ids.iter().zip(&self.diagnoses) {
            if *d == diagnosis && seen.insert(id.as_str()) {
                unique.push(id.clone());
            }
        }
        unique
    }

    /// Rows of `diagnosis` whose ID is listed, in table order.
    fn rows_for(&self, diagnosis: Diagnosis, ids: &[String]) -> Vec<usize> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        (0..self.ids.len())
            .filter(|&row| {
                self.diagnoses[row] == diagnosis && wanted.contains(self.ids[row].as_str())
            })
            .collect()
    }
}

fn missing(name: &str) -> ClassificationError {
    ClassificationError::Schema(format!("required column `{name}` is missing"))
}

fn numeric_column<'a>(
    cohort: &'a CohortTable,
    name: &str,
) -> Result<&'a [f64], ClassificationError> {
    match cohort.column(name) {
        Some(ColumnData::Numeric(values)) => Ok(values),
        Some(ColumnData::Text(_)) => Err(ClassificationError::Schema(format!(
            "column `{name}` must be numeric"
        ))),
        None => Err(missing(name)),
    }
}

/// Subject IDs of each stratum on each side of one fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldSplit {
    pub train_non_diabetic: Vec<String>,
    pub train_diabetic: Vec<String>,
    pub test_non_diabetic: Vec<String>,
    pub test_diabetic: Vec<String>,
}

/// Probability estimate for one held-out row.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldPrediction {
    /// Row index in the cohort table.
    pub row: usize,
    pub id: String,
    pub diagnosis: Diagnosis,
    /// Probability of the diabetic class.
    pub probability: f64,
}

/// Held-out predictions of one fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldResult {
    pub fold_index: usize,
    pub model: ModelKind,
    pub train_rows: usize,
    pub predictions: Vec<FoldPrediction>,
}

impl FoldResult {
    /// `Fold {i} Probability`.
    pub fn column_name(&self) -> String {
        fold_column_name(self.fold_index)
    }
}

/// Evaluate one fold on `cohort`.
///
/// Schema problems are reported before any fitting; an empty train or test split, or a
/// training split lacking a class, is [`ClassificationError::InsufficientData`].
pub fn evaluate_fold<S: AsRef<str>>(
    cohort: &CohortTable,
    feature_names: &[S],
    split: &FoldSplit,
    fold_index: usize,
    model: ModelKind,
) -> Result<FoldResult, ClassificationError> {
    let labeled = LabeledCohort::resolve(cohort, feature_names)?;
    evaluate_resolved(&labeled, split, fold_index, model)
}

/// [`evaluate_fold`] on an already validated cohort.
pub fn evaluate_resolved(
    cohort: &LabeledCohort,
    split: &FoldSplit,
    fold_index: usize,
    model: ModelKind,
) -> Result<FoldResult, ClassificationError> {
    let mut train = cohort.rows_for(Diagnosis::NonDiabetic, &split.train_non_diabetic);
    train.extend(cohort.rows_for(Diagnosis::Diabetic, &split.train_diabetic));
    let mut test = cohort.rows_for(Diagnosis::NonDiabetic, &split.test_non_diabetic);
    test.extend(cohort.rows_for(Diagnosis::Diabetic, &split.test_diabetic));
    if train.is_empty() {
        return Err(ClassificationError::InsufficientData(format!(
            "fold {fold_index}: training split selects no rows"
        )));
    }
    if test.is_empty() {
        return Err(ClassificationError::InsufficientData(format!(
            "fold {fold_index}: test split selects no rows"
        )));
    }
    let positive: Vec<bool> = train
        .iter()
        .map(|&row| cohort.diagnoses[row] == Diagnosis::Diabetic)
        .collect();
    if !positive.contains(&true) || !positive.contains(&false) {
        return Err(ClassificationError::InsufficientData(format!(
            "fold {fold_index}: training split must contain both diagnoses"
        )));
    }

    let x_train = cohort.features.select(Axis(0), &train);
    let x_test = cohort.features.select(Axis(0), &test);
    let scaler = Standardizer::fit(x_train.view());
    let fitted = model.fit(scaler.transform(x_train.view()).view(), &positive)?;
    let probabilities = fitted.predict_proba(scaler.transform(x_test.view()).view());
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
        return Err(ClassificationError::Numerical(format!(
            "fold {fold_index}: {model} produced probability {bad}"
        )));
    }

    tracing::debug!(
        fold = fold_index,
        model = model.code(),
        train_rows = train.len(),
        test_rows = test.len(),
        "evaluated fold"
    );
    let predictions = test
        .into_iter()
        .zip(probabilities)
        .map(|(row, probability)| FoldPrediction {
            row,
            id: cohort.ids[row].clone(),
            diagnosis: cohort.diagnoses[row],
            probability: probability.clamp(0.0, 1.0),
        })
        .collect();
    Ok(FoldResult {
        fold_index,
        model,
        train_rows: positive.len(),
        predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CohortTable;

    fn cohort() -> CohortTable {
        CohortTable::new()
            .with_column(
                ID_COLUMN,
                ColumnData::Text(["a", "b", "c", "d", "e", "f"].map(String::from).to_vec()),
            )
            .unwrap()
            .with_column(
                DIAGNOSIS_COLUMN,
                ColumnData::Numeric(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]),
            )
            .unwrap()
            .with_column("x", ColumnData::Numeric(vec![-2.0, -1.5, -1.0, 1.0, 1.5, 2.0]))
            .unwrap()
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn split() -> FoldSplit {
        FoldSplit {
            train_non_diabetic: ids(&["a", "b"]),
            train_diabetic: ids(&["e", "f"]),
            test_non_diabetic: ids(&["c"]),
            test_diabetic: ids(&["d"]),
        }
    }

    #[test]
    fn predicts_only_held_out_rows() {
        let result = evaluate_fold(&cohort(), &["x"], &split(), 3, ModelKind::NaiveBayes).unwrap();
        assert_eq!(result.column_name(), "Fold 3 Probability");
        let rows: Vec<usize> = result.predictions.iter().map(|p| p.row).collect();
        assert_eq!(rows, vec![2, 3]);
        assert!(result.predictions[0].probability < 0.5);
        assert!(result.predictions[1].probability > 0.5);
        assert_eq!(result.predictions[1].diagnosis, Diagnosis::Diabetic);
        assert_eq!(result.train_rows, 4);
    }

    #[test]
    fn repeated_runs_are_identical() {
        for model in ModelKind::ALL {
            let first = evaluate_fold(&cohort(), &["x"], &split(), 0, model).unwrap();
            let second = evaluate_fold(&cohort(), &["x"], &split(), 0, model).unwrap();
            assert_eq!(first, second, "{model}");
        }
    }

    #[test]
    fn missing_feature_is_a_schema_error() {
        let err = evaluate_fold(&cohort(), &["HNR"], &split(), 0, ModelKind::Svm).unwrap_err();
        assert!(matches!(err, ClassificationError::Schema(_)));
    }

    #[test]
    fn empty_test_split_is_insufficient() {
        let mut split = split();
        split.test_non_diabetic.clear();
        split.test_diabetic.clear();
        let err = evaluate_fold(&cohort(), &["x"], &split, 0, ModelKind::NaiveBayes).unwrap_err();
        assert!(matches!(err, ClassificationError::InsufficientData(_)));
    }

    #[test]
    fn one_class_training_is_insufficient() {
        let mut split = split();
        split.train_diabetic.clear();
        let err =
            evaluate_fold(&cohort(), &["x"], &split, 0, ModelKind::LogisticRegression).unwrap_err();
        assert!(matches!(err, ClassificationError::InsufficientData(_)));
    }

    #[test]
    fn conflicting_labels_are_rejected() {
        let table = CohortTable::new()
            .with_column(ID_COLUMN, ColumnData::Text(ids(&["a", "a"])))
            .unwrap()
            .with_column(DIAGNOSIS_COLUMN, ColumnData::Numeric(vec![0.0, 1.0]))
            .unwrap()
            .with_column("x", ColumnData::Numeric(vec![0.0, 1.0]))
            .unwrap();
        assert!(matches!(
            LabeledCohort::resolve(&table, &["x"]),
            Err(ClassificationError::Schema(_))
        ));
    }

    #[test]
    fn unique_ids_keep_first_appearance_order() {
        let table = CohortTable::new()
            .with_column(ID_COLUMN, ColumnData::Text(ids(&["b", "a", "b", "c"])))
            .unwrap()
            .with_column(DIAGNOSIS_COLUMN, ColumnData::Numeric(vec![0.0, 0.0, 0.0, 1.0]))
            .unwrap()
            .with_column("x", ColumnData::Numeric(vec![0.0; 4]))
            .unwrap();
        let labeled = LabeledCohort::resolve(&table, &["x"]).unwrap();
        assert_eq!(labeled.unique_ids(Diagnosis::NonDiabetic), ids(&["b", "a"]));
        assert_eq!(labeled.unique_ids(Diagnosis::Diabetic), ids(&["c"]));
    }
}

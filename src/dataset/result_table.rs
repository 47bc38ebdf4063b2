use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::cohort::{CohortError, DIAGNOSIS_COLUMN, Diagnosis, ID_COLUMN};

/// Header of the probability column produced by fold `index`.
pub fn fold_column_name(index: usize) -> String {
    format!("Fold {index} Probability")
}

/// Out-of-sample probabilities from a cross-validation run, one row per cohort row.
///
/// Each fold contributes one column; a row holds a value only in the fold that held it out.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    ids: Vec<String>,
    diagnoses: Vec<Diagnosis>,
    folds: Vec<Vec<Option<f64>>>,
}

impl ResultTable {
    pub fn new(ids: Vec<String>, diagnoses: Vec<Diagnosis>) -> Self {
        debug_assert_eq!(ids.len(), diagnoses.len());
        Self {
            ids,
            diagnoses,
            folds: Vec::new(),
        }
    }

    /// Append the next fold column from `(row, probability)` pairs.
    pub fn push_fold_column(&mut self, values: impl IntoIterator<Item = (usize, f64)>) {
        let mut column = vec![None; self.ids.len()];
        for (row, probability) in values {
            if let Some(slot) = column.get_mut(row) {
                *slot = Some(probability);
            }
        }
        self.folds.push(column);
    }

    pub fn row_count(&self) -> usize {
        self.ids.len()
    }

    pub fn fold_count(&self) -> usize {
        self.folds.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn diagnoses(&self) -> &[Diagnosis] {
        &self.diagnoses
    }

    pub fn fold_column(&self, fold: usize) -> Option<&[Option<f64>]> {
        self.folds.get(fold).map(Vec::as_slice)
    }

    pub fn probability(&self, row: usize, fold: usize) -> Option<f64> {
        self.folds.get(fold)?.get(row).copied().flatten()
    }

    /// The fold in which `row` was held out, with its probability.
    pub fn held_out(&self, row: usize) -> Option<(usize, f64)> {
        self.folds
            .iter()
            .enumerate()
            .find_map(|(fold, column)| column.get(row).copied().flatten().map(|p| (fold, p)))
    }

    pub fn column_names(&self) -> Vec<String> {
        let mut names = vec![ID_COLUMN.to_string(), DIAGNOSIS_COLUMN.to_string()];
        names.extend((0..self.folds.len()).map(fold_column_name));
        names
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), CohortError> {
        let file = File::create(path)?;
        self.to_csv_writer(file).map_err(|err| match err {
            CohortError::Csv(source) => CohortError::Write {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Write the table; probabilities a row does not have are left as empty cells.
    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<(), CohortError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.column_names())?;
        for (row, (id, diagnosis)) in self.ids.iter().zip(&self.diagnoses).enumerate() {
            let mut record = vec![id.clone(), diagnosis.label().to_string()];
            record.extend(self.folds.iter().map(|column| {
                column[row].map(|p| p.to_string()).unwrap_or_default()
            }));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_row_reports_its_fold() {
        let mut table = ResultTable::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![Diagnosis::NonDiabetic, Diagnosis::Diabetic, Diagnosis::Diabetic],
        );
        table.push_fold_column([(0, 0.2), (2, 0.9)]);
        table.push_fold_column([(1, 0.6)]);
        assert_eq!(table.held_out(0), Some((0, 0.2)));
        assert_eq!(table.held_out(1), Some((1, 0.6)));
        assert_eq!(table.probability(1, 0), None);
        assert_eq!(table.fold_count(), 2);
    }

    #[test]
    fn csv_leaves_missing_cells_empty() {
        let mut table = ResultTable::new(
            vec!["a".into(), "b".into()],
            vec![Diagnosis::NonDiabetic, Diagnosis::Diabetic],
        );
        table.push_fold_column([(0, 0.25)]);
        table.push_fold_column([(1, 0.75)]);
        let mut buffer = Vec::new();
        table.to_csv_writer(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "ID,Diagnosis,Fold 0 Probability,Fold 1 Probability\na,0,0.25,\nb,1,,0.75\n"
        );
    }
}

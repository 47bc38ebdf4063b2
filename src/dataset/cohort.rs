//! Column-oriented cohort table: one row per recording, `ID` + `Diagnosis` + feature columns.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{FEATURE_NAMES, FeatureVector};

pub const ID_COLUMN: &str = "ID";
pub const DIAGNOSIS_COLUMN: &str = "Diagnosis";

#[derive(Debug, Error)]
pub enum CohortError {
    #[error("column `{name}` has {found} rows but the table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),
    #[error("failed to read cohort table {path}: {source}")]
    Read {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("failed to write table {path}: {source}")]
    Write {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ground-truth label of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Diagnosis {
    NonDiabetic,
    Diabetic,
}

impl Diagnosis {
    /// Numeric label stored in the `Diagnosis` column.
    pub fn label(self) -> u8 {
        match self {
            Diagnosis::NonDiabetic => 0,
            Diagnosis::Diabetic => 1,
        }
    }

    /// Parse a stored label; only exact 0 and 1 are accepted.
    pub fn from_label(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(Diagnosis::NonDiabetic)
        } else if value == 1.0 {
            Some(Diagnosis::Diabetic)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Text(_) => None,
        }
    }

    fn cell(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(values) => values[row].to_string(),
            ColumnData::Text(values) => values[row].clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    data: ColumnData,
}

/// One labeled recording, the unit [`CohortTable::from_records`] is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortRecord {
    pub id: String,
    pub diagnosis: Diagnosis,
    pub features: FeatureVector,
}

/// Read-only table the classifiers train and evaluate on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CohortTable {
    columns: Vec<Column>,
    rows: usize,
}

impl CohortTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::push_column`].
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        data: ColumnData,
    ) -> Result<Self, CohortError> {
        self.push_column(name, data)?;
        Ok(self)
    }

    /// Append a column; the first column fixes the row count.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        data: ColumnData,
    ) -> Result<(), CohortError> {
        let name = name.into();
        if self.columns.iter().any(|column| column.name == name) {
            return Err(CohortError::DuplicateColumn(name));
        }
        if self.columns.is_empty() {
            self.rows = data.len();
        } else if data.len() != self.rows {
            return Err(CohortError::LengthMismatch {
                name,
                expected: self.rows,
                found: data.len(),
            });
        }
        self.columns.push(Column { name, data });
        Ok(())
    }

    /// `ID`, `Diagnosis` and the feature columns for labeled recordings.
    pub fn from_records(records: &[CohortRecord]) -> Self {
        let mut columns = vec![
            Column {
                name: ID_COLUMN.to_string(),
                data: ColumnData::Text(records.iter().map(|r| r.id.clone()).collect()),
            },
            Column {
                name: DIAGNOSIS_COLUMN.to_string(),
                data: ColumnData::Numeric(
                    records.iter().map(|r| r.diagnosis.label() as f64).collect(),
                ),
            },
        ];
        for (idx, name) in FEATURE_NAMES.iter().enumerate() {
            columns.push(Column {
                name: (*name).to_string(),
                data: ColumnData::Numeric(
                    records.iter().map(|r| r.features.to_array()[idx]).collect(),
                ),
            });
        }
        Self {
            columns,
            rows: records.len(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| &column.data)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn read_csv(path: &Path) -> Result<Self, CohortError> {
        let file = File::open(path)?;
        Self::from_csv_reader(file).map_err(|err| match err {
            CohortError::Csv(source) => CohortError::Read {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse CSV with a header row. `ID` stays text; other columns are numeric when every cell
    /// parses as a number.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CohortError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            for (column, value) in cells.iter_mut().zip(record.iter()) {
                column.push(value.to_string());
            }
        }
        let mut table = Self::new();
        for (name, values) in headers.into_iter().zip(cells) {
            let data = if name == ID_COLUMN {
                ColumnData::Text(values)
            } else {
                match values
                    .iter()
                    .map(|value| value.parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                {
                    Ok(numbers) => ColumnData::Numeric(numbers),
                    Err(_) => ColumnData::Text(values),
                }
            };
            table.push_column(name, data)?;
        }
        Ok(table)
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

    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<(), CohortError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.columns.iter().map(|column| column.name.as_str()))?;
        for row in 0..self.rows {
            writer.write_record(self.columns.iter().map(|column| column.data.cell(row)))?;
        }
        writer.flush()?;
        Ok(())
    }
}

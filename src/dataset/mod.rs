//! Tabular inputs and outputs of the classification layer.

mod cohort;
mod result_table;

pub use cohort::{
    CohortError, CohortRecord, CohortTable, ColumnData, DIAGNOSIS_COLUMN, Diagnosis, ID_COLUMN,
};
pub use result_table::{ResultTable, fold_column_name};

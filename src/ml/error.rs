use thiserror::Error;

/// Failures of the classification layer. All of them are caller-visible precondition violations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassificationError {
    /// A required column is absent, non-numeric, or holds invalid values.
    #[error("schema error: {0}")]
    Schema(String),
    /// A train or test split is empty, or training lacks one of the classes.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("unknown model kind `{0}` (expected one of: nb, lr, svm)")]
    UnknownModel(String),
    #[error("invalid fold count {folds}: need at least 2 and at most {max} (smallest stratum size)")]
    InvalidFoldCount { folds: usize, max: usize },
    /// The solver produced non-finite parameters.
    #[error("numerical failure: {0}")]
    Numerical(String),
}

//! Binary classification of cohort feature vectors.
//!
//! Every classifier is fitted from scratch per fold on standardized training rows, and the
//! orchestration in [`cross_val`] never lets a fitted scaler or model cross a fold boundary.

mod cross_val;
mod error;
mod folds;
pub(crate) mod linalg;
pub mod logreg;
pub mod metrics;
mod model;
pub mod naive_bayes;
mod pipeline;
mod single;
pub mod standardize;
pub mod svm;

pub use cross_val::{CrossValOptions, cross_validate};
pub use error::ClassificationError;
pub use folds::{StratifiedFolds, partition};
pub use model::{FittedModel, ModelKind};
pub use pipeline::{
    FoldPrediction, FoldResult, FoldSplit, LabeledCohort, evaluate_fold, evaluate_resolved,
};
pub use single::{Likelihood, LowConfidencePrediction, PredictionValidity, predict_single};

//! L2-regularized binary logistic regression.

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

mod train;
pub use train::{TrainOptions, train_logreg};

/// Fitted binary logistic regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogRegModel {
    /// Validate that every parameter is finite.
    pub fn validate(&self) -> Result<(), String> {
        if self.weights.is_empty() {
            return Err("No weights defined".to_string());
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err("Non-finite model parameters".to_string());
        }
        Ok(())
    }

    /// Linear score `w·x + b` for every row.
    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&Array1::from(self.weights.clone())) + self.bias
    }

    /// Probability of the positive class for every row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        if x.ncols() != self.weights.len() {
            return Vec::new();
        }
        self.decision_function(x).iter().map(|&z| sigmoid(z)).collect()
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

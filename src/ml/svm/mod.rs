//! RBF support vector classifier with Platt-calibrated probabilities.
//!
//! Calibration decision values come from an internal K-fold split of the training rows, so the
//! sigmoid is never fitted on decision values the model was trained on.

use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

mod platt;
mod smo;

use platt::{Sigmoid, sigmoid_train};
use smo::RbfKernel;

use super::error::ClassificationError;

/// Training options for the support vector classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SvmOptions {
    /// Box constraint on the dual multipliers.
    pub c: f64,
    /// RBF width; `None` derives `1 / (n_features * Var(X))` from the training matrix.
    pub gamma: Option<f64>,
    /// Stopping tolerance on the maximal KKT violation.
    pub tolerance: f64,
    pub calibration_folds: usize,
    /// Seed of the calibration split shuffle.
    pub seed: u64,
}

impl Default for SvmOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            tolerance: 1e-3,
            calibration_folds: 5,
            seed: 0,
        }
    }
}

/// Decision function `sum(coef_i * K(sv_i, x)) - rho` without calibration.
#[derive(Debug, Clone, PartialEq)]
struct Machine {
    kernel: RbfKernel,
    support_vectors: Array2<f64>,
    /// `y_i * alpha_i` of each support vector.
    coefficients: Vec<f64>,
    rho: f64,
}

impl Machine {
    fn fit(
        x: ArrayView2<'_, f64>,
        positive: &[bool],
        kernel: RbfKernel,
        options: &SvmOptions,
    ) -> Self {
        let y: Vec<f64> = positive.iter().map(|&p| if p { 1.0 } else { -1.0 }).collect();
        let gram = kernel.gram(x);
        let solution = smo::solve(&gram, &y, options.c, options.tolerance);
        tracing::trace!(
            iterations = solution.iterations,
            rows = x.nrows(),
            "SMO converged"
        );
        let support: Vec<usize> = (0..y.len()).filter(|&i| solution.alpha[i] > 0.0).collect();
        Self {
            kernel,
            support_vectors: x.select(Axis(0), &support),
            coefficients: support.iter().map(|&i| y[i] * solution.alpha[i]).collect(),
            rho: solution.rho,
        }
    }

    fn decision(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                self.support_vectors
                    .rows()
                    .into_iter()
                    .zip(&self.coefficients)
                    .map(|(sv, coef)| coef * self.kernel.eval(sv, row))
                    .sum::<f64>()
                    - self.rho
            })
            .collect()
    }
}

/// Fitted classifier; positive decision values favour the positive class.
#[derive(Debug, Clone, PartialEq)]
pub struct SvmModel {
    machine: Machine,
    sigmoid: Sigmoid,
}

impl SvmModel {
    pub fn gamma(&self) -> f64 {
        self.machine.kernel.gamma
    }

    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        self.machine.decision(x)
    }

    /// Calibrated probability of the positive class for each row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        self.machine
            .decision(x)
            .into_iter()
            .map(|f| self.sigmoid.predict(f))
            .collect()
    }
}

pub fn train_svm(
    x: ArrayView2<'_, f64>,
    positive: &[bool],
    options: &SvmOptions,
) -> Result<SvmModel, ClassificationError> {
    if x.nrows() != positive.len() {
        return Err(ClassificationError::Schema(
            "Mismatched training inputs/labels".to_string(),
        ));
    }
    if !positive.contains(&true) || !positive.contains(&false) {
        return Err(ClassificationError::InsufficientData(
            "support vector training needs rows of both classes".to_string(),
        ));
    }
    let gamma = options.gamma.unwrap_or_else(|| scale_gamma(x));
    if !gamma.is_finite() || gamma <= 0.0 {
        return Err(ClassificationError::Numerical(format!(
            "RBF gamma must be > 0, got {gamma}"
        )));
    }
    let kernel = RbfKernel { gamma };

    let decisions = cross_validated_decisions(x, positive, kernel, options);
    let sigmoid = sigmoid_train(&decisions, positive);
    let machine = Machine::fit(x, positive, kernel, options);
    if !machine.rho.is_finite() || !sigmoid.a.is_finite() || !sigmoid.b.is_finite() {
        return Err(ClassificationError::Numerical(
            "support vector training produced non-finite parameters".to_string(),
        ));
    }
    Ok(SvmModel { machine, sigmoid })
}

/// `1 / (n_features * Var(X))` over every entry of `x`, or 1 for a constant matrix.
fn scale_gamma(x: ArrayView2<'_, f64>) -> f64 {
    let count = x.len() as f64;
    if count == 0.0 {
        return 1.0;
    }
    let mean = x.sum() / count;
    let variance = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
    if variance > 0.0 {
        1.0 / (x.ncols() as f64 * variance)
    } else {
        1.0
    }
}

/// Out-of-fold decision values for every training row.
///
/// A fold whose training part holds a single class scores its held-out rows as +1 or -1.
fn cross_validated_decisions(
    x: ArrayView2<'_, f64>,
    positive: &[bool],
    kernel: RbfKernel,
    options: &SvmOptions,
) -> Vec<f64> {
    let n = positive.len();
    let folds = options.calibration_folds.max(2);
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(options.seed));

    let mut decisions = vec![0.0; n];
    for fold in 0..folds {
        let (start, end) = (fold * n / folds, (fold + 1) * n / folds);
        if start == end {
            continue;
        }
        let held_out = &order[start..end];
        let train: Vec<usize> = order[..start].iter().chain(&order[end..]).copied().collect();
        let train_labels: Vec<bool> = train.iter().map(|&i| positive[i]).collect();
        let has_positive = train_labels.contains(&true);
        let has_negative = train_labels.contains(&false);
        if has_positive && has_negative {
            let machine = Machine::fit(x.select(Axis(0), &train).view(), &train_labels, kernel, options);
            let values = machine.decision(x.select(Axis(0), held_out).view());
            for (&row, value) in held_out.iter().zip(values) {
                decisions[row] = value;
            }
        } else {
            let value = match (has_positive, has_negative) {
                (true, false) => 1.0,
                (false, true) => -1.0,
                _ => 0.0,
            };
            for &row in held_out {
                decisions[row] = value;
            }
        }
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn clusters() -> (Array2<f64>, Vec<bool>) {
        let x = array![
            [-1.5, -1.0],
            [-1.2, -0.8],
            [-0.9, -1.3],
            [-1.1, -1.1],
            [-1.4, -0.7],
            [1.3, 1.0],
            [1.0, 1.2],
            [0.8, 0.9],
            [1.2, 1.4],
            [1.5, 0.8]
        ];
        let y = vec![false, false, false, false, false, true, true, true, true, true];
        (x, y)
    }

    #[test]
    fn probabilities_follow_the_clusters() {
        let (x, y) = clusters();
        let model = train_svm(x.view(), &y, &SvmOptions::default()).unwrap();
        let p = model.predict_proba(array![[-1.2, -1.0], [1.2, 1.0]].view());
        assert!(p[0] < 0.5 && p[1] > 0.5, "{p:?}");
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        let d = model.decision_function(array![[-1.2, -1.0], [1.2, 1.0]].view());
        assert!(d[0] < 0.0 && d[1] > 0.0);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let (x, y) = clusters();
        let first = train_svm(x.view(), &y, &SvmOptions::default()).unwrap();
        let second = train_svm(x.view(), &y, &SvmOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn gamma_scales_with_data_variance() {
        let x = array![[0.0, 2.0], [2.0, 0.0]];
        assert!((scale_gamma(x.view()) - 0.5).abs() < 1e-12);
        assert_eq!(scale_gamma(array![[3.0, 3.0]].view()), 1.0);
    }

    #[test]
    fn single_class_is_rejected() {
        let x = array![[0.0], [1.0]];
        assert!(matches!(
            train_svm(x.view(), &[true, true], &SvmOptions::default()),
            Err(ClassificationError::InsufficientData(_))
        ));
    }
}

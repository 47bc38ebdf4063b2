use ndarray::{Array1, Array2, ArrayView2, Axis, s};

use super::{LogRegModel, sigmoid};
use crate::ml::error::ClassificationError;
use crate::ml::linalg::solve;

/// Training options for the logistic regression classifier.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Inverse L2 strength; the intercept is not penalized.
    pub c: f64,
    pub max_iter: usize,
    /// Stop once every gradient component is below this.
    pub tolerance: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tolerance: 1e-8,
        }
    }
}

/// Fit by Newton's method with a backtracking line search.
pub fn train_logreg(
    x: ArrayView2<'_, f64>,
    positive: &[bool],
    options: &TrainOptions,
) -> Result<LogRegModel, ClassificationError> {
    if x.nrows() == 0 {
        return Err(ClassificationError::InsufficientData(
            "Empty training set".to_string(),
        ));
    }
    if x.nrows() != positive.len() {
        return Err(ClassificationError::Schema(
            "Mismatched training inputs/labels".to_string(),
        ));
    }
    if !options.c.is_finite() || options.c <= 0.0 {
        return Err(ClassificationError::Numerical(format!(
            "regularization C must be > 0, got {}",
            options.c
        )));
    }

    let (rows, dim) = x.dim();
    // Design matrix with a trailing column of ones for the intercept.
    let mut design = Array2::<f64>::ones((rows, dim + 1));
    design.slice_mut(s![.., ..dim]).assign(&x);
    let y: Array1<f64> = positive.iter().map(|&p| if p { 1.0 } else { 0.0 }).collect();
    let lambda = 1.0 / options.c;

    let objective = |theta: &Array1<f64>| -> f64 {
        let z = design.dot(theta);
        let loss: f64 = z
            .iter()
            .zip(&y)
            .map(|(&z, &y)| softplus(z) - y * z)
            .sum();
        let w = theta.slice(s![..dim]);
        loss + 0.5 * lambda * w.dot(&w)
    };

    let mut theta = Array1::<f64>::zeros(dim + 1);
    let mut current = objective(&theta);
    for _iteration in 0..options.max_iter {
        let z = design.dot(&theta);
        let p = z.mapv(sigmoid);
        let mut gradient = design.t().dot(&(&p - &y));
        let mut penalty = theta.clone();
        penalty[dim] = 0.0;
        gradient.scaled_add(lambda, &penalty);
        if gradient.iter().all(|g| g.abs() < options.tolerance) {
            break;
        }

        let curvature = p.mapv(|p| p * (1.0 - p));
        let weighted = &design * &curvature.insert_axis(Axis(1));
        let mut hessian = design.t().dot(&weighted);
        for k in 0..=dim {
            let ridge = if k < dim { lambda } else { 0.0 };
            hessian[[k, k]] += ridge + 1e-10;
        }
        let step = solve(hessian, -&gradient).ok_or_else(|| {
            ClassificationError::Numerical("singular Hessian in logistic regression".to_string())
        })?;

        let slope = gradient.dot(&step);
        let mut t = 1.0_f64;
        let mut accepted = false;
        while t >= 1e-10 {
            let candidate = &theta + &(t * &step);
            let value = objective(&candidate);
            if value <= current + 1e-4 * t * slope {
                theta = candidate;
                current = value;
                accepted = true;
                break;
            }
            t *= 0.5;
        }
        if !accepted {
            break;
        }
    }

    let model = LogRegModel {
        weights: theta.slice(s![..dim]).to_vec(),
        bias: theta[dim],
    };
    model.validate().map_err(ClassificationError::Numerical)?;
    Ok(model)
}

fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn learns_a_separating_direction() {
        let x = array![[-2.0], [-1.0], [-0.5], [0.5], [1.0], [2.0]];
        let y = [false, false, false, true, true, true];
        let model = train_logreg(x.view(), &y, &TrainOptions::default()).unwrap();
        assert!(model.weights[0] > 0.5);
        let p = model.predict_proba(array![[-3.0], [3.0]].view());
        assert!(p[0] < 0.2 && p[1] > 0.8, "{p:?}");
    }

    #[test]
    fn regularization_keeps_separable_data_finite() {
        let x = array![[-1.0], [1.0]];
        let model = train_logreg(x.view(), &[false, true], &TrainOptions::default()).unwrap();
        assert!(model.weights[0].is_finite() && model.weights[0] > 0.0);
        assert!(model.bias.abs() < 1e-6);
    }

    #[test]
    fn balanced_identical_rows_give_one_half() {
        let x = array![[0.0, 0.0], [0.0, 0.0]];
        let model = train_logreg(x.view(), &[false, true], &TrainOptions::default()).unwrap();
        let p = model.predict_proba(x.view());
        assert!((p[0] - 0.5).abs() < 1e-9);
    }
}

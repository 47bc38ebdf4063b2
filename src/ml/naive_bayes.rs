//! Gaussian naive Bayes for two classes.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use super::error::ClassificationError;

const VAR_SMOOTHING: f64 = 1e-9;
const MIN_VARIANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
struct ClassStats {
    log_prior: f64,
    mean: Array1<f64>,
    variance: Array1<f64>,
}

impl ClassStats {
    fn joint_log_likelihood(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut sum = self.log_prior;
        for ((&x, &mu), &var) in row.iter().zip(&self.mean).zip(&self.variance) {
            sum -= 0.5 * (2.0 * std::f64::consts::PI * var).ln();
            sum -= 0.5 * (x - mu) * (x - mu) / var;
        }
        sum
    }
}

/// Per-class independent Gaussians with variance smoothing relative to the widest feature.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianNb {
    negative: ClassStats,
    positive: ClassStats,
}

impl GaussianNb {
    /// Fit on rows of `x`; `positive[i]` marks rows of the positive class.
    pub fn fit(x: ArrayView2<'_, f64>, positive: &[bool]) -> Result<Self, ClassificationError> {
        if x.nrows() != positive.len() {
            return Err(ClassificationError::Schema(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                positive.len()
            )));
        }
        let epsilon = VAR_SMOOTHING
            * x.var_axis(Axis(0), 0.0)
                .iter()
                .fold(0.0_f64, |max, &v| max.max(v));
        let total = positive.len() as f64;
        let stats = |want: bool| -> Result<ClassStats, ClassificationError> {
            let rows: Vec<usize> = (0..positive.len()).filter(|&i| positive[i] == want).collect();
            if rows.is_empty() {
                return Err(ClassificationError::InsufficientData(
                    "naive Bayes needs training rows of both classes".to_string(),
                ));
            }
            let subset = x.select(Axis(0), &rows);
            let mean = subset
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(x.ncols()));
            let variance = subset
                .var_axis(Axis(0), 0.0)
                .mapv(|v| (v + epsilon).max(MIN_VARIANCE));
            Ok(ClassStats {
                log_prior: (rows.len() as f64 / total).ln(),
                mean,
                variance,
            })
        };
        Ok(Self {
            negative: stats(false)?,
            positive: stats(true)?,
        })
    }

    /// Posterior probability of the positive class for each row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let neg = self.negative.joint_log_likelihood(row);
                let pos = self.positive.joint_log_likelihood(row);
                // Logistic of the log-odds, written to stay finite for large gaps.
                let log_odds = pos - neg;
                if log_odds >= 0.0 {
                    1.0 / (1.0 + (-log_odds).exp())
                } else {
                    let e = log_odds.exp();
                    e / (1.0 + e)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn separates_two_clusters() {
        let x = array![[-2.0, 0.1], [-1.8, -0.1], [-2.2, 0.0], [2.0, 0.2], [1.9, -0.2], [2.1, 0.0]];
        let y = [false, false, false, true, true, true];
        let model = GaussianNb::fit(x.view(), &y).unwrap();
        let p = model.predict_proba(array![[-2.0, 0.0], [2.0, 0.0]].view());
        assert!(p[0] < 0.01 && p[1] > 0.99, "{p:?}");
    }

    #[test]
    fn identical_rows_fall_back_to_priors() {
        let x = array![[0.0, 0.0], [0.0, 0.0]];
        let model = GaussianNb::fit(x.view(), &[false, true]).unwrap();
        let p = model.predict_proba(x.view());
        assert!((p[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_rejected() {
        let x = array![[0.0], [1.0]];
        assert!(matches!(
            GaussianNb::fit(x.view(), &[true, true]),
            Err(ClassificationError::InsufficientData(_))
        ));
    }
}

//! Sequential minimal optimization for the C-SVC dual with second-order working set selection.

use ndarray::{Array2, ArrayView1, ArrayView2};

const TAU: f64 = 1e-12;

/// Radial basis kernel `exp(-gamma * |a - b|^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RbfKernel {
    pub(crate) gamma: f64,
}

impl RbfKernel {
    pub(crate) fn eval(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        let distance: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
        (-self.gamma * distance).exp()
    }

    pub(crate) fn gram(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut gram = Array2::zeros((n, n));
        for i in 0..n {
            gram[[i, i]] = 1.0;
            for j in 0..i {
                let k = self.eval(x.row(i), x.row(j));
                gram[[i, j]] = k;
                gram[[j, i]] = k;
            }
        }
        gram
    }
}

/// Solution of the dual problem.
#[derive(Debug, Clone)]
pub(crate) struct DualSolution {
    /// Lagrange multipliers, one per training row.
    pub(crate) alpha: Vec<f64>,
    /// Offset subtracted from the kernel expansion.
    pub(crate) rho: f64,
    pub(crate) iterations: usize,
}

/// Minimise `0.5 a'Qa - e'a` subject to `0 <= a <= c` and `y'a = 0`, where
/// `Q[i][j] = y[i] y[j] K[i][j]` and `y` is +1/-1.
pub(crate) fn solve(gram: &Array2<f64>, y: &[f64], c: f64, tolerance: f64) -> DualSolution {
    let n = y.len();
    let q = |i: usize, j: usize| y[i] * y[j] * gram[[i, j]];
    let mut alpha = vec![0.0; n];
    let mut gradient = vec![-1.0; n];
    let max_iter = (100 * n).max(10_000_000);

    let mut iterations = 0;
    while iterations < max_iter {
        let Some((i, j)) = select_working_set(gram, y, &alpha, &gradient, c, tolerance) else {
            break;
        };
        iterations += 1;

        let (old_i, old_j) = (alpha[i], alpha[j]);
        if y[i] != y[j] {
            let mut quad = q(i, i) + q(j, j) + 2.0 * q(i, j);
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (-gradient[i] - gradient[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let mut quad = q(i, i) + q(j, j) - 2.0 * q(i, j);
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (gradient[i] - gradient[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let (delta_i, delta_j) = (alpha[i] - old_i, alpha[j] - old_j);
        for (k, g) in gradient.iter_mut().enumerate() {
            *g += q(i, k) * delta_i + q(j, k) * delta_j;
        }
    }
    if iterations >= max_iter {
        tracing::warn!(iterations, "SMO reached the iteration limit before converging");
    }

    let rho = compute_rho(y, &alpha, &gradient, c);
    DualSolution {
        alpha,
        rho,
        iterations,
    }
}

fn select_working_set(
    gram: &Array2<f64>,
    y: &[f64],
    alpha: &[f64],
    gradient: &[f64],
    c: f64,
    tolerance: f64,
) -> Option<(usize, usize)> {
    let below_upper = |t: usize| alpha[t] < c;
    let above_lower = |t: usize| alpha[t] > 0.0;

    let mut gmax = f64::NEG_INFINITY;
    let mut selected_i = None;
    for t in 0..y.len() {
        let candidate = if y[t] > 0.0 {
            below_upper(t).then(|| -gradient[t])
        } else {
            above_lower(t).then(|| gradient[t])
        };
        if let Some(value) = candidate.filter(|value| *value >= gmax) {
            gmax = value;
            selected_i = Some(t);
        }
    }
    let i = selected_i?;

    let mut gmax2 = f64::NEG_INFINITY;
    let mut objective_min = f64::INFINITY;
    let mut selected_j = None;
    for t in 0..y.len() {
        let (eligible, grad_diff, violation) = if y[t] > 0.0 {
            (above_lower(t), gmax + gradient[t], gradient[t])
        } else {
            (below_upper(t), gmax - gradient[t], -gradient[t])
        };
        if !eligible {
            continue;
        }
        gmax2 = gmax2.max(violation);
        if grad_diff > 0.0 {
            // For either label of `t` this is K[i][i] + K[t][t] - 2 K[i][t].
            let mut quad = gram[[i, i]] + gram[[t, t]] - 2.0 * gram[[i, t]];
            if quad <= 0.0 {
                quad = TAU;
            }
            let objective = -(grad_diff * grad_diff) / quad;
            if objective <= objective_min {
                objective_min = objective;
                selected_j = Some(t);
            }
        }
    }

    if gmax + gmax2 < tolerance {
        return None;
    }
    selected_j.map(|j| (i, j))
}

fn compute_rho(y: &[f64], alpha: &[f64], gradient: &[f64], c: f64) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut free_sum = 0.0;
    let mut free_count = 0usize;
    for t in 0..y.len() {
        let yg = y[t] * gradient[t];
        let at_upper = alpha[t] >= c;
        let at_lower = alpha[t] <= 0.0;
        if at_upper {
            if y[t] < 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else if at_lower {
            if y[t] > 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            free_count += 1;
            free_sum += yg;
        }
    }
    if free_count > 0 {
        free_sum / free_count as f64
    } else {
        0.5 * (upper + lower)
    }
}

//! Platt scaling: fit `P(positive | f) = 1 / (1 + exp(A f + B))` to decision values.

const MAX_ITER: usize = 100;
const MIN_STEP: f64 = 1e-10;
const SIGMA: f64 = 1e-12;
const EPS: f64 = 1e-5;

/// Sigmoid parameters `(A, B)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sigmoid {
    pub(crate) a: f64,
    pub(crate) b: f64,
}

impl Sigmoid {
    pub(crate) fn predict(&self, decision: f64) -> f64 {
        let f_ap_b = decision * self.a + self.b;
        if f_ap_b >= 0.0 {
            (-f_ap_b).exp() / (1.0 + (-f_ap_b).exp())
        } else {
            1.0 / (1.0 + f_ap_b.exp())
        }
    }
}

/// Newton fit with backtracking on regularized targets, as in Lin, Lin and Weng's
/// revision of Platt's method.
pub(crate) fn sigmoid_train(decisions: &[f64], positive: &[bool]) -> Sigmoid {
    let prior1 = positive.iter().filter(|&&p| p).count() as f64;
    let prior0 = positive.len() as f64 - prior1;
    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = positive
        .iter()
        .map(|&p| if p { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        decisions
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let f_ap_b = f * a + b;
                if f_ap_b >= 0.0 {
                    t * f_ap_b + (-f_ap_b).exp().ln_1p()
                } else {
                    (t - 1.0) * f_ap_b + f_ap_b.exp().ln_1p()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);
    for _iteration in 0..MAX_ITER {
        let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (&f, &t) in decisions.iter().zip(&targets) {
            let f_ap_b = f * a + b;
            let (p, q) = if f_ap_b >= 0.0 {
                let e = (-f_ap_b).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_ap_b.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }
        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let (new_a, new_b) = (a + step * da, b + step * db);
            let new_f = objective(new_a, new_b);
            if new_f < fval + 0.0001 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }
        if step < MIN_STEP {
            tracing::debug!("Platt line search failed to improve");
            break;
        }
    }
    Sigmoid { a, b }
}

//! Binary logistic regression with L2 penalty
//!
//! Minimizes `0.5 * ||w||^2 + C * sum_i s_i * logloss_i` with Newton steps
//! (IRLS). The intercept is not penalized. Sample weights `s_i` carry
//! class balancing.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::constants::{LOGISTIC_C, LOGISTIC_MAX_ITER};

const GRAD_TOL: f64 = 1e-6;
const RIDGE: f64 = 1e-10;
const MAX_HALVINGS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: LOGISTIC_C,
            max_iter: LOGISTIC_MAX_ITER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Vec<f64>,
    pub intercept: f64,
    pub n_iter: usize,
    pub converged: bool,
    pub params: LogisticParams,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// log(1 + exp(z)) without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

impl LogisticRegression {
    /// Fit on `labels` in {0, 1}
    pub fn fit(
        x: ArrayView2<'_, f64>,
        labels: &[usize],
        sample_weights: &[f64],
        params: LogisticParams,
    ) -> Result<Self, String> {
        let (n, d) = x.dim();
        if n == 0 || d == 0 {
            return Err(format!("empty training matrix ({}x{})", n, d));
        }
        if labels.len() != n || sample_weights.len() != n {
            return Err("label/weight length does not match sample count".to_string());
        }
        if labels.iter().any(|&l| l > 1) {
            return Err("logistic regression expects binary labels".to_string());
        }
        if params.c <= 0.0 {
            return Err("C must be positive".to_string());
        }

        // Design matrix with a trailing intercept column
        let mut xa = Array2::<f64>::ones((n, d + 1));
        xa.slice_mut(ndarray::s![.., ..d]).assign(&x);

        let y = Array1::from_iter(labels.iter().map(|&l| l as f64));
        let sw = Array1::from_vec(sample_weights.to_vec());
        let c = params.c;

        let objective = |beta: &Array1<f64>| -> f64 {
            let z = xa.dot(beta);
            let loss: f64 = z
                .iter()
                .zip(y.iter())
                .zip(sw.iter())
                .map(|((&zi, &yi), &si)| si * (softplus(zi) - yi * zi))
                .sum();
            let penalty: f64 = beta.iter().take(d).map(|b| b * b).sum();
            0.5 * penalty + c * loss
        };

        let mut beta = Array1::<f64>::zeros(d + 1);
        let mut current = objective(&beta);
        let mut converged = false;
        let mut n_iter = 0;

        for iter in 0..params.max_iter {
            n_iter = iter + 1;

            let p = xa.dot(&beta).mapv(sigmoid);
            let residual = (&p - &y) * &sw;

            let mut grad = xa.t().dot(&residual) * c;
            for j in 0..d {
                grad[j] += beta[j];
            }

            if grad.iter().all(|g| g.abs() < GRAD_TOL) {
                converged = true;
                break;
            }

            let curvature = (&p * &(1.0 - &p)) * &sw;
            let weighted = &xa * &curvature.insert_axis(Axis(1));
            let mut hessian = xa.t().dot(&weighted) * c;
            for j in 0..=d {
                hessian[[j, j]] += if j < d { 1.0 } else { RIDGE };
            }

            let step = solve(hessian, grad.clone())
                .ok_or_else(|| "singular Hessian during Newton step".to_string())?;

            // Backtracking line search on the penalized objective
            let mut t = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_HALVINGS {
                let candidate = &beta - &(&step * t);
                let value = objective(&candidate);
                if value.is_finite() && value <= current {
                    let improvement = current - value;
                    beta = candidate;
                    current = value;
                    accepted = true;
                    if improvement <= 1e-12 * current.abs().max(1.0) {
                        converged = true;
                    }
                    break;
                }
                t *= 0.5;
            }

            if !accepted || converged {
                converged = true;
                break;
            }
        }

        if beta.iter().any(|b| !b.is_finite()) {
            return Err("logistic regression diverged".to_string());
        }
        if !converged {
            log::warn!("Logistic regression stopped after {} iterations without converging", n_iter);
        }

        Ok(Self {
            coef: beta.iter().take(d).copied().collect(),
            intercept: beta[d],
            n_iter,
            converged,
            params,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coef.len()
    }

    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.intercept + self.coef.iter().zip(row).map(|(w, v)| w * v).sum::<f64>()
    }

    /// P(class 1)
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < 1e-14 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }

        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_solve_small_system() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![3.0, 5.0];
        let x = solve(a, b).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(solve(a, array![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_fit_learns_direction() {
        // y = 1 when x > 0, with some overlap near zero
        let xs: Vec<f64> = (-20..20).map(|i| i as f64 / 4.0).collect();
        let labels: Vec<usize> = xs
            .iter()
            .enumerate()
            .map(|(i, &v)| if v > 0.0 || i % 9 == 0 { 1 } else { 0 })
            .collect();
        let x = Array2::from_shape_vec((xs.len(), 1), xs.clone()).unwrap();
        let weights = vec![1.0; xs.len()];

        let model = LogisticRegression::fit(x.view(), &labels, &weights, LogisticParams::default()).unwrap();

        assert!(model.converged);
        assert!(model.coef[0] > 0.0);
        assert!(model.predict_proba_row(&[4.0]) > 0.9);
        assert!(model.predict_proba_row(&[-4.0]) < 0.2);
    }

    #[test]
    fn test_separable_data_stays_finite() {
        // Perfect separation: L2 keeps the weights bounded
        let x = array![[-2.0], [-1.0], [1.0], [2.0]];
        let labels = [0, 0, 1, 1];
        let model = LogisticRegression::fit(x.view(), &labels, &[1.0; 4], LogisticParams::default()).unwrap();
        assert!(model.coef[0].is_finite());
        assert!(model.predict_proba_row(&[2.0]) > 0.5);
    }

    #[test]
    fn test_weights_move_intercept() {
        let x = array![[0.0], [0.0], [0.0], [0.0]];
        let labels = [0, 0, 0, 1];
        let plain = LogisticRegression::fit(x.view(), &labels, &[1.0; 4], LogisticParams::default()).unwrap();
        let balanced = LogisticRegression::fit(
            x.view(),
            &labels,
            &[4.0 / 6.0, 4.0 / 6.0, 4.0 / 6.0, 2.0],
            LogisticParams::default(),
        )
        .unwrap();

        assert!((plain.predict_proba_row(&[0.0]) - 0.25).abs() < 1e-4);
        assert!((balanced.predict_proba_row(&[0.0]) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let x = array![[0.0], [1.0]];
        assert!(LogisticRegression::fit(x.view(), &[0, 2], &[1.0, 1.0], LogisticParams::default()).is_err());
    }
}

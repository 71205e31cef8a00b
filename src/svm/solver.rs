//! Sequential minimal optimization for the binary C-SVC dual
//!
//!   min 0.5 a'Qa - e'a   subject to   0 <= a_i <= C,  y'a = 0
//!
//! with Q_ij = y_i y_j K(x_i, x_j). Working pairs are chosen by the
//! maximal-violating-pair rule with second-order gain, and the loop stops
//! once the KKT gap drops below the termination epsilon.

use std::collections::VecDeque;
use std::rc::Rc;

use super::kernel::Kernel;
use super::TermCriteria;
use crate::error::{DigitError, Result};

const TAU: f64 = 1e-12;

/// Budget for cached Q rows
const CACHE_BYTES: usize = 256 << 20;

#[derive(Debug, Clone)]
pub(crate) struct Solution {
    pub alpha: Vec<f64>,
    pub rho: f64,
    pub iterations: usize,
}

/// Bounded FIFO cache of Q rows
struct RowCache {
    rows: Vec<Option<Rc<[f64]>>>,
    order: VecDeque<usize>,
    capacity: usize,
}

impl RowCache {
    fn new(n: usize) -> Self {
        let row_bytes = n.max(1) * std::mem::size_of::<f64>();
        Self {
            rows: vec![None; n],
            order: VecDeque::new(),
            capacity: (CACHE_BYTES / row_bytes).max(2),
        }
    }

    fn get(&self, index: usize) -> Option<Rc<[f64]>> {
        self.rows[index].clone()
    }

    fn insert(&mut self, index: usize, row: Rc<[f64]>) {
        if self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.rows[evicted] = None;
            }
        }
        self.rows[index] = Some(row);
        self.order.push_back(index);
    }
}

struct QMatrix<'a> {
    samples: &'a [&'a [f32]],
    y: &'a [f64],
    kernel: &'a Kernel,
    cache: RowCache,
}

impl QMatrix<'_> {
    fn row(&mut self, i: usize) -> Rc<[f64]> {
        if let Some(row) = self.cache.get(i) {
            return row;
        }
        let xi = self.samples[i];
        let yi = self.y[i];
        let row: Rc<[f64]> = self
            .samples
            .iter()
            .zip(self.y)
            .map(|(xk, &yk)| yi * yk * self.kernel.eval(xi, xk))
            .collect();
        self.cache.insert(i, row.clone());
        row
    }
}

/// Solve one binary problem. `y` holds +1.0 / -1.0 per sample.
pub(crate) fn solve(
    samples: &[&[f32]],
    y: &[f64],
    kernel: &Kernel,
    c: f64,
    criteria: &TermCriteria,
) -> Result<Solution> {
    let n = samples.len();
    let qd: Vec<f64> = samples.iter().map(|x| kernel.eval(x, x)).collect();
    let mut alpha = vec![0.0; n];
    let mut grad = vec![-1.0; n];
    let mut q = QMatrix {
        samples,
        y,
        kernel,
        cache: RowCache::new(n),
    };

    let mut iterations = 0;
    while let Some((i, j)) = select_working_set(&mut q, &alpha, &grad, &qd, c, criteria.epsilon) {
        if iterations >= criteria.max_iter {
            return Err(DigitError::NumericsFault(format!(
                "SMO did not converge within {} iterations",
                criteria.max_iter
            )));
        }
        iterations += 1;

        let q_i = q.row(i);
        let q_j = q.row(j);
        let (old_ai, old_aj) = (alpha[i], alpha[j]);

        if y[i] != y[j] {
            let mut quad = qd[i] + qd[j] + 2.0 * q_i[j];
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (-grad[i] - grad[j]) / quad;
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
            let mut quad = qd[i] + qd[j] - 2.0 * q_i[j];
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (grad[i] - grad[j]) / quad;
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

        let delta_i = alpha[i] - old_ai;
        let delta_j = alpha[j] - old_aj;
        for k in 0..n {
            grad[k] += q_i[k] * delta_i + q_j[k] * delta_j;
        }
    }

    let rho = compute_rho(y, &alpha, &grad, c);
    if !rho.is_finite() || alpha.iter().any(|a| !a.is_finite()) {
        return Err(DigitError::NumericsFault(
            "solver produced a non-finite solution".to_string(),
        ));
    }

    Ok(Solution {
        alpha,
        rho,
        iterations,
    })
}

/// Pick the next pair to optimize, or `None` once the KKT gap is below `eps`
fn select_working_set(
    q: &mut QMatrix<'_>,
    alpha: &[f64],
    grad: &[f64],
    qd: &[f64],
    c: f64,
    eps: f64,
) -> Option<(usize, usize)> {
    let y = q.y;
    let n = alpha.len();

    let mut gmax = f64::NEG_INFINITY;
    let mut gmax_idx = None;
    for t in 0..n {
        if y[t] > 0.0 {
            if alpha[t] < c && -grad[t] >= gmax {
                gmax = -grad[t];
                gmax_idx = Some(t);
            }
        } else if alpha[t] > 0.0 && grad[t] >= gmax {
            gmax = grad[t];
            gmax_idx = Some(t);
        }
    }
    let i = gmax_idx?;
    let q_i = q.row(i);

    let mut gmax2 = f64::NEG_INFINITY;
    let mut gmin_idx = None;
    let mut obj_diff_min = f64::INFINITY;
    for t in 0..n {
        let (grad_diff, quad) = if y[t] > 0.0 {
            if alpha[t] <= 0.0 {
                continue;
            }
            gmax2 = gmax2.max(grad[t]);
            (gmax + grad[t], qd[i] + qd[t] - 2.0 * y[i] * q_i[t])
        } else {
            if alpha[t] >= c {
                continue;
            }
            gmax2 = gmax2.max(-grad[t]);
            (gmax - grad[t], qd[i] + qd[t] + 2.0 * y[i] * q_i[t])
        };

        if grad_diff > 0.0 {
            let quad = if quad > 0.0 { quad } else { TAU };
            let obj_diff = -(grad_diff * grad_diff) / quad;
            if obj_diff <= obj_diff_min {
                gmin_idx = Some(t);
                obj_diff_min = obj_diff;
            }
        }
    }

    if gmax + gmax2 < eps {
        return None;
    }
    gmin_idx.map(|j| (i, j))
}

fn compute_rho(y: &[f64], alpha: &[f64], grad: &[f64], c: f64) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut free_sum = 0.0;
    let mut free_count = 0usize;

    for t in 0..alpha.len() {
        let yg = y[t] * grad[t];
        let at_upper = alpha[t] >= c;
        let at_lower = alpha[t] <= 0.0;
        if at_upper || at_lower {
            // Bound variables only constrain rho from one side
            if (at_upper && y[t] < 0.0) || (at_lower && y[t] > 0.0) {
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
        (upper + lower) / 2.0
    }
}

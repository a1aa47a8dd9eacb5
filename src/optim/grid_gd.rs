//! Exhaustive grid search followed by finite-difference gradient descent.
//!
//! The grid is regular over every axis (20/10/8 points per axis for
//! dimension ≤2/3/>3 unless an explicit size is configured). Refinement works
//! in unit-box coordinates: a normalized central-difference gradient step of
//! length `learning_rate`, scaled by `step_decay` whenever the move does not
//! improve on the best point, until it drops below `min_step`.

use crate::domain::{GridSearchConfig, OptimizerKind};
use crate::error::AppError;
use crate::optim::{Evaluator, SearchOutcome, Strategy};

#[derive(Debug, Clone)]
pub struct GridSearchGd {
    config: GridSearchConfig,
}

impl GridSearchGd {
    pub fn new(config: GridSearchConfig) -> Self {
        Self { config }
    }

    fn points_per_axis(&self, dim: usize) -> usize {
        let by_dim = self.config.points_by_dim;
        self.config
            .grid_size
            .unwrap_or(match dim {
                0..=2 => by_dim[0],
                3 => by_dim[1],
                _ => by_dim[2],
            })
            .max(1)
    }
}

impl Strategy for GridSearchGd {
    const KIND: OptimizerKind = OptimizerKind::GridSearchGd;

    fn search(&self, eval: &mut Evaluator<'_>, _start: &[f64]) -> Result<SearchOutcome, AppError> {
        let bounds = eval.bounds();
        let dim = eval.dim();
        let k = self.points_per_axis(dim);

        let axes: Vec<Vec<f64>> = (0..dim)
            .map(|i| {
                if k == 1 || bounds.range(i) == 0.0 {
                    vec![0.5 * (bounds.lower[i] + bounds.upper[i])]
                } else {
                    (0..k)
                        .map(|j| bounds.lower[i] + bounds.range(i) * j as f64 / (k - 1) as f64)
                        .collect()
                }
            })
            .collect();

        // Odometer over the cartesian product.
        let mut idx = vec![0usize; dim];
        let mut point: Vec<f64> = axes.iter().map(|a| a[0]).collect();
        'grid: loop {
            eval.eval(&point);
            let mut axis = 0;
            loop {
                if axis == dim {
                    break 'grid;
                }
                idx[axis] += 1;
                if idx[axis] < axes[axis].len() {
                    point[axis] = axes[axis][idx[axis]];
                    break;
                }
                idx[axis] = 0;
                point[axis] = axes[axis][0];
                axis += 1;
            }
        }
        eval.record_generation();

        let mut x = eval.best_x().to_vec();
        let mut fx = eval.best_value();
        let mut step = self.config.learning_rate;
        let h = self.config.fd_step;
        let mut grad = vec![0.0; dim];
        let mut reason = "iteration budget exhausted";
        let mut iterations = 1;

        for _ in 0..self.config.gd_iterations {
            iterations += 1;
            let mut norm_sq = 0.0;
            for i in 0..dim {
                let range = bounds.range(i);
                if range == 0.0 {
                    grad[i] = 0.0;
                    continue;
                }
                let mut probe = x.clone();
                probe[i] = (x[i] + h * range).min(bounds.upper[i]);
                let up = probe[i];
                let f_up = eval.eval(&probe);
                probe[i] = (x[i] - h * range).max(bounds.lower[i]);
                let down = probe[i];
                let f_down = eval.eval(&probe);
                grad[i] = (f_up - f_down) / ((up - down) / range);
                norm_sq += grad[i] * grad[i];
            }
            let norm = norm_sq.sqrt();
            if !norm.is_finite() || norm == 0.0 {
                eval.record_generation();
                reason = "stationary point";
                break;
            }

            let mut candidate = x.clone();
            for i in 0..dim {
                candidate[i] -= step * bounds.range(i) * grad[i] / norm;
            }
            let f_candidate = eval.eval_mut(&mut candidate);
            if f_candidate < fx {
                x = candidate;
                fx = f_candidate;
            } else {
                step *= self.config.step_decay;
            }
            // A probe may have beaten the current point.
            if eval.best_value() < fx {
                x = eval.best_x().to_vec();
                fx = eval.best_value();
            }
            eval.record_generation();
            if step < self.config.min_step {
                reason = "step size below threshold";
                break;
            }
        }

        Ok(SearchOutcome::new(iterations, reason))
    }
}

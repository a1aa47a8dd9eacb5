//! Nelder-Mead simplex search with clipping.
//!
//! The initial simplex is `x0` plus one vertex per axis offset by
//! `initial_step * range` (away from the nearer bound). Each iteration sorts
//! the vertices, then tries reflection, expansion, outside/inside contraction
//! and finally a shrink toward the best vertex. Termination:
//!
//! - value spread across the simplex below `tolerance` (relative to `1 + |best|`)
//! - `stall_window` consecutive iterations without a new best
//! - the iteration cap

use crate::domain::{NelderMeadConfig, OptimizerKind};
use crate::error::AppError;
use crate::optim::{Evaluator, SearchOutcome, Strategy};

#[derive(Debug, Clone)]
pub struct NelderMead {
    config: NelderMeadConfig,
}

impl NelderMead {
    pub fn new(config: NelderMeadConfig) -> Self {
        Self { config }
    }

    /// Same coefficients with a tighter iteration cap (bootstrap refits).
    pub fn capped(config: &NelderMeadConfig, max_iterations: usize) -> Self {
        Self {
            config: NelderMeadConfig {
                max_iterations,
                ..config.clone()
            },
        }
    }
}

fn affine(from: &[f64], towards: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(towards).map(|(a, b)| a + t * (b - a)).collect()
}

impl Strategy for NelderMead {
    const KIND: OptimizerKind = OptimizerKind::NelderMead;

    fn search(&self, eval: &mut Evaluator<'_>, start: &[f64]) -> Result<SearchOutcome, AppError> {
        let c = &self.config;
        let bounds = eval.bounds();
        let dim = eval.dim();

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
        let f0 = eval.eval(start);
        simplex.push((start.to_vec(), f0));
        for i in 0..dim {
            let mut v = start.to_vec();
            let step = c.initial_step * bounds.range(i);
            v[i] = if v[i] + step <= bounds.upper[i] {
                v[i] + step
            } else {
                v[i] - step
            };
            let fv = eval.eval_mut(&mut v);
            simplex.push((v, fv));
        }
        eval.record_generation();

        let mut stall = 0;
        let mut best_seen = eval.best_value();
        let mut iterations = 0;
        let mut reason = "iteration budget exhausted";

        for it in 0..c.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            let f_best = simplex[0].1;
            let f_worst = simplex[dim].1;
            if f_worst - f_best <= c.tolerance * (1.0 + f_best.abs()) {
                reason = "simplex spread below tolerance";
                break;
            }
            iterations = it + 1;

            let mut centroid = vec![0.0; dim];
            for (v, _) in &simplex[..dim] {
                for (acc, x) in centroid.iter_mut().zip(v) {
                    *acc += x / dim as f64;
                }
            }
            let worst = simplex[dim].0.clone();
            let f_second = simplex[dim - 1].1;

            // Reflection: c + alpha (c - worst).
            let mut xr = affine(&centroid, &worst, -c.reflection);
            let fr = eval.eval_mut(&mut xr);

            let mut shrink = false;
            if fr < f_best {
                let mut xe = affine(&centroid, &xr, c.expansion);
                let fe = eval.eval_mut(&mut xe);
                simplex[dim] = if fe < fr { (xe, fe) } else { (xr, fr) };
            } else if fr < f_second {
                simplex[dim] = (xr, fr);
            } else if fr < f_worst {
                let mut xc = affine(&centroid, &xr, c.contraction);
                let fc = eval.eval_mut(&mut xc);
                if fc <= fr {
                    simplex[dim] = (xc, fc);
                } else {
                    shrink = true;
                }
            } else {
                let mut xc = affine(&centroid, &worst, c.contraction);
                let fc = eval.eval_mut(&mut xc);
                if fc < f_worst {
                    simplex[dim] = (xc, fc);
                } else {
                    shrink = true;
                }
            }

            if shrink {
                let best = simplex[0].0.clone();
                for vertex in simplex.iter_mut().skip(1) {
                    let mut v = affine(&best, &vertex.0, c.shrink);
                    let fv = eval.eval_mut(&mut v);
                    *vertex = (v, fv);
                }
            }
            eval.record_generation();

            if eval.best_value() < best_seen {
                best_seen = eval.best_value();
                stall = 0;
            } else {
                stall += 1;
                if stall >= c.stall_window {
                    reason = "no improvement within stall window";
                    break;
                }
            }
        }

        Ok(SearchOutcome::new(iterations, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bounds;
    use crate::optim::Optimizer;
    use crate::optim::testing::check_contract;

    #[test]
    fn recovers_quadratic_optimum() {
        check_contract(&NelderMead::new(NelderMeadConfig::default()), 1e-3);
    }

    #[test]
    fn rosenbrock_valley() {
        let bounds = Bounds::new(vec![-2.0, -2.0], vec![2.0, 2.0]).unwrap();
        let rosen = |x: &[f64]| {
            Ok::<f64, AppError>((1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2))
        };
        let result = NelderMead::new(NelderMeadConfig::default()).optimize(&rosen, &bounds, Some(&[-1.2, 1.0]));
        assert!(result.success);
        assert!((result.params[0] - 1.0).abs() < 1e-2 && (result.params[1] - 1.0).abs() < 2e-2);
    }

    #[test]
    fn cap_bounds_iterations() {
        let nm = NelderMead::capped(&NelderMeadConfig::default(), 5);
        let bounds = Bounds::new(vec![-5.0], vec![5.0]).unwrap();
        let f = |x: &[f64]| Ok::<f64, AppError>((x[0] - 3.0).powi(2));
        let result = nm.optimize(&f, &bounds, Some(&[-4.0]));
        assert!(result.iterations <= 5);
        assert!(result.history.len() <= 6);
    }
}

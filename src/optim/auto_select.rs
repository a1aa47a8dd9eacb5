//! Run every concrete strategy and keep the best success.
//!
//! Children run in parallel on the current rayon pool, each with its own
//! derived seed. The winner is the lowest objective value among successful
//! children; ties go to the earlier strategy in [`OptimizerKind::CONCRETE`].
//! The returned result keeps the winner's `optimizer` tag and counts the
//! evaluations of all children.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::domain::{Bounds, OptimizationResult, OptimizerConfig, OptimizerKind};
use crate::optim::rng::child_seed;
use crate::optim::{Objective, Optimizer, build_optimizer, prepare_start};

#[derive(Debug, Clone)]
pub struct AutoSelect {
    config: OptimizerConfig,
    seed: Option<u64>,
}

impl AutoSelect {
    pub fn new(config: OptimizerConfig, seed: Option<u64>) -> Self {
        Self { config, seed }
    }
}

/// Index of the best successful result (strict `<`, so earlier entries win ties).
pub(crate) fn pick_best(results: &[OptimizationResult]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, r) in results.iter().enumerate() {
        if !r.success || !r.objective_value.is_finite() {
            continue;
        }
        match best {
            Some(b) if results[b].objective_value <= r.objective_value => {}
            _ => best = Some(i),
        }
    }
    best
}

impl Optimizer for AutoSelect {
    fn kind(&self) -> OptimizerKind {
        OptimizerKind::AutoSelect
    }

    fn optimize(
        &self,
        objective: &Objective<'_>,
        bounds: &Bounds,
        initial: Option<&[f64]>,
    ) -> OptimizationResult {
        let started = Instant::now();
        let start = match prepare_start(bounds, initial) {
            Ok(x) => x,
            Err(e) => {
                let params = initial.map(<[f64]>::to_vec).unwrap_or_default();
                return OptimizationResult::failed(OptimizerKind::AutoSelect, params, e.message());
            }
        };

        let results: Vec<OptimizationResult> = OptimizerKind::CONCRETE
            .par_iter()
            .enumerate()
            .map(|(i, &kind)| {
                let child = build_optimizer(kind, &self.config, child_seed(self.seed, i as u64));
                child.optimize(objective, bounds, Some(&start))
            })
            .collect();

        let evaluations = results.iter().map(|r| r.evaluations).sum();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1e3;

        match pick_best(&results) {
            Some(i) => {
                let mut best = results[i].clone();
                debug!(
                    winner = best.optimizer.display_name(),
                    value = best.objective_value,
                    "auto-select finished"
                );
                best.evaluations = evaluations;
                best.elapsed_ms = elapsed_ms;
                best.message = Some(format!(
                    "auto-select: {} won ({})",
                    best.optimizer.display_name(),
                    best.message.as_deref().unwrap_or("converged")
                ));
                best
            }
            None => {
                let reasons: Vec<String> = results
                    .iter()
                    .map(|r| {
                        format!(
                            "{}: {}",
                            r.optimizer.display_name(),
                            r.message.as_deref().unwrap_or("failed")
                        )
                    })
                    .collect();
                let mut failed = OptimizationResult::failed(
                    OptimizerKind::AutoSelect,
                    start,
                    format!("No strategy succeeded. {}", reasons.join("; ")),
                );
                failed.evaluations = evaluations;
                failed.elapsed_ms = elapsed_ms;
                failed
            }
        }
    }
}

//! Grey wolf optimizer.
//!
//! The three best positions seen so far (alpha, beta, delta) lead the hunt.
//! Every wolf moves to the average of three bound-clipped pulls, one toward
//! each leader, with per-axis coefficients `A = 2a r1 - a` and `C = 2 r2`
//! while `a` decays linearly from 2 to 0. Leaders are replaced only by
//! strictly better positions.

use rand::Rng;

use crate::domain::{GreyWolfConfig, OptimizerKind};
use crate::error::AppError;
use crate::optim::pso::stalled;
use crate::optim::rng::make_rng;
use crate::optim::{Evaluator, SearchOutcome, Strategy};

#[derive(Debug, Clone)]
pub struct GreyWolf {
    config: GreyWolfConfig,
    seed: Option<u64>,
}

impl GreyWolf {
    pub fn new(config: GreyWolfConfig, seed: Option<u64>) -> Self {
        Self { config, seed }
    }
}

#[derive(Debug, Clone)]
struct Leaders {
    /// alpha, beta, delta, best first.
    ranks: Vec<(Vec<f64>, f64)>,
}

impl Leaders {
    fn from_pack(pack: &[Vec<f64>], values: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..pack.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
        let ranks = (0..3)
            .map(|r| {
                let i = order[r.min(order.len() - 1)];
                (pack[i].clone(), values[i])
            })
            .collect();
        Self { ranks }
    }

    fn offer(&mut self, x: &[f64], value: f64) {
        if let Some(slot) = self.ranks.iter().position(|(_, v)| value < *v) {
            self.ranks.pop();
            self.ranks.insert(slot, (x.to_vec(), value));
        }
    }

    fn alpha_value(&self) -> f64 {
        self.ranks[0].1
    }
}

impl Strategy for GreyWolf {
    const KIND: OptimizerKind = OptimizerKind::GreyWolf;

    fn search(&self, eval: &mut Evaluator<'_>, start: &[f64]) -> Result<SearchOutcome, AppError> {
        let c = &self.config;
        let bounds = eval.bounds();
        let dim = eval.dim();
        let n = c.pack_size.max(3);
        let mut rng = make_rng(self.seed);

        let mut pack: Vec<Vec<f64>> = Vec::with_capacity(n);
        pack.push(start.to_vec());
        while pack.len() < n {
            pack.push(
                (0..dim)
                    .map(|i| bounds.lower[i] + rng.r#gen::<f64>() * bounds.range(i))
                    .collect(),
            );
        }
        let values: Vec<f64> = pack.iter_mut().map(|x| eval.eval_mut(x)).collect();
        let mut leaders = Leaders::from_pack(&pack, &values);
        eval.record_generation();

        let max_iter = c.max_iterations.max(1);
        let mut stall = 0;
        let mut iterations = 0;
        let mut reason = "iteration budget exhausted";

        for it in 0..max_iter {
            iterations = it + 1;
            let a = 2.0 * (1.0 - it as f64 / max_iter as f64);
            let previous = leaders.alpha_value();
            let snapshot = leaders.clone();

            for wolf in pack.iter_mut() {
                for d in 0..dim {
                    let mut sum = 0.0;
                    for (lead, _) in &snapshot.ranks {
                        let big_a = 2.0 * a * rng.r#gen::<f64>() - a;
                        let big_c = 2.0 * rng.r#gen::<f64>();
                        let distance = (big_c * lead[d] - wolf[d]).abs();
                        let pull = (lead[d] - big_a * distance).clamp(bounds.lower[d], bounds.upper[d]);
                        sum += pull;
                    }
                    wolf[d] = sum / 3.0;
                }
                let value = eval.eval_mut(wolf);
                leaders.offer(wolf, value);
            }
            eval.record_generation();

            if stalled(previous, leaders.alpha_value(), c.tolerance) {
                stall += 1;
                if stall >= c.stagnation_window {
                    reason = "stagnation window reached";
                    break;
                }
            } else {
                stall = 0;
            }
        }

        Ok(SearchOutcome::new(iterations, reason))
    }
}

//! Particle swarm optimization with linearly decaying inertia.
//!
//! Velocities are clamped per axis to a fraction of the range. A particle
//! leaving the box is put back on the violated bound and its velocity on that
//! axis is reflected with damping. The run stops early once the global best
//! has not moved (relative change below tolerance) for a whole stagnation
//! window.

use rand::Rng;

use crate::domain::{OptimizerKind, PsoConfig};
use crate::error::AppError;
use crate::optim::rng::make_rng;
use crate::optim::{Evaluator, SearchOutcome, Strategy};

#[derive(Debug, Clone)]
pub struct ParticleSwarm {
    config: PsoConfig,
    seed: Option<u64>,
}

impl ParticleSwarm {
    pub fn new(config: PsoConfig, seed: Option<u64>) -> Self {
        Self { config, seed }
    }
}

/// True when `best` improved on `previous` by less than `tol` (relative).
pub(crate) fn stalled(previous: f64, best: f64, tol: f64) -> bool {
    (previous - best).abs() <= tol * previous.abs().max(1e-12)
}

impl Strategy for ParticleSwarm {
    const KIND: OptimizerKind = OptimizerKind::Pso;

    fn search(&self, eval: &mut Evaluator<'_>, start: &[f64]) -> Result<SearchOutcome, AppError> {
        let c = &self.config;
        let bounds = eval.bounds();
        let dim = eval.dim();
        let n = c.swarm_size.max(2);
        let mut rng = make_rng(self.seed);

        let fraction = if c.velocity_fraction.is_finite() {
            c.velocity_fraction.abs()
        } else {
            PsoConfig::default().velocity_fraction
        };
        let v_max: Vec<f64> = (0..dim).map(|i| fraction * bounds.range(i)).collect();
        let mut positions: Vec<Vec<f64>> = Vec::with_capacity(n);
        positions.push(start.to_vec());
        while positions.len() < n {
            positions.push(
                (0..dim)
                    .map(|i| bounds.lower[i] + rng.r#gen::<f64>() * bounds.range(i))
                    .collect(),
            );
        }
        let mut velocities: Vec<Vec<f64>> = (0..n)
            .map(|_| {
                (0..dim)
                    .map(|i| v_max[i] * (2.0 * rng.r#gen::<f64>() - 1.0))
                    .collect()
            })
            .collect();

        let mut personal = positions.clone();
        let mut personal_value: Vec<f64> = positions.iter_mut().map(|x| eval.eval_mut(x)).collect();
        let mut global = 0;
        for i in 1..n {
            if personal_value[i] < personal_value[global] {
                global = i;
            }
        }
        let mut global_x = personal[global].clone();
        let mut global_value = personal_value[global];
        eval.record_generation();

        let max_iter = c.max_iterations.max(1);
        let mut stall = 0;
        let mut iterations = 0;
        let mut reason = "iteration budget exhausted";

        for it in 0..max_iter {
            iterations = it + 1;
            let progress = if max_iter > 1 {
                it as f64 / (max_iter - 1) as f64
            } else {
                1.0
            };
            let inertia = c.inertia_start - (c.inertia_start - c.inertia_end) * progress;
            let previous = global_value;

            for p in 0..n {
                let (x, v) = (&mut positions[p], &mut velocities[p]);
                for d in 0..dim {
                    let r1: f64 = rng.r#gen();
                    let r2: f64 = rng.r#gen();
                    let mut vd = inertia * v[d]
                        + c.cognitive * r1 * (personal[p][d] - x[d])
                        + c.social * r2 * (global_x[d] - x[d]);
                    vd = vd.clamp(-v_max[d], v_max[d]);
                    let mut xd = x[d] + vd;
                    if xd < bounds.lower[d] {
                        xd = bounds.lower[d];
                        vd *= c.reflection_damping;
                    } else if xd > bounds.upper[d] {
                        xd = bounds.upper[d];
                        vd *= c.reflection_damping;
                    }
                    x[d] = xd;
                    v[d] = vd;
                }
                let value = eval.eval_mut(x);
                if value < personal_value[p] {
                    personal_value[p] = value;
                    personal[p].copy_from_slice(x);
                    if value < global_value {
                        global_value = value;
                        global_x.copy_from_slice(x);
                    }
                }
            }
            eval.record_generation();

            if stalled(previous, global_value, c.tolerance) {
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

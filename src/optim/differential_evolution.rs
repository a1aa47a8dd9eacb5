//! Differential evolution, `rand/1/bin`.
//!
//! Each generation builds, for every member, a mutant `x_r1 + F (x_r2 - x_r3)`
//! from three distinct other members, mixes it with the member by binomial
//! crossover (one axis always taken from the mutant), clips the trial into the
//! box and keeps it when it is no worse. The run stops once the population's
//! objective spread falls below `tolerance * (1 + |best|)`.

use rand::Rng;
use rand::rngs::StdRng;

use crate::domain::{DifferentialEvolutionConfig, OptimizerKind};
use crate::error::AppError;
use crate::optim::rng::make_rng;
use crate::optim::{Evaluator, SearchOutcome, Strategy};

#[derive(Debug, Clone)]
pub struct DifferentialEvolution {
    config: DifferentialEvolutionConfig,
    seed: Option<u64>,
}

impl DifferentialEvolution {
    pub fn new(config: DifferentialEvolutionConfig, seed: Option<u64>) -> Self {
        Self { config, seed }
    }
}

/// Three distinct indices in `0..n`, all different from `skip` (requires `n >= 4`).
fn pick_three(rng: &mut StdRng, n: usize, skip: usize) -> [usize; 3] {
    let mut out = [skip; 3];
    let mut filled = 0;
    while filled < 3 {
        let candidate = rng.gen_range(0..n);
        if candidate != skip && !out[..filled].contains(&candidate) {
            out[filled] = candidate;
            filled += 1;
        }
    }
    out
}

impl Strategy for DifferentialEvolution {
    const KIND: OptimizerKind = OptimizerKind::DifferentialEvolution;

    fn search(&self, eval: &mut Evaluator<'_>, start: &[f64]) -> Result<SearchOutcome, AppError> {
        let c = &self.config;
        let bounds = eval.bounds();
        let dim = eval.dim();
        let n = c.population_size.max(4);
        let mut rng = make_rng(self.seed);

        let mut population: Vec<Vec<f64>> = Vec::with_capacity(n);
        population.push(start.to_vec());
        while population.len() < n {
            population.push(
                (0..dim)
                    .map(|i| bounds.lower[i] + rng.r#gen::<f64>() * bounds.range(i))
                    .collect(),
            );
        }
        let mut fitness: Vec<f64> = population.iter_mut().map(|x| eval.eval_mut(x)).collect();
        eval.record_generation();

        let mut iterations = 0;
        let mut reason = "generation budget exhausted";
        let mut trial = vec![0.0; dim];

        for generation in 0..c.max_generations {
            iterations = generation + 1;
            for i in 0..n {
                let [r1, r2, r3] = pick_three(&mut rng, n, i);
                let forced = rng.gen_range(0..dim);
                for d in 0..dim {
                    trial[d] = if d == forced || rng.r#gen::<f64>() < c.crossover_rate {
                        population[r1][d] + c.scaling_factor * (population[r2][d] - population[r3][d])
                    } else {
                        population[i][d]
                    };
                }
                let value = eval.eval_mut(&mut trial);
                if value <= fitness[i] {
                    population[i].copy_from_slice(&trial);
                    fitness[i] = value;
                }
            }
            eval.record_generation();

            let (lo, hi) = fitness
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &f| (lo.min(f), hi.max(f)));
            if hi - lo <= c.tolerance * (1.0 + lo.abs()) {
                reason = "population converged";
                break;
            }
        }

        Ok(SearchOutcome::new(iterations, reason))
    }
}

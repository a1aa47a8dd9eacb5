//! Bounded derivative-free optimizers.
//!
//! Every strategy implements [`Strategy::search`] against a guarded
//! [`Evaluator`]; the shared [`Optimizer::optimize`] wrapper supplies the
//! common contract:
//!
//! - bounds are validated and the initial guess is clipped (midpoint when absent)
//! - the returned parameters are the best point seen, always inside the bounds
//! - internal failures become `success = false` with a message, never a panic
//! - `success = true` implies a finite objective value
//! - convergence diagnostics are attached to successful runs
//!
//! [`AutoSelect`] runs every concrete strategy and keeps the best success.

pub mod auto_select;
pub mod cmaes;
pub mod diagnostics;
pub mod differential_evolution;
pub mod evaluator;
pub mod grey_wolf;
pub mod grid_gd;
pub mod nelder_mead;
pub mod pso;
pub mod rng;

use std::time::Instant;

use tracing::debug;

use crate::domain::{Bounds, OptimizationResult, OptimizerConfig, OptimizerKind};
use crate::error::AppError;

pub use auto_select::AutoSelect;
pub use cmaes::Cmaes;
pub use differential_evolution::DifferentialEvolution;
pub use evaluator::{Evaluator, INVALID_OBJECTIVE, Objective};
pub use grey_wolf::GreyWolf;
pub use grid_gd::GridSearchGd;
pub use nelder_mead::NelderMead;
pub use pso::ParticleSwarm;

/// How a search loop ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub iterations: usize,
    pub reason: String,
}

impl SearchOutcome {
    pub fn new(iterations: usize, reason: impl Into<String>) -> Self {
        Self {
            iterations,
            reason: reason.into(),
        }
    }
}

/// A single search algorithm over a box.
pub trait Strategy: Send + Sync {
    const KIND: OptimizerKind;

    /// Run the search from `start` (already clipped and evaluated once).
    ///
    /// Implementations evaluate only through `eval` and call
    /// [`Evaluator::record_generation`] once per iteration/generation.
    fn search(&self, eval: &mut Evaluator<'_>, start: &[f64]) -> Result<SearchOutcome, AppError>;
}

/// Public optimizer interface.
pub trait Optimizer: Send + Sync {
    fn kind(&self) -> OptimizerKind;

    fn optimize(
        &self,
        objective: &Objective<'_>,
        bounds: &Bounds,
        initial: Option<&[f64]>,
    ) -> OptimizationResult;
}

impl<S: Strategy> Optimizer for S {
    fn kind(&self) -> OptimizerKind {
        S::KIND
    }

    fn optimize(
        &self,
        objective: &Objective<'_>,
        bounds: &Bounds,
        initial: Option<&[f64]>,
    ) -> OptimizationResult {
        run_strategy(self, objective, bounds, initial)
    }
}

/// Validate bounds and pick the clipped starting point.
pub(crate) fn prepare_start(bounds: &Bounds, initial: Option<&[f64]>) -> Result<Vec<f64>, AppError> {
    bounds.validate()?;
    match initial {
        Some(x) if x.len() != bounds.dim() => Err(AppError::new(
            2,
            format!(
                "Initial guess has {} coordinates, bounds have {}.",
                x.len(),
                bounds.dim()
            ),
        )),
        Some(x) => Ok(bounds.clipped(x)),
        None => Ok(bounds.midpoint()),
    }
}

fn run_strategy<S: Strategy>(
    strategy: &S,
    objective: &Objective<'_>,
    bounds: &Bounds,
    initial: Option<&[f64]>,
) -> OptimizationResult {
    let started = Instant::now();
    let kind = S::KIND;
    let start = match prepare_start(bounds, initial) {
        Ok(x) => x,
        Err(e) => {
            let params = initial.map(<[f64]>::to_vec).unwrap_or_default();
            return OptimizationResult::failed(kind, params, e.message());
        }
    };

    let mut eval = Evaluator::new(objective, bounds, &start);
    eval.eval(&start);
    let outcome = strategy.search(&mut eval, &start);

    let (success, message, iterations) = match outcome {
        Ok(o) if eval.found_valid() => (true, o.reason, o.iterations),
        Ok(o) => {
            let detail = eval
                .last_error()
                .map(|e| format!(" (last error: {e})"))
                .unwrap_or_default();
            (
                false,
                format!("No finite objective value found{detail}."),
                o.iterations,
            )
        }
        Err(e) => (false, e.message().to_string(), eval.history().len()),
    };
    // Diagnose the search's answer; a finite-difference point that beats it becomes the result.
    let diagnostics = success.then(|| {
        let x = eval.best_x().to_vec();
        let fx = eval.best_objective().unwrap_or(f64::NAN);
        diagnostics::diagnose(&mut eval, &x, fx)
    });

    let (best_x, best_value, evaluations, history) = eval.into_parts();
    let elapsed_ms = started.elapsed().as_secs_f64() * 1e3;
    debug!(
        optimizer = kind.display_name(),
        success,
        iterations,
        evaluations,
        value = best_value,
        reason = %message,
        "search finished"
    );

    OptimizationResult {
        optimizer: kind,
        params: best_x,
        objective_value: best_value,
        success,
        message: Some(message),
        iterations,
        evaluations,
        history,
        elapsed_ms,
        diagnostics,
    }
}

/// Build the optimizer for `kind`. `seed` feeds the randomized strategies.
pub fn build_optimizer(
    kind: OptimizerKind,
    config: &OptimizerConfig,
    seed: Option<u64>,
) -> Box<dyn Optimizer> {
    match kind {
        OptimizerKind::GridSearchGd => Box::new(GridSearchGd::new(config.grid.clone())),
        OptimizerKind::Pso => Box::new(ParticleSwarm::new(config.pso.clone(), seed)),
        OptimizerKind::DifferentialEvolution => Box::new(DifferentialEvolution::new(
            config.differential_evolution.clone(),
            seed,
        )),
        OptimizerKind::GreyWolf => Box::new(GreyWolf::new(config.grey_wolf.clone(), seed)),
        OptimizerKind::NelderMead => Box::new(NelderMead::new(config.nelder_mead.clone())),
        OptimizerKind::Cmaes => Box::new(Cmaes::new(config.cmaes.clone(), seed)),
        OptimizerKind::AutoSelect => Box::new(AutoSelect::new(config.clone(), seed)),
    }
}

/// Shared fixtures for the per-strategy tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub const OPTIMUM: [f64; 2] = [1.3, -0.7];

    pub fn quadratic(x: &[f64]) -> Result<f64, AppError> {
        let dx = x[0] - OPTIMUM[0];
        let dy = x[1] - OPTIMUM[1];
        Ok(dx * dx + 2.0 * dy * dy + 0.5 * dx * dy)
    }

    /// Quadratic with a NaN hole and an erroring region.
    pub fn holey(x: &[f64]) -> Result<f64, AppError> {
        if x[0] < -3.0 {
            return Err(AppError::new(4, "outside model domain"));
        }
        if x[1] > 3.0 {
            return Ok(f64::NAN);
        }
        quadratic(x)
    }

    pub fn square() -> Bounds {
        Bounds::new(vec![-5.0, -5.0], vec![5.0, 5.0]).unwrap()
    }

    /// Shared contract checks for one strategy.
    pub fn check_contract(optimizer: &dyn Optimizer, tolerance: f64) {
        let bounds = square();
        let result = optimizer.optimize(&quadratic, &bounds, Some(&[4.0, 4.0]));
        assert!(result.success, "{:?}", result.message);
        assert!(bounds.contains(&result.params));
        assert!(result.objective_value.is_finite());
        assert!((result.params[0] - OPTIMUM[0]).abs() < tolerance, "{:?}", result.params);
        assert!((result.params[1] - OPTIMUM[1]).abs() < tolerance, "{:?}", result.params);
        assert!(!result.history.is_empty());
        assert!(result.history.windows(2).all(|w| w[1] <= w[0]));
        assert!(result.evaluations > result.iterations);
        assert!(result.diagnostics.is_some());

        let holey = optimizer.optimize(&holey, &bounds, Some(&[-2.8, 2.8]));
        assert!(holey.success, "{:?}", holey.message);
        assert!(bounds.contains(&holey.params));
        assert!(holey.objective_value < 1e-2);

        let nothing = optimizer.optimize(&|_: &[f64]| Ok::<f64, AppError>(f64::NAN), &bounds, None);
        assert!(!nothing.success);
        assert!(bounds.contains(&nothing.params));
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn invalid_bounds_fail_without_panicking() {
        let opt = build_optimizer(OptimizerKind::NelderMead, &OptimizerConfig::default(), None);
        let bounds = Bounds {
            lower: vec![1.0],
            upper: vec![0.0],
        };
        let result = opt.optimize(&quadratic, &bounds, None);
        assert!(!result.success);
        assert!(result.message.is_some());
    }

    #[test]
    fn initial_guess_is_clipped() {
        let opt = build_optimizer(OptimizerKind::NelderMead, &OptimizerConfig::default(), None);
        let bounds = Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let result = opt.optimize(&quadratic, &bounds, Some(&[50.0, -50.0]));
        assert!(result.success);
        assert!(bounds.contains(&result.params));
        // Optimum (1.3, -0.7) lies outside: the answer sits on the corner (1, 0).
        assert!((result.params[0] - 1.0).abs() < 1e-3 && result.params[1].abs() < 1e-3);
    }

    #[test]
    fn wrong_guess_length_is_reported() {
        let opt = build_optimizer(OptimizerKind::Pso, &OptimizerConfig::default(), Some(1));
        let result = opt.optimize(&quadratic, &square(), Some(&[1.0]));
        assert!(!result.success);
        assert_eq!(result.optimizer, OptimizerKind::Pso);
    }

    #[test]
    fn reported_value_is_the_best_evaluated() {
        use std::sync::Mutex;

        let seen = Mutex::new(Vec::new());
        let f = |x: &[f64]| {
            let v = (x[0] - 0.3) * (x[0] - 0.3);
            seen.lock().unwrap().push(v);
            Ok::<f64, AppError>(v)
        };
        // A single grid point at 0.5 and no descent: only the diagnostic
        // finite-difference points move toward the optimum.
        let config = crate::domain::GridSearchConfig {
            grid_size: Some(1),
            gd_iterations: 0,
            ..Default::default()
        };
        let bounds = Bounds::new(vec![0.0], vec![1.0]).unwrap();
        let result = GridSearchGd::new(config).optimize(&f, &bounds, None);
        assert!(result.success);

        let min_seen = seen.lock().unwrap().iter().copied().fold(f64::INFINITY, f64::min);
        assert!(min_seen < 0.04);
        assert_eq!(result.objective_value, min_seen);
        assert!(result.params[0] < 0.5);
        assert!(result.diagnostics.is_some());
    }

    #[test]
    fn builder_maps_every_kind() {
        for kind in OptimizerKind::CONCRETE
            .into_iter()
            .chain([OptimizerKind::AutoSelect])
        {
            let opt = build_optimizer(kind, &OptimizerConfig::default(), Some(3));
            assert_eq!(opt.kind(), kind);
        }
    }
}

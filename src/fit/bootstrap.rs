//! Residual-resampling bootstrap around a fitted curve.
//!
//! Each run resamples the fit's residuals with replacement, adds them to the
//! fitted curve (clipped at zero), and refits with a capped Nelder-Mead
//! started from the fitted parameters. A failed refit reuses the fitted
//! curve for that run, so every run contributes. Runs are independent and
//! seeded per run index, which keeps the band reproducible under any
//! scheduling.

use rand::seq::SliceRandom;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{BootstrapBand, EngineConfig, ModelKind, OptimizationResult, TimeSeriesData};
use crate::error::AppError;
use crate::fit::fitter::sse_objective;
use crate::fit::with_pool;
use crate::math::percentile_mut;
use crate::models::{curve, search_setup};
use crate::optim::rng::{child_seed, make_rng};
use crate::optim::{NelderMead, Optimizer};

fn check_percentiles(p: [f64; 2]) -> Result<(), AppError> {
    let [lo, hi] = p;
    if lo.is_finite() && hi.is_finite() && 0.0 <= lo && lo <= hi && hi <= 100.0 {
        Ok(())
    } else {
        Err(AppError::new(
            2,
            format!("Invalid bootstrap percentiles [{lo}, {hi}]; need 0 <= lower <= upper <= 100."),
        ))
    }
}

/// Curve contributed by one run and whether it fell back to `fitted`.
fn run_curve(model: ModelKind, t: &[f64], refit: &OptimizationResult, fitted: &[f64]) -> (Vec<f64>, bool) {
    if refit.success {
        let c = curve(model, t, &refit.params);
        if c.iter().all(|v| v.is_finite()) {
            return (c, false);
        }
    }
    (fitted.to_vec(), true)
}

/// Percentile band over `config.bootstrap.iterations` refits of `model`.
pub fn bootstrap_interval(
    data: &TimeSeriesData,
    model: ModelKind,
    best_params: &[f64],
    config: &EngineConfig,
) -> Result<BootstrapBand, AppError> {
    let bc = &config.bootstrap;
    if bc.iterations == 0 {
        return Err(AppError::new(2, "Bootstrap needs at least one iteration."));
    }
    check_percentiles(bc.percentiles)?;
    if best_params.len() != model.param_count() {
        return Err(AppError::new(
            2,
            format!(
                "{} takes {} parameters, got {}.",
                model.display_name(),
                model.param_count(),
                best_params.len()
            ),
        ));
    }

    let t = data.days();
    let y = data.cumulative_found();
    let fitted = curve(model, &t, best_params);
    if fitted.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(4, "Fitted curve is not finite; cannot bootstrap."));
    }
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(o, f)| o - f).collect();

    let (bounds, _) = search_setup(model, data, &config.heuristics)?;
    let start = bounds.clipped(best_params);
    let refit = NelderMead::capped(&config.optimizer.nelder_mead, bc.refit_max_iterations);
    let base_seed = bc.seed.or(config.optimizer.seed);

    let runs: Vec<(Vec<f64>, bool)> = with_pool(bc.workers, || {
        (0..bc.iterations)
            .into_par_iter()
            .map(|run| {
                let mut rng = make_rng(child_seed(base_seed, run as u64));
                let resampled: Vec<f64> = fitted
                    .iter()
                    .map(|f| (f + residuals.choose(&mut rng).copied().unwrap_or(0.0)).max(0.0))
                    .collect();
                let objective = sse_objective(model, &t, &resampled);
                let result = refit.optimize(&objective, &bounds, Some(start.as_slice()));
                run_curve(model, &t, &result, &fitted)
            })
            .collect()
    })?;

    let fallback_runs = runs.iter().filter(|(_, fell_back)| *fell_back).count();
    if fallback_runs * 2 > runs.len() {
        warn!(
            model = model.display_name(),
            fallback_runs,
            iterations = runs.len(),
            "most bootstrap refits failed; band is narrower than it should be"
        );
    }

    let [p_lo, p_hi] = bc.percentiles;
    let mut lower = Vec::with_capacity(t.len());
    let mut median = Vec::with_capacity(t.len());
    let mut upper = Vec::with_capacity(t.len());
    let mut column = vec![0.0; runs.len()];
    for i in 0..t.len() {
        for (slot, (c, _)) in column.iter_mut().zip(&runs) {
            *slot = c[i];
        }
        let pick = |column: &mut [f64], q: f64| {
            percentile_mut(column, q)
                .map(|v| v.max(0.0))
                .ok_or_else(|| AppError::new(4, "Empty bootstrap column."))
        };
        lower.push(pick(&mut column, p_lo)?);
        median.push(pick(&mut column, 50.0)?);
        upper.push(pick(&mut column, p_hi)?);
    }

    info!(
        model = model.display_name(),
        iterations = runs.len(),
        fallback_runs,
        "bootstrap band computed"
    );
    Ok(BootstrapBand {
        model,
        percentiles: bc.percentiles,
        lower,
        median,
        upper,
        iterations: runs.len(),
        fallback_runs,
    })
}

//! Fitting routine for a single catalog model.
//!
//! Given:
//! - days `t_i = 1..n`
//! - observed cumulative defects `y_i`
//! - a model with data-driven bounds and initial guess
//!
//! we minimize `SSE(p) = Σ (y_i - m(t_i; p))^2` with the chosen optimizer and
//! derive fit statistics, the estimated total and threshold predictions.
//! Failures are recorded on the returned [`FittingResult`], never raised.

use std::time::Instant;

use tracing::{debug, warn};

use crate::domain::{
    EngineConfig, FitQuality, FittingResult, ModelKind, OptimizationResult, OptimizerKind,
    TimeSeriesData,
};
use crate::error::AppError;
use crate::fit::predictions::threshold_predictions;
use crate::math::{aic, bic, r_squared, sum_squared_error};
use crate::models::{asymptote, curve, evaluate, param_names, search_setup};
use crate::optim::build_optimizer;

/// Evaluation day used when a closed-form asymptote is unavailable.
const LARGE_T: f64 = 1e6;

/// SSE objective for `model` against `(t, y)`.
pub fn sse_objective<'a>(
    model: ModelKind,
    t: &'a [f64],
    y: &'a [f64],
) -> impl Fn(&[f64]) -> Result<f64, AppError> + Sync + 'a {
    move |params: &[f64]| {
        let mut sse = 0.0;
        for (&ti, &yi) in t.iter().zip(y) {
            let r = yi - evaluate(model, ti, params);
            sse += r * r;
        }
        Ok::<f64, AppError>(sse)
    }
}

pub fn fit_quality(observed: &[f64], predicted: &[f64], k: usize) -> FitQuality {
    let n = observed.len();
    let sse = sum_squared_error(observed, predicted);
    if !sse.is_finite() || n == 0 {
        return FitQuality::undefined(n);
    }
    FitQuality {
        n,
        sse,
        rmse: (sse / n as f64).sqrt(),
        r_squared: r_squared(observed, predicted),
        aic: aic(n, sse, k),
        bic: bic(n, sse, k),
    }
}

/// Total defects implied by a fitted curve: the closed-form asymptote, or the
/// curve far in the future when that is not finite.
pub fn estimated_total(model: ModelKind, params: &[f64]) -> f64 {
    let total = asymptote(model, params);
    if total.is_finite() && total > 0.0 {
        total
    } else {
        evaluate(model, LARGE_T, params)
    }
}

fn failed(
    model: ModelKind,
    n: usize,
    optimization: OptimizationResult,
    error: String,
    started: Instant,
) -> FittingResult {
    warn!(model = model.display_name(), error = %error, "fit failed");
    FittingResult {
        model,
        category: model.category(),
        display_name: model.display_name().to_string(),
        param_names: param_names(model).iter().map(|s| s.to_string()).collect(),
        params: optimization.params.clone(),
        quality: FitQuality::undefined(n),
        predicted: Vec::new(),
        estimated_total: f64::NAN,
        predictions: Vec::new(),
        optimization,
        success: false,
        error: Some(error),
        elapsed_ms: started.elapsed().as_secs_f64() * 1e3,
    }
}

/// Fit `model` to `data` with `optimizer`.
///
/// `seed` is used as-is for the randomized strategies; batch callers derive
/// one per model.
pub fn fit(
    data: &TimeSeriesData,
    model: ModelKind,
    optimizer: OptimizerKind,
    config: &EngineConfig,
    seed: Option<u64>,
) -> FittingResult {
    let started = Instant::now();
    let n = data.len();
    if let Err(e) = data.validate() {
        let opt = OptimizationResult::failed(optimizer, Vec::new(), e.message());
        return failed(model, n, opt, e.message().to_string(), started);
    }

    let t = data.days();
    let y = data.cumulative_found();
    let (bounds, initial) = match search_setup(model, data, &config.heuristics) {
        Ok(setup) => setup,
        Err(e) => {
            let opt = OptimizationResult::failed(optimizer, Vec::new(), e.message());
            return failed(model, n, opt, e.message().to_string(), started);
        }
    };

    let objective = sse_objective(model, &t, &y);
    let optimization = build_optimizer(optimizer, &config.optimizer, seed).optimize(
        &objective,
        &bounds,
        Some(initial.as_slice()),
    );
    if !optimization.success {
        let error = optimization
            .message
            .clone()
            .unwrap_or_else(|| "optimizer failed".to_string());
        return failed(model, n, optimization, error, started);
    }

    let params = optimization.params.clone();
    let predicted = curve(model, &t, &params);
    let quality = fit_quality(&y, &predicted, model.param_count());
    if !quality.sse.is_finite() {
        return failed(
            model,
            n,
            optimization,
            "fitted curve is not finite on the observed days".to_string(),
            started,
        );
    }
    let total = estimated_total(model, &params);
    if !total.is_finite() {
        return failed(
            model,
            n,
            optimization,
            "estimated total is not finite".to_string(),
            started,
        );
    }

    let predictions = threshold_predictions(
        model,
        &params,
        total,
        data,
        &config.fitting.thresholds,
        config.fitting.horizon_days,
    );
    debug!(
        model = model.display_name(),
        optimizer = optimization.optimizer.display_name(),
        r_squared = quality.r_squared,
        aic = quality.aic,
        total,
        "model fitted"
    );

    FittingResult {
        model,
        category: model.category(),
        display_name: model.display_name().to_string(),
        param_names: param_names(model).iter().map(|s| s.to_string()).collect(),
        params,
        quality,
        predicted,
        estimated_total: total,
        predictions,
        optimization,
        success: true,
        error: None,
        elapsed_ms: started.elapsed().as_secs_f64() * 1e3,
    }
}

//! Batch fitting and model selection by AIC.
//!
//! Each requested model is fitted independently (in parallel) and computes:
//! - SSE / RMSE / R²
//! - AIC = n * ln(SSE/n) + 2k (BIC is reported alongside)
//!
//! Selection rules:
//! 1. Exclude failed fits (recorded with their reason)
//! 2. Choose the model with minimum AIC
//! 3. Ties keep the earliest entry, i.e. catalog order for a `ModelSet`

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{EngineConfig, FittingResult, ModelKind, ModelSet, OptimizerKind, TimeSeriesData};
use crate::error::AppError;
use crate::fit::fitter::fit;
use crate::fit::with_pool;
use crate::optim::rng::child_seed;

/// Output of fitting + selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSelection {
    pub best: FittingResult,
    /// Every attempted fit, in request order.
    pub fits: Vec<FittingResult>,
    /// Models that failed to fit and why.
    pub failed: Vec<(ModelKind, String)>,
}

impl FitSelection {
    pub fn successes(&self) -> impl Iterator<Item = &FittingResult> {
        self.fits.iter().filter(|f| f.success)
    }
}

/// Fit every model in `models`, preserving order.
///
/// Each model gets a seed derived from the configured base seed and its
/// catalog position, so results do not depend on which other models are fitted.
pub fn fit_all(
    data: &TimeSeriesData,
    models: &[ModelKind],
    optimizer: OptimizerKind,
    config: &EngineConfig,
) -> Result<Vec<FittingResult>, AppError> {
    data.validate()?;
    let base_seed = config.optimizer.seed;
    with_pool(config.fitting.workers, || {
        models
            .par_iter()
            .map(|&model| fit(data, model, optimizer, config, child_seed(base_seed, model as u64)))
            .collect()
    })
}

/// Minimum-AIC successful fit; the first one wins ties.
pub fn select_best(results: &[FittingResult]) -> Option<&FittingResult> {
    let mut best: Option<&FittingResult> = None;
    for r in results {
        if !r.success || !r.quality.aic.is_finite() {
            continue;
        }
        match best {
            Some(b) if b.quality.aic <= r.quality.aic => {}
            _ => best = Some(r),
        }
    }
    best
}

/// Fit the model set and select the best model.
///
/// Fails with exit code 3 when no model could be fitted.
pub fn fit_and_select(
    data: &TimeSeriesData,
    models: &ModelSet,
    optimizer: OptimizerKind,
    config: &EngineConfig,
) -> Result<FitSelection, AppError> {
    let kinds = models.models();
    if kinds.is_empty() {
        return Err(AppError::new(2, "Model set is empty."));
    }
    info!(
        project = %data.project_name,
        days = data.len(),
        models = kinds.len(),
        optimizer = optimizer.display_name(),
        "fitting model set"
    );

    let fits = fit_all(data, &kinds, optimizer, config)?;
    let failed: Vec<(ModelKind, String)> = fits
        .iter()
        .filter(|f| !f.success)
        .map(|f| {
            (
                f.model,
                f.error.clone().unwrap_or_else(|| "unknown failure".to_string()),
            )
        })
        .collect();

    let Some(best) = select_best(&fits).cloned() else {
        let reasons: Vec<String> = failed
            .iter()
            .map(|(m, e)| format!("{}: {e}", m.display_name()))
            .collect();
        return Err(AppError::new(
            3,
            format!("No model could be fitted. {}", reasons.join("; ")),
        ));
    };
    if !failed.is_empty() {
        warn!(failed = failed.len(), "some models failed to fit");
    }
    info!(
        best = best.display_name.as_str(),
        aic = best.quality.aic,
        total = best.estimated_total,
        "model selected"
    );

    Ok(FitSelection { best, fits, failed })
}

//! Shared "fit pipeline" used by both the `fit` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! series -> fit model set -> select best -> optional bootstrap band
//!
//! The commands can then focus on where the series comes from and on
//! presentation (printing, plotting, exporting).

use tracing::info;

use crate::domain::{BootstrapBand, EngineConfig, ModelSet, OptimizerKind, TimeSeriesData};
use crate::error::AppError;
use crate::fit::{FitSelection, bootstrap_interval, fit_and_select};

/// What to fit and whether to bootstrap the winner.
#[derive(Debug, Clone)]
pub struct FitRequest {
    pub models: ModelSet,
    pub optimizer: OptimizerKind,
    pub bootstrap: bool,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub selection: FitSelection,
    pub band: Option<BootstrapBand>,
}

pub fn run_fit(
    data: &TimeSeriesData,
    request: &FitRequest,
    config: &EngineConfig,
) -> Result<RunOutput, AppError> {
    let selection = fit_and_select(data, &request.models, request.optimizer, config)?;

    let band = if request.bootstrap {
        let best = &selection.best;
        info!(
            model = best.model.display_name(),
            iterations = config.bootstrap.iterations,
            "bootstrapping recommended model"
        );
        Some(bootstrap_interval(data, best.model, &best.params, config)?)
    } else {
        None
    };

    Ok(RunOutput { selection, band })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SyntheticSpec, generate_series};
    use crate::domain::ModelKind;

    #[test]
    fn pipeline_fits_and_bootstraps_synthetic_data() {
        let data = generate_series(&SyntheticSpec::new(ModelKind::Exponential, 11)).unwrap();
        let mut config = EngineConfig::default();
        config.optimizer.seed = Some(3);
        config.bootstrap.iterations = 30;
        let request = FitRequest {
            models: ModelSet::basic(),
            optimizer: OptimizerKind::NelderMead,
            bootstrap: true,
        };
        let out = run_fit(&data, &request, &config).unwrap();
        assert!(out.selection.best.quality.r_squared > 0.95);
        let band = out.band.unwrap();
        assert_eq!(band.model, out.selection.best.model);
        assert_eq!(band.median.len(), data.len());
    }

    #[test]
    fn no_band_unless_requested() {
        let data = generate_series(&SyntheticSpec::new(ModelKind::Logistic, 2)).unwrap();
        let request = FitRequest {
            models: ModelSet::basic(),
            optimizer: OptimizerKind::NelderMead,
            bootstrap: false,
        };
        let out = run_fit(&data, &request, &EngineConfig::default()).unwrap();
        assert!(out.band.is_none());
    }
}

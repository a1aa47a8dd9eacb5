//! Catalog dispatch.
//!
//! Every catalog entry exposes the same primitive operations:
//! - evaluate `m(t)` for a parameter vector (for residuals/plots/predictions)
//! - data-driven search bounds and initial guess (for the optimizer)
//! - the closed-form asymptote (the estimated total defect count)
//!
//! The per-family formulas live in the sibling modules; this file only routes.

use crate::domain::{Bounds, HeuristicsConfig, ModelCategory, ModelKind, TimeSeriesData};
use crate::error::AppError;
use crate::models::heuristics::DataSummary;
use crate::models::{basic, change_point, coverage, effort, imperfect};

/// Evaluate `m(t)`.
///
/// Returns NaN when `params` has the wrong length, so a malformed vector
/// surfaces as a non-finite objective instead of a panic.
pub fn evaluate(model: ModelKind, t: f64, params: &[f64]) -> f64 {
    if params.len() != model.param_count() {
        return f64::NAN;
    }
    match model {
        ModelKind::Exponential => basic::exponential(t, params),
        ModelKind::DelayedSShaped => basic::delayed_s_shaped(t, params),
        ModelKind::Gompertz => basic::gompertz(t, params),
        ModelKind::ModifiedGompertz => basic::modified_gompertz(t, params),
        ModelKind::Logistic => basic::logistic(t, params),
        ModelKind::ImperfectExponential => imperfect::exponential(t, params),
        ModelKind::ImperfectDelayedS => imperfect::delayed_s(t, params),
        ModelKind::ImperfectInflection => imperfect::inflection(t, params),
        ModelKind::ChangePointExponential => change_point::exponential(t, params),
        ModelKind::TefWeibull => effort::tef_weibull(t, params),
        ModelKind::TefLogistic => effort::tef_logistic(t, params),
        ModelKind::FreInflection => effort::fre_inflection(t, params),
        ModelKind::CoverageWeibull => coverage::weibull(t, params),
        ModelKind::CoverageLogistic => coverage::logistic(t, params),
        ModelKind::CoverageGompertz => coverage::gompertz(t, params),
    }
}

/// Evaluate the curve at every day in `days`.
pub fn curve(model: ModelKind, days: &[f64], params: &[f64]) -> Vec<f64> {
    days.iter().map(|&t| evaluate(model, t, params)).collect()
}

pub fn param_names(model: ModelKind) -> &'static [&'static str] {
    match model {
        ModelKind::Exponential | ModelKind::DelayedSShaped => &["a", "b"],
        ModelKind::Gompertz | ModelKind::Logistic => &["a", "b", "c"],
        ModelKind::ModifiedGompertz => &["a", "b", "c", "d"],
        ModelKind::ImperfectExponential | ModelKind::ImperfectDelayedS => &["a", "b", "p"],
        ModelKind::ImperfectInflection => &["a", "b", "beta", "p"],
        ModelKind::ChangePointExponential => &["a", "b1", "b2", "tau"],
        ModelKind::TefWeibull => &["a", "r", "beta", "kappa"],
        ModelKind::TefLogistic => &["a", "r", "alpha", "A"],
        ModelKind::FreInflection => &["a", "b", "alpha", "p", "beta"],
        ModelKind::CoverageWeibull => &["a", "b", "k"],
        ModelKind::CoverageLogistic | ModelKind::CoverageGompertz => &["a", "b", "beta"],
    }
}

type BoundsFn = fn(ModelKind, &DataSummary, &HeuristicsConfig) -> (Vec<f64>, Vec<f64>);
type InitialFn = fn(ModelKind, &DataSummary, &HeuristicsConfig) -> Vec<f64>;
type AsymptoteFn = fn(ModelKind, &[f64]) -> f64;

fn family(model: ModelKind) -> (BoundsFn, InitialFn, AsymptoteFn) {
    match model.category() {
        ModelCategory::Basic => (basic::bounds, basic::initial, basic::asymptote),
        ModelCategory::ImperfectDebug => (imperfect::bounds, imperfect::initial, imperfect::asymptote),
        ModelCategory::ChangePoint => (change_point::bounds, change_point::initial, change_point::asymptote),
        ModelCategory::Tef | ModelCategory::Fre => (effort::bounds, effort::initial, effort::asymptote),
        ModelCategory::Coverage => (coverage::bounds, coverage::initial, coverage::asymptote),
    }
}

/// Search box derived from the observed series.
pub fn bounds(model: ModelKind, summary: &DataSummary, h: &HeuristicsConfig) -> Result<Bounds, AppError> {
    let (lower, upper) = (family(model).0)(model, summary, h);
    Bounds::new(lower, upper).map_err(|e| {
        AppError::new(
            e.exit_code(),
            format!("{}: {}", model.display_name(), e.message()),
        )
    })
}

/// Data-driven starting point, clipped into [`bounds`].
pub fn initial_parameters(model: ModelKind, summary: &DataSummary, h: &HeuristicsConfig) -> Vec<f64> {
    (family(model).1)(model, summary, h)
}

/// Total defects as `t -> infinity`; NaN on a malformed parameter vector.
pub fn asymptote(model: ModelKind, params: &[f64]) -> f64 {
    if params.len() != model.param_count() {
        return f64::NAN;
    }
    (family(model).2)(model, params)
}

/// Convenience: summary + bounds + initial guess for one series.
pub fn search_setup(
    model: ModelKind,
    data: &TimeSeriesData,
    h: &HeuristicsConfig,
) -> Result<(Bounds, Vec<f64>), AppError> {
    let summary = DataSummary::from_data(data);
    let bounds = bounds(model, &summary, h)?;
    let initial = bounds.clipped(&initial_parameters(model, &summary, h));
    Ok((bounds, initial))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plateau() -> TimeSeriesData {
        TimeSeriesData::from_cumulative(
            "p",
            &[8.0, 20.0, 35.0, 45.0, 52.0, 58.0, 62.0, 64.0, 65.0, 65.0],
        )
        .unwrap()
    }

    #[test]
    fn wrong_length_yields_nan() {
        assert!(evaluate(ModelKind::Exponential, 1.0, &[1.0]).is_nan());
        assert!(asymptote(ModelKind::Gompertz, &[1.0, 2.0]).is_nan());
    }

    #[test]
    fn names_match_param_count() {
        for model in ModelKind::ALL {
            assert_eq!(param_names(model).len(), model.param_count(), "{model:?}");
        }
    }

    #[test]
    fn every_model_has_valid_setup_and_finite_start() {
        let data = plateau();
        let h = HeuristicsConfig::default();
        for model in ModelKind::ALL {
            let (bounds, x0) = search_setup(model, &data, &h).unwrap();
            assert_eq!(bounds.dim(), model.param_count());
            assert!(bounds.contains(&x0));
            let y = curve(model, &data.days(), &x0);
            assert!(y.iter().all(|v| v.is_finite()), "{model:?}: {y:?}");
            assert!(asymptote(model, &x0).is_finite());
        }
    }

    #[test]
    fn curves_are_non_decreasing_at_start() {
        let data = plateau();
        let h = HeuristicsConfig::default();
        let days: Vec<f64> = (1..=60).map(|d| d as f64).collect();
        for model in ModelKind::ALL {
            let (_, x0) = search_setup(model, &data, &h).unwrap();
            let y = curve(model, &days, &x0);
            assert!(y.windows(2).all(|w| w[1] >= w[0] - 1e-9), "{model:?}");
        }
    }
}

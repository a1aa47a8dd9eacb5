//! Synthetic defect-discovery series drawn from a catalog model.
//!
//! The expected daily count is the increment of the model curve,
//! `m(i) - m(i - 1)`. Observed counts add Gaussian noise scaled by the square
//! root of that increment (a Poisson-like spread), then round and floor at
//! zero so the cumulative series never decreases. Effort columns are filled
//! with a planned 8 units per day and an actual effort that ramps up and
//! down over the campaign, so the effort-driven models have something to read.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DailyRecord, ModelKind, TimeSeriesData};
use crate::error::AppError;
use crate::models::{evaluate, param_names};

const PLANNED_EFFORT: f64 = 8.0;

/// Parameters of one synthetic campaign.
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub model: ModelKind,
    pub params: Vec<f64>,
    pub days: usize,
    /// Multiplier on the per-day noise standard deviation; `0` gives the exact
    /// rounded curve.
    pub noise: f64,
    pub seed: u64,
    pub start_date: Option<NaiveDate>,
}

impl SyntheticSpec {
    /// A 40-day campaign with the model's default parameters.
    pub fn new(model: ModelKind, seed: u64) -> Self {
        Self {
            model,
            params: default_params(model),
            days: 40,
            noise: 1.0,
            seed,
            start_date: None,
        }
    }
}

/// Parameters that give a plausible curve over a 30-60 day campaign.
pub fn default_params(model: ModelKind) -> Vec<f64> {
    match model {
        ModelKind::Exponential => vec![120.0, 0.08],
        ModelKind::DelayedSShaped => vec![120.0, 0.15],
        ModelKind::Gompertz => vec![120.0, 0.15, 5.0],
        ModelKind::ModifiedGompertz => vec![110.0, 0.15, 5.0, 5.0],
        ModelKind::Logistic => vec![120.0, 0.2, 30.0],
        ModelKind::ImperfectExponential => vec![100.0, 0.08, 0.1],
        ModelKind::ImperfectDelayedS => vec![100.0, 0.15, 0.1],
        ModelKind::ImperfectInflection => vec![100.0, 0.12, 3.0, 0.1],
        ModelKind::ChangePointExponential => vec![120.0, 0.04, 0.12, 15.0],
        ModelKind::TefWeibull => vec![140.0, 3.0, 0.01, 1.5],
        ModelKind::TefLogistic => vec![140.0, 3.0, 0.15, 20.0],
        ModelKind::FreInflection => vec![110.0, 0.12, 2.0, 0.95, 0.05],
        ModelKind::CoverageWeibull => vec![120.0, 0.06, 1.5],
        ModelKind::CoverageLogistic => vec![120.0, 0.15, 10.0],
        ModelKind::CoverageGompertz => vec![120.0, 0.12, 5.0],
    }
}

pub fn generate_series(spec: &SyntheticSpec) -> Result<TimeSeriesData, AppError> {
    if spec.days == 0 {
        return Err(AppError::new(2, "Synthetic series needs at least one day."));
    }
    if !(spec.noise.is_finite() && spec.noise >= 0.0) {
        return Err(AppError::new(2, "Noise level must be finite and >= 0."));
    }
    if spec.params.len() != spec.model.param_count() {
        return Err(AppError::new(
            2,
            format!(
                "{} expects parameters [{}], got {} values.",
                spec.model.display_name(),
                param_names(spec.model).join(", "),
                spec.params.len()
            ),
        ));
    }

    let mut rng = StdRng::seed_from_u64(series_seed(spec));
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut records = Vec::with_capacity(spec.days);
    let mut prev_level = evaluate(spec.model, 0.0, &spec.params);
    let mut backlog = 0.0;
    for day in 1..=spec.days {
        let level = evaluate(spec.model, day as f64, &spec.params);
        let expected = level - prev_level;
        if !expected.is_finite() {
            return Err(AppError::new(
                4,
                format!("{} is not finite at day {day}.", spec.model.display_name()),
            ));
        }
        prev_level = level;

        let sd = spec.noise * expected.max(1.0).sqrt();
        let z: f64 = normal.sample(&mut rng);
        let found = (expected + sd * z).round().max(0.0);

        // Fixes trail discovery: roughly 70% of the open backlog is closed per day.
        backlog += found;
        let fixed = (0.7 * backlog).floor();
        backlog -= fixed;

        let phase = day as f64 / spec.days as f64;
        let ramp = (std::f64::consts::PI * phase).sin();
        let jitter: f64 = rng.gen_range(-0.1..=0.1);
        let actual_effort = (PLANNED_EFFORT * (0.5 + 0.7 * ramp + jitter)).max(0.0);

        let date = spec
            .start_date
            .and_then(|s| s.checked_add_signed(Duration::days(day as i64 - 1)));
        records.push(DailyRecord {
            date,
            planned_effort: PLANNED_EFFORT,
            actual_effort,
            defects_found: found,
            defects_fixed: fixed,
        });
    }

    let mut data = TimeSeriesData::new(
        format!("synthetic-{}", spec.model.display_name()),
        records,
    )?;
    data.start_date = spec.start_date;
    Ok(data)
}

fn series_seed(spec: &SyntheticSpec) -> u64 {
    let mut hasher = DefaultHasher::new();
    spec.model.hash(&mut hasher);
    for p in &spec.params {
        p.to_bits().hash(&mut hasher);
    }
    spec.days.hash(&mut hasher);
    spec.noise.to_bits().hash(&mut hasher);
    spec.seed.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_model_has_usable_defaults() {
        for model in ModelKind::ALL {
            let data = generate_series(&SyntheticSpec::new(model, 1)).unwrap();
            assert_eq!(data.len(), 40);
            let cum = data.cumulative_found();
            assert!(cum.windows(2).all(|w| w[0] <= w[1]));
            assert!(*cum.last().unwrap() > 20.0, "{model:?}: {:?}", cum.last());
            assert!(data.cumulative_actual_effort().is_some());
        }
    }

    #[test]
    fn same_seed_same_series() {
        let spec = SyntheticSpec::new(ModelKind::DelayedSShaped, 7);
        assert_eq!(generate_series(&spec).unwrap(), generate_series(&spec).unwrap());
        let other = SyntheticSpec::new(ModelKind::DelayedSShaped, 8);
        assert_ne!(
            generate_series(&spec).unwrap().records,
            generate_series(&other).unwrap().records
        );
    }

    #[test]
    fn noiseless_series_tracks_the_curve() {
        let mut spec = SyntheticSpec::new(ModelKind::Exponential, 3);
        spec.noise = 0.0;
        spec.days = 30;
        let data = generate_series(&spec).unwrap();
        let cum = data.cumulative_found();
        for (i, c) in cum.iter().enumerate() {
            let expected = 120.0 * (1.0 - (-0.08 * (i + 1) as f64).exp());
            // Rounding error accumulates by at most half a defect per day.
            assert!((c - expected).abs() <= 0.5 * (i + 1) as f64);
        }
    }

    #[test]
    fn dates_follow_start_date() {
        let mut spec = SyntheticSpec::new(ModelKind::Logistic, 2);
        spec.start_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        spec.days = 5;
        let data = generate_series(&spec).unwrap();
        assert_eq!(data.records[4].date, NaiveDate::from_ymd_opt(2025, 3, 5));
        assert_eq!(data.date_for_day(10), NaiveDate::from_ymd_opt(2025, 3, 10));
    }

    #[test]
    fn bad_specs_are_rejected() {
        let mut spec = SyntheticSpec::new(ModelKind::Gompertz, 1);
        spec.params.pop();
        assert_eq!(generate_series(&spec).unwrap_err().exit_code(), 2);
        let mut spec = SyntheticSpec::new(ModelKind::Gompertz, 1);
        spec.days = 0;
        assert!(generate_series(&spec).is_err());
    }
}

//! Threshold predictions: when does the fitted curve reach a share of the
//! estimated total?
//!
//! Days are 1-based like the observations. The scan is over whole days:
//!
//! - if the curve already meets the target on an observed day, the first such
//!   day is reported as `AlreadyReached`
//! - otherwise days after the last observation are scanned up to the horizon
//! - a target never met within the horizon is `Unreachable`

use crate::domain::{ModelKind, ThresholdOutcome, ThresholdPrediction, TimeSeriesData};
use crate::models::evaluate;

pub fn threshold_predictions(
    model: ModelKind,
    params: &[f64],
    estimated_total: f64,
    data: &TimeSeriesData,
    thresholds: &[f64],
    horizon_days: u32,
) -> Vec<ThresholdPrediction> {
    let last_day = data.len() as u32;
    thresholds
        .iter()
        .map(|&threshold| {
            let target = threshold * estimated_total;
            let outcome = if !target.is_finite() {
                ThresholdOutcome::Unreachable
            } else {
                first_day_reaching(model, params, target, 1, last_day)
                    .map(|day| ThresholdOutcome::AlreadyReached { day })
                    .or_else(|| {
                        first_day_reaching(
                            model,
                            params,
                            target,
                            last_day + 1,
                            last_day.saturating_add(horizon_days),
                        )
                        .map(|day| ThresholdOutcome::Reached {
                            day,
                            date: data.date_for_day(day),
                        })
                    })
                    .unwrap_or(ThresholdOutcome::Unreachable)
            };
            ThresholdPrediction { threshold, outcome }
        })
        .collect()
}

fn first_day_reaching(model: ModelKind, params: &[f64], target: f64, from: u32, to: u32) -> Option<u32> {
    (from..=to).find(|&day| evaluate(model, f64::from(day), params) >= target)
}

//! Reporting utilities: model ranking and formatted terminal output.

pub mod format;

pub use format::*;

use std::cmp::Ordering;

use crate::domain::{FittingResult, ThresholdOutcome, ThresholdPrediction};
use crate::fit::FitSelection;

/// Successful fits by ascending AIC, failed fits after them in request order.
///
/// The sort is stable, so equal AIC keeps catalog order like `select_best`.
pub fn rank_by_aic(selection: &FitSelection) -> Vec<&FittingResult> {
    let mut ok: Vec<&FittingResult> = selection.successes().collect();
    ok.sort_by(|a, b| a.quality.aic.partial_cmp(&b.quality.aic).unwrap_or(Ordering::Equal));
    ok.extend(selection.fits.iter().filter(|f| !f.success));
    ok
}

/// Short label for a threshold outcome, e.g. `day 34 (2025-02-03)`.
pub fn outcome_label(prediction: &ThresholdPrediction) -> String {
    match &prediction.outcome {
        ThresholdOutcome::AlreadyReached { day } => format!("reached d{day}"),
        ThresholdOutcome::Reached { day, date: Some(date) } => format!("day {day} ({date})"),
        ThresholdOutcome::Reached { day, date: None } => format!("day {day}"),
        ThresholdOutcome::Unreachable => "not reached".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn outcome_labels() {
        let p = |outcome| ThresholdPrediction { threshold: 0.9, outcome };
        assert_eq!(outcome_label(&p(ThresholdOutcome::AlreadyReached { day: 4 })), "reached d4");
        assert_eq!(
            outcome_label(&p(ThresholdOutcome::Reached {
                day: 34,
                date: NaiveDate::from_ymd_opt(2025, 2, 3),
            })),
            "day 34 (2025-02-03)"
        );
        assert_eq!(outcome_label(&p(ThresholdOutcome::Reached { day: 34, date: None })), "day 34");
        assert_eq!(outcome_label(&p(ThresholdOutcome::Unreachable)), "not reached");
    }
}

//! Guarded objective evaluation shared by every strategy.
//!
//! The evaluator owns the per-run bookkeeping:
//! - every point is clipped into the bounds before the objective sees it
//! - NaN, infinite and `Err` outcomes are folded into [`INVALID_OBJECTIVE`];
//!   validity is tracked separately, so a genuine value at or above the
//!   sentinel is still reported as found
//! - every call is counted (including finite-difference probes)
//! - the best `(x, f(x))` seen so far is tracked, so the reported optimum can
//!   never be worse than any evaluated point
//! - [`Evaluator::record_generation`] appends the best-so-far value, which keeps
//!   the convergence history non-increasing

use crate::domain::Bounds;
use crate::error::AppError;

/// Objective signature. An `Err` marks an evaluation that could not be computed.
pub type Objective<'a> = dyn Fn(&[f64]) -> Result<f64, AppError> + Sync + 'a;

/// Finite stand-in for invalid evaluations. Strategies see finite values
/// capped at this, so an invalid point never ranks below a valid one.
pub const INVALID_OBJECTIVE: f64 = 1e20;

pub struct Evaluator<'a> {
    objective: &'a Objective<'a>,
    bounds: &'a Bounds,
    evaluations: usize,
    best_x: Vec<f64>,
    best_value: f64,
    /// Uncapped objective at `best_x`, when that point was valid.
    best_raw: Option<f64>,
    history: Vec<f64>,
    last_error: Option<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(objective: &'a Objective<'a>, bounds: &'a Bounds, start: &[f64]) -> Self {
        Self {
            objective,
            bounds,
            evaluations: 0,
            best_x: bounds.clipped(start),
            best_value: f64::INFINITY,
            best_raw: None,
            history: Vec::new(),
            last_error: None,
        }
    }

    pub fn bounds(&self) -> &'a Bounds {
        self.bounds
    }

    pub fn dim(&self) -> usize {
        self.bounds.dim()
    }

    /// Clip `x` in place, then evaluate it.
    pub fn eval_mut(&mut self, x: &mut [f64]) -> f64 {
        self.bounds.clip(x);
        self.guarded(x)
    }

    /// Evaluate a clipped copy of `x`.
    pub fn eval(&mut self, x: &[f64]) -> f64 {
        let x = self.bounds.clipped(x);
        self.guarded(&x)
    }

    fn guarded(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        let raw = match (self.objective)(x) {
            Ok(v) if v.is_finite() => Some(v),
            Ok(_) => None,
            Err(e) => {
                self.last_error = Some(e.message().to_string());
                None
            }
        };
        let value = raw.map_or(INVALID_OBJECTIVE, |v| v.min(INVALID_OBJECTIVE));
        let improves = match (raw, self.best_raw) {
            (Some(v), Some(best)) => v < best,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => value < self.best_value,
        };
        if improves {
            self.best_value = value;
            self.best_raw = raw;
            self.best_x.clear();
            self.best_x.extend_from_slice(x);
        }
        value
    }

    /// Close one iteration/generation: append the best value seen so far.
    pub fn record_generation(&mut self) {
        self.history.push(self.best_value);
    }

    pub fn best_value(&self) -> f64 {
        self.best_value
    }

    pub fn best_x(&self) -> &[f64] {
        &self.best_x
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Whether the objective returned a finite value at any point.
    pub fn found_valid(&self) -> bool {
        self.best_raw.is_some()
    }

    /// Uncapped objective at [`Evaluator::best_x`]; `None` until a valid point is seen.
    pub fn best_objective(&self) -> Option<f64> {
        self.best_raw
    }

    /// Message of the most recent `Err` returned by the objective.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Best point, its uncapped value (NaN when nothing valid was seen),
    /// evaluation count and history.
    pub(crate) fn into_parts(self) -> (Vec<f64>, f64, usize, Vec<f64>) {
        let value = self.best_raw.unwrap_or(f64::NAN);
        (self.best_x, value, self.evaluations, self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_counts_and_tracks_best() {
        let bounds = Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let f = |x: &[f64]| Ok::<_, AppError>(x[0] + x[1]);
        let mut eval = Evaluator::new(&f, &bounds, &[0.5, 0.5]);
        assert_eq!(eval.eval(&[2.0, 3.0]), 2.0);
        let mut x = vec![-1.0, 0.25];
        assert_eq!(eval.eval_mut(&mut x), 0.25);
        assert_eq!(x, vec![0.0, 0.25]);
        eval.record_generation();
        assert_eq!(eval.evaluations(), 2);
        assert_eq!(eval.best_x(), &[0.0, 0.25]);
        assert_eq!(eval.history(), &[0.25]);
    }

    #[test]
    fn invalid_outcomes_become_sentinel() {
        let bounds = Bounds::new(vec![-1.0], vec![1.0]).unwrap();
        let f = |x: &[f64]| {
            if x[0] < 0.0 {
                Err(AppError::new(4, "negative"))
            } else if x[0] == 0.0 {
                Ok(f64::NAN)
            } else {
                Ok(f64::INFINITY)
            }
        };
        let mut eval = Evaluator::new(&f, &bounds, &[0.0]);
        assert_eq!(eval.eval(&[-0.5]), INVALID_OBJECTIVE);
        assert_eq!(eval.eval(&[0.0]), INVALID_OBJECTIVE);
        assert_eq!(eval.eval(&[0.5]), INVALID_OBJECTIVE);
        assert!(!eval.found_valid());
        assert_eq!(eval.last_error(), Some("negative"));
    }

    #[test]
    fn huge_finite_values_still_count_as_valid() {
        let bounds = Bounds::new(vec![0.0], vec![2.0]).unwrap();
        let f = |x: &[f64]| {
            if x[0] < 1.0 {
                Ok::<f64, AppError>(f64::NAN)
            } else {
                Ok(1e25 * x[0])
            }
        };
        let mut eval = Evaluator::new(&f, &bounds, &[0.0]);
        assert_eq!(eval.eval(&[0.5]), INVALID_OBJECTIVE);
        assert_eq!(eval.eval(&[1.5]), INVALID_OBJECTIVE);
        assert!(eval.found_valid());
        assert_eq!(eval.best_x(), &[1.5]);
        eval.eval(&[1.2]);
        assert_eq!(eval.best_x(), &[1.2]);
        assert_eq!(eval.best_objective(), Some(1.2e25));
        let (_, value, evaluations, _) = eval.into_parts();
        assert_eq!(value, 1.2e25);
        assert_eq!(evaluations, 3);
    }
}

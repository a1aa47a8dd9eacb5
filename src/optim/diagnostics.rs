//! Post-hoc convergence checks on an optimizer's answer.
//!
//! - projected central-difference gradient at the solution, in unit-box
//!   coordinates (components pushing against an active bound are dropped)
//! - which coordinates sit on a bound
//! - how much the best value still moved over the tail of the history
//!
//! The probes go through the run's evaluator, so they are counted.

use crate::domain::{ConvergenceClass, ConvergenceDiagnostics};
use crate::optim::evaluator::Evaluator;

const FD_STEP: f64 = 1e-5;
/// A coordinate within this share of its range from a bound counts as on it.
const BOUND_TOLERANCE: f64 = 1e-6;
const TAIL: usize = 10;

pub fn diagnose(eval: &mut Evaluator<'_>, x: &[f64], fx: f64) -> ConvergenceDiagnostics {
    let bounds = eval.bounds();
    let dim = x.len();
    let mut at_lower = vec![false; dim];
    let mut at_upper = vec![false; dim];
    let mut grad_sq = 0.0;

    for i in 0..dim {
        let range = bounds.range(i);
        if range <= 0.0 {
            at_lower[i] = true;
            at_upper[i] = true;
            continue;
        }
        at_lower[i] = x[i] - bounds.lower[i] <= BOUND_TOLERANCE * range;
        at_upper[i] = bounds.upper[i] - x[i] <= BOUND_TOLERANCE * range;

        let mut probe = x.to_vec();
        probe[i] = (x[i] + FD_STEP * range).min(bounds.upper[i]);
        let hi = probe[i];
        let f_hi = eval.eval(&probe);
        probe[i] = (x[i] - FD_STEP * range).max(bounds.lower[i]);
        let lo = probe[i];
        let f_lo = eval.eval(&probe);
        let g = (f_hi - f_lo) / ((hi - lo) / range);

        let pushes_out = (at_lower[i] && g > 0.0) || (at_upper[i] && g < 0.0);
        if g.is_finite() && !pushes_out {
            grad_sq += g * g;
        }
    }

    let gradient_norm = grad_sq.sqrt();
    let change_rate = tail_change_rate(eval.history());
    let class = classify(fx, gradient_norm, change_rate, &at_lower, &at_upper);
    ConvergenceDiagnostics {
        gradient_norm,
        at_lower,
        at_upper,
        change_rate,
        class,
    }
}

/// Relative drop of the best value over the last few history entries.
pub fn tail_change_rate(history: &[f64]) -> f64 {
    let n = history.len();
    if n < 2 {
        return 0.0;
    }
    let w = TAIL.min(n - 1);
    let (then, now) = (history[n - 1 - w], history[n - 1]);
    let drop = then - now;
    if drop <= 0.0 {
        0.0
    } else {
        drop / then.abs().max(1e-12)
    }
}

fn classify(
    fx: f64,
    gradient_norm: f64,
    change_rate: f64,
    at_lower: &[bool],
    at_upper: &[bool],
) -> ConvergenceClass {
    if !fx.is_finite() || !gradient_norm.is_finite() {
        return ConvergenceClass::Poor;
    }
    let relative_grad = gradient_norm / (1.0 + fx.abs());
    let on_bound = at_lower.iter().chain(at_upper).any(|&b| b);
    let settled = change_rate < 1e-3;
    match (relative_grad, on_bound, settled) {
        (g, false, true) if g < 1e-2 => ConvergenceClass::Good,
        (g, _, true) if g < 1e-1 => ConvergenceClass::Acceptable,
        (g, _, _) if g < 1.0 => ConvergenceClass::Questionable,
        _ => ConvergenceClass::Poor,
    }
}

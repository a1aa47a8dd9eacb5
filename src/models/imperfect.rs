//! Imperfect-debugging variants.
//!
//! Each curve carries a fault-content change term `p`:
//!
//! - `p > 0`: fixes reintroduce faults, so the total grows to `a / (1 - p)`
//! - `p < 0`: removing one fault also removes correlated ones
//! - `p = 0`: reduces exactly to the perfect-debugging curve
//!
//! With `k = 1 - p`, the effective detection rate is `b k`.

use crate::domain::{HeuristicsConfig, ModelKind};
use crate::models::heuristics::DataSummary;

/// `(a/k) (1 - e^{-bkt})`, params `[a, b, p]`.
pub fn exponential(t: f64, p: &[f64]) -> f64 {
    let (a, b, k) = (p[0], p[1], 1.0 - p[2]);
    -(a / k) * (-b * k * t).exp_m1()
}

/// `(a/k) (1 - (1 + bkt) e^{-bkt})`, params `[a, b, p]`.
pub fn delayed_s(t: f64, p: &[f64]) -> f64 {
    let (a, b, k) = (p[0], p[1], 1.0 - p[2]);
    let x = b * k * t;
    (a / k) * (1.0 - (1.0 + x) * (-x).exp())
}

/// `(a/k) (1 - e^{-bkt}) / (1 + β e^{-bkt})`, params `[a, b, β, p]`.
pub fn inflection(t: f64, p: &[f64]) -> f64 {
    let (a, b, beta, k) = (p[0], p[1], p[2], 1.0 - p[3]);
    let e = (-b * k * t).exp();
    (a / k) * (1.0 - e) / (1.0 + beta * e)
}

const BETA: (f64, f64) = (0.0, 100.0);

fn p_index(model: ModelKind) -> usize {
    match model {
        ModelKind::ImperfectInflection => 3,
        _ => 2,
    }
}

pub(crate) fn bounds(model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> (Vec<f64>, Vec<f64>) {
    let (a_lo, a_hi) = s.scale_bounds(h);
    // `a` is the total scaled by k; the lowest k allowed is 1 - p_max.
    let a_lo = a_lo * (1.0 - h.imperfect_p_max);
    let (r_lo, r_hi) = (h.rate_min, h.rate_max);
    match model {
        ModelKind::ImperfectInflection => (
            vec![a_lo, r_lo, BETA.0, h.imperfect_p_min],
            vec![a_hi, r_hi, BETA.1, h.imperfect_p_max],
        ),
        _ => (
            vec![a_lo, r_lo, h.imperfect_p_min],
            vec![a_hi, r_hi, h.imperfect_p_max],
        ),
    }
}

pub(crate) fn initial(model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> Vec<f64> {
    let p = h.imperfect_p_default.clamp(h.imperfect_p_min, h.imperfect_p_max);
    let k = 1.0 - p;
    let total = s.initial_total(h);
    // Choose (a, b) so the effective curve matches the perfect-debugging guess.
    let rate = match model {
        ModelKind::ImperfectDelayedS => s.clamp_rate(1.0 / s.peak_day.max(1.0), h),
        _ => s.initial_rate(total, h),
    };
    let a = total * k;
    let b = s.clamp_rate(rate / k, h);
    match model {
        ModelKind::ImperfectInflection => vec![a, b, 1.0, p],
        _ => vec![a, b, p],
    }
}

pub(crate) fn asymptote(model: ModelKind, p: &[f64]) -> f64 {
    p[0] / (1.0 - p[p_index(model)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::basic;

    #[test]
    fn zero_p_reduces_to_perfect_debugging() {
        for t in [0.5, 3.0, 17.0] {
            let id = exponential(t, &[100.0, 0.2, 0.0]);
            let go = basic::exponential(t, &[100.0, 0.2]);
            assert!((id - go).abs() < 1e-12);
            let ids = delayed_s(t, &[100.0, 0.2, 0.0]);
            let ds = basic::delayed_s_shaped(t, &[100.0, 0.2]);
            assert!((ids - ds).abs() < 1e-12);
        }
    }

    #[test]
    fn reintroduction_raises_total() {
        let asym = asymptote(ModelKind::ImperfectExponential, &[90.0, 0.2, 0.1]);
        assert!((asym - 100.0).abs() < 1e-9);
        assert!((exponential(1e4, &[90.0, 0.2, 0.1]) - 100.0).abs() < 1e-6);
        let asym = asymptote(ModelKind::ImperfectInflection, &[120.0, 0.2, 1.0, -0.2]);
        assert!((asym - 100.0).abs() < 1e-9);
    }

    #[test]
    fn inflection_with_zero_beta_is_exponential() {
        let a = inflection(4.0, &[100.0, 0.3, 0.0, 0.0]);
        let b = basic::exponential(4.0, &[100.0, 0.3]);
        assert!((a - b).abs() < 1e-12);
    }
}

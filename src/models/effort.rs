//! Testing-effort-dependent curves and the fault-removal-efficiency model.
//!
//! The TEF models drive an exponential detection process by a normalized
//! cumulative effort `W(t)` in `[0, 1)` rather than by calendar time:
//! `m(t) = a (1 - e^{-r W(t)})`, which saturates at `a (1 - e^{-r})`.
//!
//! - Weibull effort, params `[a, r, beta, kappa]`: `W = 1 - exp(-beta t^kappa)`
//! - logistic effort, params `[a, r, alpha, A]`: `W = (1 - e^{-alpha t}) / (1 + A e^{-alpha t})`
//!
//! The FRE model, params `[a, b, alpha, p, beta]`, combines an inflection-S
//! detection shape with removal efficiency `p` and reintroduction rate `beta`:
//! `m(t) = (a/k) (1 - ((1 + alpha) e^{-bt} / (1 + alpha e^{-bt}))^k)` with `k = p - beta`.

use crate::domain::{HeuristicsConfig, ModelKind};
use crate::models::heuristics::DataSummary;

const EFFORT_SCALE: (f64, f64) = (0.05, 20.0);
const WEIBULL_SHAPE: (f64, f64) = (0.3, 4.0);
const LOGISTIC_A: (f64, f64) = (0.0, 1e3);
const FRE_ALPHA: (f64, f64) = (0.0, 100.0);
const FRE_EFFICIENCY: (f64, f64) = (0.5, 1.0);
const FRE_REINTRODUCTION: (f64, f64) = (0.0, 0.45);

/// Effort scale used for the initial guess: 95% of the saturation level is
/// reached once `W` is close to 1.
const INITIAL_EFFORT_SCALE: f64 = 3.0;

pub fn tef_weibull(t: f64, p: &[f64]) -> f64 {
    let (a, r, beta, kappa) = (p[0], p[1], p[2], p[3]);
    let w = -(-beta * t.max(0.0).powf(kappa)).exp_m1();
    -a * (-r * w).exp_m1()
}

pub fn tef_logistic(t: f64, p: &[f64]) -> f64 {
    let (a, r, alpha, big_a) = (p[0], p[1], p[2], p[3]);
    let e = (-alpha * t).exp();
    let w = (1.0 - e) / (1.0 + big_a * e);
    -a * (-r * w).exp_m1()
}

pub fn fre_inflection(t: f64, p: &[f64]) -> f64 {
    let (a, b, alpha, eff, beta) = (p[0], p[1], p[2], p[3], p[4]);
    let k = eff - beta;
    let e = (-b * t).exp();
    let ratio = (1.0 + alpha) * e / (1.0 + alpha * e);
    (a / k) * (1.0 - ratio.powf(k))
}

pub(crate) fn bounds(model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> (Vec<f64>, Vec<f64>) {
    let (a_lo, a_hi) = s.scale_bounds(h);
    let (r_lo, r_hi) = (h.rate_min, h.rate_max);
    match model {
        ModelKind::TefWeibull => (
            vec![a_lo, EFFORT_SCALE.0, r_lo, WEIBULL_SHAPE.0],
            vec![2.0 * a_hi, EFFORT_SCALE.1, r_hi, WEIBULL_SHAPE.1],
        ),
        ModelKind::TefLogistic => (
            vec![a_lo, EFFORT_SCALE.0, r_lo, LOGISTIC_A.0],
            vec![2.0 * a_hi, EFFORT_SCALE.1, r_hi, LOGISTIC_A.1],
        ),
        _ => (
            // k can be as small as p_min - beta_max.
            vec![0.05 * a_lo, r_lo, FRE_ALPHA.0, FRE_EFFICIENCY.0, FRE_REINTRODUCTION.0],
            vec![a_hi, r_hi, FRE_ALPHA.1, FRE_EFFICIENCY.1, FRE_REINTRODUCTION.1],
        ),
    }
}

pub(crate) fn initial(model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> Vec<f64> {
    let total = s.initial_total(h);
    let b = s.initial_rate(total, h);
    match model {
        ModelKind::TefWeibull | ModelKind::TefLogistic => {
            let r = INITIAL_EFFORT_SCALE;
            let a = total / -(-r).exp_m1();
            // Half of the effort spent by h50: W(h50) = 1/2.
            let rate = |ln_k: f64| {
                s.effort_half_day
                    .map(|h50| s.clamp_rate(ln_k / h50.max(1.0), h))
                    .unwrap_or(b)
            };
            match model {
                ModelKind::TefWeibull => vec![a, r, rate(std::f64::consts::LN_2), 1.0],
                _ => vec![a, r, rate(3f64.ln()), 1.0],
            }
        }
        _ => {
            let (eff, beta) = (0.95, 0.05);
            vec![total * (eff - beta), b, 1.0, eff, beta]
        }
    }
}

pub(crate) fn asymptote(model: ModelKind, p: &[f64]) -> f64 {
    match model {
        ModelKind::TefWeibull | ModelKind::TefLogistic => -p[0] * (-p[1]).exp_m1(),
        _ => p[0] / (p[3] - p[4]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tef_curves_saturate_below_a() {
        let p = [100.0, 2.0, 0.1, 1.0];
        let sat = asymptote(ModelKind::TefWeibull, &p);
        assert!((tef_weibull(1e4, &p) - sat).abs() < 1e-9);
        assert!(sat < 100.0);
        assert!(tef_weibull(0.0, &p).abs() < 1e-12);

        let p = [100.0, 2.0, 0.1, 5.0];
        assert!((tef_logistic(1e4, &p) - asymptote(ModelKind::TefLogistic, &p)).abs() < 1e-9);
        assert!(tef_logistic(0.0, &p).abs() < 1e-12);
    }

    #[test]
    fn fre_starts_at_zero_and_reaches_a_over_k() {
        let p = [90.0, 0.3, 2.0, 0.95, 0.05];
        assert!(fre_inflection(0.0, &p).abs() < 1e-12);
        assert!((fre_inflection(1e3, &p) - 100.0).abs() < 1e-9);
        assert!((asymptote(ModelKind::FreInflection, &p) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn effort_half_day_drives_rate_guess() {
        let h = HeuristicsConfig::default();
        let t: Vec<f64> = (1..=8).map(|d| d as f64).collect();
        let y: Vec<f64> = t.iter().map(|d| 2.0 * d).collect();
        let mut s = DataSummary::from_series(&t, &y);
        s.effort_half_day = Some(4.0);
        let x0 = initial(ModelKind::TefWeibull, &s, &h);
        assert!((x0[2] - std::f64::consts::LN_2 / 4.0).abs() < 1e-12);
        // W(h50) = 1/2 for the Weibull effort with kappa = 1.
        let w = 1.0 - f64::exp(-x0[2] * 4.0);
        assert!((w - 0.5).abs() < 1e-12);
    }

    #[test]
    fn initial_guesses_lie_within_bounds() {
        let h = HeuristicsConfig::default();
        let t: Vec<f64> = (1..=10).map(|d| d as f64).collect();
        let y = [8.0, 20.0, 35.0, 45.0, 52.0, 58.0, 62.0, 64.0, 65.0, 65.0];
        let s = DataSummary::from_series(&t, &y);
        for model in [ModelKind::TefWeibull, ModelKind::TefLogistic, ModelKind::FreInflection] {
            let (lo, hi) = bounds(model, &s, &h);
            let x0 = initial(model, &s, &h);
            assert!(x0.iter().zip(lo.iter().zip(&hi)).all(|(x, (l, u))| x >= l && x <= u));
        }
    }
}

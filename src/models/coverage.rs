//! Test-coverage-driven curves: `m(t) = a c(t)` where `c(t)` is the share of
//! code covered by day `t`, rising from 0 towards 1.
//!
//! | model     | parameters   | `c(t)`                                              |
//! |-----------|--------------|-----------------------------------------------------|
//! | Weibull   | `a, b, k`    | `1 - exp(-(bt)^k)`                                  |
//! | logistic  | `a, b, beta` | `(1 - e^{-bt}) / (1 + beta e^{-bt})`                |
//! | Gompertz  | `a, b, beta` | `(exp(-beta e^{-bt}) - e^{-beta}) / (1 - e^{-beta})` |

use crate::domain::{HeuristicsConfig, ModelKind};
use crate::models::heuristics::DataSummary;

const WEIBULL_SHAPE: (f64, f64) = (0.2, 5.0);
const LOGISTIC_BETA: (f64, f64) = (0.0, 1e3);
const GOMPERTZ_BETA: (f64, f64) = (1e-3, 50.0);

pub fn weibull(t: f64, p: &[f64]) -> f64 {
    let (a, b, k) = (p[0], p[1], p[2]);
    -a * (-(b * t.max(0.0)).powf(k)).exp_m1()
}

pub fn logistic(t: f64, p: &[f64]) -> f64 {
    let (a, b, beta) = (p[0], p[1], p[2]);
    let e = (-b * t).exp();
    a * (1.0 - e) / (1.0 + beta * e)
}

pub fn gompertz(t: f64, p: &[f64]) -> f64 {
    let (a, b, beta) = (p[0], p[1], p[2]);
    let c = ((-beta * (-b * t).exp()).exp() - (-beta).exp()) / -(-beta).exp_m1();
    a * c
}

pub(crate) fn bounds(model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> (Vec<f64>, Vec<f64>) {
    let (a_lo, a_hi) = s.scale_bounds(h);
    let shape = match model {
        ModelKind::CoverageWeibull => WEIBULL_SHAPE,
        ModelKind::CoverageLogistic => LOGISTIC_BETA,
        _ => GOMPERTZ_BETA,
    };
    (
        vec![a_lo, h.rate_min, shape.0],
        vec![a_hi, h.rate_max, shape.1],
    )
}

pub(crate) fn initial(model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> Vec<f64> {
    let a = s.initial_total(h);
    let b = s.initial_rate(a, h);
    let shape = match model {
        // A discovery peak after the first days suggests an S-shaped ramp.
        ModelKind::CoverageWeibull if s.peak_day > 1.5 => 1.5,
        ModelKind::CoverageWeibull => 1.0,
        ModelKind::CoverageLogistic => 1.0,
        _ => 2.0,
    };
    vec![a, b, shape]
}

pub(crate) fn asymptote(_model: ModelKind, p: &[f64]) -> f64 {
    p[0]
}

//! Closed-form NHPP growth curves.
//!
//! | model              | parameters       | `m(t)`                          |
//! |--------------------|------------------|---------------------------------|
//! | exponential (G-O)  | `a, b`           | `a (1 - e^{-bt})`               |
//! | delayed S-shaped   | `a, b`           | `a (1 - (1 + bt) e^{-bt})`      |
//! | Gompertz           | `a, b, c`        | `a exp(-c e^{-bt})`             |
//! | modified Gompertz  | `a, b, c, d`     | `d + a exp(-c e^{-bt})`         |
//! | logistic           | `a, b, c`        | `a / (1 + c e^{-bt})`           |

use crate::domain::{HeuristicsConfig, ModelKind};
use crate::models::heuristics::DataSummary;

pub fn exponential(t: f64, p: &[f64]) -> f64 {
    let (a, b) = (p[0], p[1]);
    -a * (-b * t).exp_m1()
}

pub fn delayed_s_shaped(t: f64, p: &[f64]) -> f64 {
    let (a, b) = (p[0], p[1]);
    a * (1.0 - (1.0 + b * t) * (-b * t).exp())
}

pub fn gompertz(t: f64, p: &[f64]) -> f64 {
    let (a, b, c) = (p[0], p[1], p[2]);
    a * (-c * (-b * t).exp()).exp()
}

pub fn modified_gompertz(t: f64, p: &[f64]) -> f64 {
    let (a, b, c, d) = (p[0], p[1], p[2], p[3]);
    d + a * (-c * (-b * t).exp()).exp()
}

pub fn logistic(t: f64, p: &[f64]) -> f64 {
    let (a, b, c) = (p[0], p[1], p[2]);
    a / (1.0 + c * (-b * t).exp())
}

const GOMPERTZ_C: (f64, f64) = (1e-3, 50.0);
const LOGISTIC_C: (f64, f64) = (1e-3, 1e4);

pub(crate) fn bounds(model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> (Vec<f64>, Vec<f64>) {
    let (a_lo, a_hi) = s.scale_bounds(h);
    let (r_lo, r_hi) = (h.rate_min, h.rate_max);
    match model {
        ModelKind::Gompertz => (
            vec![a_lo, r_lo, GOMPERTZ_C.0],
            vec![a_hi, r_hi, GOMPERTZ_C.1],
        ),
        ModelKind::ModifiedGompertz => (
            vec![0.1 * s.max_y, r_lo, GOMPERTZ_C.0, 0.0],
            vec![a_hi, r_hi, GOMPERTZ_C.1, s.max_y],
        ),
        ModelKind::Logistic => (
            vec![a_lo, r_lo, LOGISTIC_C.0],
            vec![a_hi, r_hi, LOGISTIC_C.1],
        ),
        _ => (vec![a_lo, r_lo], vec![a_hi, r_hi]),
    }
}

pub(crate) fn initial(model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> Vec<f64> {
    let a = s.initial_total(h);
    let b = s.initial_rate(a, h);
    // m(t_first) = y_first pins the Gompertz/logistic shape constant.
    let y1 = s.y_first.max(1e-3 * s.max_y);
    match model {
        ModelKind::DelayedSShaped => {
            // Detection density b^2 t e^{-bt} peaks at t = 1/b.
            vec![a, s.clamp_rate(1.0 / s.peak_day.max(1.0), h)]
        }
        ModelKind::Gompertz => {
            let c = ((a / y1).ln() * (b * s.t_first).exp()).clamp(GOMPERTZ_C.0, GOMPERTZ_C.1);
            vec![a, b, c]
        }
        ModelKind::ModifiedGompertz => {
            let d = 0.5 * s.y_first;
            let scale = (a - d).max(0.1 * s.max_y);
            let c = ((scale / y1).ln() * (b * s.t_first).exp()).clamp(GOMPERTZ_C.0, GOMPERTZ_C.1);
            vec![scale, b, c, d]
        }
        ModelKind::Logistic => {
            let c = (a / y1 - 1.0).clamp(LOGISTIC_C.0, LOGISTIC_C.1);
            // Inflection at ln(c)/b: place it at the peak-discovery day when that is informative.
            let b = if c > 1.0 {
                s.clamp_rate(c.ln() / s.peak_day.max(1.0), h)
            } else {
                b
            };
            vec![a, b, c]
        }
        _ => vec![a, b],
    }
}

pub(crate) fn asymptote(model: ModelKind, p: &[f64]) -> f64 {
    match model {
        ModelKind::ModifiedGompertz => p[0] + p[3],
        _ => p[0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curves_start_near_zero_and_saturate() {
        assert!(exponential(0.0, &[100.0, 0.3]).abs() < 1e-12);
        assert!((exponential(200.0, &[100.0, 0.3]) - 100.0).abs() < 1e-9);
        assert!(delayed_s_shaped(0.0, &[50.0, 0.2]).abs() < 1e-12);
        assert!((delayed_s_shaped(500.0, &[50.0, 0.2]) - 50.0).abs() < 1e-9);
        assert!((gompertz(1e3, &[80.0, 0.5, 3.0]) - 80.0).abs() < 1e-9);
        assert!((modified_gompertz(1e3, &[80.0, 0.5, 3.0, 5.0]) - 85.0).abs() < 1e-9);
        assert!((logistic(1e3, &[40.0, 0.5, 9.0]) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn logistic_inflection_at_ln_c_over_b() {
        let (a, b, c) = (40.0, 0.5, 9.0);
        let t_inf = f64::ln(c) / b;
        assert!((logistic(t_inf, &[a, b, c]) - a / 2.0).abs() < 1e-9);
    }

    #[test]
    fn initial_guesses_lie_within_bounds() {
        let h = HeuristicsConfig::default();
        let t: Vec<f64> = (1..=10).map(|d| d as f64).collect();
        let y = [8.0, 20.0, 35.0, 45.0, 52.0, 58.0, 62.0, 64.0, 65.0, 65.0];
        let s = DataSummary::from_series(&t, &y);
        for model in [
            ModelKind::Exponential,
            ModelKind::DelayedSShaped,
            ModelKind::Gompertz,
            ModelKind::ModifiedGompertz,
            ModelKind::Logistic,
        ] {
            let (lo, hi) = bounds(model, &s, &h);
            let x0 = initial(model, &s, &h);
            assert_eq!(x0.len(), lo.len());
            for i in 0..x0.len() {
                assert!(x0[i] >= lo[i] && x0[i] <= hi[i], "{model:?} axis {i}: {} not in [{}, {}]", x0[i], lo[i], hi[i]);
            }
        }
    }
}

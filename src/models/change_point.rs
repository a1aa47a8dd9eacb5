//! Exponential growth with a single detection-rate change point.
//!
//! Parameters `[a, b1, b2, tau]`: the rate is `b1` up to day `tau` and `b2`
//! afterwards, so the cumulative hazard is piecewise linear and the curve is
//! continuous at `tau`.

use crate::domain::{HeuristicsConfig, ModelKind};
use crate::models::heuristics::DataSummary;

pub fn exponential(t: f64, p: &[f64]) -> f64 {
    let (a, b1, b2, tau) = (p[0], p[1], p[2], p[3]);
    let hazard = if t <= tau {
        b1 * t
    } else {
        b1 * tau + b2 * (t - tau)
    };
    -a * (-hazard).exp_m1()
}

pub(crate) fn bounds(_model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> (Vec<f64>, Vec<f64>) {
    let (a_lo, a_hi) = s.scale_bounds(h);
    (
        vec![a_lo, h.rate_min, h.rate_min, s.t_first],
        vec![a_hi, h.rate_max, h.rate_max, s.t_last.max(s.t_first)],
    )
}

pub(crate) fn initial(_model: ModelKind, s: &DataSummary, h: &HeuristicsConfig) -> Vec<f64> {
    let a = s.initial_total(h);
    let b = s.initial_rate(a, h);
    let tau = (h.change_point_ratio * s.t_last).clamp(s.t_first, s.t_last.max(s.t_first));
    vec![a, b, b, tau]
}

pub(crate) fn asymptote(_model: ModelKind, p: &[f64]) -> f64 {
    p[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::basic;

    #[test]
    fn equal_rates_match_plain_exponential() {
        for t in [1.0, 5.0, 9.0] {
            let cp = exponential(t, &[100.0, 0.2, 0.2, 4.0]);
            let go = basic::exponential(t, &[100.0, 0.2]);
            assert!((cp - go).abs() < 1e-12);
        }
    }

    #[test]
    fn continuous_at_change_point() {
        let p = [100.0, 0.1, 0.5, 6.0];
        let left = exponential(6.0, &p);
        let right = exponential(6.0 + 1e-9, &p);
        assert!((left - right).abs() < 1e-6);
        // Faster rate after tau.
        assert!(exponential(8.0, &p) > basic::exponential(8.0, &[100.0, 0.1]));
    }

    #[test]
    fn tau_guess_within_observed_window() {
        let h = HeuristicsConfig::default();
        let t: Vec<f64> = (1..=10).map(|d| d as f64).collect();
        let y: Vec<f64> = t.iter().map(|d| 3.0 * d).collect();
        let s = DataSummary::from_series(&t, &y);
        let x0 = initial(ModelKind::ChangePointExponential, &s, &h);
        assert_eq!(x0[3], 5.0);
        let (lo, hi) = bounds(ModelKind::ChangePointExponential, &s, &h);
        assert_eq!((lo[3], hi[3]), (1.0, 10.0));
    }
}

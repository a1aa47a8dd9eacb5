//! Logistic reparameterization between the real line and a bounded interval.
//!
//! CMA-ES searches an unconstrained space; each axis is mapped into its box
//! with `x = lo + (hi - lo) * σ(y)`. The logistic is evaluated in a guarded
//! form so large `|y|` saturates at the bounds instead of overflowing.

/// Largest share of the interval the inverse map will target (keeps logits finite).
const EDGE: f64 = 1e-9;

/// Numerically stable logistic `1 / (1 + e^{-y})`.
pub fn logistic(y: f64) -> f64 {
    if y >= 0.0 {
        1.0 / (1.0 + (-y).exp())
    } else {
        let e = y.exp();
        e / (1.0 + e)
    }
}

/// Map an unconstrained value into `[lo, hi]`.
pub fn to_bounded(y: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return lo;
    }
    (lo + (hi - lo) * logistic(y)).clamp(lo, hi)
}

/// Inverse of [`to_bounded`]; points on (or outside) a bound map to a large finite logit.
pub fn to_unbounded(x: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo || !x.is_finite() {
        return 0.0;
    }
    let u = ((x - lo) / (hi - lo)).clamp(EDGE, 1.0 - EDGE);
    (u / (1.0 - u)).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_interior_point() {
        let y = to_unbounded(3.0, -2.0, 10.0);
        assert!((to_bounded(y, -2.0, 10.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn extreme_logits_saturate_inside_bounds() {
        assert_eq!(to_bounded(1e6, 0.0, 1.0), 1.0);
        assert_eq!(to_bounded(-1e6, 0.0, 1.0), 0.0);
        assert!(to_unbounded(0.0, 0.0, 1.0).is_finite());
        assert_eq!(to_bounded(5.0, 2.0, 2.0), 2.0);
    }
}

//! Goodness-of-fit statistics and order statistics.

use std::cmp::Ordering;

/// Floor applied to `SSE / n` before taking logs, so a perfect fit stays finite.
const SSE_PER_FLOOR: f64 = 1e-12;

pub fn sum_squared_error(observed: &[f64], predicted: &[f64]) -> f64 {
    observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p) * (y - p))
        .sum()
}

/// Coefficient of determination `1 - SSres / SStot`.
///
/// A constant series has `SStot = 0`; it scores `1` when reproduced exactly
/// and `0` otherwise.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    if observed.is_empty() {
        return f64::NAN;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_tot: f64 = observed.iter().map(|y| (y - mean) * (y - mean)).sum();
    let ss_res = sum_squared_error(observed, predicted);
    if ss_tot <= 0.0 {
        return if ss_res <= 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Akaike information criterion for a least-squares fit: `n ln(SSE/n) + 2k`.
pub fn aic(n: usize, sse: f64, k: usize) -> f64 {
    let n_f = n as f64;
    let sse_per = (sse / n_f).max(SSE_PER_FLOOR);
    n_f * sse_per.ln() + 2.0 * k as f64
}

/// Bayesian information criterion: `n ln(SSE/n) + k ln(n)`.
pub fn bic(n: usize, sse: f64, k: usize) -> f64 {
    let n_f = n as f64;
    let sse_per = (sse / n_f).max(SSE_PER_FLOOR);
    n_f * sse_per.ln() + (k as f64) * n_f.ln()
}

/// Percentile `q ∈ [0, 100]` of `values`, linearly interpolated between order statistics.
///
/// Sorts `values` in place. Returns `None` for an empty slice.
pub fn percentile_mut(values: &mut [f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let q = q.clamp(0.0, 100.0) / 100.0;
    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(values[lo] + (values[hi] - values[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r_squared_perfect_and_mean_fit() {
        let y = [1.0, 2.0, 3.0];
        assert!((r_squared(&y, &y) - 1.0).abs() < 1e-12);
        assert!(r_squared(&y, &[2.0, 2.0, 2.0]).abs() < 1e-12);
        assert_eq!(r_squared(&[4.0, 4.0], &[4.0, 4.0]), 1.0);
    }

    #[test]
    fn aic_penalizes_parameters() {
        let a2 = aic(10, 5.0, 2);
        let a3 = aic(10, 5.0, 3);
        assert!((a3 - a2 - 2.0).abs() < 1e-12);
        assert!(aic(10, 0.0, 2).is_finite());
        assert!(bic(10, 5.0, 2) > a2);
    }

    #[test]
    fn percentile_interpolates() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile_mut(&mut v, 0.0), Some(1.0));
        assert_eq!(percentile_mut(&mut v, 100.0), Some(4.0));
        assert!((percentile_mut(&mut v, 50.0).unwrap() - 2.5).abs() < 1e-12);
        assert!(percentile_mut(&mut [], 50.0).is_none());
    }
}

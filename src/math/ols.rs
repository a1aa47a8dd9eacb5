//! Small least-squares solves.
//!
//! The model heuristics need slopes of short stretches of the cumulative
//! series (early vs. late discovery rate). Those are tiny regression problems
//!
//! ```text
//! minimize Σ (y_i - a - b t_i)^2
//! ```
//!
//! solved with an SVD so that a degenerate window (all `t_i` equal) is
//! reported as `None` instead of producing garbage.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() < x.ncols() {
        return None;
    }
    let svd = x.clone().svd(true, true);

    // Reject rank-deficient designs instead of returning a minimum-norm answer.
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) || svd.singular_values.min() <= max_sv * 1e-12 {
        return None;
    }

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y = intercept + slope * t`; returns `(intercept, slope)`.
pub fn linear_trend(t: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = t.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mut x = DMatrix::<f64>::zeros(n, 2);
    for i in 0..n {
        x[(i, 0)] = 1.0;
        x[(i, 1)] = t[i];
    }
    let yv = DVector::from_row_slice(&y[..n]);
    let beta = solve_least_squares(&x, &yv)?;
    Some((beta[0], beta[1]))
}

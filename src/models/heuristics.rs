//! Data-driven summary used by the model heuristics.
//!
//! Initial guesses and bounds for every curve are derived from a handful of
//! scalar features of the observed series:
//!
//! - the maximum cumulative count (sets the total-scale range)
//! - early vs. late discovery slope (is the series plateauing or still growing?)
//! - the day with the most discoveries (peak of the detection density)
//! - the day half of the actual test effort had been spent, when effort is recorded

use crate::domain::{HeuristicsConfig, TimeSeriesData};
use crate::math::linear_trend;

/// Scalar features of one observed series.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSummary {
    pub n: usize,
    pub t_first: f64,
    pub t_last: f64,
    pub y_first: f64,
    pub y_last: f64,
    /// Maximum observed cumulative count, floored at 1 so scale bounds stay non-degenerate.
    pub max_y: f64,
    pub early_slope: f64,
    pub late_slope: f64,
    /// `late_slope / early_slope`, clamped to `[0, 10]`.
    pub slope_ratio: f64,
    pub peak_day: f64,
    pub effort_half_day: Option<f64>,
}

impl DataSummary {
    pub fn from_data(data: &TimeSeriesData) -> Self {
        let t = data.days();
        let y = data.cumulative_found();
        let mut summary = Self::from_series(&t, &y);
        summary.effort_half_day = data.cumulative_actual_effort().and_then(|effort| {
            let half = 0.5 * effort.last().copied().unwrap_or(0.0);
            effort.iter().position(|&e| e >= half).map(|i| t[i])
        });
        summary
    }

    /// Summary of a bare `(t, y)` cumulative series (no effort information).
    pub fn from_series(t: &[f64], y: &[f64]) -> Self {
        let n = t.len().min(y.len());
        let t_first = t.first().copied().unwrap_or(1.0);
        let t_last = t.get(n.saturating_sub(1)).copied().unwrap_or(1.0);
        let y_first = y.first().copied().unwrap_or(0.0);
        let y_last = y.get(n.saturating_sub(1)).copied().unwrap_or(0.0);
        let max_y = y[..n].iter().copied().fold(0.0_f64, f64::max).max(1.0);

        // Slopes over the first and last third (at least two points each).
        let window = n.div_ceil(3).max(2).min(n);
        let early_slope = linear_trend(&t[..window], &y[..window])
            .map(|(_, b)| b)
            .unwrap_or(0.0);
        let late_slope = linear_trend(&t[n - window..n], &y[n - window..n])
            .map(|(_, b)| b)
            .unwrap_or(0.0);
        let slope_ratio = if early_slope > 0.0 {
            (late_slope / early_slope).clamp(0.0, 10.0)
        } else {
            1.0
        };

        let mut peak_day = t_first;
        let mut peak = f64::NEG_INFINITY;
        let mut prev = 0.0;
        for i in 0..n {
            let inc = y[i] - prev;
            if inc > peak {
                peak = inc;
                peak_day = t[i];
            }
            prev = y[i];
        }

        Self {
            n,
            t_first,
            t_last,
            y_first,
            y_last,
            max_y,
            early_slope,
            late_slope,
            slope_ratio,
            peak_day,
            effort_half_day: None,
        }
    }

    /// Total-scale bounds `[scale_min * max_y, scale_max * max_y]`.
    pub fn scale_bounds(&self, h: &HeuristicsConfig) -> (f64, f64) {
        (h.scale_min * self.max_y, h.scale_max * self.max_y)
    }

    /// Initial guess for the total defect count.
    ///
    /// A flattening series is assumed close to its total; a series still
    /// growing at its early rate gets a larger multiple.
    pub fn initial_total(&self, h: &HeuristicsConfig) -> f64 {
        let scale = if self.slope_ratio < h.plateau_slope_ratio {
            h.scale_plateau
        } else if self.slope_ratio < h.growing_slope_ratio {
            h.scale_mid
        } else {
            h.scale_growing
        };
        let (lo, hi) = self.scale_bounds(h);
        (scale * self.max_y).clamp(lo, hi)
    }

    /// Exponential detection rate consistent with reaching `y_last` of `total` by `t_last`.
    pub fn initial_rate(&self, total: f64, h: &HeuristicsConfig) -> f64 {
        let frac = self.y_last / total;
        let rate = if frac > 0.0 && frac < 1.0 && self.t_last > 0.0 {
            -(1.0 - frac).ln() / self.t_last
        } else {
            0.1
        };
        self.clamp_rate(rate, h)
    }

    pub fn clamp_rate(&self, rate: f64, h: &HeuristicsConfig) -> f64 {
        if rate.is_finite() {
            rate.clamp(h.rate_min, h.rate_max)
        } else {
            h.rate_min
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DailyRecord;

    fn series(values: &[f64]) -> DataSummary {
        let t: Vec<f64> = (1..=values.len()).map(|d| d as f64).collect();
        DataSummary::from_series(&t, values)
    }

    #[test]
    fn plateau_series_gets_small_scale() {
        let h = HeuristicsConfig::default();
        let s = series(&[8.0, 20.0, 35.0, 45.0, 52.0, 58.0, 62.0, 64.0, 65.0, 65.0]);
        assert!(s.slope_ratio < h.plateau_slope_ratio);
        assert!((s.initial_total(&h) - 1.1 * 65.0).abs() < 1e-9);
        assert_eq!(s.peak_day, 3.0);
    }

    #[test]
    fn linear_series_is_growing() {
        let h = HeuristicsConfig::default();
        let s = series(&[2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);
        assert!((s.slope_ratio - 1.0).abs() < 1e-9);
        assert!((s.initial_total(&h) - 2.5 * 12.0).abs() < 1e-9);
    }

    #[test]
    fn rate_guess_is_bounded() {
        let h = HeuristicsConfig::default();
        let s = series(&[0.0, 0.0, 0.0]);
        let r = s.initial_rate(s.initial_total(&h), &h);
        assert!(r >= h.rate_min && r <= h.rate_max);
        assert_eq!(s.max_y, 1.0);
    }

    #[test]
    fn effort_half_day_found() {
        let records = (0..6)
            .map(|i| DailyRecord {
                actual_effort: if i < 3 { 1.0 } else { 3.0 },
                ..DailyRecord::found(1.0)
            })
            .collect();
        let data = TimeSeriesData::new("p", records).unwrap();
        // cumulative effort: 1,2,3,6,9,12 -> half (6) at day 4
        assert_eq!(DataSummary::from_data(&data).effort_half_day, Some(4.0));
    }
}

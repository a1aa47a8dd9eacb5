//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting (shared read-only across worker threads)
//! - exported to JSON/CSV
//! - handed unchanged to the report and plot collaborators

use chrono::{Duration, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One day of test execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub planned_effort: f64,
    #[serde(default)]
    pub actual_effort: f64,
    pub defects_found: f64,
    #[serde(default)]
    pub defects_fixed: f64,
}

impl DailyRecord {
    /// A record carrying only a defect count.
    pub fn found(defects_found: f64) -> Self {
        Self {
            date: None,
            planned_effort: 0.0,
            actual_effort: 0.0,
            defects_found,
            defects_fixed: 0.0,
        }
    }
}

/// Ordered per-day observations for one project.
///
/// Day `i` of the series (1-based) corresponds to `records[i - 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesData {
    pub project_name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_test_cases: Option<u32>,
    pub records: Vec<DailyRecord>,
}

impl TimeSeriesData {
    /// Build and validate a series.
    pub fn new(project_name: impl Into<String>, records: Vec<DailyRecord>) -> Result<Self, AppError> {
        let data = Self {
            project_name: project_name.into(),
            start_date: None,
            total_test_cases: None,
            records,
        };
        data.validate()?;
        Ok(data)
    }

    /// Build a series from cumulative defect counts (daily counts are the differences).
    pub fn from_cumulative(project_name: impl Into<String>, cumulative: &[f64]) -> Result<Self, AppError> {
        let mut prev = 0.0;
        let mut records = Vec::with_capacity(cumulative.len());
        for (i, &c) in cumulative.iter().enumerate() {
            if !c.is_finite() || c < prev {
                return Err(AppError::new(
                    2,
                    format!("Cumulative count at day {} decreases or is not finite ({c}).", i + 1),
                ));
            }
            records.push(DailyRecord::found(c - prev));
            prev = c;
        }
        Self::new(project_name, records)
    }

    pub fn with_start_date(mut self, start: NaiveDate) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.records.is_empty() {
            return Err(AppError::new(2, "Time series has no records."));
        }
        for (i, r) in self.records.iter().enumerate() {
            let fields = [r.planned_effort, r.actual_effort, r.defects_found, r.defects_fixed];
            if fields.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(AppError::new(
                    2,
                    format!("Day {} has a negative or non-finite value.", i + 1),
                ));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Day index `t_i = i + 1` for every record.
    pub fn days(&self) -> Vec<f64> {
        (1..=self.records.len()).map(|d| d as f64).collect()
    }

    pub fn cumulative_found(&self) -> Vec<f64> {
        running_sum(self.records.iter().map(|r| r.defects_found))
    }

    pub fn cumulative_fixed(&self) -> Vec<f64> {
        running_sum(self.records.iter().map(|r| r.defects_fixed))
    }

    /// Cumulative actual effort, or `None` when no effort was recorded.
    pub fn cumulative_actual_effort(&self) -> Option<Vec<f64>> {
        let cum = running_sum(self.records.iter().map(|r| r.actual_effort));
        match cum.last() {
            Some(&last) if last > 0.0 => Some(cum),
            _ => None,
        }
    }

    /// Calendar date of a 1-based day index, when a start date is known.
    pub fn date_for_day(&self, day: u32) -> Option<NaiveDate> {
        let start = self
            .start_date
            .or_else(|| self.records.first().and_then(|r| r.date))?;
        start.checked_add_signed(Duration::days(i64::from(day.max(1)) - 1))
    }
}

fn running_sum(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut acc = 0.0;
    values
        .map(|v| {
            acc += v;
            acc
        })
        .collect()
}

/// Axis-aligned search box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, AppError> {
        let bounds = Self { lower, upper };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.lower.len() != self.upper.len() {
            return Err(AppError::new(
                2,
                format!(
                    "Bounds length mismatch: lower={} upper={}.",
                    self.lower.len(),
                    self.upper.len()
                ),
            ));
        }
        if self.lower.is_empty() {
            return Err(AppError::new(2, "Bounds have zero dimension."));
        }
        for (i, (lo, hi)) in self.lower.iter().zip(&self.upper).enumerate() {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(AppError::new(
                    2,
                    format!("Invalid bounds on axis {i}: [{lo}, {hi}]."),
                ));
            }
        }
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn range(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }

    pub fn midpoint(&self) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    /// Clamp `x` into the box in place. Non-finite coordinates go to the midpoint.
    pub fn clip(&self, x: &mut [f64]) {
        for (i, v) in x.iter_mut().enumerate() {
            let (lo, hi) = (self.lower[i], self.upper[i]);
            *v = if v.is_finite() { v.clamp(lo, hi) } else { 0.5 * (lo + hi) };
        }
    }

    pub fn clipped(&self, x: &[f64]) -> Vec<f64> {
        let mut out = x.to_vec();
        self.clip(&mut out);
        out
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dim()
            && x
                .iter()
                .enumerate()
                .all(|(i, v)| *v >= self.lower[i] && *v <= self.upper[i])
    }
}

/// Model families selectable as a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelCategory {
    Basic,
    ImperfectDebug,
    ChangePoint,
    Tef,
    Fre,
    Coverage,
}

impl ModelCategory {
    pub const ALL: [ModelCategory; 6] = [
        ModelCategory::Basic,
        ModelCategory::ImperfectDebug,
        ModelCategory::ChangePoint,
        ModelCategory::Tef,
        ModelCategory::Fre,
        ModelCategory::Coverage,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ModelCategory::Basic => "Basic",
            ModelCategory::ImperfectDebug => "Imperfect debugging",
            ModelCategory::ChangePoint => "Change-point",
            ModelCategory::Tef => "Testing effort",
            ModelCategory::Fre => "Fault removal efficiency",
            ModelCategory::Coverage => "Coverage",
        }
    }
}

/// Concrete curve in the catalog.
///
/// Variant order is the catalog order used for stable tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Exponential,
    DelayedSShaped,
    Gompertz,
    ModifiedGompertz,
    Logistic,
    ImperfectExponential,
    ImperfectDelayedS,
    ImperfectInflection,
    ChangePointExponential,
    TefWeibull,
    TefLogistic,
    FreInflection,
    CoverageWeibull,
    CoverageLogistic,
    CoverageGompertz,
}

impl ModelKind {
    pub const ALL: [ModelKind; 15] = [
        ModelKind::Exponential,
        ModelKind::DelayedSShaped,
        ModelKind::Gompertz,
        ModelKind::ModifiedGompertz,
        ModelKind::Logistic,
        ModelKind::ImperfectExponential,
        ModelKind::ImperfectDelayedS,
        ModelKind::ImperfectInflection,
        ModelKind::ChangePointExponential,
        ModelKind::TefWeibull,
        ModelKind::TefLogistic,
        ModelKind::FreInflection,
        ModelKind::CoverageWeibull,
        ModelKind::CoverageLogistic,
        ModelKind::CoverageGompertz,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Exponential => "Exponential (G-O)",
            ModelKind::DelayedSShaped => "Delayed S-shaped",
            ModelKind::Gompertz => "Gompertz",
            ModelKind::ModifiedGompertz => "Modified Gompertz",
            ModelKind::Logistic => "Logistic",
            ModelKind::ImperfectExponential => "ID exponential",
            ModelKind::ImperfectDelayedS => "ID delayed S",
            ModelKind::ImperfectInflection => "ID inflection S",
            ModelKind::ChangePointExponential => "Change-point exp.",
            ModelKind::TefWeibull => "TEF Weibull",
            ModelKind::TefLogistic => "TEF logistic",
            ModelKind::FreInflection => "FRE inflection",
            ModelKind::CoverageWeibull => "Coverage Weibull",
            ModelKind::CoverageLogistic => "Coverage logistic",
            ModelKind::CoverageGompertz => "Coverage Gompertz",
        }
    }

    pub fn category(self) -> ModelCategory {
        match self {
            ModelKind::Exponential
            | ModelKind::DelayedSShaped
            | ModelKind::Gompertz
            | ModelKind::ModifiedGompertz
            | ModelKind::Logistic => ModelCategory::Basic,
            ModelKind::ImperfectExponential
            | ModelKind::ImperfectDelayedS
            | ModelKind::ImperfectInflection => ModelCategory::ImperfectDebug,
            ModelKind::ChangePointExponential => ModelCategory::ChangePoint,
            ModelKind::TefWeibull | ModelKind::TefLogistic => ModelCategory::Tef,
            ModelKind::FreInflection => ModelCategory::Fre,
            ModelKind::CoverageWeibull
            | ModelKind::CoverageLogistic
            | ModelKind::CoverageGompertz => ModelCategory::Coverage,
        }
    }

    /// Number of free parameters (used by AIC/BIC).
    pub fn param_count(self) -> usize {
        match self {
            ModelKind::Exponential | ModelKind::DelayedSShaped => 2,
            ModelKind::Gompertz
            | ModelKind::Logistic
            | ModelKind::ImperfectExponential
            | ModelKind::ImperfectDelayedS
            | ModelKind::CoverageWeibull
            | ModelKind::CoverageLogistic
            | ModelKind::CoverageGompertz => 3,
            ModelKind::ModifiedGompertz
            | ModelKind::ImperfectInflection
            | ModelKind::ChangePointExponential
            | ModelKind::TefWeibull
            | ModelKind::TefLogistic => 4,
            ModelKind::FreInflection => 5,
        }
    }
}

/// Which model groups to fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSet {
    pub categories: Vec<ModelCategory>,
}

impl ModelSet {
    pub fn basic() -> Self {
        Self {
            categories: vec![ModelCategory::Basic],
        }
    }

    /// Basic models plus every extended group.
    pub fn all() -> Self {
        Self {
            categories: ModelCategory::ALL.to_vec(),
        }
    }

    pub fn from_categories(categories: &[ModelCategory]) -> Self {
        Self {
            categories: categories.to_vec(),
        }
    }

    /// Member models in catalog order (duplicates in `categories` are ignored).
    pub fn models(&self) -> Vec<ModelKind> {
        ModelKind::ALL
            .into_iter()
            .filter(|m| self.categories.contains(&m.category()))
            .collect()
    }
}

/// Optimizer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[value(name = "grid")]
    GridSearchGd,
    Pso,
    #[value(name = "de")]
    DifferentialEvolution,
    GreyWolf,
    NelderMead,
    Cmaes,
    #[value(name = "auto")]
    AutoSelect,
}

impl OptimizerKind {
    /// Concrete strategies, in the order AutoSelect runs them.
    pub const CONCRETE: [OptimizerKind; 6] = [
        OptimizerKind::GridSearchGd,
        OptimizerKind::Pso,
        OptimizerKind::DifferentialEvolution,
        OptimizerKind::GreyWolf,
        OptimizerKind::NelderMead,
        OptimizerKind::Cmaes,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            OptimizerKind::GridSearchGd => "Grid search + gradient descent",
            OptimizerKind::Pso => "Particle swarm",
            OptimizerKind::DifferentialEvolution => "Differential evolution",
            OptimizerKind::GreyWolf => "Grey wolf",
            OptimizerKind::NelderMead => "Nelder-Mead",
            OptimizerKind::Cmaes => "CMA-ES",
            OptimizerKind::AutoSelect => "Auto-select",
        }
    }

    pub fn is_randomized(self) -> bool {
        matches!(
            self,
            OptimizerKind::Pso
                | OptimizerKind::DifferentialEvolution
                | OptimizerKind::GreyWolf
                | OptimizerKind::Cmaes
        )
    }
}

/// Qualitative verdict on how trustworthy an optimum is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceClass {
    Good,
    Acceptable,
    Questionable,
    Poor,
}

/// Post-hoc checks on an optimizer's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceDiagnostics {
    /// Central-difference gradient norm at the solution (unit-box coordinates).
    pub gradient_norm: f64,
    pub at_lower: Vec<bool>,
    pub at_upper: Vec<bool>,
    /// Relative objective change over the tail of the history.
    pub change_rate: f64,
    pub class: ConvergenceClass,
}

/// Outcome of one optimizer invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub optimizer: OptimizerKind,
    pub params: Vec<f64>,
    pub objective_value: f64,
    pub success: bool,
    /// Error message on failure, termination reason on success.
    pub message: Option<String>,
    pub iterations: usize,
    pub evaluations: usize,
    /// Best-so-far objective value per iteration/generation.
    pub history: Vec<f64>,
    pub elapsed_ms: f64,
    pub diagnostics: Option<ConvergenceDiagnostics>,
}

impl OptimizationResult {
    pub fn failed(optimizer: OptimizerKind, params: Vec<f64>, message: impl Into<String>) -> Self {
        Self {
            optimizer,
            params,
            objective_value: f64::NAN,
            success: false,
            message: Some(message.into()),
            iterations: 0,
            evaluations: 0,
            history: Vec::new(),
            elapsed_ms: 0.0,
            diagnostics: None,
        }
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub n: usize,
    pub sse: f64,
    pub rmse: f64,
    pub r_squared: f64,
    pub aic: f64,
    pub bic: f64,
}

impl FitQuality {
    pub fn undefined(n: usize) -> Self {
        Self {
            n,
            sse: f64::NAN,
            rmse: f64::NAN,
            r_squared: f64::NAN,
            aic: f64::NAN,
            bic: f64::NAN,
        }
    }
}

/// When a share of the estimated total is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThresholdOutcome {
    /// The fitted curve already exceeds the threshold inside the observed window.
    AlreadyReached { day: u32 },
    Reached { day: u32, date: Option<NaiveDate> },
    /// Not reached within the search horizon.
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPrediction {
    /// Share of the estimated total, e.g. `0.95`.
    pub threshold: f64,
    pub outcome: ThresholdOutcome,
}

/// Fit output for a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittingResult {
    pub model: ModelKind,
    pub category: ModelCategory,
    pub display_name: String,
    pub param_names: Vec<String>,
    pub params: Vec<f64>,
    pub quality: FitQuality,
    /// Fitted cumulative value at every observed day.
    pub predicted: Vec<f64>,
    pub estimated_total: f64,
    pub predictions: Vec<ThresholdPrediction>,
    pub optimization: OptimizationResult,
    pub success: bool,
    pub error: Option<String>,
    pub elapsed_ms: f64,
}

/// Percentile band over bootstrap refits, one entry per observed day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapBand {
    pub model: ModelKind,
    /// Lower/upper percentile in `[0, 100]`.
    pub percentiles: [f64; 2],
    pub lower: Vec<f64>,
    pub median: Vec<f64>,
    pub upper: Vec<f64>,
    pub iterations: usize,
    /// Runs whose refit failed and reused the fitted curve.
    pub fallback_runs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cumulative_recovers_daily_counts() {
        let data = TimeSeriesData::from_cumulative("p", &[3.0, 5.0, 5.0, 9.0]).unwrap();
        let daily: Vec<f64> = data.records.iter().map(|r| r.defects_found).collect();
        assert_eq!(daily, vec![3.0, 2.0, 0.0, 4.0]);
        assert_eq!(data.cumulative_found(), vec![3.0, 5.0, 5.0, 9.0]);
        assert_eq!(data.days(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn decreasing_cumulative_is_rejected() {
        let err = TimeSeriesData::from_cumulative("p", &[3.0, 2.0]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(TimeSeriesData::new("p", Vec::new()).is_err());
    }

    #[test]
    fn effort_absent_when_all_zero() {
        let data = TimeSeriesData::from_cumulative("p", &[1.0, 2.0]).unwrap();
        assert!(data.cumulative_actual_effort().is_none());
    }

    #[test]
    fn date_for_day_uses_start_date() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let data = TimeSeriesData::from_cumulative("p", &[1.0, 2.0])
            .unwrap()
            .with_start_date(start);
        assert_eq!(data.date_for_day(1), Some(start));
        assert_eq!(data.date_for_day(3), NaiveDate::from_ymd_opt(2025, 4, 1));
    }

    #[test]
    fn bounds_clip_and_contain() {
        let b = Bounds::new(vec![0.0, -1.0], vec![1.0, 1.0]).unwrap();
        let x = b.clipped(&[2.0, f64::NAN]);
        assert_eq!(x, vec![1.0, 0.0]);
        assert!(b.contains(&x));
        assert!(!b.contains(&[0.5]));
    }

    #[test]
    fn bounds_reject_inverted_axis() {
        assert!(Bounds::new(vec![1.0], vec![0.0]).is_err());
        assert!(Bounds::new(vec![0.0, 0.0], vec![1.0]).is_err());
    }

    #[test]
    fn model_set_keeps_catalog_order() {
        let set = ModelSet::from_categories(&[ModelCategory::Coverage, ModelCategory::Basic]);
        let models = set.models();
        assert_eq!(models.len(), 8);
        assert_eq!(models[0], ModelKind::Exponential);
        assert_eq!(models[7], ModelKind::CoverageGompertz);
        assert_eq!(ModelSet::all().models().len(), ModelKind::ALL.len());
    }
}

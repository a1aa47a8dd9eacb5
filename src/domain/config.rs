//! Engine configuration.
//!
//! Every section and field is independently overridable. A JSON document only
//! needs the fields it changes; the rest fall back to the defaults below.
//!
//! ```json
//! { "optimizer": { "seed": 7, "pso": { "swarm_size": 50 } },
//!   "bootstrap": { "iterations": 500 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppError;

/// Velocity multiplier applied when a particle is reflected off a bound.
pub const DEFAULT_REFLECTION_DAMPING: f64 = -0.5;
/// Iterations without relative improvement before PSO / Grey Wolf stop.
pub const DEFAULT_STAGNATION_WINDOW: usize = 50;
/// Non-improving Nelder-Mead iterations before the simplex is abandoned.
pub const DEFAULT_STALL_WINDOW: usize = 100;
/// Grid points per axis for dimension `<= 2`, `3`, `> 3`.
pub const DEFAULT_GRID_POINTS: [usize; 3] = [20, 10, 8];
/// Grid-search descent step multiplier after a non-improving move.
pub const DEFAULT_STEP_DECAY: f64 = 0.5;
/// Grid-search descent step (unit-box length) at which refinement stops.
pub const DEFAULT_MIN_STEP: f64 = 1e-12;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub optimizer: OptimizerConfig,
    pub heuristics: HeuristicsConfig,
    pub fitting: FittingConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Base seed for the randomized strategies; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub grid: GridSearchConfig,
    pub pso: PsoConfig,
    pub differential_evolution: DifferentialEvolutionConfig,
    pub grey_wolf: GreyWolfConfig,
    pub nelder_mead: NelderMeadConfig,
    pub cmaes: CmaesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchConfig {
    /// Explicit points per axis; overrides the dimension-based resolution.
    pub grid_size: Option<usize>,
    /// Points per axis for dimension `<= 2`, `3`, `> 3`.
    pub points_by_dim: [usize; 3],
    pub gd_iterations: usize,
    /// Initial step length in unit-box coordinates.
    pub learning_rate: f64,
    /// Central-difference step as a fraction of each axis range.
    pub fd_step: f64,
    /// Step multiplier applied after a non-improving move.
    pub step_decay: f64,
    /// Descent stops once the step falls below this.
    pub min_step: f64,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            grid_size: None,
            points_by_dim: DEFAULT_GRID_POINTS,
            gd_iterations: 300,
            learning_rate: 0.05,
            fd_step: 1e-5,
            step_decay: DEFAULT_STEP_DECAY,
            min_step: DEFAULT_MIN_STEP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsoConfig {
    pub swarm_size: usize,
    pub max_iterations: usize,
    pub inertia_start: f64,
    pub inertia_end: f64,
    pub cognitive: f64,
    pub social: f64,
    /// Velocity cap per axis as a fraction of that axis' range.
    pub velocity_fraction: f64,
    pub reflection_damping: f64,
    pub stagnation_window: usize,
    pub tolerance: f64,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            swarm_size: 30,
            max_iterations: 400,
            inertia_start: 0.9,
            inertia_end: 0.4,
            cognitive: 1.5,
            social: 1.5,
            velocity_fraction: 0.2,
            reflection_damping: DEFAULT_REFLECTION_DAMPING,
            stagnation_window: DEFAULT_STAGNATION_WINDOW,
            tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentialEvolutionConfig {
    pub population_size: usize,
    pub max_generations: usize,
    /// Mutation scale `F`.
    pub scaling_factor: f64,
    /// Binomial crossover probability `CR`.
    pub crossover_rate: f64,
    /// Stop when the population's objective spread falls below this (relative).
    pub tolerance: f64,
}

impl Default for DifferentialEvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 40,
            max_generations: 500,
            scaling_factor: 0.7,
            crossover_rate: 0.9,
            tolerance: 1e-12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreyWolfConfig {
    pub pack_size: usize,
    pub max_iterations: usize,
    pub stagnation_window: usize,
    pub tolerance: f64,
}

impl Default for GreyWolfConfig {
    fn default() -> Self {
        Self {
            pack_size: 30,
            max_iterations: 400,
            stagnation_window: DEFAULT_STAGNATION_WINDOW,
            tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
    pub max_iterations: usize,
    pub reflection: f64,
    pub expansion: f64,
    pub contraction: f64,
    pub shrink: f64,
    /// Stop when `f(worst) - f(best)` falls below this.
    pub tolerance: f64,
    pub stall_window: usize,
    /// Initial vertex offset as a fraction of each axis range.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
            tolerance: 1e-10,
            stall_window: DEFAULT_STALL_WINDOW,
            initial_step: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmaesConfig {
    /// `λ`; defaults to `4 + ⌊3 ln n⌋`.
    pub population_size: Option<usize>,
    /// `μ`; defaults to `λ / 2`.
    pub elite_count: Option<usize>,
    pub max_generations: usize,
    /// Initial step size in the unconstrained (logit) space.
    pub initial_sigma: f64,
    pub tolerance: f64,
}

impl Default for CmaesConfig {
    fn default() -> Self {
        Self {
            population_size: None,
            elite_count: None,
            max_generations: 600,
            initial_sigma: 0.5,
            tolerance: 1e-12,
        }
    }
}

/// Data-driven initial-guess and bound heuristics for the model catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    /// Lower bound of the total-scale parameter, as a multiple of the max observed count.
    pub scale_min: f64,
    /// Upper bound of the total-scale parameter, as a multiple of the max observed count.
    pub scale_max: f64,
    /// Initial scale when the late slope shows a plateau.
    pub scale_plateau: f64,
    pub scale_mid: f64,
    /// Initial scale when discovery is still growing.
    pub scale_growing: f64,
    /// Late/early slope ratio below which the series counts as plateaued.
    pub plateau_slope_ratio: f64,
    /// Late/early slope ratio above which the series counts as still growing.
    pub growing_slope_ratio: f64,
    /// Default change point as a fraction of the observed window.
    pub change_point_ratio: f64,
    pub imperfect_p_default: f64,
    pub imperfect_p_min: f64,
    pub imperfect_p_max: f64,
    pub rate_min: f64,
    pub rate_max: f64,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            scale_min: 1.0,
            scale_max: 10.0,
            scale_plateau: 1.1,
            scale_mid: 1.5,
            scale_growing: 2.5,
            plateau_slope_ratio: 0.2,
            growing_slope_ratio: 0.5,
            change_point_ratio: 0.5,
            imperfect_p_default: 0.05,
            imperfect_p_min: -0.5,
            imperfect_p_max: 0.9,
            rate_min: 1e-5,
            rate_max: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FittingConfig {
    /// Worker threads for the model batch; `None` uses the global rayon pool.
    pub workers: Option<usize>,
    /// Shares of the estimated total to predict, each in `(0, 1)`.
    pub thresholds: Vec<f64>,
    /// Days past the last observation searched for threshold crossings.
    pub horizon_days: u32,
}

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            workers: None,
            thresholds: vec![0.90, 0.95, 0.99],
            horizon_days: 3650,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub iterations: usize,
    pub percentiles: [f64; 2],
    /// Nelder-Mead iteration cap for each refit.
    pub refit_max_iterations: usize,
    pub workers: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: 200,
            percentiles: [2.5, 97.5],
            refit_max_iterations: 150,
            workers: None,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Load a JSON configuration.
    ///
    /// A missing source (no path, or a path that does not exist) yields the
    /// defaults. A file that exists but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            debug!("no configuration source given; using defaults");
            return Ok(Self::default());
        };

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "configuration file not found; using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::new(
                    5,
                    format!("Failed to read configuration '{}': {e}", path.display()),
                ));
            }
        };

        let config = Self::from_json(&text)
            .map_err(|e| AppError::new(2, format!("Invalid configuration '{}': {e}", path.display())))?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| AppError::new(2, format!("Malformed configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let o = &self.optimizer;
        if o.pso.swarm_size == 0 || o.grey_wolf.pack_size == 0 {
            return Err(AppError::new(2, "Swarm and pack sizes must be > 0."));
        }
        if !(o.pso.velocity_fraction.is_finite() && o.pso.velocity_fraction > 0.0) {
            return Err(AppError::new(2, "PSO velocity fraction must be positive."));
        }
        if !(-1.0..=0.0).contains(&o.pso.reflection_damping) {
            return Err(AppError::new(2, "PSO reflection damping must lie in [-1, 0]."));
        }
        if o.differential_evolution.population_size < 4 {
            return Err(AppError::new(2, "Differential evolution needs a population of at least 4."));
        }
        if !(o.differential_evolution.crossover_rate >= 0.0 && o.differential_evolution.crossover_rate <= 1.0) {
            return Err(AppError::new(2, "Crossover rate must lie in [0, 1]."));
        }
        let nm = &o.nelder_mead;
        if ![nm.reflection, nm.expansion, nm.contraction, nm.shrink]
            .iter()
            .all(|c| c.is_finite() && *c > 0.0)
        {
            return Err(AppError::new(2, "Nelder-Mead coefficients must be positive."));
        }
        if !(o.cmaes.initial_sigma.is_finite() && o.cmaes.initial_sigma > 0.0) {
            return Err(AppError::new(2, "CMA-ES initial sigma must be positive."));
        }
        if o.grid.grid_size == Some(0) || o.grid.points_by_dim.contains(&0) {
            return Err(AppError::new(2, "Grid resolution must be > 0."));
        }
        if !(o.grid.step_decay > 0.0 && o.grid.step_decay < 1.0) {
            return Err(AppError::new(2, "Grid-search step decay must lie in (0, 1)."));
        }
        if !(o.grid.min_step.is_finite() && o.grid.min_step > 0.0) {
            return Err(AppError::new(2, "Grid-search minimum step must be positive."));
        }

        let h = &self.heuristics;
        if !(h.scale_min > 0.0 && h.scale_max >= h.scale_min) {
            return Err(AppError::new(2, "Scale bounds must satisfy 0 < scale_min <= scale_max."));
        }
        if !(h.rate_min > 0.0 && h.rate_max > h.rate_min) {
            return Err(AppError::new(2, "Rate bounds must satisfy 0 < rate_min < rate_max."));
        }
        if !(h.imperfect_p_min < h.imperfect_p_max && h.imperfect_p_max < 1.0) {
            return Err(AppError::new(2, "Imperfect-debugging bounds must satisfy p_min < p_max < 1."));
        }
        if !(h.change_point_ratio > 0.0 && h.change_point_ratio < 1.0) {
            return Err(AppError::new(2, "Change-point ratio must lie in (0, 1)."));
        }

        if self.fitting.thresholds.iter().any(|t| !(*t > 0.0 && *t < 1.0)) {
            return Err(AppError::new(2, "Convergence thresholds must lie in (0, 1)."));
        }
        let [lo, hi] = self.bootstrap.percentiles;
        if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) || lo > hi {
            return Err(AppError::new(2, "Bootstrap percentiles must satisfy 0 <= lo <= hi <= 100."));
        }
        if self.fitting.workers == Some(0) || self.bootstrap.workers == Some(0) {
            return Err(AppError::new(2, "Worker counts must be > 0."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_yields_defaults() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config, EngineConfig::default());

        let missing = Path::new("/nonexistent/defect-curves/config.json");
        let config = EngineConfig::load(Some(missing)).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let config = EngineConfig::from_json(
            r#"{ "optimizer": { "seed": 7, "pso": { "swarm_size": 12 } },
                 "bootstrap": { "iterations": 50 } }"#,
        )
        .unwrap();
        assert_eq!(config.optimizer.seed, Some(7));
        assert_eq!(config.optimizer.pso.swarm_size, 12);
        assert_eq!(config.optimizer.pso.reflection_damping, DEFAULT_REFLECTION_DAMPING);
        assert_eq!(config.optimizer.pso.stagnation_window, DEFAULT_STAGNATION_WINDOW);
        assert_eq!(config.bootstrap.iterations, 50);
        assert_eq!(config.bootstrap.percentiles, [2.5, 97.5]);
        assert_eq!(config.heuristics, HeuristicsConfig::default());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let err = EngineConfig::from_json("{ \"optimizer\": 3 }").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_json(r#"{ "bootstrap": { "percentiles": [90.0, 10.0] } }"#).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = EngineConfig::from_json(r#"{ "fitting": { "thresholds": [1.5] } }"#).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn pso_velocity_settings_are_checked() {
        let err = EngineConfig::from_json(r#"{ "optimizer": { "pso": { "velocity_fraction": -0.2 } } }"#)
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(EngineConfig::from_json(r#"{ "optimizer": { "pso": { "velocity_fraction": 0.0 } } }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "optimizer": { "pso": { "reflection_damping": 0.5 } } }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "optimizer": { "pso": { "reflection_damping": -1.0 } } }"#).is_ok());
    }

    #[test]
    fn grid_step_schedule_is_configurable() {
        let config =
            EngineConfig::from_json(r#"{ "optimizer": { "grid": { "step_decay": 0.8, "min_step": 1e-6 } } }"#)
                .unwrap();
        assert_eq!(config.optimizer.grid.step_decay, 0.8);
        assert_eq!(config.optimizer.grid.min_step, 1e-6);
        assert_eq!(config.optimizer.grid.learning_rate, GridSearchConfig::default().learning_rate);
        assert!(EngineConfig::from_json(r#"{ "optimizer": { "grid": { "step_decay": 1.0 } } }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "optimizer": { "grid": { "min_step": 0.0 } } }"#).is_err());
    }
}

//! Command-line parsing for the defect growth-curve fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling/math code; `app` turns these structs into an `EngineConfig` and a
//! pipeline request.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ModelCategory, ModelKind, ModelSet, OptimizerKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "defect", version, about = "Defect-discovery growth curve fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit growth models to a daily test log (CSV or JSON) and report the best one.
    Fit(FitArgs),
    /// Generate a synthetic campaign from a catalog model and fit it.
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Daily test log: CSV with a `defects_found` column, or a `.json` series.
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Project name for reports (defaults to the file name or the JSON field).
    #[arg(long)]
    pub project: Option<String>,

    #[command(flatten)]
    pub options: FitOptions,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Model that generates the synthetic series.
    #[arg(long, value_enum, default_value_t = ModelKind::DelayedSShaped)]
    pub model: ModelKind,

    /// Number of observed days.
    #[arg(long, default_value_t = 40)]
    pub days: usize,

    /// Noise multiplier (0 gives the exact rounded curve).
    #[arg(long, default_value_t = 1.0)]
    pub noise: f64,

    /// Seed for the synthetic series.
    #[arg(long, default_value_t = 42)]
    pub data_seed: u64,

    #[command(flatten)]
    pub options: FitOptions,
}

/// Options shared by `fit` and `demo`.
#[derive(Debug, Args, Clone)]
pub struct FitOptions {
    /// Optimizer strategy.
    #[arg(short, long, value_enum, default_value_t = OptimizerKind::AutoSelect)]
    pub optimizer: OptimizerKind,

    /// Model groups to fit (comma separated).
    #[arg(short, long, value_enum, value_delimiter = ',', default_value = "basic")]
    pub models: Vec<ModelCategory>,

    /// Fit every model group (overrides `--models`).
    #[arg(long)]
    pub all_models: bool,

    /// JSON configuration file (falls back to `DEFECT_CURVES_CONFIG`).
    #[arg(short, long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Compute a bootstrap band with this many refits of the best model.
    #[arg(long, value_name = "N")]
    pub bootstrap: Option<usize>,

    /// Base seed for randomized optimizers and the bootstrap.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for fitting and bootstrap (default: all cores).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Export the full selection (and band) to JSON.
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,

    /// Export observed vs. fitted (and band) per day to CSV.
    #[arg(long, value_name = "FILE")]
    pub export_csv: Option<PathBuf>,

    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

impl FitOptions {
    pub fn model_set(&self) -> ModelSet {
        if self.all_models {
            ModelSet::all()
        } else {
            ModelSet::from_categories(&self.models)
        }
    }
}

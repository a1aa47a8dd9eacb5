//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments and resolves the engine configuration
//! - loads or generates the series
//! - runs fitting + selection (+ bootstrap)
//! - prints reports/plots
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DemoArgs, FitArgs, FitOptions};
use crate::data::{SyntheticSpec, generate_series};
use crate::domain::{EngineConfig, TimeSeriesData};
use crate::error::AppError;

pub mod pipeline;

use pipeline::{FitRequest, RunOutput};

/// Log filter variable; `RUST_LOG` is used when it is unset.
pub const LOG_ENV: &str = "DEFECT_CURVES_LOG";
/// Configuration file used when `--config` is not given.
pub const CONFIG_ENV: &str = "DEFECT_CURVES_CONFIG";

/// Entry point for the `defect` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // Ignore the error when a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let data = crate::io::load_series(&args.input, args.project.as_deref())?;
    run_and_print(&data, &args.options)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut spec = SyntheticSpec::new(args.model, args.data_seed);
    spec.days = args.days;
    spec.noise = args.noise;
    let data = generate_series(&spec)?;
    println!(
        "Synthetic {} series: {} days, params {:?}\n",
        args.model.display_name(),
        spec.days,
        spec.params
    );
    run_and_print(&data, &args.options)
}

fn run_and_print(data: &TimeSeriesData, options: &FitOptions) -> Result<(), AppError> {
    let config = resolve_config(options, std::env::var_os(CONFIG_ENV).map(PathBuf::from))?;
    let request = FitRequest {
        models: options.model_set(),
        optimizer: options.optimizer,
        bootstrap: options.bootstrap.is_some(),
    };
    let RunOutput { selection, band } = pipeline::run_fit(data, &request, &config)?;

    println!(
        "{}",
        crate::report::format_run_summary(data, &selection, options.optimizer, band.as_ref())
    );
    if options.plot {
        let plot = crate::plot::render_fit_plot(
            data,
            &selection.best,
            band.as_ref(),
            options.width,
            options.height,
        );
        println!("{plot}");
    }

    if let Some(path) = &options.export_json {
        crate::io::write_selection_json(path, data, &selection, band.as_ref())?;
    }
    if let Some(path) = &options.export_csv {
        crate::io::write_fit_csv(path, data, &selection, band.as_ref())?;
    }
    Ok(())
}

/// Configuration from `--config` (else `env_path`, else defaults) with CLI
/// overrides applied on top.
pub fn resolve_config(options: &FitOptions, env_path: Option<PathBuf>) -> Result<EngineConfig, AppError> {
    let path = options.config.clone().or(env_path);
    let mut config = EngineConfig::load(path.as_deref())?;

    if let Some(seed) = options.seed {
        config.optimizer.seed = Some(seed);
    }
    if let Some(n) = options.bootstrap {
        config.bootstrap.iterations = n;
    }
    if let Some(workers) = options.workers {
        config.fitting.workers = Some(workers);
        config.bootstrap.workers = Some(workers);
    }
    config.validate()?;
    debug!(?path, seed = ?config.optimizer.seed, "engine configuration resolved");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(extra: &[&str]) -> FitOptions {
        let mut argv = vec!["defect", "fit", "-i", "x.csv"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Fit(args) => args.options,
            Command::Demo(_) => unreachable!(),
        }
    }

    #[test]
    fn cli_overrides_config() {
        let config = resolve_config(&options(&["--seed", "5", "--bootstrap", "25", "--workers", "3"]), None).unwrap();
        assert_eq!(config.optimizer.seed, Some(5));
        assert_eq!(config.bootstrap.iterations, 25);
        assert_eq!(config.fitting.workers, Some(3));
        assert_eq!(config.bootstrap.workers, Some(3));
    }

    #[test]
    fn missing_config_source_falls_back_to_defaults() {
        let config = resolve_config(
            &options(&[]),
            Some(PathBuf::from("/nonexistent/defect-curves.json")),
        )
        .unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let err = resolve_config(&options(&["--workers", "0"]), None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}

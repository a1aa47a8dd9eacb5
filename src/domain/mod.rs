//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the input series (`TimeSeriesData`, `DailyRecord`)
//! - catalog/selection enums (`ModelKind`, `ModelCategory`, `ModelSet`, `OptimizerKind`)
//! - optimizer and fit outputs (`OptimizationResult`, `FittingResult`, `BootstrapBand`)
//! - the engine configuration (`EngineConfig`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;

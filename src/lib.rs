//! `defect-curves` library crate.
//!
//! The binary (`defect`) is a thin wrapper around this library so that:
//!
//! - the fitting engine is testable without spawning processes
//! - the optimizers and model catalog are reusable on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod optim;
pub mod plot;
pub mod report;

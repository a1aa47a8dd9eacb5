//! Defect-discovery growth model catalog.
//!
//! Models are implemented as small, pure functions so that fitting/search code can
//! stay generic. `model` routes a [`ModelKind`](crate::domain::ModelKind) to its
//! family module.

pub mod basic;
pub mod change_point;
pub mod coverage;
pub mod effort;
pub mod heuristics;
pub mod imperfect;
pub mod model;

pub use heuristics::DataSummary;
pub use model::*;

//! Mathematical utilities: least squares, fit statistics, bounded transforms.

pub mod ols;
pub mod stats;
pub mod transform;

pub use ols::*;
pub use stats::*;
pub use transform::*;

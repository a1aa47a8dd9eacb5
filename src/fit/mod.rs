//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit one catalog model to a series with a chosen optimizer (`fitter`)
//! - derive threshold predictions from a fitted curve (`predictions`)
//! - fit a whole model set in parallel and select the minimum-AIC success (`selection`)
//! - bootstrap a percentile band around the chosen curve (`bootstrap`)

pub mod bootstrap;
pub mod fitter;
pub mod predictions;
pub mod selection;

pub use bootstrap::*;
pub use fitter::*;
pub use predictions::*;
pub use selection::*;

use crate::error::AppError;

/// Run `op` on a dedicated pool of `workers` threads, or on the global pool.
pub(crate) fn with_pool<T, F>(workers: Option<usize>, op: F) -> Result<T, AppError>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    match workers {
        None => Ok(op()),
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n.max(1))
                .build()
                .map_err(|e| AppError::new(4, format!("Failed to build worker pool: {e}")))?;
            Ok(pool.install(op))
        }
    }
}

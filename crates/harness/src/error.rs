//! Top-level harness error

use crate::config::ConfigError;
use stalefh_core::SetupError;
use thiserror::Error;

/// Any error that prevents a run from producing a report
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Configuration could not be loaded or failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The environment could not be set up
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Result type for harness operations
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

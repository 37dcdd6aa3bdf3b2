//! Error taxonomy for the harvester.

use evm::ChainError;
use thiserror::Error;

/// Startup configuration problems. Always fatal, raised before any chain call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid address for {field}: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("unknown fork {0:?}")]
    UnknownFork(String),

    #[error("unsupported settlement currency {0:?}")]
    UnknownCurrency(String),

    #[error("{0}")]
    Invalid(String),
}

/// Failure processing one fork or the settlement step.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("failed to append run record: {0}")]
    RecordLog(#[from] std::io::Error),
}

pub type Result<T, E = HarvestError> = std::result::Result<T, E>;

//! Error types.
//!
//! Only conditions that stop a whole run are errors. Per-group problems,
//! unresolved conflicts and deferred reinsertions are reported as
//! [`Diagnostic`](crate::models::Diagnostic)s in the run result.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::DutyCategory;

/// Result alias for engine operations.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors that abort a calculation run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("calculation cancelled before the {phase} phase")]
    Cancelled { phase: DutyCategory },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Engine configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by a [`DutyStore`](crate::store::DutyStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("write conflict: {0}")]
    Conflict(String),
}

//! Error types for the search engine.

use thiserror::Error;

use crate::oracle::OracleError;

/// Errors returned by [`MctsEngine`](crate::mcts::MctsEngine) operations.
#[derive(Debug, Error)]
pub enum MctsError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("oracle contract violation: {0}")]
    OracleContractViolation(String),

    #[error("oracle evaluation failed: {0}")]
    Oracle(#[from] OracleError),
}

pub type Result<T> = std::result::Result<T, MctsError>;

//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("script step {step} failed: {message}")]
    Script { step: usize, message: String },
}

impl ApplicationError {
    /// Attach the failing step number to an error raised while replaying.
    pub fn at_step(step: usize, source: impl std::fmt::Display) -> Self {
        Self::Script {
            step,
            message: source.to_string(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

//! CLI-level errors (wraps infrastructure errors)

use std::io;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                    exitcode::NOINPUT
                }
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Parse { .. } => exitcode::DATAERR,
                InfraError::Application(app) => match app {
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::Script { .. } => exitcode::DATAERR,
                    ApplicationError::Domain(DomainError::ContractViolation(_)) => exitcode::SOFTWARE,
                    ApplicationError::Domain(_) => exitcode::DATAERR,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CliError::Usage("x".into()), exitcode::USAGE)]
    #[case(CliError::from(ApplicationError::Config { message: "bad".into() }), exitcode::CONFIG)]
    #[case(CliError::from(ApplicationError::at_step(3, "boom")), exitcode::DATAERR)]
    #[case(
        CliError::Infra(InfraError::io("read x", io::Error::from(io::ErrorKind::NotFound))),
        exitcode::NOINPUT
    )]
    #[case(
        CliError::from(ApplicationError::Domain(DomainError::ContractViolation("skew".into()))),
        exitcode::SOFTWARE
    )]
    fn given_error_when_mapping_then_uses_sysexits_code(#[case] error: CliError, #[case] code: i32) {
        assert_eq!(error.exit_code(), code);
    }
}

//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;

/// Domain errors represent violations of the projection contract.
/// These are independent of I/O and configuration concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("node is not owned by this tree: {0}")]
    UnknownNode(NodeId),

    /// A source notification does not match the projection's view of the source.
    /// The projection would desynchronize if this were skipped.
    #[error("source contract violated: {0}")]
    ContractViolation(String),

    #[error("record has no value for field '{field}'")]
    MissingField { field: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

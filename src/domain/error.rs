//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::identifier::Identifier;
use crate::domain::tree::NodeId;

/// Coarse classification of a [`ModelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required input was missing or malformed.
    InvalidArgument,
    /// A precondition about model membership or tree position was violated.
    InvalidOperation,
}

/// Domain errors represent violated preconditions of a single operation.
/// The operation that returns one has not changed the tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("feature already present in model: {0}")]
    FeatureAlreadyPresent(Identifier),

    #[error("feature not found in model: {0}")]
    FeatureNotFound(Identifier),

    #[error("cannot remove root feature: {0}")]
    RootRemoval(Identifier),

    #[error("root feature has no siblings: {0}")]
    RootHasNoSiblings(Identifier),

    #[error("node not found in tree: {0}")]
    NodeNotFound(NodeId),

    #[error("node already has a parent: {0}")]
    AlreadyAttached(NodeId),

    #[error("inserting {0} would create a cycle")]
    CycleDetected(NodeId),

    #[error("child index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            _ => ErrorKind::InvalidOperation,
        }
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

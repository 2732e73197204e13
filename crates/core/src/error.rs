//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification the calling layer maps to user-visible failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidState,
    Conflict,
}

/// Domain-level error.
///
/// Every variant is raised before any mutation is persisted, so a caller that
/// receives one can correct its input and retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller input is structurally or semantically invalid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Submission attempted while checklist tasks are still open.
    #[error("validation failed: {pendentes} tarefa(s) pendente(s) impedem a submissão")]
    PendingTasks { pendentes: usize },

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is not permitted in the current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Stale write (optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_)
            | DomainError::PendingTasks { .. }
            | DomainError::InvalidId(_) => ErrorKind::Validation,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::InvalidState(_) => ErrorKind::InvalidState,
            DomainError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

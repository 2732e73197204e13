//! Errors surfaced by engine operations.

use thiserror::Error;

use remanejamento_core::{DomainError, ErrorKind};

use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Classification for the calling layer. Backend failures have no domain
    /// kind and return `None`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EngineError::Domain(e) => Some(e.kind()),
            EngineError::Store(StoreError::Conflict(_)) => Some(ErrorKind::Conflict),
            EngineError::Store(StoreError::NotFound(_)) => Some(ErrorKind::NotFound),
            EngineError::Store(StoreError::Backend(_)) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == Some(ErrorKind::Conflict)
    }

    /// Open tasks reported by a rejected submission.
    pub fn tarefas_pendentes(&self) -> Option<usize> {
        match self {
            EngineError::Domain(DomainError::PendingTasks { pendentes }) => Some(*pendentes),
            _ => None,
        }
    }
}

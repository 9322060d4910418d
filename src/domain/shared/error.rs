//! Domain errors

use super::value_objects::CallId;
use thiserror::Error;

/// Result type for domain and store operations
pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Line busy: {0} is already on an active call")]
    LineBusy(String),

    #[error("Call not found: {0}")]
    NotFound(CallId),

    #[error("Call already ended: {0}")]
    AlreadyEnded(CallId),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::InvalidRequest(_) => "invalid_request",
            DomainError::LineBusy(_) => "line_busy",
            DomainError::NotFound(_) => "not_found",
            DomainError::AlreadyEnded(_) => "already_ended",
            DomainError::InvalidStateTransition(_) => "invalid_state_transition",
            DomainError::Storage(_) => "storage",
        }
    }
}

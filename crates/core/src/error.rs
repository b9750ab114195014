//! Domain error model.

use thiserror::Error;

use crate::job::JobStatus;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic failures (input validation, lifecycle
/// invariants). Collaborator and transport failures belong to the crates that
/// talk to those collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The inbound webhook payload failed one of the intake checks.
    ///
    /// The message names the violated rule and is returned verbatim to the caller.
    #[error("{0}")]
    InvalidWebhookPayload(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A job status change would move backwards or skip a state.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

impl DomainError {
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidWebhookPayload(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

//! Queued unit of work and its failure modes.

use std::time::Duration;

use serde_json::Value as JsonValue;

use autocat_ai::AiError;
use autocat_core::{AcceptedWebhook, JobId, TransactionId};

use crate::external::LedgerError;

use super::registry::RegistryError;

/// Everything one categorization run needs, captured at intake.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationTask {
    pub job_id: JobId,
    pub destination_name: String,
    pub description: String,
    pub transaction_id: TransactionId,
    pub transactions: Vec<JsonValue>,
}

impl ClassificationTask {
    pub fn new(job_id: JobId, accepted: AcceptedWebhook) -> Self {
        Self {
            job_id,
            destination_name: accepted.destination_name,
            description: accepted.description,
            transaction_id: accepted.transaction_id,
            transactions: accepted.transactions,
        }
    }
}

/// A remote collaborator call failed.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Classifier(#[from] AiError),
}

impl CollaboratorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            CollaboratorError::Ledger(LedgerError::Cancelled)
                | CollaboratorError::Classifier(AiError::Cancelled)
        )
    }
}

/// Why a task did not complete.
///
/// None of these reach the webhook caller; the job simply stays at the last
/// status it reached.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("task exceeded its {0:?} execution budget")]
    TimedOut(Duration),

    #[error("task cancelled")]
    Cancelled,
}

impl From<LedgerError> for TaskError {
    fn from(err: LedgerError) -> Self {
        TaskError::Collaborator(err.into())
    }
}

impl From<AiError> for TaskError {
    fn from(err: AiError) -> Self {
        TaskError::Collaborator(err.into())
    }
}

/// How a task ended, as recorded by the worker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

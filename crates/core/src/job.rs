//! Categorization job record and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::JobId;

/// Job lifecycle status.
///
/// Statuses only move forward, one step at a time:
/// `queued -> in_progress -> finished`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted and waiting for the worker.
    Queued,
    /// Picked up by the worker.
    InProgress,
    /// Categorization completed (with or without a category).
    Finished,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Finished => "finished",
        }
    }

    /// The only status this one may move to, if any.
    pub fn next(&self) -> Option<JobStatus> {
        match self {
            JobStatus::Queued => Some(JobStatus::InProgress),
            JobStatus::InProgress => Some(JobStatus::Finished),
            JobStatus::Finished => None,
        }
    }

    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        self.next() == Some(to)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished)
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic fields tracked for a job.
///
/// Starts with the counterparty and description; the classification fields
/// are filled in once the worker resolved a category. The record is always
/// replaced as a whole, never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    pub destination_name: String,
    pub description: String,
    /// Resolved category name; `null` when nothing matched.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl JobData {
    pub fn new(destination_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            destination_name: destination_name.into(),
            description: description.into(),
            category: None,
            prompt: None,
            response: None,
        }
    }

    /// Return a copy of this record carrying a classification outcome.
    pub fn with_classification(
        &self,
        category: Option<String>,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            destination_name: self.destination_name.clone(),
            description: self.description.clone(),
            category,
            prompt: Some(prompt.into()),
            response: Some(response.into()),
        }
    }

    /// Whether a classification outcome has been recorded.
    pub fn is_classified(&self) -> bool {
        self.prompt.is_some()
    }
}

/// A tracked categorization job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub created: DateTime<Utc>,
    pub status: JobStatus,
    pub data: JobData,
}

impl Job {
    /// Create a new queued job.
    pub fn new(data: JobData) -> Self {
        Self {
            id: JobId::new(),
            created: Utc::now(),
            status: JobStatus::Queued,
            data,
        }
    }

    /// Move the job to `to`, rejecting regressions and skips.
    pub fn advance(&mut self, to: JobStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

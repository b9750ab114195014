use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of one classification request.
///
/// `prompt` and `response` are kept for display even when nothing matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Matched category name from the supplied list, if any.
    pub category: Option<String>,
    /// Prompt sent to the model.
    pub prompt: String,
    /// Raw model output.
    pub response: String,
}

impl Classification {
    pub fn matched(category: impl Into<String>, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            prompt: prompt.into(),
            response: response.into(),
        }
    }

    pub fn unmatched(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            category: None,
            prompt: prompt.into(),
            response: response.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    /// The service could not be reached or answered with a non-success status.
    #[error("error while communicating with the classifier: {} - {body}", status.map(|s| s.to_string()).unwrap_or_else(|| "no status".to_string()))]
    Service { status: Option<u16>, body: String },

    /// The service answered, but not in the expected shape.
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),

    /// The job that asked for this classification was abandoned.
    #[error("classification cancelled")]
    Cancelled,

    #[error("invalid classifier configuration: {0}")]
    InvalidConfig(String),
}

impl AiError {
    pub fn service(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Service {
            status,
            body: body.into(),
        }
    }
}

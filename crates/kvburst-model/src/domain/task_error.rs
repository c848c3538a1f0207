use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a single task.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TaskError {
    /// The task ran and returned an error (network failure, timeout, ...).
    #[error("task failed: {reason}")]
    Fail { reason: String },
    /// The task panicked before producing a result.
    #[error("task panicked: {reason}")]
    Panicked { reason: String },
    /// The task was aborted before it could finish.
    #[error("task canceled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    /// Human readable reason without the variant prefix.
    pub fn reason(&self) -> &str {
        match self {
            TaskError::Fail { reason } | TaskError::Panicked { reason } => reason,
            TaskError::Canceled => "canceled",
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TaskIndex;

/// Why a run finished before dispatching every task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StopReason {
    /// A task failed while running under [`ErrorPolicy::AbortOnFirstError`](crate::ErrorPolicy).
    Aborted { index: TaskIndex, reason: String },
    /// The cancellation token fired before a dispatch.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Aborted { index, reason } => {
                write!(f, "aborted by task {index}: {reason}")
            }
            StopReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

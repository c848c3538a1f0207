use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{StatusCode, TaskResult};

/// Category a finished task is tallied under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// The task produced a status code.
    Status(StatusCode),
    /// The task produced no response.
    Failed,
}

impl Outcome {
    pub fn of(result: &TaskResult) -> Self {
        match result {
            Ok(code) => Outcome::Status(*code),
            Err(_) => Outcome::Failed,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Status(code) => write!(f, "{code}"),
            Outcome::Failed => f.write_str("no response"),
        }
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// How a run reacts to a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorPolicy {
    /// Every task runs; failures are tallied like any other outcome.
    #[default]
    TolerateAndTally,
    /// Stop dispatching once a task fails and report that failure.
    AbortOnFirstError,
}

impl ErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorPolicy::TolerateAndTally => "tolerate",
            ErrorPolicy::AbortOnFirstError => "abort",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "tolerate" | "tally" | "tolerate-and-tally" => Ok(ErrorPolicy::TolerateAndTally),
            "abort" | "abort-on-first-error" => Ok(ErrorPolicy::AbortOnFirstError),
            _ => Err(ModelError::InvalidPolicy(s.to_string())),
        }
    }
}

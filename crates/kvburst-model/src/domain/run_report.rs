use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ErrorPolicy, FailureRecord, StatusCode, StopReason};

/// Read-only outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Number of tasks the run was asked to execute.
    pub total: usize,
    /// Concurrency window.
    pub limit: usize,
    pub policy: ErrorPolicy,
    /// Tasks dispatched.
    pub started: usize,
    /// Tasks finished (success or failure).
    pub completed: usize,
    /// Highest number of tasks observed in flight at once.
    pub peak_in_flight: usize,
    /// Status code -> occurrences.
    pub statuses: BTreeMap<StatusCode, usize>,
    /// Every failed task, in completion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
    /// Set when the run stopped before dispatching every task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped: Option<StopReason>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn count_of(&self, status: StatusCode) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }

    /// Tasks that produced a status code.
    pub fn succeeded(&self) -> usize {
        self.statuses.values().sum()
    }

    /// Tasks that produced no response.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Sum over every outcome category.
    pub fn tallied(&self) -> usize {
        self.succeeded() + self.failed()
    }

    /// Returns `true` if every task ran.
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }

    /// Tasks whose status is not in `expected`.
    pub fn unexpected(&self, expected: &[StatusCode]) -> usize {
        self.statuses
            .iter()
            .filter(|(code, _)| !expected.contains(*code))
            .map(|(_, n)| n)
            .sum()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stopped {
            Some(reason) => writeln!(f, "DONE {reason}")?,
            None => writeln!(f, "DONE")?,
        }
        writeln!(f, "count: {}", self.started)?;
        writeln!(f, "completed: {}/{}", self.completed, self.total)?;
        for (code, n) in &self.statuses {
            writeln!(f, "{code}: {n}")?;
        }
        writeln!(f, "no response: {}", self.failed())?;
        write!(
            f,
            "limit: {} (peak {}), policy: {}, elapsed: {}ms",
            self.limit, self.peak_in_flight, self.policy, self.elapsed_ms
        )
    }
}

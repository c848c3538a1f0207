use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a run: `Idle -> Running -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    /// Terminal.
    Completed,
}

impl RunPhase {
    /// Returns `true` if `self -> next` is a legal transition.
    pub fn can_enter(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (RunPhase::Idle, RunPhase::Running) | (RunPhase::Running, RunPhase::Completed)
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Completed => "completed",
        };
        f.write_str(s)
    }
}

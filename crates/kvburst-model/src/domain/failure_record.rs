use serde::{Deserialize, Serialize};

use crate::TaskIndex;

/// A failed task and the reason it gave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub index: TaskIndex,
    pub reason: String,
}

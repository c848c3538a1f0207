use thiserror::Error;

use crate::RunPhase;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid error policy: {0} (expected: tolerate|abort)")]
    InvalidPolicy(String),
    #[error("illegal run phase transition: {from} -> {to}")]
    IllegalTransition { from: RunPhase, to: RunPhase },
}

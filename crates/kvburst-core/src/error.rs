use thiserror::Error;

use kvburst_model::ModelError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid runner config: {0}")]
    InvalidConfig(String),

    #[error("run state error: {0}")]
    State(#[from] ModelError),
}

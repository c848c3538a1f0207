use thiserror::Error;

use kvburst_model::ModelError;
use kvburst_observe::LoggerError;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("invalid base url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Policy(#[from] ModelError),

    #[error(transparent)]
    Logger(#[from] LoggerError),
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

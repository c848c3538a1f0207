use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (expected: text|json|journald)")]
    InvalidFormat(String),
    #[error("journald output needs linux and the `journald` feature")]
    JournaldNotSupported,
    #[error("a global logger is already installed")]
    AlreadyInitialized,
    #[error("logger setup failed: {0}")]
    InitializationFailed(String),
    #[error("invalid log filter {0:?}")]
    InvalidLogLevel(String),
}

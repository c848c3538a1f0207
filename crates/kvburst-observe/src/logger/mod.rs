mod config;
mod error;
mod format;
mod log;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] on a second call.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    log::install(cfg)
}

/// Check that `level` is a valid filter directive without installing anything.
pub fn check_level(level: &str) -> Result<(), LoggerError> {
    log::mk_filter(level).map(|_| ())
}

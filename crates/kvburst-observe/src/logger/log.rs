use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::time::OffsetTime, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Build the subscriber for `cfg` and make it the global default.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = mk_filter(&cfg.level)?;
    let output = output_layer(cfg)?;

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(as_error)
}

pub(crate) fn mk_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(level).map_err(|_| LoggerError::InvalidLogLevel(level.to_string()))
}

fn output_layer(cfg: &LoggerConfig) -> Result<OutputLayer, LoggerError> {
    match cfg.format {
        LoggerFormat::Text => Ok(fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer())
            .boxed()),
        LoggerFormat::Json => Ok(fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer())
            .boxed()),
        LoggerFormat::Journald => journald_layer(),
    }
}

fn mk_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

// Both the `log` bridge and the tracing dispatcher say "already" when set twice.
fn as_error(e: impl std::fmt::Display) -> LoggerError {
    let s = e.to_string();
    if s.contains("already") {
        LoggerError::AlreadyInitialized
    } else {
        LoggerError::InitializationFailed(s)
    }
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer() -> Result<OutputLayer, LoggerError> {
    tracing_journald::layer()
        .map(|layer| layer.boxed())
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer() -> Result<OutputLayer, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}

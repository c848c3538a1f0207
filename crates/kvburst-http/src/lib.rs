//! HTTP GET load against a key-value store, one request per task index.

mod config;
pub use config::{KeyOrder, LoadConfig, ReportFormat, TargetConfig};

mod errors;
pub use errors::{ConfigError, HttpError};

mod fetch;
pub use fetch::{key_fetch, key_number, key_url};

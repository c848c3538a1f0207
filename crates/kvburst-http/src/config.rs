use std::str::FromStr;

use serde::{Deserialize, Serialize};

use kvburst_core::RunnerConfig;
use kvburst_model::{ErrorPolicy, StatusCode};
use kvburst_observe::{LoggerConfig, LoggerFormat, check_level};

use crate::errors::ConfigError;

const DEFAULT_BASE_URL: &str = "http://localhost:8036/riak/test/key";
const DEFAULT_TOTAL: usize = 1000;
const DEFAULT_LIMIT: usize = 50;
const DEFAULT_TIMEOUT_MS: u64 = 4_000;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_KEY_SPACE: u64 = 1000;

/// How the key number of each request is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum KeyOrder {
    /// Key number equals the task index.
    #[default]
    Sequential,
    /// Key number drawn from `0..space`, reproducible per `(seed, index)`.
    Random { seed: u64, space: u64 },
}

/// Where requests go and how responses are judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Prefix the key number is appended to, without separator.
    pub base_url: String,
    pub keys: KeyOrder,
    /// Whole-request timeout; an expired request is a failed task.
    pub timeout_ms: u64,
    /// Statuses considered normal. Others are still tallied but logged.
    pub expected_statuses: Vec<StatusCode>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            keys: KeyOrder::Sequential,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            expected_statuses: vec![200, 404],
        }
    }
}

/// Output format of the final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(ConfigError::invalid(
                "KVBURST_REPORT",
                s,
                "expected: text|json",
            )),
        }
    }
}

/// Everything the load harness needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    pub target: TargetConfig,
    pub total: usize,
    pub limit: usize,
    pub policy: ErrorPolicy,
    pub report: ReportFormat,
    pub log: LoggerConfig,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            total: DEFAULT_TOTAL,
            limit: DEFAULT_LIMIT,
            policy: ErrorPolicy::default(),
            report: ReportFormat::default(),
            log: LoggerConfig::default(),
        }
    }
}

impl LoadConfig {
    pub fn runner(&self) -> RunnerConfig {
        RunnerConfig::new(self.total, self.limit).with_policy(self.policy)
    }

    /// Defaults overridden by `KVBURST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(url) = lookup("KVBURST_URL") {
            cfg.target.base_url = url;
        }
        if let Some(v) = lookup("KVBURST_TOTAL") {
            cfg.total = parse_num("KVBURST_TOTAL", &v)?;
        }
        match lookup("KVBURST_LIMIT") {
            Some(v) => cfg.limit = parse_num("KVBURST_LIMIT", &v)?,
            // The default window never exceeds a smaller run.
            None => cfg.limit = DEFAULT_LIMIT.min(cfg.total),
        }
        if let Some(v) = lookup("KVBURST_POLICY") {
            cfg.policy = v.parse()?;
        }
        if let Some(v) = lookup("KVBURST_TIMEOUT_MS") {
            cfg.target.timeout_ms = parse_num("KVBURST_TIMEOUT_MS", &v)?;
            if cfg.target.timeout_ms == 0 {
                return Err(ConfigError::invalid("KVBURST_TIMEOUT_MS", &v, "must be > 0"));
            }
        }
        if let Some(v) = lookup("KVBURST_EXPECT") {
            cfg.target.expected_statuses = parse_statuses(&v)?;
        }
        if let Some(v) = lookup("KVBURST_KEYS") {
            cfg.target.keys = match v.trim().to_ascii_lowercase().as_str() {
                "sequential" | "seq" => KeyOrder::Sequential,
                "random" | "rand" => {
                    let seed = match lookup("KVBURST_SEED") {
                        Some(s) => parse_num("KVBURST_SEED", &s)?,
                        None => DEFAULT_SEED,
                    };
                    let space = match lookup("KVBURST_KEY_SPACE") {
                        Some(s) => parse_num("KVBURST_KEY_SPACE", &s)?,
                        None => DEFAULT_KEY_SPACE,
                    };
                    if space == 0 {
                        return Err(ConfigError::invalid("KVBURST_KEY_SPACE", "0", "must be > 0"));
                    }
                    KeyOrder::Random { seed, space }
                }
                _ => {
                    return Err(ConfigError::invalid(
                        "KVBURST_KEYS",
                        &v,
                        "expected: sequential|random",
                    ));
                }
            };
        }
        if let Some(v) = lookup("KVBURST_REPORT") {
            cfg.report = v.parse()?;
        }
        if let Some(v) = lookup("KVBURST_LOG_LEVEL") {
            check_level(&v)?;
            cfg.log.level = v;
        }
        if let Some(v) = lookup("KVBURST_LOG_FORMAT") {
            cfg.log.format = v.parse::<LoggerFormat>()?;
        }

        Ok(cfg)
    }
}

fn parse_num<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::invalid(key, value, e))
}

fn parse_statuses(value: &str) -> Result<Vec<StatusCode>, ConfigError> {
    let codes = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_num::<StatusCode>("KVBURST_EXPECT", s))
        .collect::<Result<Vec<_>, _>>()?;

    if codes.is_empty() {
        return Err(ConfigError::invalid(
            "KVBURST_EXPECT",
            value,
            "at least one status code is required",
        ));
    }
    Ok(codes)
}

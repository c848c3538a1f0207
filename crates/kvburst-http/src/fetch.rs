use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{trace, warn};

use kvburst_core::{TaskFn, TaskRef};
use kvburst_model::{StatusCode, TaskError, TaskIndex};

use crate::config::{KeyOrder, TargetConfig};
use crate::errors::HttpError;

const TASK_NAME: &str = "kv-get";

/// Key number requested by task `index`.
pub fn key_number(keys: &KeyOrder, index: TaskIndex) -> u64 {
    match *keys {
        KeyOrder::Sequential => index as u64,
        KeyOrder::Random { seed, space } => {
            let mix = seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            StdRng::seed_from_u64(mix).random_range(0..space.max(1))
        }
    }
}

/// `base_url` with the key number appended.
pub fn key_url(base_url: &str, keys: &KeyOrder, index: TaskIndex) -> String {
    format!("{base_url}{}", key_number(keys, index))
}

/// Build a task that GETs one key per index and yields the response status.
///
/// Transport errors and timeouts become [`TaskError::Fail`]; any status code,
/// expected or not, is a successful result.
pub fn key_fetch(cfg: &TargetConfig) -> Result<TaskRef, HttpError> {
    validate_base(&cfg.base_url)?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(cfg.timeout_ms))
        .build()
        .map_err(HttpError::Client)?;
    let cfg = Arc::new(cfg.clone());

    let task = TaskFn::arc(TASK_NAME, move |index: TaskIndex| {
        let client = client.clone();
        let cfg = Arc::clone(&cfg);
        let url = key_url(&cfg.base_url, &cfg.keys, index);

        async move {
            trace!(index, %url, "GET");
            match get_status(&client, &url).await {
                Ok(status) => {
                    if !cfg.expected_statuses.contains(&status) {
                        warn!(index, %url, status, "unexpected status");
                    }
                    Ok(status)
                }
                Err(e) => Err(TaskError::fail(e.to_string())),
            }
        }
    });
    Ok(task)
}

async fn get_status(client: &reqwest::Client, url: &str) -> Result<StatusCode, HttpError> {
    let response = client.get(url).send().await?;
    let status = response.status().as_u16();
    // Read to the end so the connection can go back to the pool.
    response.bytes().await?;
    Ok(status)
}

fn validate_base(base_url: &str) -> Result<(), HttpError> {
    let invalid = |reason: String| HttpError::InvalidUrl {
        url: base_url.to_string(),
        reason,
    };
    let url = reqwest::Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}

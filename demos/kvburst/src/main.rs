use anyhow::{Context, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kvburst_core::BoundedRunner;
use kvburst_http::{LoadConfig, ReportFormat, key_fetch};
use kvburst_observe::logger_init;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Config
    let cfg = LoadConfig::from_env().context("failed to load configuration")?;

    // 2) Logger
    logger_init(&cfg.log)?;
    info!(
        url = %cfg.target.base_url,
        keys = ?cfg.target.keys,
        total = cfg.total,
        limit = cfg.limit,
        policy = %cfg.policy,
        "configuration loaded"
    );

    // 3) Runner + task
    let runner = BoundedRunner::new(cfg.runner())?;
    let task = key_fetch(&cfg.target)?;

    // 4) Ctrl+C stops further dispatches; in-flight requests still finish.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; no further requests will be sent");
            on_signal.cancel();
        }
    });

    // 5) Run and report
    let report = runner.run_until_cancelled(task, cancel).await?;
    match cfg.report {
        ReportFormat::Text => println!("{report}"),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    let unexpected = report.unexpected(&cfg.target.expected_statuses);
    if unexpected > 0 {
        warn!(
            unexpected,
            expected = ?cfg.target.expected_statuses,
            "some responses had unexpected status codes"
        );
    }

    if let Some(reason) = &report.stopped {
        bail!(
            "run stopped early after {} of {} requests: {reason}",
            report.completed,
            report.total
        );
    }
    Ok(())
}

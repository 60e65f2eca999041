//! News Monitor — Binary Entrypoint
//! One batch run per invocation; scheduling (cron, systemd timer) stays outside.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_monitor::config::credentials::TelegramCredentials;
use news_monitor::ingest::providers::build_providers;
use news_monitor::metrics::{Metrics, ENV_METRICS_TEXTFILE};
use news_monitor::{JsonlHistoryLog, Monitor, MonitorConfig, SqliteSentStore, TelegramNotifier};

const USER_AGENT: &str = concat!("news-monitor/", env!("CARGO_PKG_VERSION"));

/// Compact logs by default; `LOG_FORMAT=json` for log shippers.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_monitor=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Nothing can be delivered without credentials; fail before any fetch.
    let credentials = TelegramCredentials::from_env()?;
    let config = MonitorConfig::load_default()?;

    let metrics = match std::env::var(ENV_METRICS_TEXTFILE) {
        Ok(path) if !path.trim().is_empty() => Some((Metrics::init()?, path)),
        _ => None,
    };

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.run.fetch_timeout_secs))
        .build()
        .context("building http client")?;

    let providers = build_providers(
        &config.sources,
        &client,
        config.run.max_entries_per_source,
    )?;

    let store = SqliteSentStore::open(&config.storage.db_path).with_context(|| {
        format!("opening sent store {}", config.storage.db_path.display())
    })?;
    let history = JsonlHistoryLog::new(config.storage.history_path.clone());
    let notifier = TelegramNotifier::new(credentials, client.clone())
        .with_api_base(&config.delivery.api_base)
        .with_timeout(config.delivery.timeout_secs);

    tracing::info!(
        sources = providers.len(),
        db = %config.storage.db_path.display(),
        "starting run"
    );

    let mut monitor = Monitor::new(
        config,
        Box::new(notifier),
        Box::new(store),
        Box::new(history),
    );
    let summary = monitor.run(&providers, Utc::now()).await?;

    if let Some((m, path)) = metrics {
        if let Err(e) = m.write_textfile(std::path::Path::new(&path)) {
            tracing::warn!(error = ?e, "metrics textfile not written");
        }
    }

    println!("{summary}");
    Ok(())
}

// src/metrics.rs
//! Counter registration and the optional Prometheus textfile export.
//!
//! Counters are emitted through the `metrics` facade from every stage. Without an
//! installed recorder they are no-ops; the binary installs one when
//! `METRICS_TEXTFILE` is set and writes the exposition there at run end.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::path::Path;

pub const ENV_METRICS_TEXTFILE: &str = "METRICS_TEXTFILE";

/// One-time metrics registration (so series carry descriptions).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_items_total", "Raw items returned by source adapters.");
        describe_counter!(
            "fetch_errors_total",
            "Source adapter failures and timeouts."
        );
        describe_counter!(
            "filter_rejected_total",
            "Candidates rejected by the keyword/recency policy, by reason."
        );
        describe_counter!(
            "dedup_skipped_total",
            "Candidates skipped as duplicate or similar, by kind."
        );
        describe_counter!("delivery_sent_total", "Messages delivered.");
        describe_counter!(
            "delivery_failed_total",
            "Messages abandoned after permanent failure or exhausted retries."
        );
        describe_counter!("delivery_retries_total", "Transient failures retried.");
        describe_gauge!("run_last_finished_ts", "Unix ts when the last run finished.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Write the current exposition to `path` (node-exporter textfile collector).
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.handle.render())
            .with_context(|| format!("writing metrics to {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("renaming metrics file to {}", path.display()))?;
        Ok(())
    }
}

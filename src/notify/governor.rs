// src/notify/governor.rs
//! Sequential, paced delivery of the accepted items.
//!
//! Per item: render, send with retry, then record. A failed item is logged and
//! skipped. A sent-store write failure aborts the run, since dedup cannot be
//! trusted afterwards. History append failures are logged only.

use std::time::Duration;

use chrono::{FixedOffset, Utc};
use metrics::counter;

use super::render::render_message;
use super::retry::{RetryPolicy, RetryState, RetryStep};
use super::{Notifier, TransportError};
use crate::config::MonitorConfig;
use crate::ingest::types::Item;
use crate::metrics::ensure_metrics_described;
use crate::store::{HistoryLog, HistoryRow, SentRecord, SentStore, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    pub sent_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DeliveryGovernor {
    retry: RetryPolicy,
    pacing: Duration,
    offset: FixedOffset,
}

impl DeliveryGovernor {
    pub fn new(retry: RetryPolicy, pacing: Duration, offset: FixedOffset) -> Self {
        Self {
            retry,
            pacing,
            offset,
        }
    }

    pub fn from_config(cfg: &MonitorConfig) -> Self {
        let d = &cfg.delivery;
        Self::new(
            RetryPolicy::new(
                d.max_attempts,
                Duration::from_millis(d.backoff_base_ms),
                Duration::from_millis(d.backoff_max_ms),
            ),
            Duration::from_millis(cfg.run.pacing_ms),
            d.display_offset(),
        )
    }

    /// Send one message, retrying transient failures per the retry policy.
    pub async fn send_with_retry(
        &self,
        notifier: &dyn Notifier,
        text: &str,
        id: &str,
    ) -> Result<(), TransportError> {
        let mut state = RetryState::new(self.retry);
        loop {
            let attempt = state.attempt();
            let err = match notifier.send(text).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            match state.on_failure(&err) {
                RetryStep::Retry(delay) => {
                    tracing::warn!(
                        id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "send failed, retrying"
                    );
                    counter!("delivery_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
                RetryStep::GiveUp => return Err(err),
            }
        }
    }

    pub async fn deliver(
        &self,
        items: &[Item],
        notifier: &dyn Notifier,
        store: &mut dyn SentStore,
        history: &mut dyn HistoryLog,
    ) -> Result<DeliveryReport, StoreError> {
        ensure_metrics_described();

        let mut report = DeliveryReport::default();
        for (i, item) in items.iter().enumerate() {
            let text = render_message(item, self.offset);

            if let Err(e) = self.send_with_retry(notifier, &text, &item.id).await {
                tracing::error!(
                    id = %item.id,
                    source = %item.source_name,
                    error = %e,
                    "delivery failed"
                );
                counter!("delivery_failed_total").increment(1);
                report.failed += 1;
                continue;
            }

            let sent_at = Utc::now();
            let record = SentRecord {
                id: item.id.clone(),
                title: item.title.clone(),
                link: item.link.clone(),
                source_name: item.source_name.clone(),
                published_at: item.published_at,
                sent_at,
            };
            store.insert_if_absent(&record)?;

            if let Err(e) = history.append_row(&HistoryRow::from_item(item, sent_at, self.offset)) {
                tracing::error!(id = %item.id, error = %e, "history append failed");
            }

            tracing::info!(id = %item.id, source = %item.source_name, title = %item.title, "sent");
            counter!("delivery_sent_total").increment(1);
            report.sent += 1;
            report.sent_ids.push(item.id.clone());

            if i + 1 < items.len() && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }
        Ok(report)
    }
}

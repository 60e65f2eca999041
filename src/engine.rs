//! # Run Engine
//! One batch run: fetch → normalize → screen → rank → dedup → deliver.
//!
//! Collaborators are passed in explicitly and live for one run. Fetching is the
//! only concurrent stage; everything after the merge barrier is sequential over an
//! immutable snapshot, so ranking is reproducible for a given input.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};

use crate::analyze::dedup::{self, Deduplicator};
use crate::analyze::{rank, screen, KeywordPolicy};
use crate::config::MonitorConfig;
use crate::ingest::types::{Item, SourceProvider};
use crate::ingest::{fetch_all, normalize_item};
use crate::metrics::ensure_metrics_described;
use crate::notify::{DeliveryGovernor, Notifier};
use crate::store::{HistoryLog, SentStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Raw entries returned by all sources.
    pub fetched: usize,
    /// Items that passed normalization and the filter.
    pub candidates: usize,
    pub sent: usize,
    pub skipped_duplicate: usize,
    pub skipped_similar: usize,
    pub failed: usize,
    /// Ranked candidates left untouched once the per-run cap was reached.
    pub not_considered: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched={} candidates={} sent={} skipped_duplicate={} skipped_similar={} \
             failed={} not_considered={}",
            self.fetched,
            self.candidates,
            self.sent,
            self.skipped_duplicate,
            self.skipped_similar,
            self.failed,
            self.not_considered
        )
    }
}

/// `now - hours`, saturating at the earliest representable time.
pub fn lookback_cutoff(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    chrono::Duration::try_hours(hours.max(0))
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub struct Monitor {
    config: MonitorConfig,
    policy: KeywordPolicy,
    governor: DeliveryGovernor,
    notifier: Box<dyn Notifier>,
    store: Box<dyn SentStore>,
    history: Box<dyn HistoryLog>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        notifier: Box<dyn Notifier>,
        store: Box<dyn SentStore>,
        history: Box<dyn HistoryLog>,
    ) -> Self {
        Self {
            policy: KeywordPolicy::from_config(&config.policy),
            governor: DeliveryGovernor::from_config(&config),
            config,
            notifier,
            store,
            history,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn SentStore {
        self.store.as_ref()
    }

    /// Fetch every source and return the ranked candidate list, without touching
    /// the store. `now` anchors the lookback window.
    pub async fn collect(
        &self,
        providers: &[Box<dyn SourceProvider>],
        now: DateTime<Utc>,
    ) -> (Vec<Item>, usize) {
        ensure_metrics_described();
        let run = &self.config.run;

        let batches = fetch_all(
            providers,
            run.workers,
            Duration::from_secs(run.fetch_timeout_secs),
        )
        .await;

        let cutoff = lookback_cutoff(now, run.lookback_hours);
        let mut fetched = 0usize;
        let mut candidates = Vec::new();

        for batch in batches {
            fetched += batch.items.len();
            for raw in batch.items {
                let Some(item) = normalize_item(raw, &batch.source, batch.kind) else {
                    tracing::debug!(source = %batch.source, "dropped entry without title or link");
                    continue;
                };
                match screen(item, &self.policy, &self.config.context, batch.filtered, cutoff) {
                    Ok(item) => candidates.push(item),
                    Err(verdict) => {
                        counter!("filter_rejected_total", "reason" => verdict.reason())
                            .increment(1);
                    }
                }
            }
        }

        rank::rank(&mut candidates);
        (candidates, fetched)
    }

    /// One full run. Errors only on sent-store failure; everything else is
    /// absorbed into the summary.
    pub async fn run(
        &mut self,
        providers: &[Box<dyn SourceProvider>],
        now: DateTime<Utc>,
    ) -> Result<RunSummary> {
        let (ranked, fetched) = self.collect(providers, now).await;
        let candidates = ranked.len();
        tracing::info!(fetched, candidates, sources = providers.len(), "candidates ready");

        let day_start = dedup::start_of_day(now, self.config.delivery.display_offset());
        let prior = self
            .store
            .titles_sent_since(day_start)
            .context("reading today's sent titles")?;
        let mut dedup = Deduplicator::new(self.config.run.similarity_threshold, prior);
        let selection = dedup::select(
            ranked,
            self.store.as_ref(),
            &mut dedup,
            self.config.run.max_items_per_run,
        )
        .context("checking sent store")?;

        let report = self
            .governor
            .deliver(
                &selection.accepted,
                self.notifier.as_ref(),
                self.store.as_mut(),
                self.history.as_mut(),
            )
            .await
            .context("recording sent item")?;

        let summary = RunSummary {
            fetched,
            candidates,
            sent: report.sent,
            skipped_duplicate: selection.skipped_duplicate,
            skipped_similar: selection.skipped_similar,
            failed: report.failed,
            not_considered: selection.not_considered,
        };

        gauge!("run_last_finished_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(
            sent = summary.sent,
            skipped_duplicate = summary.skipped_duplicate,
            skipped_similar = summary.skipped_similar,
            failed = summary.failed,
            not_considered = summary.not_considered,
            "run finished"
        );
        Ok(summary)
    }
}

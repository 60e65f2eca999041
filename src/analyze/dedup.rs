// src/analyze/dedup.rs
//! Delivery-time dedup over the ranked candidate list.
//!
//! Two gates, in order: exact id against the sent store (authoritative, survives
//! restarts), then fuzzy title similarity against titles sent earlier today and
//! titles accepted earlier in this run. Similarity is `strsim::normalized_levenshtein`
//! on normalized titles; a candidate is rejected when the ratio is strictly above
//! the threshold.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use metrics::counter;
use strsim::normalized_levenshtein;

use crate::ingest::types::Item;
use crate::metrics::ensure_metrics_described;
use crate::store::{SentStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    Accepted,
    Duplicate,
    Similar,
}

/// Lowercase, punctuation to spaces, whitespace collapsed.
pub fn normalize_title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = true;
    for ch in s.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// Ratio in [0, 1] between two already-normalized titles.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b)
}

/// Start of the calendar day containing `now`, in the given display offset.
pub fn start_of_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = now
        .with_timezone(&offset)
        .date_naive()
        .and_time(NaiveTime::MIN);
    offset
        .from_local_datetime(&local_midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

pub struct Deduplicator {
    threshold: f64,
    /// Normalized titles; grows as candidates are accepted.
    seen_titles: Vec<String>,
    accepted_ids: HashSet<String>,
}

impl Deduplicator {
    pub fn new<I, S>(threshold: f64, prior_titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seen_titles = prior_titles
            .into_iter()
            .map(|t| normalize_title(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            seen_titles,
            accepted_ids: HashSet::new(),
        }
    }

    /// Check one candidate; on acceptance its id and title join the comparison set.
    pub fn check(
        &mut self,
        item: &Item,
        store: &dyn SentStore,
    ) -> Result<DedupOutcome, StoreError> {
        if self.accepted_ids.contains(&item.id) || store.exists(&item.id)? {
            return Ok(DedupOutcome::Duplicate);
        }

        let norm = normalize_title(&item.title);
        if !norm.is_empty()
            && self
                .seen_titles
                .iter()
                .any(|seen| similarity(&norm, seen) > self.threshold)
        {
            return Ok(DedupOutcome::Similar);
        }

        self.accepted_ids.insert(item.id.clone());
        if !norm.is_empty() {
            self.seen_titles.push(norm);
        }
        Ok(DedupOutcome::Accepted)
    }
}

#[derive(Debug, Default)]
pub struct Selection {
    pub accepted: Vec<Item>,
    pub skipped_duplicate: usize,
    pub skipped_similar: usize,
    /// Candidates left untouched once the cap was reached.
    pub not_considered: usize,
}

/// Walk `ranked` in order, accepting until `cap` items pass both gates.
pub fn select(
    ranked: Vec<Item>,
    store: &dyn SentStore,
    dedup: &mut Deduplicator,
    cap: usize,
) -> Result<Selection, StoreError> {
    ensure_metrics_described();

    let total = ranked.len();
    let mut sel = Selection::default();
    let mut walked = 0usize;

    for item in ranked {
        if sel.accepted.len() >= cap {
            break;
        }
        walked += 1;
        match dedup.check(&item, store)? {
            DedupOutcome::Accepted => sel.accepted.push(item),
            DedupOutcome::Duplicate => {
                tracing::debug!(id = %item.id, "skip: already sent");
                counter!("dedup_skipped_total", "kind" => "duplicate").increment(1);
                sel.skipped_duplicate += 1;
            }
            DedupOutcome::Similar => {
                tracing::debug!(id = %item.id, title = %item.title, "skip: similar title");
                counter!("dedup_skipped_total", "kind" => "similar").increment(1);
                sel.skipped_similar += 1;
            }
        }
    }

    sel.not_considered = total - walked;
    Ok(sel)
}

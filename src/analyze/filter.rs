// src/analyze/filter.rs
//! Eligibility predicate: blocklist → must-have → recency.
//!
//! Matching is lowercase substring containment, not word-boundary aware: "tribut"
//! matches "tributária", and "stf" would match inside a longer word. Keyword scoring
//! depends on exactly this behaviour, so it stays loose on purpose.

use chrono::{DateTime, Utc};

use super::KeywordPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Keep,
    Blocked,
    NoKeyword,
    Stale,
}

impl FilterVerdict {
    pub fn is_keep(&self) -> bool {
        matches!(self, FilterVerdict::Keep)
    }

    /// Label used for logs and the `filter_rejected_total` counter.
    pub fn reason(&self) -> &'static str {
        match self {
            FilterVerdict::Keep => "keep",
            FilterVerdict::Blocked => "blocked",
            FilterVerdict::NoKeyword => "no_keyword",
            FilterVerdict::Stale => "stale",
        }
    }
}

/// `combined_lower` is the lowercased `title + "\n" + body`.
/// With `require_keyword == false` the must-have gate is skipped (unfiltered source).
pub fn check(
    combined_lower: &str,
    published_at: Option<DateTime<Utc>>,
    policy: &KeywordPolicy,
    require_keyword: bool,
    cutoff: DateTime<Utc>,
) -> FilterVerdict {
    if policy
        .blocklist
        .iter()
        .any(|b| combined_lower.contains(b.as_str()))
    {
        return FilterVerdict::Blocked;
    }

    if require_keyword
        && !policy.must_have.is_empty()
        && !policy
            .must_have
            .iter()
            .any(|k| combined_lower.contains(k.as_str()))
    {
        return FilterVerdict::NoKeyword;
    }

    // Unknown publish time cannot be proven stale.
    if matches!(published_at, Some(ts) if ts < cutoff) {
        return FilterVerdict::Stale;
    }

    FilterVerdict::Keep
}

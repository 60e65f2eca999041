// src/analyze/rank.rs
//! Ranking of the merged candidate list.
//!
//! Key: publish time descending (unknown sorts as oldest), then relevance score
//! descending. The sort is stable, so equal keys keep source enumeration order.

use std::cmp::Ordering;

use crate::ingest::types::Item;

pub fn compare(a: &Item, b: &Item) -> Ordering {
    // Option orders None < Some, so reversing puts unknown timestamps last.
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.relevance_score.cmp(&a.relevance_score))
}

pub fn rank(items: &mut [Item]) {
    items.sort_by(compare);
}

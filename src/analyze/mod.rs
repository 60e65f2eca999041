// src/analyze/mod.rs
pub mod context;
pub mod dedup;
pub mod filter;
pub mod rank;
pub mod scoring;

use chrono::{DateTime, Utc};

use crate::config::{ContextConfig, PolicyConfig};
use crate::ingest::types::Item;
use filter::FilterVerdict;

/// Keyword sets driving filter, context and score. All entries lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordPolicy {
    /// Declared order matters: the first hit is the one reported.
    pub must_have: Vec<String>,
    pub blocklist: Vec<String>,
    pub boost: Vec<String>,
    pub boost_weight: u32,
}

impl KeywordPolicy {
    pub fn new(must_have: &[&str], blocklist: &[&str], boost: &[&str], boost_weight: u32) -> Self {
        Self {
            must_have: lower_all(must_have.iter().copied()),
            blocklist: lower_all(blocklist.iter().copied()),
            boost: lower_all(boost.iter().copied()),
            boost_weight,
        }
    }

    pub fn from_config(cfg: &PolicyConfig) -> Self {
        Self {
            must_have: lower_all(cfg.must_have.iter().map(String::as_str)),
            blocklist: lower_all(cfg.blocklist.iter().map(String::as_str)),
            boost: lower_all(cfg.boost.iter().map(String::as_str)),
            boost_weight: cfg.boost_weight,
        }
    }
}

fn lower_all<'a>(it: impl Iterator<Item = &'a str>) -> Vec<String> {
    it.map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Run one normalized item through filter, context and scoring.
///
/// `filtered == false` marks an unfiltered source: the must-have gate is skipped,
/// `matched_keyword` stays empty and the snippet is the head of the body.
pub fn screen(
    mut item: Item,
    policy: &KeywordPolicy,
    ctx: &ContextConfig,
    filtered: bool,
    cutoff: DateTime<Utc>,
) -> Result<Item, FilterVerdict> {
    let combined = item.combined_text();
    let verdict = filter::check(&combined, item.published_at, policy, filtered, cutoff);
    if !verdict.is_keep() {
        return Err(verdict);
    }

    if filtered {
        if let Some(m) = context::extract_context(&item.body, &item.title, &policy.must_have, ctx)
        {
            item.matched_keyword = m.keyword;
            item.context_snippet = m.snippet;
        }
        // An empty must-have set admits everything without a trigger; keep the lead.
        if item.context_snippet.is_empty() {
            item.context_snippet = context::lead_snippet(&item.body, ctx.max_len);
        }
    } else {
        item.context_snippet = context::lead_snippet(&item.body, ctx.max_len);
    }

    item.relevance_score = scoring::relevance_score(&combined, &policy.boost, policy.boost_weight);
    Ok(item)
}

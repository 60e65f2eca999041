// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{Item, RawItem, SourceKind, SourceProvider};
use crate::metrics::ensure_metrics_described;
use futures::stream::{self, StreamExt};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::time::Duration;

/// Hard cap on normalized field length (characters).
const MAX_TEXT_CHARS: usize = 1500;

/// Normalize text: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. NBSP)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

/// Deterministic id for items without an adapter id: hex SHA-256 of `source \n link`.
pub fn derive_id(source_name: &str, link: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(source_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(link.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Canonicalize a raw entry. Returns `None` when title or link is missing.
pub fn normalize_item(raw: RawItem, fallback_source: &str, kind: SourceKind) -> Option<Item> {
    let title = normalize_text(&raw.title);
    let link = raw.link.trim().to_string();
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let body = raw.summary.as_deref().map(normalize_text).unwrap_or_default();
    let source_name = match raw.source_name.trim() {
        "" => fallback_source.trim().to_string(),
        s => s.to_string(),
    };
    let id = match raw.guid.as_deref().map(str::trim) {
        Some(g) if !g.is_empty() => g.to_string(),
        _ => derive_id(&source_name, &link),
    };

    Some(Item {
        id,
        title,
        body,
        link,
        source_name,
        source_kind: kind,
        published_at: raw.published_at,
        matched_keyword: String::new(),
        context_snippet: String::new(),
        relevance_score: 0,
    })
}

/// Everything one adapter yielded in this run.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: String,
    pub kind: SourceKind,
    pub filtered: bool,
    pub items: Vec<RawItem>,
    pub failed: bool,
}

/// Fetch all providers with at most `workers` in flight, each under its own
/// `timeout`. A failing or slow source yields an empty batch; results come back
/// in provider order once every fetch has finished.
pub async fn fetch_all(
    providers: &[Box<dyn SourceProvider>],
    workers: usize,
    timeout: Duration,
) -> Vec<SourceBatch> {
    ensure_metrics_described();

    stream::iter(providers.iter().map(|p| async move {
        let (items, failed) = match tokio::time::timeout(timeout, p.fetch_latest()).await {
            Ok(Ok(items)) => {
                counter!("fetch_items_total").increment(items.len() as u64);
                tracing::debug!(source = p.name(), items = items.len(), "source fetched");
                (items, false)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, source = p.name(), "source error");
                counter!("fetch_errors_total").increment(1);
                (Vec::new(), true)
            }
            Err(_) => {
                tracing::warn!(
                    source = p.name(),
                    timeout_secs = timeout.as_secs(),
                    "source timed out"
                );
                counter!("fetch_errors_total").increment(1);
                (Vec::new(), true)
            }
        };
        SourceBatch {
            source: p.name().to_string(),
            kind: p.kind(),
            filtered: p.filtered(),
            items,
            failed,
        }
    }))
    .buffered(workers.max(1))
    .collect()
    .await
}

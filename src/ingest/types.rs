// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which adapter family produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,
    Page,
    Api,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Feed => "feed",
            SourceKind::Page => "page",
            SourceKind::Api => "api",
        }
    }
}

/// An entry as yielded by a source adapter, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Adapter-provided stable id (RSS guid, API id), if any.
    pub guid: Option<String>,
    /// Display name of the source (feed title or configured name).
    pub source_name: String,
}

/// Canonical candidate record. Created fresh every run, discarded at run end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub body: String,
    pub link: String,
    pub source_name: String,
    pub source_kind: SourceKind,
    pub published_at: Option<DateTime<Utc>>,
    /// First must-have keyword found; empty when the source is unfiltered.
    pub matched_keyword: String,
    /// Rendered (escaped, emphasized) context snippet.
    pub context_snippet: String,
    pub relevance_score: u32,
}

impl Item {
    /// Lowercased `title + "\n" + body`, the text every keyword check runs against.
    pub fn combined_text(&self) -> String {
        format!("{}\n{}", self.title, self.body).to_lowercase()
    }
}

/// What a source adapter must provide.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>>;
    fn name(&self) -> &str;
    fn kind(&self) -> SourceKind;

    /// Whether the must-have keyword gate applies to this source's items.
    fn filtered(&self) -> bool {
        true
    }
}

// src/store/mod.rs
//! Durable record of what was delivered.
//!
//! The sent store is the only dedup authority. The history log is an audit trail
//! and is never read back by the pipeline.

pub mod history;
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use history::{HistoryLog, HistoryRow, JsonlHistoryLog};
pub use sqlite::SqliteSentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("bad timestamp `{0}` in store")]
    Timestamp(String),
}

/// One delivered item. Written once, at the moment of successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentRecord {
    pub id: String,
    pub title: String,
    pub link: String,
    pub source_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub sent_at: DateTime<Utc>,
}

/// Persistence seam for dedup. Inserts are idempotent on `id`.
pub trait SentStore: Send {
    fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// `true` when a row was written, `false` when `id` was already present.
    fn insert_if_absent(&self, record: &SentRecord) -> Result<bool, StoreError>;

    /// Titles of records with `sent_at >= since`, oldest first.
    fn titles_sent_since(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError>;
}

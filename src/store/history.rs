// src/store/history.rs
//! Append-only audit log, one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::ingest::types::Item;

const TIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Times are local to the display offset; this file is read by people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub sent_at: String,
    pub published_at: Option<String>,
    pub source: String,
    pub title: String,
    pub link: String,
    pub keyword: String,
    pub snippet: String,
    pub score: u32,
}

impl HistoryRow {
    pub fn from_item(item: &Item, sent_at: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            sent_at: sent_at.with_timezone(&offset).format(TIME_FMT).to_string(),
            published_at: item
                .published_at
                .map(|p| p.with_timezone(&offset).format(TIME_FMT).to_string()),
            source: item.source_name.clone(),
            title: item.title.clone(),
            link: item.link.clone(),
            keyword: item.matched_keyword.clone(),
            snippet: item.context_snippet.clone(),
            score: item.relevance_score,
        }
    }
}

pub trait HistoryLog: Send {
    fn append_row(&mut self, row: &HistoryRow) -> Result<(), StoreError>;
}

pub struct JsonlHistoryLog {
    path: PathBuf,
}

impl JsonlHistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse every row back; used by tests and ad-hoc inspection.
    pub fn read_all(&self) -> Result<Vec<HistoryRow>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StoreError::from))
            .collect()
    }
}

impl HistoryLog for JsonlHistoryLog {
    fn append_row(&mut self, row: &HistoryRow) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let mut line = serde_json::to_string(row)?;
        line.push('\n');
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        f.write_all(line.as_bytes())?;
        Ok(())
    }
}

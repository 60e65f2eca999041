// src/ingest/providers/json_api.rs
//! Structured REST sources (e.g. legislative agenda endpoints). Items are found
//! through a JSON pointer and fields are mapped by name from config.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::ApiMapping;
use crate::ingest::types::{RawItem, SourceKind, SourceProvider};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

pub struct JsonApiProvider {
    name: String,
    mapping: ApiMapping,
    max_entries: usize,
    filtered: bool,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

impl JsonApiProvider {
    pub fn from_fixture(name: &str, mapping: ApiMapping, json: &str) -> Self {
        Self {
            name: name.to_string(),
            mapping,
            max_entries: usize::MAX,
            filtered: true,
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn from_url(
        name: Option<&str>,
        url: &str,
        mapping: ApiMapping,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.unwrap_or(url).to_string(),
            mapping,
            max_entries: usize::MAX,
            filtered: true,
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    pub fn with_max_entries(mut self, n: usize) -> Self {
        self.max_entries = n.max(1);
        self
    }

    pub fn with_filter(mut self, filtered: bool) -> Self {
        self.filtered = filtered;
        self
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<RawItem>> {
        let doc: Value = serde_json::from_str(s).context("parsing api json")?;
        let m = &self.mapping;
        let arr = doc
            .pointer(&m.items_pointer)
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("no item array at pointer `{}`", m.items_pointer))?;

        let offset = FixedOffset::east_opt(m.utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("invalid utc_offset_hours {}", m.utc_offset_hours))?;

        let out = arr
            .iter()
            .take(self.max_entries)
            .map(|obj| RawItem {
                title: field_str(obj, &m.title_field).unwrap_or_default(),
                link: field_str(obj, &m.link_field).unwrap_or_default(),
                summary: m.body_field.as_deref().and_then(|f| field_str(obj, f)),
                published_at: m
                    .date_field
                    .as_deref()
                    .and_then(|f| field_str(obj, f))
                    .and_then(|d| parse_api_date(&d, offset)),
                guid: m
                    .id_field
                    .as_deref()
                    .and_then(|f| field_str(obj, f))
                    .map(|id| format!("{}:{}", self.name, id)),
                source_name: self.name.clone(),
            })
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for JsonApiProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await
                    .with_context(|| format!("api http get {url}"))?
                    .error_for_status()
                    .with_context(|| format!("api http status {url}"))?
                    .text()
                    .await
                    .context("api http .text()")?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn filtered(&self) -> bool {
        self.filtered
    }
}

/// Plain key, or a JSON pointer when the field starts with '/'.
fn field_str(obj: &Value, field: &str) -> Option<String> {
    let v = if field.starts_with('/') {
        obj.pointer(field)
    } else {
        obj.get(field)
    }?;
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// RFC 3339, else a naive timestamp read at `offset`.
pub(crate) fn parse_api_date(s: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}

// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::{RawItem, SourceKind, SourceProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    guid: Option<Guid>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// RFC 2822 first (RSS 2.0), RFC 3339 as a lenient fallback.
pub(crate) fn parse_feed_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
}

/// RSS/Atom-style feed adapter (RSS 2.0 and 0.91 share the channel/item shape).
pub struct RssProvider {
    name: String,
    /// Set when the name came from config rather than the URL.
    explicit_name: bool,
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

impl RssProvider {
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            explicit_name: !name.is_empty(),
            max_entries: usize::MAX,
            filtered: true,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(name: Option<&str>, url: &str, client: reqwest::Client) -> Self {
        Self {
            name: name.unwrap_or(url).to_string(),
            explicit_name: name.is_some(),
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

    /// Channel title is used unless a name was configured explicitly.
    fn source_name(&self, channel_title: Option<&str>) -> String {
        match channel_title.map(str::trim) {
            Some(t) if !self.explicit_name && !t.is_empty() => crate::ingest::normalize_text(t),
            _ => self.name.clone(),
        }
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<RawItem>> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
        let source_name = self.source_name(rss.channel.title.as_deref());

        let out = rss
            .channel
            .item
            .into_iter()
            .take(self.max_entries)
            .map(|it| RawItem {
                title: it.title.unwrap_or_default(),
                link: it.link.unwrap_or_default(),
                summary: it.description,
                published_at: it.pub_date.as_deref().and_then(parse_feed_date),
                guid: it.guid.map(|g| g.value),
                source_name: source_name.clone(),
            })
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("feed http get {url}"))?
                    .error_for_status()
                    .with_context(|| format!("feed http status {url}"))?
                    .text()
                    .await
                    .context("feed http .text()")?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }

    fn filtered(&self) -> bool {
        self.filtered
    }
}

/// Feeds in the wild use HTML named entities (`&nbsp;`, `&ccedil;`) that are not
/// valid XML. Decode everything except the five XML-predefined entities.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY
        .get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("entity regex"));
    re.replace_all(s, |caps: &regex::Captures| {
        let name = &caps[1];
        match name {
            "amp" | "lt" | "gt" | "quot" | "apos" => caps[0].to_string(),
            _ => html_escape::decode_html_entities(&caps[0]).to_string(),
        }
    })
    .to_string()
}

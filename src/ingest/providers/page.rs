// src/ingest/providers/page.rs
//! Scraped listing pages: every `a[href]` whose resolved URL matches the
//! configured pattern becomes an item. Pages carry no body and no date.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::ingest::normalize_text;
use crate::ingest::types::{RawItem, SourceKind, SourceProvider};

pub struct PageProvider {
    name: String,
    url: Url,
    link_pattern: Regex,
    max_entries: usize,
    filtered: bool,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http(reqwest::Client),
}

impl PageProvider {
    pub fn from_fixture(
        name: &str,
        page_url: &str,
        link_pattern: &str,
        html: &str,
    ) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            url: parse_base(page_url)?,
            link_pattern: compile(link_pattern)?,
            max_entries: usize::MAX,
            filtered: true,
            mode: Mode::Fixture(html.to_string()),
        })
    }

    pub fn from_url(
        name: Option<&str>,
        url: &str,
        link_pattern: &str,
        client: reqwest::Client,
    ) -> Result<Self> {
        Ok(Self {
            name: name.unwrap_or(url).to_string(),
            url: parse_base(url)?,
            link_pattern: compile(link_pattern)?,
            max_entries: usize::MAX,
            filtered: true,
            mode: Mode::Http(client),
        })
    }

    pub fn with_max_entries(mut self, n: usize) -> Self {
        self.max_entries = n.max(1);
        self
    }

    pub fn with_filter(mut self, filtered: bool) -> Self {
        self.filtered = filtered;
        self
    }

    fn parse_items_from_str(&self, html: &str) -> Vec<RawItem> {
        let Ok(anchors) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        let document = Html::parse_document(html);

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for el in document.select(&anchors) {
            let Some(link) = el
                .value()
                .attr("href")
                .and_then(|href| resolve_href(&self.url, href))
            else {
                continue;
            };
            if !self.link_pattern.is_match(&link) {
                continue;
            }
            let title = normalize_text(&el.text().collect::<String>());
            if title.is_empty() || !seen.insert(link.clone()) {
                continue;
            }
            out.push(RawItem {
                title,
                link,
                summary: None,
                published_at: None,
                guid: None,
                source_name: self.name.clone(),
            });
            if out.len() >= self.max_entries {
                break;
            }
        }
        out
    }
}

#[async_trait]
impl SourceProvider for PageProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(s) => Ok(self.parse_items_from_str(s)),
            Mode::Http(client) => {
                let body = client
                    .get(self.url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("page http get {}", self.url))?
                    .error_for_status()
                    .with_context(|| format!("page http status {}", self.url))?
                    .text()
                    .await
                    .context("page http .text()")?;
                Ok(self.parse_items_from_str(&body))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Page
    }

    fn filtered(&self) -> bool {
        self.filtered
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("invalid link_pattern `{pattern}`"))
}

fn parse_base(url: &str) -> Result<Url> {
    Url::parse(url).with_context(|| format!("invalid page url `{url}`"))
}

/// Resolve `href` against the page URL; only http(s) targets are kept.
pub(crate) fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let url = base.join(href.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

// src/ingest/providers/mod.rs
pub mod json_api;
pub mod page;
pub mod rss;

use anyhow::{anyhow, Result};

use crate::config::SourceConfig;
use crate::ingest::types::{SourceKind, SourceProvider};
use json_api::JsonApiProvider;
use page::PageProvider;
use rss::RssProvider;

/// Build one adapter per configured source, sharing a single HTTP client.
/// Misconfigured sources (bad pattern, missing mapping) fail the build.
pub fn build_providers(
    sources: &[SourceConfig],
    client: &reqwest::Client,
    max_entries: usize,
) -> Result<Vec<Box<dyn SourceProvider>>> {
    let mut out: Vec<Box<dyn SourceProvider>> = Vec::with_capacity(sources.len());
    for s in sources {
        let name = s.name.as_deref();
        let provider: Box<dyn SourceProvider> = match s.kind {
            SourceKind::Feed => Box::new(
                RssProvider::from_url(name, &s.url, client.clone())
                    .with_max_entries(max_entries)
                    .with_filter(s.filter),
            ),
            SourceKind::Page => {
                let pattern = s
                    .link_pattern
                    .as_deref()
                    .ok_or_else(|| anyhow!("page source {} needs link_pattern", s.url))?;
                Box::new(
                    PageProvider::from_url(name, &s.url, pattern, client.clone())?
                        .with_max_entries(max_entries)
                        .with_filter(s.filter),
                )
            }
            SourceKind::Api => {
                let mapping = s
                    .api
                    .clone()
                    .ok_or_else(|| anyhow!("api source {} needs an `api` mapping", s.url))?;
                Box::new(
                    JsonApiProvider::from_url(name, &s.url, mapping, client.clone())
                        .with_max_entries(max_entries)
                        .with_filter(s.filter),
                )
            }
        };
        out.push(provider);
    }
    Ok(out)
}

// src/config/mod.rs
//! Monitor configuration: keyword policy, run limits, sources, delivery and storage.
//!
//! Resolution order (see `MonitorConfig::load_default`):
//!   1) $NEWS_MONITOR_CONFIG_PATH (must exist)
//!   2) config/monitor.toml
//!   3) built-in defaults
//!
//! Operational knobs can be overridden by env (`NEWS_MONITOR_MAX_ITEMS`,
//! `NEWS_MONITOR_LOOKBACK_HOURS`).

pub mod credentials;

use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::SourceKind;

pub const ENV_CONFIG_PATH: &str = "NEWS_MONITOR_CONFIG_PATH";
pub const ENV_MAX_ITEMS: &str = "NEWS_MONITOR_MAX_ITEMS";
pub const ENV_LOOKBACK_HOURS: &str = "NEWS_MONITOR_LOOKBACK_HOURS";
pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";
/// Ten years; anything larger is treated as "no recency limit" anyway.
pub const MAX_LOOKBACK_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            run: RunConfig::default(),
            context: ContextConfig::default(),
            delivery: DeliveryConfig::default(),
            storage: StorageConfig::default(),
            sources: default_sources(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Item is eligible only if one of these occurs (declared order = scan order).
    pub must_have: Vec<String>,
    /// Any hit disqualifies the item.
    pub blocklist: Vec<String>,
    /// Each distinct hit adds `boost_weight` to the relevance score.
    pub boost: Vec<String>,
    pub boost_weight: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            must_have: to_strings(&[
                // Congresso / Justiça
                "câmara",
                "senado",
                "congresso",
                "plenário",
                "comissão",
                "stf",
                "tcu",
                "cgu",
                "pgr",
                "mpf",
                // Economia / tributos
                "imposto",
                "imposto de renda",
                "irpf",
                "tribut",
                "orçamento",
                "ldo",
                "ploa",
                "gastos",
                "lrf",
                "inflação",
                "juros",
                "selic",
                "banco central",
                "pix",
                // Governo federal
                "lula",
                "haddad",
                "governo federal",
                "governo lula",
                "ministério da fazenda",
                "receita federal",
                "ministério da justiça",
                "macaé evaristo",
                // SC / mandato
                "santa catarina",
                "julia zanatta",
                "zanatta",
                "bolsonaro",
                "jorginho mello",
            ]),
            blocklist: to_strings(&["horóscopo", "bbb", "fofoca", "celebridade"]),
            boost: to_strings(&[
                "zanatta",
                "santa catarina",
                "urgente",
                "aprova",
                "votação",
                "plenário",
            ]),
            boost_weight: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub lookback_hours: i64,
    pub max_items_per_run: usize,
    pub pacing_ms: u64,
    /// Normalized Levenshtein similarity in [0,1]; strictly above means "same story".
    pub similarity_threshold: f64,
    pub workers: usize,
    pub fetch_timeout_secs: u64,
    pub max_entries_per_source: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 8,
            max_items_per_run: 20,
            pacing_ms: 400,
            similarity_threshold: 0.85,
            workers: 4,
            fetch_timeout_secs: 20,
            max_entries_per_source: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Characters kept on each side of the keyword.
    pub radius: usize,
    /// Window length cap (characters) before the truncation marker.
    pub max_len: usize,
    /// Snippet used when the keyword only occurs in the title.
    pub title_fallback: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            radius: 90,
            max_len: 240,
            title_fallback: "(ver título)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub api_base: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Offset used for rendered timestamps, the history log and "same day".
    pub display_utc_offset_hours: i32,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 25,
            max_attempts: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
            display_utc_offset_hours: -3,
        }
    }
}

impl DeliveryConfig {
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.display_utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    pub history_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("sent_items.db"),
            history_path: PathBuf::from("historico_news.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub kind: SourceKind,
    pub url: String,
    /// When false, the must-have gate is skipped for this source.
    #[serde(default = "default_true")]
    pub filter: bool,
    /// Page sources: regex an absolute href must match to become an item.
    #[serde(default)]
    pub link_pattern: Option<String>,
    /// API sources: where items live in the JSON and how fields map.
    #[serde(default)]
    pub api: Option<ApiMapping>,
}

impl SourceConfig {
    pub fn feed(url: &str) -> Self {
        Self {
            name: None,
            kind: SourceKind::Feed,
            url: url.to_string(),
            filter: true,
            link_pattern: None,
            api: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMapping {
    /// JSON pointer to the item array ("" = document root).
    #[serde(default)]
    pub items_pointer: String,
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default = "default_title_field")]
    pub title_field: String,
    #[serde(default)]
    pub body_field: Option<String>,
    #[serde(default = "default_link_field")]
    pub link_field: String,
    #[serde(default)]
    pub date_field: Option<String>,
    /// Offset applied to naive timestamps.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl Default for ApiMapping {
    fn default() -> Self {
        Self {
            items_pointer: String::new(),
            id_field: None,
            title_field: default_title_field(),
            body_field: None,
            link_field: default_link_field(),
            date_field: None,
            utc_offset_hours: 0,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_title_field() -> String {
    "title".to_string()
}
fn default_link_field() -> String {
    "link".to_string()
}

fn to_strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn default_sources() -> Vec<SourceConfig> {
    [
        // Institucional
        "https://www12.senado.leg.br/noticias/feed",
        "https://www.camara.leg.br/rss/ultimas-noticias.xml",
        // G1
        "https://g1.globo.com/rss/g1/politica/",
        "https://g1.globo.com/rss/g1/economia/",
        "https://g1.globo.com/rss/g1/brasil/",
        // Folha
        "https://feeds.folha.uol.com.br/poder/rss091.xml",
        "https://feeds.folha.uol.com.br/mercado/rss091.xml",
        // Estadão
        "https://politica.estadao.com.br/rss",
        "https://economia.estadao.com.br/rss",
        // CNN Brasil
        "https://www.cnnbrasil.com.br/politica/feed/",
        // Metrópoles
        "https://www.metropoles.com/feed",
        // BBC
        "https://feeds.bbci.co.uk/portuguese/rss.xml",
        // Veja
        "https://veja.abril.com.br/rss/",
    ]
    .iter()
    .map(|u| SourceConfig::feed(u))
    .collect()
}

impl MonitorConfig {
    /// Load using env var + fallbacks, then apply env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing monitor config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: MonitorConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Clamp numbers into usable ranges and clean keyword lists.
    pub fn sanitize(&mut self) {
        let p = &mut self.policy;
        p.must_have = clean_keywords(std::mem::take(&mut p.must_have));
        p.blocklist = clean_keywords(std::mem::take(&mut p.blocklist));
        p.boost = clean_keywords(std::mem::take(&mut p.boost));

        let r = &mut self.run;
        if !r.similarity_threshold.is_finite() {
            r.similarity_threshold = RunConfig::default().similarity_threshold;
        }
        r.similarity_threshold = r.similarity_threshold.clamp(0.0, 1.0);
        r.workers = r.workers.max(1);
        r.lookback_hours = r.lookback_hours.clamp(0, MAX_LOOKBACK_HOURS);
        r.fetch_timeout_secs = r.fetch_timeout_secs.max(1);
        r.max_entries_per_source = r.max_entries_per_source.max(1);

        self.context.max_len = self.context.max_len.max(1);

        let d = &mut self.delivery;
        d.max_attempts = d.max_attempts.max(1);
        d.timeout_secs = d.timeout_secs.max(1);
        if d.backoff_max_ms < d.backoff_base_ms {
            d.backoff_max_ms = d.backoff_base_ms;
        }
        if !(-23..=23).contains(&d.display_utc_offset_hours) {
            d.display_utc_offset_hours = DeliveryConfig::default().display_utc_offset_hours;
        }
        while d.api_base.ends_with('/') {
            d.api_base.pop();
        }
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(n) = parse_env::<usize>(ENV_MAX_ITEMS) {
            self.run.max_items_per_run = n;
        }
        if let Some(h) = parse_env::<i64>(ENV_LOOKBACK_HOURS) {
            self.run.lookback_hours = h.clamp(0, MAX_LOOKBACK_HOURS);
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Trim, lowercase, drop blanks and repeats; declared order is kept.
fn clean_keywords(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}

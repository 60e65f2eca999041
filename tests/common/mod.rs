// tests/common/mod.rs
// Shared doubles for the integration tests. Not every test file uses every helper.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use news_monitor::config::MonitorConfig;
use news_monitor::ingest::providers::rss::RssProvider;
use news_monitor::{
    JsonlHistoryLog, Monitor, Notifier, SourceProvider, SqliteSentStore, TransportError,
};

pub const G1_XML: &str = include_str!("../fixtures/g1_politica.xml");
pub const FOLHA_XML: &str = include_str!("../fixtures/folha_poder.xml");
pub const AGENDA_JSON: &str = include_str!("../fixtures/camara_agenda.json");
pub const CAMARA_HTML: &str = include_str!("../fixtures/camara_ultimas.html");

/// 12:00 in UTC-3 on the fixtures' publication day.
pub fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
}

/// Small, fast policy over the fixtures: no pacing, no backoff waits.
pub fn test_config() -> MonitorConfig {
    let mut cfg = MonitorConfig::default();
    cfg.policy.must_have = vec![
        "senado".into(),
        "câmara".into(),
        "stf".into(),
        "congresso".into(),
    ];
    cfg.policy.blocklist = vec!["bbb".into(), "fofoca".into()];
    cfg.policy.boost = vec!["votação".into()];
    cfg.policy.boost_weight = 2;
    cfg.run.pacing_ms = 0;
    cfg.run.similarity_threshold = 0.85;
    cfg.delivery.backoff_base_ms = 1;
    cfg.delivery.backoff_max_ms = 2;
    cfg.sources.clear();
    cfg
}

/// Records every message; replays a script of results, then succeeds.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<String>>>,
    script: Arc<Mutex<VecDeque<Result<(), TransportError>>>>,
}

impl RecordingNotifier {
    pub fn with_script(script: Vec<Result<(), TransportError>>) -> Self {
        Self {
            sent: Arc::default(),
            script: Arc::new(Mutex::new(script.into())),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(text.to_string());
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

pub fn fixture_providers() -> Vec<Box<dyn SourceProvider>> {
    vec![
        Box::new(RssProvider::from_fixture("", G1_XML)),
        Box::new(RssProvider::from_fixture("", FOLHA_XML)),
    ]
}

pub fn monitor_at(dir: &Path, cfg: MonitorConfig, notifier: RecordingNotifier) -> Monitor {
    let store = SqliteSentStore::open(dir.join("sent.db")).unwrap();
    let history = JsonlHistoryLog::new(dir.join("historico.jsonl"));
    Monitor::new(cfg, Box::new(notifier), Box::new(store), Box::new(history))
}

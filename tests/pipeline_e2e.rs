// tests/pipeline_e2e.rs
//
// Full runs over fixture sources with a recording notifier and an on-disk store.
//
// Covered:
// - near-duplicate across outlets: the more recent version wins
// - blocklist / no-keyword / stale rejections never reach the channel
// - idempotence across runs and across a store reopen
// - per-run cap, unfiltered sources, failing and slow sources
// - an unbounded lookback window
// - sent-store failures abort; history failures do not

mod common;

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::*;
use news_monitor::config::ApiMapping;
use news_monitor::ingest::providers::json_api::JsonApiProvider;
use news_monitor::ingest::providers::rss::RssProvider;
use news_monitor::store::{SentRecord, StoreError};
use news_monitor::{
    JsonlHistoryLog, Monitor, RawItem, SentStore, SourceKind, SourceProvider, SqliteSentStore,
    TransportError,
};

#[tokio::test]
async fn scenario_recent_near_duplicate_wins_and_filters_apply() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let mut monitor = monitor_at(dir.path(), test_config(), notifier.clone());

    let summary = monitor
        .run(&fixture_providers(), fixture_now())
        .await
        .expect("run");

    assert_eq!(summary.fetched, 7);
    assert_eq!(summary.candidates, 4);
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.skipped_similar, 1);
    assert_eq!(summary.skipped_duplicate, 0);
    assert_eq!(summary.failed, 0);

    let msgs = notifier.messages();
    assert_eq!(msgs.len(), 3);
    assert!(msgs[0].contains("Câmara instala comissão do orçamento &amp; LDO"));
    // Folha's version (1 h old, no boost) beats G1's (2 h old, boosted).
    assert!(msgs[1].contains("Senado aprova texto-base da reforma tributária."));
    assert!(msgs[1].contains("Folha de S.Paulo - Poder • 10/03 11:00"));
    assert!(msgs[2].contains("Haddad apresenta nova meta fiscal"));
    assert!(msgs.iter().all(|m| !m.contains("paredão")));
    assert!(msgs.iter().all(|m| !m.contains("futebol")));
    assert!(msgs.iter().all(|m| !m.contains("marco temporal")));

    assert!(!monitor.store().exists("g1-1001").unwrap());
}

#[tokio::test]
async fn second_run_delivers_nothing_even_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();

    let mut first = monitor_at(dir.path(), test_config(), notifier.clone());
    assert_eq!(first.run(&fixture_providers(), fixture_now()).await.unwrap().sent, 3);

    let again = first.run(&fixture_providers(), fixture_now()).await.unwrap();
    assert_eq!(again.sent, 0);
    assert_eq!(again.skipped_duplicate, 3);
    assert_eq!(again.skipped_similar, 1);
    drop(first);

    let mut reopened = monitor_at(dir.path(), test_config(), notifier.clone());
    let third = reopened.run(&fixture_providers(), fixture_now()).await.unwrap();
    assert_eq!(third.sent, 0);
    assert_eq!(notifier.messages().len(), 3);

    let rows = JsonlHistoryLog::new(dir.path().join("historico.jsonl"))
        .read_all()
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].source, "G1 > Política");
    assert_eq!(rows[0].keyword, "câmara");
    assert_eq!(rows[0].published_at.as_deref(), Some("2025-03-10 11:30:00"));
}

#[tokio::test]
async fn unbounded_lookback_keeps_old_items_instead_of_overflowing() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let mut cfg = test_config();
    cfg.run.lookback_hours = i64::MAX;
    let mut monitor = monitor_at(dir.path(), cfg, notifier.clone());

    let summary = monitor
        .run(&fixture_providers(), fixture_now())
        .await
        .expect("run");

    assert_eq!(summary.candidates, 5);
    assert_eq!(summary.sent, 4);
    assert!(notifier
        .messages()
        .iter()
        .any(|m| m.contains("STF julga marco temporal")));
}

fn many_items_feed(n: usize) -> String {
    let mut xml = String::from("<rss version=\"2.0\"><channel><title>Agência Senado</title>");
    for i in 0..n {
        xml.push_str(&format!(
            "<item><title>Senado pauta {i}</title>\
             <link>https://www12.senado.leg.br/noticias/{i}</link>\
             <pubDate>Mon, 10 Mar 2025 11:00:00 -0300</pubDate></item>"
        ));
    }
    xml.push_str("</channel></rss>");
    xml
}

#[tokio::test]
async fn cap_limits_deliveries_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let mut cfg = test_config();
    cfg.run.max_items_per_run = 20;
    // 1.0 disables fuzzy matching (ratio must be strictly above).
    cfg.run.similarity_threshold = 1.0;
    let mut monitor = monitor_at(dir.path(), cfg, notifier.clone());

    let providers: Vec<Box<dyn SourceProvider>> =
        vec![Box::new(RssProvider::from_fixture("", &many_items_feed(57)))];
    let summary = monitor.run(&providers, fixture_now()).await.unwrap();

    assert_eq!(summary.candidates, 57);
    assert_eq!(summary.sent, 20);
    assert_eq!(summary.not_considered, 37);
    assert_eq!(notifier.messages().len(), 20);
    // Equal keys keep feed order.
    assert!(notifier.messages()[0].contains("Senado pauta 0</b>"));

    let next = monitor.run(&providers, fixture_now()).await.unwrap();
    assert_eq!(next.sent, 20);
    assert!(notifier.messages()[20].contains("Senado pauta 20</b>"));
}

#[tokio::test]
async fn unfiltered_api_source_skips_keyword_gate_only() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let mut monitor = monitor_at(dir.path(), test_config(), notifier.clone());

    let mapping = ApiMapping {
        items_pointer: "/dados".into(),
        id_field: Some("id".into()),
        title_field: "descricao".into(),
        body_field: None,
        link_field: "urlRegistro".into(),
        date_field: Some("dataHoraInicio".into()),
        utc_offset_hours: -3,
    };
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(
        JsonApiProvider::from_fixture("Agenda Câmara", mapping, AGENDA_JSON).with_filter(false),
    )];
    let summary = monitor.run(&providers, fixture_now()).await.unwrap();

    // 74002 is stale, 74003 blocked, 74004 has no title.
    assert_eq!(summary.fetched, 4);
    assert_eq!(summary.sent, 1);
    let msgs = notifier.messages();
    assert!(msgs[0].contains("Reunião Deliberativa da Comissão de Finanças"));
    assert!(!msgs[0].contains("Gatilho"));
    assert!(monitor.store().exists("Agenda Câmara:74001").unwrap());
}

struct BrokenSource;

#[async_trait]
impl SourceProvider for BrokenSource {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        Err(anyhow!("connection reset"))
    }
    fn name(&self) -> &str {
        "broken"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }
}

struct SlowSource;

#[async_trait]
impl SourceProvider for SlowSource {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(vec![RawItem {
            title: "Senado atrasado".into(),
            link: "https://slow.test/1".into(),
            ..Default::default()
        }])
    }
    fn name(&self) -> &str {
        "slow"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }
}

#[tokio::test(start_paused = true)]
async fn failing_and_slow_sources_do_not_block_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let mut cfg = test_config();
    cfg.run.fetch_timeout_secs = 1;
    let mut monitor = monitor_at(dir.path(), cfg, notifier.clone());

    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(BrokenSource),
        Box::new(SlowSource),
        Box::new(RssProvider::from_fixture("", G1_XML)),
    ];
    let summary = monitor.run(&providers, fixture_now()).await.unwrap();

    assert_eq!(summary.fetched, 5);
    assert_eq!(summary.sent, 2);
    assert!(notifier.messages().iter().all(|m| !m.contains("atrasado")));
}

#[tokio::test]
async fn permanent_failure_is_retried_by_a_later_run() {
    let dir = tempfile::tempdir().unwrap();
    let notifier =
        RecordingNotifier::with_script(vec![Err(TransportError::permanent("400 bad request"))]);
    let mut monitor = monitor_at(dir.path(), test_config(), notifier.clone());

    let first = monitor.run(&fixture_providers(), fixture_now()).await.unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(first.sent, 2);

    let second = monitor.run(&fixture_providers(), fixture_now()).await.unwrap();
    assert_eq!(second.sent, 1);
    assert_eq!(second.failed, 0);
}

#[tokio::test]
async fn transient_failures_are_retried_within_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::with_script(vec![
        Err(TransportError::transient("502")),
        Err(TransportError::transient("503")),
    ]);
    let mut monitor = monitor_at(dir.path(), test_config(), notifier.clone());

    let summary = monitor.run(&fixture_providers(), fixture_now()).await.unwrap();
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.failed, 0);
    // Two failed attempts plus three successful sends.
    assert_eq!(notifier.messages().len(), 5);
}

/// `exists` works; `insert_if_absent` fails.
struct ReadOnlyStore(SqliteSentStore);

impl SentStore for ReadOnlyStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.0.exists(id)
    }
    fn insert_if_absent(&self, _record: &SentRecord) -> Result<bool, StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }
    fn titles_sent_since(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        self.0.titles_sent_since(since)
    }
}

/// Nothing works.
struct DeadStore;

impl SentStore for DeadStore {
    fn exists(&self, _id: &str) -> Result<bool, StoreError> {
        Err(StoreError::Io(std::io::Error::other("gone")))
    }
    fn insert_if_absent(&self, _record: &SentRecord) -> Result<bool, StoreError> {
        Err(StoreError::Io(std::io::Error::other("gone")))
    }
    fn titles_sent_since(&self, _since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn store_failures_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();

    let notifier = RecordingNotifier::default();
    let mut monitor = Monitor::new(
        test_config(),
        Box::new(notifier.clone()),
        Box::new(DeadStore),
        Box::new(JsonlHistoryLog::new(dir.path().join("h.jsonl"))),
    );
    assert!(monitor.run(&fixture_providers(), fixture_now()).await.is_err());
    assert!(notifier.messages().is_empty());

    let notifier = RecordingNotifier::default();
    let mut monitor = Monitor::new(
        test_config(),
        Box::new(notifier.clone()),
        Box::new(ReadOnlyStore(SqliteSentStore::in_memory().unwrap())),
        Box::new(JsonlHistoryLog::new(dir.path().join("h.jsonl"))),
    );
    assert!(monitor.run(&fixture_providers(), fixture_now()).await.is_err());
    // The first send went out; the run stopped when it could not be recorded.
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn history_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let mut monitor = Monitor::new(
        test_config(),
        Box::new(notifier.clone()),
        Box::new(SqliteSentStore::in_memory().unwrap()),
        // A directory cannot be opened for append.
        Box::new(JsonlHistoryLog::new(dir.path())),
    );
    let summary = monitor.run(&fixture_providers(), fixture_now()).await.unwrap();
    assert_eq!(summary.sent, 3);
}

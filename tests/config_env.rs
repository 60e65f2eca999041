// tests/config_env.rs
//
// Config resolution and credential loading through the environment.
// Env vars are process-global, so these run serially.

use std::io::Write;

use serial_test::serial;

use news_monitor::config::credentials::{ENV_BOT_TOKEN, ENV_CHAT_ID};
use news_monitor::config::{ENV_CONFIG_PATH, ENV_LOOKBACK_HOURS, ENV_MAX_ITEMS};
use news_monitor::{MonitorConfig, SourceKind, TelegramCredentials};

fn clear_env() {
    for k in [ENV_CONFIG_PATH, ENV_MAX_ITEMS, ENV_LOOKBACK_HOURS, ENV_BOT_TOKEN, ENV_CHAT_ID] {
        std::env::remove_var(k);
    }
}

#[test]
#[serial]
fn explicit_path_is_loaded_and_env_overrides_apply() {
    clear_env();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(
        f,
        r#"
[policy]
must_have = ["Senado", "câmara", "senado"]
blocklist = ["BBB"]

[run]
max_items_per_run = 5
lookback_hours = 4

[storage]
db_path = "/tmp/x/sent.db"

[[sources]]
name = "Câmara Notícias"
kind = "page"
url = "https://www.camara.leg.br/noticias/ultimas"
link_pattern = '/noticias/\d+-'
"#
    )
    .unwrap();

    std::env::set_var(ENV_CONFIG_PATH, f.path());
    std::env::set_var(ENV_MAX_ITEMS, "7");
    std::env::set_var(ENV_LOOKBACK_HOURS, "not-a-number");

    let cfg = MonitorConfig::load_default().unwrap();
    assert_eq!(cfg.policy.must_have, vec!["senado", "câmara"]);
    assert_eq!(cfg.policy.blocklist, vec!["bbb"]);
    assert_eq!(cfg.run.max_items_per_run, 7);
    assert_eq!(cfg.run.lookback_hours, 4);
    assert_eq!(cfg.storage.db_path.to_str(), Some("/tmp/x/sent.db"));
    assert_eq!(cfg.sources.len(), 1);
    assert_eq!(cfg.sources[0].kind, SourceKind::Page);
    clear_env();
}

#[test]
#[serial]
fn missing_explicit_path_is_an_error() {
    clear_env();
    std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/monitor.toml");
    assert!(MonitorConfig::load_default().is_err());
    clear_env();
}

#[test]
#[serial]
fn malformed_toml_is_an_error() {
    clear_env();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "[run\nworkers = ").unwrap();
    std::env::set_var(ENV_CONFIG_PATH, f.path());
    assert!(MonitorConfig::load_default().is_err());
    clear_env();
}

#[test]
#[serial]
fn credentials_are_required() {
    clear_env();
    assert!(TelegramCredentials::from_env().is_err());

    std::env::set_var(ENV_BOT_TOKEN, "123:abc");
    std::env::set_var(ENV_CHAT_ID, "   ");
    let err = TelegramCredentials::from_env().unwrap_err();
    assert!(err.to_string().contains(ENV_CHAT_ID));

    std::env::set_var(ENV_CHAT_ID, "-100987");
    let creds = TelegramCredentials::from_env().unwrap();
    assert_eq!(creds.chat_id, "-100987");
    assert!(!format!("{creds:?}").contains("123:abc"));
    clear_env();
}

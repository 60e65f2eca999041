// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::config::credentials::TelegramCredentials;
pub use crate::config::MonitorConfig;
pub use crate::engine::{Monitor, RunSummary};
pub use crate::ingest::types::{Item, RawItem, SourceKind, SourceProvider};
pub use crate::notify::{Notifier, TelegramNotifier, TransportError};
pub use crate::store::{HistoryLog, JsonlHistoryLog, SentStore, SqliteSentStore};

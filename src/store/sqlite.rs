// src/store/sqlite.rs
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{SentRecord, SentStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sent (
    id           TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    link         TEXT NOT NULL,
    source       TEXT NOT NULL,
    published_at TEXT,
    sent_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sent_sent_at ON sent(sent_at);
";

/// SQLite-backed sent store. Timestamps are stored as fixed-width UTC RFC 3339
/// text, so lexical order equals chronological order.
pub struct SqliteSentStore {
    conn: Connection,
}

impl SqliteSentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sent", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    pub fn get(&self, id: &str) -> Result<Option<SentRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, link, source, published_at, sent_at FROM sent WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, title, link, source_name, published_at, sent_at)) = row else {
            return Ok(None);
        };
        Ok(Some(SentRecord {
            id,
            title,
            link,
            source_name,
            published_at: published_at.as_deref().map(parse_ts).transpose()?,
            sent_at: parse_ts(&sent_at)?,
        }))
    }
}

impl SentStore for SqliteSentStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM sent WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_if_absent(&self, record: &SentRecord) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO sent (id, title, link, source, published_at, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.title,
                record.link,
                record.source_name,
                record.published_at.map(fmt_ts),
                fmt_ts(record.sent_at),
            ],
        )?;
        Ok(changed > 0)
    }

    fn titles_sent_since(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT title FROM sent WHERE sent_at >= ?1 ORDER BY sent_at ASC")?;
        let rows = stmt.query_map(params![fmt_ts(since)], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(id: &str, title: &str, sent_at: DateTime<Utc>) -> SentRecord {
        SentRecord {
            id: id.into(),
            title: title.into(),
            link: format!("https://x.test/{id}"),
            source_name: "S".into(),
            published_at: None,
            sent_at,
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let store = SqliteSentStore::in_memory().unwrap();
        let t = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert!(store.insert_if_absent(&record("a", "A", t)).unwrap());
        assert!(!store.insert_if_absent(&record("a", "A again", t)).unwrap());
        assert!(store.exists("a").unwrap());
        assert!(!store.exists("b").unwrap());
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get("a").unwrap().unwrap().title, "A");
    }

    #[test]
    fn titles_since_is_inclusive_and_ordered() {
        let store = SqliteSentStore::in_memory().unwrap();
        let t = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        store
            .insert_if_absent(&record("new", "Novo", t + Duration::hours(1)))
            .unwrap();
        store.insert_if_absent(&record("edge", "Borda", t)).unwrap();
        store
            .insert_if_absent(&record("old", "Velho", t - Duration::seconds(1)))
            .unwrap();
        assert_eq!(store.titles_sent_since(t).unwrap(), vec!["Borda", "Novo"]);
    }

    #[test]
    fn timestamps_round_trip() {
        let store = SqliteSentStore::in_memory().unwrap();
        let t = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let mut r = record("p", "P", t);
        r.published_at = Some(t - Duration::minutes(30));
        store.insert_if_absent(&r).unwrap();
        assert_eq!(store.get("p").unwrap().unwrap(), r);
    }
}

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Search history kept in a libSQL database (a hosted Turso database, or a
//! local file).
//!
//! Persistence is best effort: callers log and report failures but never let
//! them block the display of results that were already fetched.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use libsql::{Builder, Connection, Database};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::normalize::ArticleRecord;
use crate::query::{parse_date, SearchRequest};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS search_log (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    topic           TEXT NOT NULL,
    start_date      TEXT NOT NULL,
    end_date        TEXT NOT NULL,
    language        TEXT NOT NULL,
    result_count    INTEGER NOT NULL,
    result_snapshot TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_search_log_created_at ON search_log (created_at DESC);
";

const SELECT_COLUMNS: &str = "SELECT id, topic, start_date, end_date, language, result_count, \
     result_snapshot, created_at FROM search_log";

/// One completed search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchLogEntry {
    /// Assigned by the store, `None` before the entry is appended.
    pub id: Option<i64>,
    pub topic: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub language: String,
    pub result_count: usize,
    pub records: Vec<ArticleRecord>,
    pub created_at: DateTime<Utc>,
}

impl SearchLogEntry {
    pub fn new(request: &SearchRequest, records: &[ArticleRecord]) -> Self {
        Self {
            id: None,
            topic: request.topic().to_string(),
            start_date: request.start_date(),
            end_date: request.end_date(),
            language: request.language().to_string(),
            result_count: records.len(),
            records: records.to_vec(),
            created_at: Utc::now(),
        }
    }

    pub fn date_range(&self) -> String {
        format!("{} / {}", self.start_date, self.end_date)
    }
}

/// Serialise a result list for the `result_snapshot` column.
pub fn serialize_snapshot(records: &[ArticleRecord]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(records)?)
}

/// Inverse of [`serialize_snapshot`].
pub fn parse_snapshot(snapshot: &str) -> Result<Vec<ArticleRecord>, StoreError> {
    Ok(serde_json::from_str(snapshot)?)
}

#[async_trait]
pub trait SearchHistory: Send + Sync {
    /// Store a completed search, returning its id.
    async fn append(&self, entry: &SearchLogEntry) -> Result<i64, StoreError>;

    /// Most recent searches first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<SearchLogEntry>, StoreError>;

    async fn get(&self, id: i64) -> Result<SearchLogEntry, StoreError>;
}

pub struct HistoryStore {
    // Kept alive for the lifetime of the connection.
    _db: Database,
    conn: Connection,
}

impl HistoryStore {
    /// Open the store described by `config`.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        if config.is_remote() {
            info!(url = %config.url, "opening hosted history store");
            Self::open_remote(&config.url, &config.auth_token).await
        } else {
            info!(path = %config.url, "opening local history store");
            Self::open_local(&config.url).await
        }
    }

    /// A local database file, or `:memory:`.
    pub async fn open_local(path: &str) -> Result<Self, StoreError> {
        let db = Builder::new_local(path).build().await?;
        Self::init(db).await
    }

    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self, StoreError> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        Self::init(db).await
    }

    async fn init(db: Database) -> Result<Self, StoreError> {
        let conn = db.connect()?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| StoreError::Query(format!("schema: {e}")))?;
        Ok(Self { _db: db, conn })
    }
}

#[async_trait]
impl SearchHistory for HistoryStore {
    async fn append(&self, entry: &SearchLogEntry) -> Result<i64, StoreError> {
        let snapshot = serialize_snapshot(&entry.records)?;
        let mut rows = self
            .conn
            .query(
                "INSERT INTO search_log \
                 (topic, start_date, end_date, language, result_count, result_snapshot, \
                 created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
                libsql::params![
                    entry.topic.as_str(),
                    entry.start_date.to_string(),
                    entry.end_date.to_string(),
                    entry.language.as_str(),
                    entry.result_count as i64,
                    snapshot,
                    entry.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
                ],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::Query("insert returned no id".into()))?;
        let id = row.get::<i64>(0)?;
        debug!(id, topic = %entry.topic, "search stored");
        Ok(id)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<SearchLogEntry>, StoreError> {
        let mut rows = self
            .conn
            .query(
                &format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ?1"),
                [i64::from(limit)],
            )
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }

    async fn get(&self, id: i64) -> Result<SearchLogEntry, StoreError> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id])
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound(id))?;
        row_to_entry(&row)
    }
}

fn row_to_entry(row: &libsql::Row) -> Result<SearchLogEntry, StoreError> {
    let start = row.get::<String>(2)?;
    let end = row.get::<String>(3)?;
    let created_at = row.get::<String>(7)?;
    Ok(SearchLogEntry {
        id: Some(row.get::<i64>(0)?),
        topic: row.get::<String>(1)?,
        start_date: parse_date("start date", &start).map_err(|e| StoreError::Query(e.to_string()))?,
        end_date: parse_date("end date", &end).map_err(|e| StoreError::Query(e.to_string()))?,
        language: row.get::<String>(4)?,
        result_count: usize::try_from(row.get::<i64>(5)?).unwrap_or_default(),
        records: parse_snapshot(&row.get::<String>(6)?)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Query(format!("bad created_at '{created_at}': {e}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Language;
    use pretty_assertions::assert_eq;

    fn request(topic: &str) -> SearchRequest {
        SearchRequest::new(
            topic,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            Language::EnglishSpanish,
        )
        .unwrap()
    }

    fn records() -> Vec<ArticleRecord> {
        let mut a = ArticleRecord::with_title("Soil carbon");
        a.year = "2021".into();
        a.year_value = Some(2021);
        a.keywords = "soil, carbon".into();
        vec![a, ArticleRecord::with_title("Cover crops")]
    }

    #[test]
    fn snapshot_round_trip() {
        let original = records();
        let parsed = parse_snapshot(&serialize_snapshot(&original).unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[tokio::test]
    async fn append_then_get() {
        let store = HistoryStore::open_local(":memory:").await.unwrap();
        let entry = SearchLogEntry::new(&request("soil"), &records());
        let id = store.append(&entry).await.unwrap();

        let loaded = store.get(id).await.unwrap();
        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.topic, "soil");
        assert_eq!(loaded.language, "en,es");
        assert_eq!(loaded.result_count, 2);
        assert_eq!(loaded.records, entry.records);
        assert_eq!(loaded.date_range(), "2020-01-01 / 2024-06-30");
    }

    #[tokio::test]
    async fn list_recent_is_newest_first_and_bounded() {
        let store = HistoryStore::open_local(":memory:").await.unwrap();
        for topic in ["first", "second", "third"] {
            store
                .append(&SearchLogEntry::new(&request(topic), &records()))
                .await
                .unwrap();
        }
        let recent = store.list_recent(2).await.unwrap();
        let topics: Vec<&str> = recent.iter().map(|e| e.topic.as_str()).collect();
        assert_eq!(topics, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn missing_id_is_not_found() {
        let store = HistoryStore::open_local(":memory:").await.unwrap();
        assert!(matches!(store.get(42).await, Err(StoreError::NotFound(42))));
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            url: dir.path().join("history.db").to_string_lossy().into_owned(),
            ..Default::default()
        };

        let id = {
            let store = HistoryStore::open(&config).await.unwrap();
            store
                .append(&SearchLogEntry::new(&request("soil"), &records()))
                .await
                .unwrap()
        };

        let store = HistoryStore::open(&config).await.unwrap();
        let recent = store.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, Some(id));
    }
}

//! sqlx-backed record store.
//!
//! Every collection lives in one `records` table; documents are stored as
//! JSON text and filtered after loading. `seq` keeps insertion order.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info, warn};

use super::{Collection, Filter, RecordStore};
use crate::core::errors::WalletError;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, WalletError> {
        let db_url = normalize_url(database_url);
        ensure_parent_dir(&db_url);

        let safe_db_url_info = match db_url.split_once("://") {
            Some((scheme, rest)) => format!("{}://(redacted, len={})", scheme, rest.len()),
            None => "(invalid db_url format)".to_string(),
        };
        info!(db = %safe_db_url_info, "[storage] connecting to database");

        let is_memory = db_url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| WalletError::ConfigError(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .journal_mode(if is_memory { SqliteJournalMode::Memory } else { SqliteJournalMode::Wal });

        // An in-memory database exists per connection, so keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(if is_memory { 1 } else { 5 })
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), WalletError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                body TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection, seq)")
            .execute(&self.pool)
            .await?;
        debug!("record schema ready");
        Ok(())
    }

    async fn load(&self, collection: Collection) -> Result<Vec<(i64, Value)>, WalletError> {
        let rows = sqlx::query("SELECT seq, body FROM records WHERE collection = ? ORDER BY seq")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await?;
        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let seq: i64 = row.try_get("seq")?;
            let body: String = row.try_get("body")?;
            match serde_json::from_str(&body) {
                Ok(doc) => docs.push((seq, doc)),
                Err(e) => warn!(seq, collection = collection.as_str(), "skipping unreadable record: {}", e),
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, WalletError> {
        Ok(self
            .load(collection)
            .await?
            .into_iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(_, doc)| doc)
            .collect())
    }

    async fn insert(&self, collection: Collection, doc: Value) -> Result<(), WalletError> {
        sqlx::query("INSERT INTO records (collection, body) VALUES (?, ?)")
            .bind(collection.as_str())
            .bind(serde_json::to_string(&doc)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, collection: Collection, filter: &Filter) -> Result<usize, WalletError> {
        let doomed: Vec<i64> = self
            .load(collection)
            .await?
            .into_iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(seq, _)| seq)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for seq in &doomed {
            sqlx::query("DELETE FROM records WHERE seq = ?")
                .bind(seq)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(doomed.len())
    }
}

/// Accept both `sqlite:path` and `sqlite://path`.
fn normalize_url(database_url: &str) -> String {
    if database_url.starts_with("sqlite:") && !database_url.starts_with("sqlite://") {
        database_url.replacen("sqlite:", "sqlite://", 1)
    } else {
        database_url.to_string()
    }
}

fn ensure_parent_dir(db_url: &str) {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return;
    };
    let path_only = path.split('?').next().unwrap_or(path);
    if path_only.is_empty() || path_only == ":memory:" {
        return;
    }
    if let Some(parent) = std::path::Path::new(path_only).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create database dir {:?}: {}", parent, e);
            }
        }
    }
}

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::analysis::AnalysisRecord;
use crate::config::RetentionPolicy;
use crate::error::EngineError;

/// Append-only record arena keyed by fixture id.
pub trait AnalysisStore: Send + Sync {
    fn append(&self, record: &AnalysisRecord) -> Result<(), EngineError>;

    /// Most recent record for the fixture created at or after `since`.
    fn latest_since(
        &self,
        fixture_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Option<AnalysisRecord>, EngineError>;

    /// Removes every record for the fixture, returning how many were dropped.
    fn delete_fixture(&self, fixture_id: u64) -> Result<usize, EngineError>;

    /// Applies `policy` to one fixture (or all when `None`); returns records removed.
    fn compact(
        &self,
        fixture_id: Option<u64>,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<usize, EngineError>;

    fn count(&self) -> Result<usize, EngineError>;

    fn count_since(&self, since: DateTime<Utc>) -> Result<usize, EngineError>;
}

#[derive(Default)]
pub struct MemoryAnalysisStore {
    inner: Mutex<HashMap<u64, Vec<AnalysisRecord>>>,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Vec<AnalysisRecord>>> {
        // Records are only ever pushed or removed whole, so a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AnalysisStore for MemoryAnalysisStore {
    fn append(&self, record: &AnalysisRecord) -> Result<(), EngineError> {
        self.lock()
            .entry(record.fixture_id())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn latest_since(
        &self,
        fixture_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Option<AnalysisRecord>, EngineError> {
        let map = self.lock();
        Ok(map.get(&fixture_id).and_then(|records| {
            records
                .iter()
                .filter(|r| r.created_at >= since)
                .max_by_key(|r| r.created_at)
                .cloned()
        }))
    }

    fn delete_fixture(&self, fixture_id: u64) -> Result<usize, EngineError> {
        Ok(self.lock().remove(&fixture_id).map_or(0, |v| v.len()))
    }

    fn compact(
        &self,
        fixture_id: Option<u64>,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        let mut map = self.lock();
        let cutoff = policy.max_age().map(|age| now - age);
        let mut removed = 0;
        for (id, records) in map.iter_mut() {
            if fixture_id.is_some_and(|f| f != *id) {
                continue;
            }
            let before = records.len();
            if let Some(cutoff) = cutoff {
                records.retain(|r| r.created_at >= cutoff);
            }
            if let Some(max) = policy.max_entries_per_fixture {
                if records.len() > max {
                    records.sort_by_key(|r| r.created_at);
                    let excess = records.len() - max;
                    records.drain(..excess);
                }
            }
            removed += before - records.len();
        }
        map.retain(|_, records| !records.is_empty());
        Ok(removed)
    }

    fn count(&self) -> Result<usize, EngineError> {
        Ok(self.lock().values().map(Vec::len).sum())
    }

    fn count_since(&self, since: DateTime<Utc>) -> Result<usize, EngineError> {
        Ok(self
            .lock()
            .values()
            .flatten()
            .filter(|r| r.created_at >= since)
            .count())
    }
}

/// Durable store: one row per record, payload as JSON.
pub struct SqliteAnalysisStore {
    conn: Mutex<Connection>,
}

impl SqliteAnalysisStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            fixture_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            created_us INTEGER NOT NULL,
            confidence INTEGER NOT NULL,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_analyses_fixture ON analyses(fixture_id, created_us);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

fn insert_record(conn: &Connection, record: &AnalysisRecord) -> Result<()> {
    let payload = serde_json::to_string(record).context("serialize analysis record")?;
    conn.execute(
        r#"
        INSERT INTO analyses (fixture_id, created_at, created_us, confidence, payload)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            record.fixture_id() as i64,
            record.created_at.to_rfc3339(),
            record.created_at.timestamp_micros(),
            i64::from(record.confidence),
            payload,
        ],
    )
    .context("insert analysis record")?;
    Ok(())
}

fn load_latest(conn: &Connection, fixture_id: u64, since: DateTime<Utc>) -> Result<Option<AnalysisRecord>> {
    let payload: Option<String> = conn
        .query_row(
            r#"
            SELECT payload FROM analyses
            WHERE fixture_id = ?1 AND created_us >= ?2
            ORDER BY created_us DESC, seq DESC
            LIMIT 1
            "#,
            params![fixture_id as i64, since.timestamp_micros()],
            |row| row.get(0),
        )
        .optional()
        .context("query latest analysis")?;

    payload
        .map(|raw| serde_json::from_str(&raw).context("decode analysis payload"))
        .transpose()
}

fn compact_rows(
    conn: &mut Connection,
    fixture_id: Option<u64>,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<usize> {
    let tx = conn.transaction().context("begin compaction")?;
    let mut removed = 0;

    if let Some(age) = policy.max_age() {
        let cutoff = (now - age).timestamp_micros();
        removed += match fixture_id {
            Some(id) => tx.execute(
                "DELETE FROM analyses WHERE fixture_id = ?1 AND created_us < ?2",
                params![id as i64, cutoff],
            ),
            None => tx.execute("DELETE FROM analyses WHERE created_us < ?1", params![cutoff]),
        }
        .context("delete expired analyses")?;
    }

    if let Some(max) = policy.max_entries_per_fixture {
        let ids: Vec<i64> = match fixture_id {
            Some(id) => vec![id as i64],
            None => {
                let mut stmt = tx
                    .prepare("SELECT DISTINCT fixture_id FROM analyses")
                    .context("prepare fixture list")?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, i64>(0))
                    .context("query fixture list")?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.context("decode fixture id")?);
                }
                out
            }
        };
        for id in ids {
            removed += tx
                .execute(
                    r#"
                    DELETE FROM analyses
                    WHERE fixture_id = ?1
                      AND seq NOT IN (
                        SELECT seq FROM analyses
                        WHERE fixture_id = ?1
                        ORDER BY created_us DESC, seq DESC
                        LIMIT ?2
                      )
                    "#,
                    params![id, max as i64],
                )
                .context("trim analyses per fixture")?;
        }
    }

    tx.commit().context("commit compaction")?;
    Ok(removed)
}

fn store_error(err: anyhow::Error) -> EngineError {
    EngineError::Store(format!("{err:#}"))
}

impl AnalysisStore for SqliteAnalysisStore {
    fn append(&self, record: &AnalysisRecord) -> Result<(), EngineError> {
        insert_record(&self.conn(), record).map_err(store_error)
    }

    fn latest_since(
        &self,
        fixture_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Option<AnalysisRecord>, EngineError> {
        load_latest(&self.conn(), fixture_id, since).map_err(store_error)
    }

    fn delete_fixture(&self, fixture_id: u64) -> Result<usize, EngineError> {
        self.conn()
            .execute(
                "DELETE FROM analyses WHERE fixture_id = ?1",
                params![fixture_id as i64],
            )
            .context("delete fixture analyses")
            .map_err(store_error)
    }

    fn compact(
        &self,
        fixture_id: Option<u64>,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        let removed = compact_rows(&mut self.conn(), fixture_id, policy, now).map_err(store_error)?;
        debug!(?fixture_id, removed, "sqlite compaction");
        Ok(removed)
    }

    fn count(&self) -> Result<usize, EngineError> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM analyses", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .context("count analyses")
            .map_err(store_error)
    }

    fn count_since(&self, since: DateTime<Utc>) -> Result<usize, EngineError> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM analyses WHERE created_us >= ?1",
                params![since.timestamp_micros()],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
            .context("count recent analyses")
            .map_err(store_error)
    }
}

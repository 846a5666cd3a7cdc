//! Local chat history (SQLite).
//!
//! Append-only `messages` table backing the history panel of the voice UI. Each call
//! opens its own connection so the store can be shared across blocking tasks.

use chrono::{TimeZone, Utc};
use parley_core::{HistoryEntry, HistoryError, HistoryStore, Role};
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct HistorySqlite {
    db_path: PathBuf,
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn backend(e: rusqlite::Error) -> HistoryError {
    HistoryError::Backend(e.to_string())
}

impl HistorySqlite {
    pub fn new(db_path: PathBuf) -> Result<Self, HistoryError> {
        let this = Self { db_path };
        this.init()?;
        Ok(this)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection, HistoryError> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(backend)
    }

    fn init(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at_ms);
            "#,
        )
        .map_err(backend)?;
        Ok(())
    }
}

impl HistoryStore for HistorySqlite {
    fn insert(&self, role: Role, content: &str) -> Result<(), HistoryError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO messages (id, role, content, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![uuid::Uuid::new_v4().to_string(), role.as_str(), content, now_ms()],
        )
        .map_err(backend)?;
        Ok(())
    }

    fn query(&self, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare("SELECT id, role, content, created_at_ms FROM messages ORDER BY seq DESC LIMIT ?1")
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![limit as i64], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, i64>(3)?,
                ))
            })
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;

        // Oldest -> newest for UI rendering.
        let mut entries = Vec::with_capacity(rows.len());
        for (id, role, content, created_at_ms) in rows.into_iter().rev() {
            let role: Role = role.parse().map_err(HistoryError::Backend)?;
            let created_at = Utc
                .timestamp_millis_opt(created_at_ms)
                .single()
                .unwrap_or_else(Utc::now);
            entries.push(HistoryEntry {
                id,
                role,
                content,
                created_at,
            });
        }
        Ok(entries)
    }
}

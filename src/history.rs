//! Interaction history store
//!
//! Logs (question, context, answer) triples to SQLite for later reuse as
//! model-training data. The search path never depends on this store: a
//! failed save is logged and the response is returned anyway.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed log of answered questions
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

/// One logged interaction
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub question: String,
    pub answer: String,
}

impl HistoryStore {
    /// Open (or create) the history database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open history database: {}", path.display()))?;

        Self::from_connection(conn)
    }

    /// In-memory store, used by tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                question TEXT NOT NULL,
                context_used TEXT NOT NULL,
                answer TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create history table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record one interaction with a UTC timestamp
    pub fn save(&self, question: &str, context_used: &[String], answer: &str) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();
        let context_json =
            serde_json::to_string(context_used).context("Failed to serialize context")?;

        let conn = self.conn.lock().expect("history lock poisoned");
        conn.execute(
            "INSERT INTO history (timestamp, question, context_used, answer)
             VALUES (?1, ?2, ?3, ?4)",
            params![timestamp, question, context_json, answer],
        )
        .context("Failed to insert history entry")?;

        Ok(())
    }

    /// Latest entries, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock().expect("history lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT timestamp, question, answer FROM history
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(HistoryEntry {
                timestamp: row.get(0)?,
                question: row.get(1)?,
                answer: row.get(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Delete all entries
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().expect("history lock poisoned");
        conn.execute("DELETE FROM history", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_recent() {
        let store = HistoryStore::open_in_memory().unwrap();

        store
            .save(
                "can I block with a tapped creature?",
                &["509.1a. Untapped requirement.".to_string()],
                "No, a tapped creature cannot be declared as a blocker.",
            )
            .unwrap();
        store
            .save("what is trample?", &["702.19. Trample.".to_string()], "Trample lets excess damage through.")
            .unwrap();

        let entries = store.recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert_eq!(entries[0].question, "what is trample?");
        assert_eq!(entries[1].question, "can I block with a tapped creature?");
    }

    #[test]
    fn test_recent_respects_limit() {
        let store = HistoryStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .save(&format!("question {i}"), &[], &format!("answer {i}"))
                .unwrap();
        }
        assert_eq!(store.recent(3).unwrap().len(), 3);
    }

    #[test]
    fn test_clear() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.save("q", &["c".to_string()], "a").unwrap();
        store.clear().unwrap();
        assert!(store.recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");
        let store = HistoryStore::open(&path).unwrap();
        store.save("q", &[], "a").unwrap();
        assert!(path.exists());
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const SELECTION_SNAPSHOT: &str = "selection";
pub const HISTORY_SNAPSHOT: &str = "history";

/// Named JSON snapshots in a single sqlite table
#[derive(Debug)]
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory().context("open in-memory db")?,
        };
        store.init()?;
        Ok(store)
    }

    /// `Ok(None)` when nothing was saved under `name` yet
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM snapshots WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => {
                let value = serde_json::from_str(&body)
                    .with_context(|| format!("decode snapshot {name}"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let body = serde_json::to_string(value).with_context(|| format!("encode snapshot {name}"))?;
        self.save_raw(name, &body)
    }

    pub(crate) fn save_raw(&self, name: &str, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO snapshots(name, body, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))
             ON CONFLICT(name) DO UPDATE SET body=excluded.body, updated_at=excluded.updated_at",
            params![name, body],
        )?;
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM snapshots WHERE name = ?1", params![name])?;
        Ok(())
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS snapshots (
                name       TEXT PRIMARY KEY,
                body       TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }
}

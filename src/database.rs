use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Store, SyncDescriptor, SyncStatus};
use crate::sync::generate_sync_id;

/// Entry holding the serialized `Store`
pub const STORE_KEY: &str = "divulgalocal_v3_data";
/// Entry holding the serialized `SyncDescriptor`
pub const SYNC_KEY: &str = "divulgalocal_sync";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Failed to serialize value: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Local device storage: a flat string key/value table in SQLite.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        let db = Database { conn };
        db.initialize_schema()?;
        debug!(path = %db_path.display(), "opened database");

        Ok(db)
    }

    /// In-memory database, used by tests and throwaway sessions
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )?;
        Ok(())
    }

    /// Load the store. A missing or unreadable entry yields an empty store.
    pub fn load_store(&self) -> Result<Store, DatabaseError> {
        let Some(raw) = self.get(STORE_KEY)? else {
            return Ok(Store::default());
        };
        match serde_json::from_str::<Store>(&raw) {
            Ok(store) => Ok(store),
            Err(e) => {
                warn!(error = %e, "stored planner data is malformed, starting empty");
                Ok(Store::default())
            }
        }
    }

    pub fn save_store(&self, store: &Store) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(store)?;
        self.set(STORE_KEY, &json)
    }

    /// Load the sync descriptor, generating and persisting a fresh one when
    /// the entry is missing or unreadable. An interrupted `syncing` status
    /// comes back as idle.
    pub fn load_sync_descriptor(&self) -> Result<SyncDescriptor, DatabaseError> {
        let parsed = match self.get(SYNC_KEY)? {
            Some(raw) => serde_json::from_str::<SyncDescriptor>(&raw)
                .inspect_err(|e| warn!(error = %e, "stored sync descriptor is malformed"))
                .ok(),
            None => None,
        };

        match parsed {
            Some(mut descriptor) => {
                if descriptor.status == SyncStatus::Syncing {
                    descriptor.status = SyncStatus::Idle;
                }
                Ok(descriptor)
            }
            None => {
                let descriptor = SyncDescriptor::new(generate_sync_id());
                self.save_sync_descriptor(&descriptor)?;
                debug!(sync_id = %descriptor.sync_id, "generated sync id");
                Ok(descriptor)
            }
        }
    }

    pub fn save_sync_descriptor(&self, descriptor: &SyncDescriptor) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(descriptor)?;
        self.set(SYNC_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelKind, TaskEdit};
    use crate::planner::DayKey;
    use chrono::NaiveDate;

    fn sample_store() -> Store {
        let mut store = Store::default();
        let day = DayKey::from_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        store.toggle_channel(&day, ChannelKind::Facebook);
        store.update_task(&day, ChannelKind::Facebook, "fb-market", TaskEdit::Text("Sofá 3 lugares".into()));
        store.update_task(&day, ChannelKind::Facebook, "fb-market", TaskEdit::Completed(true));
        let other = DayKey::from_date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        store.update_task(&other, ChannelKind::TikTok, "tt-auction", TaskEdit::Tags("#leilao".into()));
        store
    }

    #[test]
    fn empty_database_loads_empty_store() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.load_store().unwrap(), Store::default());
    }

    #[test]
    fn store_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("planner.db");
        let store = sample_store();

        {
            let db = Database::new(path.to_str().unwrap()).unwrap();
            db.save_store(&store).unwrap();
        }

        let db = Database::new(path.to_str().unwrap()).unwrap();
        assert_eq!(db.load_store().unwrap(), store);
    }

    #[test]
    fn malformed_store_falls_back_to_empty() {
        let db = Database::in_memory().unwrap();
        db.set(STORE_KEY, "{not json").unwrap();
        assert_eq!(db.load_store().unwrap(), Store::default());

        db.set(STORE_KEY, r#"{"2024-1-1":{"categories":[{"id":"myspace","name":"x","items":[]}]}}"#).unwrap();
        assert_eq!(db.load_store().unwrap(), Store::default());
    }

    #[test]
    fn missing_sync_descriptor_is_generated_once() {
        let db = Database::in_memory().unwrap();
        let first = db.load_sync_descriptor().unwrap();
        assert_eq!(first.status, SyncStatus::Idle);
        assert!(first.last_sync.is_none());

        let second = db.load_sync_descriptor().unwrap();
        assert_eq!(first.sync_id, second.sync_id);
    }

    #[test]
    fn malformed_sync_descriptor_is_replaced() {
        let db = Database::in_memory().unwrap();
        db.set(SYNC_KEY, "[]").unwrap();
        let descriptor = db.load_sync_descriptor().unwrap();
        assert_eq!(descriptor.sync_id.len(), 8);
    }

    #[test]
    fn interrupted_sync_comes_back_idle() {
        let db = Database::in_memory().unwrap();
        let mut descriptor = SyncDescriptor::new("abcd1234".to_string());
        descriptor.status = SyncStatus::Syncing;
        db.save_sync_descriptor(&descriptor).unwrap();

        let loaded = db.load_sync_descriptor().unwrap();
        assert_eq!(loaded.sync_id, "abcd1234");
        assert_eq!(loaded.status, SyncStatus::Idle);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let db = Database::in_memory().unwrap();
        db.set("k", "one").unwrap();
        db.set("k", "two").unwrap();
        assert_eq!(db.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(db.get("missing").unwrap(), None);
    }
}

//! SQLite persistence for quests, downloaded tiles and note positions

mod notes;
mod quests;
mod schema;
mod tiles;

use crate::error::{QuestError, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub use quests::ReplaceResult;
pub use schema::{create_schema, SchemaCreateResult, CURRENT_SCHEMA_VERSION};
pub use tiles::DownloadCategory;

/// SQLite store shared by the reconciliation and download components
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at `path`.
    ///
    /// A corrupted file is deleted and recreated; everything except answered quests can be
    /// downloaded again.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        match Self::open_internal(path) {
            Ok(db) => Ok(db),
            Err(e) if Self::is_corruption_error(&e) && path.exists() => {
                tracing::error!(
                    "Database corruption detected at {}: {}. Recreating...",
                    path.display(),
                    e
                );
                std::fs::remove_file(path).map_err(|delete_err| {
                    QuestError::Other(format!(
                        "failed to delete corrupted database: {} (original error: {})",
                        delete_err, e
                    ))
                })?;
                let _ = std::fs::remove_file(path.with_extension("db-wal"));
                let _ = std::fs::remove_file(path.with_extension("db-shm"));
                Self::open_internal(path)
            }
            Err(e) => Err(e),
        }
    }

    /// Fresh database that lives only as long as the returned value
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| QuestError::Other(format!("failed to open in-memory database: {}", e)))?;
        Self::init(conn)
    }

    fn open_internal(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            QuestError::Other(format!(
                "failed to open database at {}: {}",
                path.display(),
                e
            ))
        })?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| QuestError::Other(format!("failed to enable WAL mode: {}", e)))?;

        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        let result = create_schema(&conn)
            .map_err(|e| QuestError::Other(format!("failed to create database schema: {}", e)))?;
        if result == SchemaCreateResult::Recreated {
            tracing::info!("Database schema was recreated, cached quests were dropped");
        }
        Ok(Database { conn })
    }

    fn is_corruption_error(error: &QuestError) -> bool {
        match error {
            QuestError::Other(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("malformed")
                    || msg_lower.contains("corrupt")
                    || msg_lower.contains("file is not a database")
            }
            _ => false,
        }
    }

    pub fn get_schema_version(&self) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = 'schema_version'",
                [],
                |r| {
                    let s: String = r.get(0)?;
                    Ok(s.parse().unwrap_or(0))
                },
            )
            .map_err(|e| QuestError::Other(format!("failed to get schema version: {}", e)))
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.conn.pragma_update(None, "wal_checkpoint", "TRUNCATE");
    }
}

/// Lock a database shared between the caller and a download worker.
///
/// Every store mutation happens while holding this lock, so two overlapping downloads
/// cannot create the same quest twice.
pub fn lock(db: &Mutex<Database>) -> Result<MutexGuard<'_, Database>> {
    db.lock()
        .map_err(|_| QuestError::Other("database lock poisoned by a panicked worker".to_string()))
}

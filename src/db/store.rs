//! Single-writer record store shared by concurrent batch tasks.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use super::repository;
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::models::{ChatMessage, ChatRole, DocumentRecord, RecordStatus};
use crate::pipeline::naming::sidecar_path;

/// Owns the SQLite connection behind a mutex so every call is serialized,
/// however many tasks hold an `Arc<RecordStore>`.
pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl RecordStore {
    pub fn open(path: &Path, reset: bool) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path, reset)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    pub fn upsert(&self, record: &DocumentRecord) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        repository::upsert_record(&conn, record)
    }

    pub fn get(&self, id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
        let conn = self.lock()?;
        repository::get_record(&conn, id)
    }

    pub fn list(&self) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let conn = self.lock()?;
        repository::list_records(&conn)
    }

    pub fn search(&self, query: &str) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let conn = self.lock()?;
        repository::search_records(&conn, query)
    }

    pub fn set_status(&self, id: &str, status: RecordStatus) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        repository::update_status(&conn, id, status)
    }

    /// Remove the record, its on-disk file and `{path}.json` sidecar.
    /// Files go first, so a failed removal leaves the record in place.
    /// Returns `false` if no such record existed.
    pub fn delete(&self, id: &str) -> Result<bool, DatabaseError> {
        let conn = self.lock()?;
        let Some(record) = repository::get_record(&conn, id)? else {
            return Ok(false);
        };
        let path = PathBuf::from(&record.path);
        remove_if_present(&path)?;
        remove_if_present(&sidecar_path(&path))?;
        repository::delete_record(&conn, id)?;
        tracing::info!(document_id = %id, path = %path.display(), "Record deleted");
        Ok(true)
    }

    /// Append one message and return the full updated history.
    pub fn append_chat_message(
        &self,
        id: &str,
        role: ChatRole,
        message: &str,
        tokens: Option<u32>,
        cost: Option<f64>,
    ) -> Result<Vec<ChatMessage>, DatabaseError> {
        let conn = self.lock()?;
        let record = repository::get_record(&conn, id)?.ok_or_else(|| DatabaseError::NotFound {
            entity_type: "DocumentRecord".into(),
            id: id.to_string(),
        })?;

        let mut history = record.chat_history;
        history.push(ChatMessage {
            role,
            message: message.to_string(),
            tokens,
            cost,
        });
        repository::update_chat_history(&conn, id, &history)?;
        Ok(history)
    }
}

fn remove_if_present(path: &Path) -> Result<(), DatabaseError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

//! Human review actions on stored records.
//!
//! A pending or review record is finalized once someone approves its
//! destination: missing folders are created, the file is moved and the
//! record is updated in place.

use std::path::Path;

use thiserror::Error;

use crate::config::AppConfig;
use crate::db::{DatabaseError, RecordStore};
use crate::models::{ChatMessage, DocumentRecord, RecordStatus};
use crate::pipeline::filing::{FilingError, FilingOperation};

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document {id} is {status}, expected draft, pending or review")]
    InvalidStatus { id: String, status: RecordStatus },

    #[error("Filing failed: {0}")]
    Filing(#[from] FilingError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

fn load(store: &RecordStore, id: &str) -> Result<DocumentRecord, ReviewError> {
    store
        .get(id)?
        .ok_or_else(|| ReviewError::NotFound(id.to_string()))
}

/// Approve a pending/review/draft record: create its folders, file it and
/// mark it finalized. Returns the updated record.
pub fn finalize(
    store: &RecordStore,
    id: &str,
    config: &AppConfig,
) -> Result<DocumentRecord, ReviewError> {
    let mut record = load(store, id)?;
    if !record.status.is_awaiting_review() {
        return Err(ReviewError::InvalidStatus {
            id: id.to_string(),
            status: record.status,
        });
    }

    let created = record.missing.clone();
    let result = FilingOperation::new(config)
        .execute_approved(Path::new(&record.path), &record.metadata)?;
    let destination = result.path.display().to_string();

    record.path = destination.clone();
    record.suggested_path = Some(destination.clone());
    record.created_path = Some(destination);
    record.missing = Vec::new();
    record.confirmed = true;
    record.status = RecordStatus::Finalized;
    store.upsert(&record)?;

    tracing::info!(
        document_id = %id,
        path = %record.path,
        created = ?created,
        "Document finalized"
    );
    Ok(record)
}

/// Delete the record together with its file and sidecar.
pub fn delete_document(store: &RecordStore, id: &str) -> Result<(), ReviewError> {
    if !store.delete(id)? {
        return Err(ReviewError::NotFound(id.to_string()));
    }
    Ok(())
}

pub fn get_chat_history(store: &RecordStore, id: &str) -> Result<Vec<ChatMessage>, ReviewError> {
    Ok(load(store, id)?.chat_history)
}

/// Mark finalized records whose file is gone as `missing`. Returns their ids.
pub fn verify_paths(store: &RecordStore) -> Result<Vec<String>, ReviewError> {
    let mut missing = Vec::new();
    for record in store.list()? {
        if record.status != RecordStatus::Finalized || Path::new(&record.path).exists() {
            continue;
        }
        store.set_status(&record.id, RecordStatus::Missing)?;
        tracing::warn!(document_id = %record.id, path = %record.path, "Filed document missing");
        missing.push(record.id);
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatRole, Metadata};
    use crate::pipeline::naming::sidecar_path;
    use std::fs;
    use std::path::PathBuf;

    fn setup() -> (tempfile::TempDir, AppConfig, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            archive_root: dir.path().join("archive"),
            ..Default::default()
        };
        (dir, config, RecordStore::open_in_memory().unwrap())
    }

    fn pending_record(dir: &Path) -> DocumentRecord {
        let source = dir.join("scan.pdf");
        fs::write(&source, "pdf").unwrap();
        let mut record = DocumentRecord::new("doc-1", "scan.pdf", source.display().to_string());
        record.status = RecordStatus::Pending;
        record.metadata = Metadata {
            person: Some("Petrova Anna".into()),
            category: Some("Medical".into()),
            date: Some("2022-11-03".into()),
            ..Default::default()
        };
        record.missing = vec!["Petrova Anna".into(), "Petrova Anna/Medical".into()];
        record
    }

    #[test]
    fn finalize_files_pending_document() {
        let (dir, config, store) = setup();
        let record = pending_record(dir.path());
        let source = PathBuf::from(&record.path);
        store.upsert(&record).unwrap();

        let updated = finalize(&store, "doc-1", &config).unwrap();
        assert_eq!(updated.status, RecordStatus::Finalized);
        assert!(updated.confirmed);
        assert!(updated.missing.is_empty());
        assert!(!source.exists());

        let filed = PathBuf::from(&updated.path);
        assert_eq!(
            filed,
            config.archive_root.join("Petrova Anna/Medical/2022-11-03__scan.pdf")
        );
        assert!(filed.exists());
        assert!(sidecar_path(&filed).exists());
        let stored = store.get("doc-1").unwrap().unwrap();
        assert_eq!(stored.path, updated.path);
        assert_eq!(stored.status, RecordStatus::Finalized);
    }

    #[test]
    fn finalize_rejects_already_finalized() {
        let (dir, config, store) = setup();
        let mut record = pending_record(dir.path());
        record.status = RecordStatus::Finalized;
        store.upsert(&record).unwrap();

        let err = finalize(&store, "doc-1", &config).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidStatus { .. }));
    }

    #[test]
    fn finalize_unknown_id() {
        let (_dir, config, store) = setup();
        assert!(matches!(
            finalize(&store, "nope", &config),
            Err(ReviewError::NotFound(_))
        ));
    }

    #[test]
    fn delete_removes_record_and_files() {
        let (dir, config, store) = setup();
        store.upsert(&pending_record(dir.path())).unwrap();
        let filed = finalize(&store, "doc-1", &config).unwrap();

        delete_document(&store, "doc-1").unwrap();
        assert!(!Path::new(&filed.path).exists());
        assert!(!sidecar_path(Path::new(&filed.path)).exists());
        assert!(store.get("doc-1").unwrap().is_none());
        assert!(matches!(
            delete_document(&store, "doc-1"),
            Err(ReviewError::NotFound(_))
        ));
    }

    #[test]
    fn chat_history_round_trip() {
        let (dir, _config, store) = setup();
        store.upsert(&pending_record(dir.path())).unwrap();
        store
            .append_chat_message("doc-1", ChatRole::User, "Is this a referral?", None, None)
            .unwrap();

        let history = get_chat_history(&store, "doc-1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, ChatRole::User);
    }

    #[test]
    fn verify_paths_marks_vanished_files() {
        let (dir, config, store) = setup();
        store.upsert(&pending_record(dir.path())).unwrap();
        let filed = finalize(&store, "doc-1", &config).unwrap();

        assert!(verify_paths(&store).unwrap().is_empty());

        fs::remove_file(&filed.path).unwrap();
        assert_eq!(verify_paths(&store).unwrap(), vec!["doc-1"]);
        assert_eq!(
            store.get("doc-1").unwrap().unwrap().status,
            RecordStatus::Missing
        );
    }
}

//! Concurrent batch filing of an input directory.
//!
//! One blocking task per discovered file, bounded by a semaphore. Tasks share
//! only the record store and a folder-index snapshot taken before the run;
//! a failing file is quarantined and counted, never aborting its siblings.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::BatchError;
use crate::config::AppConfig;
use crate::db::RecordStore;
use crate::models::{DocumentRecord, Metadata, RecordStatus};
use crate::pipeline::analysis::{
    analyze_with_policy, AnalysisContext, AnalysisPolicy, AnalyzerOutput, MetadataAnalyzer,
};
use crate::pipeline::extraction::TextExtractor;
use crate::pipeline::filing::{
    folder_tree, quarantine_file, FilingOperation, FilingState, FolderIndex,
};
use crate::pipeline::import::{discover_files, relative_folders};
use crate::pipeline::naming::{sidecar_path, transliterate};
use crate::pipeline::resolve::MetadataResolver;

/// Counts reported at the end of a run. `pending` is a subset of `succeeded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Filed,
    Pending,
    Planned,
}

pub struct BatchProcessor {
    config: Arc<AppConfig>,
    store: Arc<RecordStore>,
    extractor: Arc<dyn TextExtractor>,
    analyzer: Arc<dyn MetadataAnalyzer>,
}

impl BatchProcessor {
    pub fn new(
        config: AppConfig,
        store: Arc<RecordStore>,
        extractor: Arc<dyn TextExtractor>,
        analyzer: Arc<dyn MetadataAnalyzer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            extractor,
            analyzer,
        }
    }

    /// Process every file under `input_dir`. Only a missing or unreadable
    /// input directory is an error; per-file failures are counted.
    pub async fn run(&self, input_dir: &Path, dry_run: bool) -> Result<BatchSummary, BatchError> {
        if !input_dir.is_dir() {
            return Err(BatchError::InputNotFound(input_dir.to_path_buf()));
        }
        let files = discover_files(input_dir)?;
        let mut summary = BatchSummary {
            total: files.len(),
            ..Default::default()
        };

        let folder_index = Arc::new(FolderIndex::build(&self.config.archive_root));
        let context = AnalysisContext {
            folder_tree: folder_tree(&self.config.archive_root),
            folder_index: folder_index.to_json(),
            file_info: None,
        };
        let task = FileTask {
            config: Arc::clone(&self.config),
            input_root: Arc::from(input_dir),
            store: Arc::clone(&self.store),
            extractor: Arc::clone(&self.extractor),
            analyzer: Arc::clone(&self.analyzer),
            resolver: Arc::new(MetadataResolver::with_folder_index(folder_index)),
            filing: Arc::new(FilingOperation::new(&self.config)),
            context: Arc::new(context),
            dry_run,
        };

        tracing::info!(
            input = %input_dir.display(),
            files = files.len(),
            dry_run,
            concurrency = self.config.concurrency(),
            "Batch started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency()));
        let mut tasks = JoinSet::new();
        for path in files {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| BatchError::WorkerPoolClosed)?;
            let task = task.clone();
            tasks.spawn_blocking(move || {
                let outcome = task.run(&path);
                drop(permit);
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(FileOutcome::Pending)) => {
                    summary.succeeded += 1;
                    summary.pending += 1;
                }
                Ok(Some(FileOutcome::Filed | FileOutcome::Planned)) => summary.succeeded += 1,
                Ok(None) => summary.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "Batch task panicked");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            pending = summary.pending,
            "Batch finished"
        );
        Ok(summary)
    }
}

/// Everything one file's pipeline needs, cheap to clone per task.
#[derive(Clone)]
struct FileTask {
    config: Arc<AppConfig>,
    input_root: Arc<Path>,
    store: Arc<RecordStore>,
    extractor: Arc<dyn TextExtractor>,
    analyzer: Arc<dyn MetadataAnalyzer>,
    resolver: Arc<MetadataResolver>,
    filing: Arc<FilingOperation>,
    context: Arc<AnalysisContext>,
    dry_run: bool,
}

/// A per-file error and where the document sits when it happened.
struct FileFailure {
    location: PathBuf,
    error: BatchError,
}

impl FileFailure {
    fn at(location: &Path) -> impl FnOnce(BatchError) -> FileFailure {
        let location = location.to_path_buf();
        move |error| FileFailure { location, error }
    }
}

impl FileTask {
    /// `None` when the file failed; the failure is logged and the file
    /// moved aside (unless dry run).
    fn run(&self, path: &Path) -> Option<FileOutcome> {
        tracing::info!(file = %path.display(), "Processing file");
        match self.process(path) {
            Ok(outcome) => Some(outcome),
            Err(FileFailure { location, error }) => {
                tracing::warn!(
                    file = %path.display(),
                    location = %location.display(),
                    error = %error,
                    "File failed"
                );
                if !self.dry_run {
                    self.set_aside(&location, &error);
                }
                None
            }
        }
    }

    /// Quarantine a failed document from wherever it ended up. A document
    /// that was already filed loses its sidecar first.
    fn set_aside(&self, location: &Path, error: &BatchError) {
        if location.starts_with(&self.config.archive_root) {
            let sidecar = sidecar_path(location);
            if let Err(e) = fs::remove_file(&sidecar) {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(sidecar = %sidecar.display(), error = %e, "Cannot remove sidecar");
                }
            }
        }
        if let Err(e) = quarantine_file(&self.config, location, &error.to_string()) {
            tracing::warn!(file = %location.display(), error = %e, "Quarantine failed");
        }
    }

    fn process(&self, path: &Path) -> Result<FileOutcome, FileFailure> {
        let (metadata, analysis) = self.describe(path).map_err(FileFailure::at(path))?;

        // Batch runs never approve new folders
        let filing = self
            .filing
            .execute(path, &metadata, self.dry_run, |_| false)
            .map_err(BatchError::from)
            .map_err(FileFailure::at(path))?;

        let (status, outcome) = match filing.state {
            FilingState::Filed => (RecordStatus::Finalized, FileOutcome::Filed),
            FilingState::Pending => (RecordStatus::Pending, FileOutcome::Pending),
            FilingState::Planned => (RecordStatus::Review, FileOutcome::Planned),
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut record = DocumentRecord::new(
            Uuid::new_v4().to_string(),
            filename,
            filing.path.display().to_string(),
        );
        record.metadata = metadata;
        record.status = status;
        record.prompt = analysis.prompt;
        record.raw_response = analysis.raw_response;
        record.missing = filing.missing;
        record.suggested_path = Some(filing.destination.display().to_string());
        record.created_path = (filing.state == FilingState::Filed)
            .then(|| filing.destination.display().to_string());
        record.confirmed = filing.confirmed;
        record.sources = vec![path.display().to_string()];

        self.store
            .upsert(&record)
            .map_err(BatchError::from)
            .map_err(FileFailure::at(&filing.path))?;
        tracing::info!(
            file = %path.display(),
            document_id = %record.id,
            status = %record.status,
            missing = ?record.missing,
            "File processed"
        );
        Ok(outcome)
    }

    /// Extract, analyze and resolve. Touches nothing on disk.
    fn describe(&self, path: &Path) -> Result<(Metadata, AnalyzerOutput), BatchError> {
        let extraction = self.extractor.extract(path)?;
        let text = extraction.full_text;

        let context = AnalysisContext {
            file_info: Some(extraction.file_info),
            ..(*self.context).clone()
        };
        let analysis = analyze_with_policy(
            self.analyzer.as_ref(),
            &text,
            &context,
            AnalysisPolicy::FallbackToRegex,
        )?;

        let mut metadata = self.resolver.resolve(&text, &analysis.draft);
        let mut folders = relative_folders(&self.input_root, path).into_iter();
        if metadata.category.is_none() {
            metadata.category = folders.next();
        } else {
            folders.next();
        }
        if metadata.subcategory.is_none() {
            metadata.subcategory = folders.next();
        }
        metadata.merge_tags();
        metadata.suggested_name_translit = metadata.suggested_name.as_deref().map(transliterate);
        metadata.language = metadata.language.or(extraction.language_detected);
        metadata.extracted_text = Some(text);

        Ok((metadata, analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analysis::{LlmAnalyzer, MockLlmClient};
    use crate::pipeline::extraction::{ExtractionError, ExtractionResult, PlainTextExtractor};
    use std::fs;

    /// Plain-text extraction that fails for one file name.
    struct FailingOn(&'static str);

    impl TextExtractor for FailingOn {
        fn extract(&self, path: &Path) -> Result<ExtractionResult, ExtractionError> {
            if path.file_name().is_some_and(|n| n == self.0) {
                return Err(ExtractionError::UnsupportedFormat(self.0.to_string()));
            }
            PlainTextExtractor.extract(path)
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        input: PathBuf,
        archive: PathBuf,
        config: AppConfig,
        store: Arc<RecordStore>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        let archive = dir.path().join("archive");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&archive).unwrap();
        let config = AppConfig {
            archive_root: archive.clone(),
            max_concurrency: 3,
            ..Default::default()
        };
        Fixture {
            _dir: dir,
            input,
            archive,
            config,
            store: Arc::new(RecordStore::open_in_memory().unwrap()),
        }
    }

    fn processor(f: &Fixture, extractor: Arc<dyn TextExtractor>, reply: Option<&str>) -> BatchProcessor {
        let client = match reply {
            Some(json) => MockLlmClient::new(json),
            None => MockLlmClient::unreachable("offline"),
        };
        BatchProcessor::new(
            f.config.clone(),
            Arc::clone(&f.store),
            extractor,
            Arc::new(LlmAnalyzer::new("mock", client)),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn one_failing_file_does_not_affect_the_others() {
        let f = fixture();
        fs::create_dir_all(f.archive.join("Ivanov Ivan/Finance")).unwrap();
        for i in 1..=5 {
            fs::write(f.input.join(format!("doc{i}.txt")), format!("statement {i}")).unwrap();
        }
        let reply = r#"{"person": "Ivan Ivanov", "category": "Finance", "suggested_filename": "statement.pdf"}"#;
        let batch = processor(&f, Arc::new(FailingOn("doc3.txt")), Some(reply));

        let summary = batch.run(&f.input, false).await.unwrap();
        assert_eq!(
            summary,
            BatchSummary { total: 5, succeeded: 4, failed: 1, pending: 0 }
        );

        let records = f.store.list().unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.status == RecordStatus::Finalized));
        assert!(records.iter().all(|r| r.filename != "doc3.txt"));
        for record in &records {
            assert!(Path::new(&record.path).exists());
            assert!(record.prompt.is_some());
        }

        let filed = fs::read_dir(f.archive.join("Ivanov Ivan/Finance"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "txt"))
            .count();
        assert_eq!(filed, 4);
        assert!(f.archive.join("Unsorted/doc3.txt").exists());
        assert!(f.archive.join("errors/doc3.txt.json").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_ai_falls_back_to_regex_and_waits_for_folders() {
        let f = fixture();
        let source = f.input.join("Bills").join("receipt.txt");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "Total 123.45 on 2023-05-17").unwrap();
        let batch = processor(&f, Arc::new(PlainTextExtractor), None);

        let summary = batch.run(&f.input, false).await.unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.pending, 1);

        let record = f.store.list().unwrap().remove(0);
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.metadata.date.as_deref(), Some("2023-05-17"));
        assert_eq!(record.metadata.amount.as_deref(), Some("123.45"));
        assert_eq!(record.metadata.category.as_deref(), Some("Bills"));
        assert!(record.prompt.is_none());
        assert!(record.raw_response.is_none());
        assert_eq!(record.missing, vec!["Shared", "Shared/Bills"]);
        assert_eq!(record.path, source.display().to_string());
        assert!(record
            .suggested_path
            .unwrap()
            .ends_with("2023-05-17__receipt.txt"));
        assert!(source.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dry_run_records_review_without_moving() {
        let f = fixture();
        let source = f.input.join("note.txt");
        fs::write(&source, "hello").unwrap();
        let batch = processor(&f, Arc::new(FailingOn("none")), Some(r#"{"category": "Notes"}"#));

        let summary = batch.run(&f.input, true).await.unwrap();
        assert_eq!(summary.succeeded, 1);

        let record = f.store.list().unwrap().remove(0);
        assert_eq!(record.status, RecordStatus::Review);
        assert_eq!(record.path, source.display().to_string());
        assert!(source.exists());
        assert!(!f.archive.join("Shared").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dry_run_leaves_failed_files_in_place() {
        let f = fixture();
        let source = f.input.join("scan.txt");
        fs::write(&source, "x").unwrap();
        let batch = processor(&f, Arc::new(FailingOn("scan.txt")), None);

        let summary = batch.run(&f.input, true).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert!(source.exists());
        assert!(!f.archive.join("Unsorted").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn store_failure_after_filing_quarantines_the_filed_copy() {
        let mut f = fixture();
        let conn = crate::db::open_memory_database().unwrap();
        conn.execute_batch("DROP TABLE files").unwrap();
        f.store = Arc::new(RecordStore::from_connection(conn));
        fs::create_dir_all(f.archive.join("Shared")).unwrap();
        let source = f.input.join("doc.txt");
        fs::write(&source, "hello").unwrap();
        let batch = processor(&f, Arc::new(PlainTextExtractor), None);

        let summary = batch.run(&f.input, false).await.unwrap();
        assert_eq!(
            summary,
            BatchSummary { total: 1, succeeded: 0, failed: 1, pending: 0 }
        );

        assert!(!source.exists());
        assert_eq!(fs::read_dir(f.archive.join("Shared")).unwrap().count(), 0);
        assert!(f.archive.join("Unsorted/unknown-date__doc.txt").exists());

        let report: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(f.archive.join("errors/unknown-date__doc.txt.json")).unwrap(),
        )
        .unwrap();
        assert!(report["error"].as_str().unwrap().contains("files"));
    }

    #[tokio::test]
    async fn missing_input_directory_is_an_error() {
        let f = fixture();
        let batch = processor(&f, Arc::new(PlainTextExtractor), None);
        let result = batch.run(&f.input.join("absent"), false).await;
        assert!(matches!(result, Err(BatchError::InputNotFound(_))));
    }
}

//! Move a file that could not be processed out of the input tree.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use super::operation::move_to_free_path;
use super::path_builder::unique_path;
use super::FilingError;
use crate::config::AppConfig;
use crate::pipeline::naming::sidecar_path;

/// Move `source` into the unsorted folder and record `error` at
/// `<errors_dir>/<quarantined name>.json`. Returns the new location.
pub fn quarantine_file(
    config: &AppConfig,
    source: &Path,
    error: &str,
) -> Result<PathBuf, FilingError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| FilingError::SourceMissing(source.to_path_buf()))?;

    let unsorted_dir = config.unsorted_dir();
    fs::create_dir_all(&unsorted_dir)?;
    let destination = move_to_free_path(source, &unsorted_dir.join(file_name))?;

    let errors_dir = config.errors_dir();
    fs::create_dir_all(&errors_dir)?;
    let quarantined_name = destination.file_name().unwrap_or(file_name);
    let report_path = unique_path(&sidecar_path(&errors_dir.join(quarantined_name)));
    let report = json!({
        "file": source.display().to_string(),
        "quarantined": destination.display().to_string(),
        "error": error,
    });
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;

    tracing::warn!(
        file = %source.display(),
        destination = %destination.display(),
        error,
        "File quarantined"
    );
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_file_and_writes_error_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            archive_root: dir.path().join("archive"),
            ..Default::default()
        };
        let source = dir.path().join("broken.bin");
        fs::write(&source, [0u8, 1, 2]).unwrap();

        let moved = quarantine_file(&config, &source, "unsupported format").unwrap();
        assert!(!source.exists());
        assert_eq!(moved, dir.path().join("archive/Unsorted/broken.bin"));

        let report: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("archive/errors/broken.bin.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(report["error"], "unsupported format");
        assert!(report["file"].as_str().unwrap().ends_with("broken.bin"));
    }

    #[test]
    fn repeated_names_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            archive_root: dir.path().join("archive"),
            ..Default::default()
        };
        for _ in 0..2 {
            let source = dir.path().join("same.txt");
            fs::write(&source, "x").unwrap();
            quarantine_file(&config, &source, "boom").unwrap();
        }
        assert!(dir.path().join("archive/Unsorted/same.txt").exists());
        assert!(dir.path().join("archive/Unsorted/same_1.txt").exists());

        let errors = dir.path().join("archive/errors");
        let first: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(errors.join("same.txt.json")).unwrap())
                .unwrap();
        let second: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(errors.join("same_1.txt.json")).unwrap())
                .unwrap();
        assert!(first["quarantined"].as_str().unwrap().ends_with("same.txt"));
        assert!(second["quarantined"].as_str().unwrap().ends_with("same_1.txt"));
        assert_eq!(fs::read_dir(&errors).unwrap().count(), 2);
    }
}

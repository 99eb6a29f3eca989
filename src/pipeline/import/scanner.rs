//! Input-directory discovery.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::ImportError;

/// System files and folders never treated as documents.
const IGNORED_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini", ".git", ".svn"];

/// Recursively collect document candidates under `root`, sorted by path.
///
/// Hidden entries, known system files and `.json` sidecars are skipped.
/// Unreadable entries are logged and skipped rather than aborting the scan.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>, ImportError> {
    if !root.exists() {
        return Err(ImportError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ImportError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() && !is_sidecar(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable input entry"),
        }
    }

    tracing::debug!(root = %root.display(), count = files.len(), "Input scan complete");
    Ok(files)
}

/// Directory names between `root` and the file, outermost first.
pub fn relative_folders(root: &Path, file: &Path) -> Vec<String> {
    file.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || IGNORED_NAMES.iter().any(|ignored| name == *ignored)
}

fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_files_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("Finance/Banks")).unwrap();
        std::fs::write(root.join("b.txt"), "b").unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();
        std::fs::write(root.join("Finance/Banks/statement.pdf"), "%PDF").unwrap();

        let files = discover_files(root).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["Finance/Banks/statement.pdf", "a.txt", "b.txt"]);
    }

    #[test]
    fn skips_hidden_system_and_sidecar_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join(".git/config"), "x").unwrap();
        std::fs::write(root.join(".DS_Store"), "x").unwrap();
        std::fs::write(root.join("Thumbs.db"), "x").unwrap();
        std::fs::write(root.join("scan.pdf.json"), "{}").unwrap();
        std::fs::write(root.join("scan.pdf"), "%PDF").unwrap();

        let files = discover_files(root).unwrap();
        assert_eq!(files, vec![root.join("scan.pdf")]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_files(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, ImportError::PathNotFound(_)));
    }

    #[test]
    fn file_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(discover_files(&file), Err(ImportError::NotADirectory(_))));
    }

    #[test]
    fn relative_folders_lists_intermediate_dirs() {
        let root = Path::new("/in");
        assert_eq!(
            relative_folders(root, Path::new("/in/Finance/Banks/x.pdf")),
            vec!["Finance", "Banks"]
        );
        assert!(relative_folders(root, Path::new("/in/x.pdf")).is_empty());
        assert!(relative_folders(root, Path::new("/elsewhere/x.pdf")).is_empty());
    }
}

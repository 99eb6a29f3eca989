//! Metadata → destination path, with missing-directory detection and
//! collision-free filenames.

use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::models::{non_blank, Metadata};
use crate::pipeline::naming::{
    normalize_person_name, sanitize_dirname, sanitize_filename, sidecar_path,
};

const UNKNOWN_DATE: &str = "unknown-date";
const FALLBACK_STEM: &str = "document";

/// Where a document should go, and which of its ancestors do not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPlan {
    pub destination: PathBuf,
    /// Relative to the archive root, `/`-separated, root-to-leaf order.
    pub missing: Vec<String>,
}

impl PathPlan {
    pub fn directory(&self) -> &Path {
        self.destination.parent().unwrap_or(&self.destination)
    }
}

#[derive(Debug, Clone)]
pub struct PathBuilder {
    archive_root: PathBuf,
    shared_folder_name: String,
}

impl PathBuilder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            archive_root: config.archive_root.clone(),
            shared_folder_name: config.shared_folder_name.clone(),
        }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Deterministic for a fixed archive state: reads the disk, never writes.
    pub fn build(&self, metadata: &Metadata, source: &Path) -> PathPlan {
        let segments = self.segments(metadata);

        let mut directory = self.archive_root.clone();
        let mut missing = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            directory.push(segment);
            if !directory.is_dir() {
                missing.push(segments[..=i].join("/"));
            }
        }

        let destination = unique_path(&directory.join(file_name(metadata, source)));
        PathPlan {
            destination,
            missing,
        }
    }

    /// `person / category? / subcategory? / issuer?`, already sanitized.
    fn segments(&self, metadata: &Metadata) -> Vec<String> {
        let person = non_blank(&metadata.person)
            .and_then(normalize_person_name)
            .map(|name| sanitize_dirname(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| sanitize_dirname(&self.shared_folder_name));

        let mut segments = vec![person];
        for value in [&metadata.category, &metadata.subcategory, &metadata.issuer] {
            let Some(raw) = non_blank(value) else {
                continue;
            };
            let segment = sanitize_dirname(raw);
            if segment.is_empty() || segment.to_lowercase() == segments[0].to_lowercase() {
                continue;
            }
            segments.push(segment);
        }
        segments
    }
}

/// `{date}__{stem}{ext}` with the date removed from inside the stem.
fn file_name(metadata: &Metadata, source: &Path) -> String {
    let source_stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let raw_stem = non_blank(&metadata.suggested_name).unwrap_or(&source_stem);
    let mut stem = sanitize_filename(raw_stem);

    let date = non_blank(&metadata.date).map(sanitize_filename);
    if let Some(date) = &date {
        stem = stem.replace(date.as_str(), "");
    }
    let stem = stem.trim_matches(|c: char| c == '_' || c == '-' || c.is_whitespace());
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };

    let extension = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    format!(
        "{}__{}{}",
        date.as_deref().unwrap_or(UNKNOWN_DATE),
        stem,
        extension
    )
}

/// `path` itself if free, otherwise the first free `stem_N.ext`.
pub fn unique_path(path: &Path) -> PathBuf {
    if !is_taken(path) {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{stem}_{counter}{extension}"));
        if !is_taken(&candidate) {
            tracing::debug!(path = %candidate.display(), "Destination taken, using suffixed name");
            return candidate;
        }
        counter += 1;
    }
}

/// Dangling symlinks count as taken, and so does a leftover `{path}.json`.
fn is_taken(path: &Path) -> bool {
    path.symlink_metadata().is_ok() || sidecar_path(path).symlink_metadata().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn builder(root: &Path) -> PathBuilder {
        let config = AppConfig {
            archive_root: root.to_path_buf(),
            ..Default::default()
        };
        PathBuilder::new(&config)
    }

    fn full_metadata() -> Metadata {
        Metadata {
            person: Some("Ivan Ivanov".into()),
            category: Some("Finance".into()),
            subcategory: Some("Bank".into()),
            issuer: Some("Sparkasse".into()),
            date: Some("2024-01-31".into()),
            suggested_name: Some("statement".into()),
            ..Default::default()
        }
    }

    #[test]
    fn builds_full_hierarchy_with_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let plan = builder(dir.path()).build(&full_metadata(), Path::new("/in/scan.PDF"));

        assert_eq!(
            plan.destination,
            dir.path()
                .join("Ivanov Ivan/Finance/Bank/Sparkasse/2024-01-31__statement.PDF")
        );
        assert_eq!(
            plan.missing,
            vec![
                "Ivanov Ivan",
                "Ivanov Ivan/Finance",
                "Ivanov Ivan/Finance/Bank",
                "Ivanov Ivan/Finance/Bank/Sparkasse",
            ]
        );
    }

    #[test]
    fn missing_dirs_clear_once_created() {
        let dir = tempfile::tempdir().unwrap();
        let builder = builder(dir.path());
        let meta = full_metadata();

        let first = builder.build(&meta, Path::new("scan.pdf"));
        assert_eq!(first, builder.build(&meta, Path::new("scan.pdf")));

        fs::create_dir_all(dir.path().join("Ivanov Ivan/Finance")).unwrap();
        let partial = builder.build(&meta, Path::new("scan.pdf"));
        assert_eq!(
            partial.missing,
            vec!["Ivanov Ivan/Finance/Bank", "Ivanov Ivan/Finance/Bank/Sparkasse"]
        );

        fs::create_dir_all(first.directory()).unwrap();
        assert!(builder.build(&meta, Path::new("scan.pdf")).missing.is_empty());
    }

    #[test]
    fn no_person_uses_shared_folder() {
        let dir = tempfile::tempdir().unwrap();
        let meta = Metadata {
            person: Some("   ".into()),
            category: Some("Utilities".into()),
            ..Default::default()
        };
        let plan = builder(dir.path()).build(&meta, Path::new("bill.txt"));
        assert_eq!(
            plan.destination,
            dir.path().join("Shared/Utilities/unknown-date__bill.txt")
        );
        assert_eq!(plan.missing, vec!["Shared", "Shared/Utilities"]);
    }

    #[test]
    fn segment_equal_to_person_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let meta = Metadata {
            person: Some("Ivanov Ivan".into()),
            category: Some("IVANOV IVAN".into()),
            subcategory: Some("Passport".into()),
            ..Default::default()
        };
        let plan = builder(dir.path()).build(&meta, Path::new("scan.jpg"));
        assert_eq!(plan.missing, vec!["Ivanov Ivan", "Ivanov Ivan/Passport"]);
        // stored metadata is untouched
        assert_eq!(meta.category.as_deref(), Some("IVANOV IVAN"));
    }

    #[test]
    fn date_is_not_duplicated_in_name() {
        let dir = tempfile::tempdir().unwrap();
        let meta = Metadata {
            date: Some("2023-05-17".into()),
            suggested_name: Some("receipt_2023-05-17".into()),
            ..Default::default()
        };
        let plan = builder(dir.path()).build(&meta, Path::new("x.pdf"));
        assert_eq!(
            plan.destination.file_name().unwrap(),
            "2023-05-17__receipt.pdf"
        );
    }

    #[test]
    fn traversal_in_metadata_stays_inside_archive() {
        let dir = tempfile::tempdir().unwrap();
        let meta = Metadata {
            person: Some("../../etc".into()),
            category: Some("..".into()),
            suggested_name: Some("../passwd".into()),
            ..Default::default()
        };
        let plan = builder(dir.path()).build(&meta, Path::new("x"));
        assert_eq!(plan.directory(), dir.path().join("etc"));
        assert!(!plan
            .destination
            .components()
            .any(|c| c == std::path::Component::ParentDir));
    }

    #[test]
    fn unique_path_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.pdf");
        assert_eq!(unique_path(&target), target);

        fs::write(&target, "1").unwrap();
        assert_eq!(unique_path(&target), dir.path().join("a_1.pdf"));

        fs::write(dir.path().join("a_1.pdf"), "2").unwrap();
        assert_eq!(unique_path(&target), dir.path().join("a_2.pdf"));
    }

    #[test]
    fn orphaned_sidecar_reserves_the_name() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.pdf");
        fs::write(sidecar_path(&target), "{}").unwrap();
        assert_eq!(unique_path(&target), dir.path().join("a_1.pdf"));
    }
}

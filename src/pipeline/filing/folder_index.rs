//! Derived view of the existing archive: which person/category folders
//! are already on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::pipeline::naming::{category_key, person_key};

/// Deepest level `folder_tree` descends to.
const FOLDER_TREE_DEPTH: usize = 6;

/// An existing `person/category` folder, with on-disk spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderMatch {
    pub person: String,
    pub category: String,
    pub relative_path: PathBuf,
}

/// person key → category key → folder. Built by walking two levels under
/// the archive root; never persisted.
#[derive(Debug, Clone, Default)]
pub struct FolderIndex {
    entries: BTreeMap<String, BTreeMap<String, FolderMatch>>,
}

impl FolderIndex {
    /// Scan `archive_root`. A missing root yields an empty index.
    pub fn build(archive_root: &Path) -> Self {
        let mut index = Self::default();
        if !archive_root.is_dir() {
            return index;
        }

        let walker = WalkDir::new(archive_root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.file_name()));

        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_dir() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(archive_root) else {
                continue;
            };
            let mut segments = relative.components().map(|c| c.as_os_str().to_string_lossy());
            let (Some(person), Some(category)) = (segments.next(), segments.next()) else {
                continue;
            };
            if is_hidden(person.as_ref()) {
                continue;
            }
            index.insert(&person, &category, relative.to_path_buf());
        }

        tracing::debug!(
            root = %archive_root.display(),
            persons = index.entries.len(),
            folders = index.len(),
            "Folder index built"
        );
        index
    }

    fn insert(&mut self, person: &str, category: &str, relative_path: PathBuf) {
        self.entries
            .entry(person_key(person))
            .or_default()
            .entry(category_key(category))
            .or_insert_with(|| FolderMatch {
                person: person.to_string(),
                category: category.to_string(),
                relative_path,
            });
    }

    /// Exact (person, category) match, order- and case-insensitive on the person.
    pub fn lookup(&self, person: &str, category: &str) -> Option<&FolderMatch> {
        self.entries
            .get(&person_key(person))?
            .get(&category_key(category))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{person: [category, ...]}` with on-disk spellings, for the prompt.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .values()
            .filter_map(|categories| {
                let person = categories.values().next()?.person.clone();
                let names = categories
                    .values()
                    .map(|m| Value::String(m.category.clone()))
                    .collect();
                Some((person, Value::Array(names)))
            })
            .collect();
        Value::Object(map)
    }
}

/// Nested `{dir: {subdir: {...}}}` map of the directories under `root`,
/// sorted by name. Empty object for a missing root.
pub fn folder_tree(root: &Path) -> Value {
    let mut tree = Map::new();
    if !root.is_dir() {
        return Value::Object(tree);
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(FOLDER_TREE_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name()));

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let mut node = &mut tree;
        for component in relative.components() {
            let name = component.as_os_str().to_string_lossy().into_owned();
            let child = node
                .entry(name)
                .or_insert_with(|| Value::Object(Map::new()));
            match child {
                Value::Object(map) => node = map,
                _ => break,
            }
        }
    }
    Value::Object(tree)
}

fn is_hidden(name: impl AsRef<std::ffi::OsStr>) -> bool {
    name.as_ref().to_string_lossy().starts_with('.')
}

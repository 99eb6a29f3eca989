//! Merge an analyzer draft with the deterministic extractors and the
//! existing archive layout into one canonical `Metadata`.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};

use super::extractors::{extract_labeled_person, extract_military_id_date};
use super::mrz::parse_mrz;
use crate::models::{non_blank, Metadata};
use crate::pipeline::filing::FolderIndex;
use crate::pipeline::naming::normalize_person_name;

static EMBEDDED_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}[-_.]\d{2}[-_.]\d{2}|\d{2}[-_.]\d{2}[-_.]\d{4}").unwrap()
});

/// Resolves drafts against an optional folder-index snapshot.
#[derive(Debug, Clone, Default)]
pub struct MetadataResolver {
    folder_index: Option<Arc<FolderIndex>>,
}

impl MetadataResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder_index(folder_index: Arc<FolderIndex>) -> Self {
        Self {
            folder_index: Some(folder_index),
        }
    }

    pub fn resolve(&self, text: &str, draft: &Value) -> Metadata {
        resolve(text, draft, self.folder_index.as_deref())
    }
}

/// Never fails: unusable input only leaves more fields empty.
pub fn resolve(text: &str, draft: &Value, folder_index: Option<&FolderIndex>) -> Metadata {
    let mut meta = metadata_from_draft(draft);

    if let Some(filename) = non_blank(&meta.suggested_filename) {
        meta.suggested_name = suggested_stem(filename);
    }

    if meta.date.is_none() {
        meta.date = extract_military_id_date(text);
    }

    let mrz = parse_mrz(text);
    fill(&mut meta.person, mrz.person);
    fill(&mut meta.date_of_birth, mrz.date_of_birth);
    fill(&mut meta.expiration_date, mrz.expiration_date);
    fill(&mut meta.passport_number, mrz.passport_number);

    if meta.person.is_none() {
        meta.person = extract_labeled_person(text);
    }

    meta.person = meta.person.as_deref().and_then(normalize_person_name);

    if let Some(index) = folder_index {
        apply_folder_index(&mut meta, index);
    }

    meta.merge_tags();
    meta
}

fn apply_folder_index(meta: &mut Metadata, index: &FolderIndex) {
    let (Some(person), Some(category)) = (non_blank(&meta.person), non_blank(&meta.category))
    else {
        return;
    };
    if let Some(found) = index.lookup(person, category) {
        tracing::debug!(folder = %found.relative_path.display(), "Reusing existing folder");
        meta.person = Some(found.person.clone());
        meta.category = Some(found.category.clone());
        meta.needs_new_folder = false;
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Filename stem with any embedded date removed, or `None` if nothing is left.
fn suggested_stem(filename: &str) -> Option<String> {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stripped = EMBEDDED_DATE_RE.replace_all(&stem, "");
    let cleaned = stripped.trim_matches(|c: char| c == '_' || c == '-' || c.is_whitespace());
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Lenient overlay of an analyzer draft onto default metadata. Accepts
/// camelCase and snake_case keys, plus the analyzer aliases.
fn metadata_from_draft(draft: &Value) -> Metadata {
    let empty = Map::new();
    let obj = match draft {
        Value::Object(map) => map,
        Value::Array(items) => items.iter().find_map(Value::as_object).unwrap_or(&empty),
        _ => &empty,
    };

    let mut meta = Metadata {
        category: text_field(obj, &["category"]),
        subcategory: text_field(obj, &["subcategory"]),
        issuer: text_field(obj, &["issuer"]),
        person: text_field(obj, &["person"]),
        document_type: text_field(obj, &["documentType", "document_type", "doc_type"]),
        date: text_field(obj, &["date"]),
        date_of_birth: text_field(obj, &["dateOfBirth", "date_of_birth"]),
        expiration_date: text_field(obj, &["expirationDate", "expiration_date"]),
        passport_number: text_field(obj, &["passportNumber", "passport_number"]),
        amount: text_field(obj, &["amount"]),
        currency: text_field(obj, &["currency"]),
        counterparty: text_field(obj, &["counterparty"]),
        document_number: text_field(obj, &["documentNumber", "document_number"]),
        due_date: text_field(obj, &["dueDate", "due_date"]),
        suggested_filename: text_field(obj, &["suggestedFilename", "suggested_filename"]),
        suggested_name: text_field(obj, &["suggestedName", "suggested_name"]),
        description: text_field(obj, &["description", "summary"]),
        language: text_field(obj, &["language"]),
        needs_new_folder: flag_field(obj, &["needsNewFolder", "needs_new_folder"]),
        ..Default::default()
    };

    for tag in list_field(obj.get("tags")) {
        meta.push_tag(&tag);
    }
    if let Some(Value::Object(localized)) = obj.get("tagsLocalized") {
        for (lang, tags) in localized {
            add_localized(&mut meta, lang, list_field(Some(tags)));
        }
    }
    for (key, lang) in [("tags_ru", "ru"), ("tags_en", "en")] {
        add_localized(&mut meta, lang, list_field(obj.get(key)));
    }
    meta
}

fn add_localized(meta: &mut Metadata, lang: &str, tags: Vec<String>) {
    if tags.is_empty() {
        return;
    }
    let slot = meta.tags_localized.entry(lang.to_string()).or_default();
    for tag in tags {
        if !slot.contains(&tag) {
            slot.push(tag);
        }
    }
}

/// First non-blank value among `keys`; numbers and booleans are stringified.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn flag_field(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|key| match obj.get(*key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    })
}

/// Array of strings, or one comma-separated string.
fn list_field(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

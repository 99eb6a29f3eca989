use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical description of a document, as written to the sidecar file and
/// embedded in the stored record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub issuer: Option<String>,
    /// Owner, always "Surname Given[ Patronymic]" once set.
    pub person: Option<String>,
    pub document_type: Option<String>,
    /// ISO-8601 calendar date.
    pub date: Option<String>,
    pub date_of_birth: Option<String>,
    pub expiration_date: Option<String>,
    pub passport_number: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub counterparty: Option<String>,
    pub document_number: Option<String>,
    pub due_date: Option<String>,
    /// Deduplicated, insertion-ordered, case-sensitive.
    pub tags: Vec<String>,
    /// Language code → tags in that language.
    pub tags_localized: BTreeMap<String, Vec<String>>,
    pub suggested_filename: Option<String>,
    pub suggested_name: Option<String>,
    pub suggested_name_translit: Option<String>,
    #[serde(alias = "summary")]
    pub description: Option<String>,
    pub extracted_text: Option<String>,
    pub language: Option<String>,
    pub needs_new_folder: bool,
}

impl Metadata {
    /// Append `tag` unless it is blank or already present.
    pub fn push_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return;
        }
        self.tags.push(tag.to_string());
    }

    /// Fold localized tags and the classification fields into `tags`.
    pub fn merge_tags(&mut self) {
        let existing = std::mem::take(&mut self.tags);
        let localized: Vec<String> = self.tags_localized.values().flatten().cloned().collect();
        let fields: Vec<String> = [
            &self.category,
            &self.subcategory,
            &self.document_type,
            &self.issuer,
            &self.person,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

        for tag in existing.iter().chain(&localized).chain(&fields) {
            self.push_tag(tag);
        }
    }

    /// Tags for one language, empty if none were supplied.
    pub fn localized(&self, lang: &str) -> &[String] {
        self.tags_localized
            .get(lang)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Treat `None`, empty and whitespace-only strings alike.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ChatRole, RecordStatus};
use super::metadata::Metadata;

/// One entry in a record's review conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// The persisted unit of work: one per ingested document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    pub metadata: Metadata,
    /// Current on-disk location.
    pub path: String,
    pub status: RecordStatus,
    pub prompt: Option<String>,
    pub raw_response: Option<String>,
    /// Last-known missing directories, relative to the archive root.
    pub missing: Vec<String>,
    pub suggested_path: Option<String>,
    pub created_path: Option<String>,
    pub confirmed: bool,
    pub chat_history: Vec<ChatMessage>,
    pub review_comment: Option<String>,
    /// Original input paths this record was built from.
    pub sources: Vec<String>,
    pub created_at: NaiveDateTime,
}

impl DocumentRecord {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            metadata: Metadata::default(),
            path: path.into(),
            status: RecordStatus::Draft,
            prompt: None,
            raw_response: None,
            missing: Vec::new(),
            suggested_path: None,
            created_path: None,
            confirmed: false,
            chat_history: Vec::new(),
            review_comment: None,
            sources: Vec::new(),
            created_at: Utc::now().naive_utc(),
        }
    }
}

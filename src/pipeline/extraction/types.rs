use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::pipeline::import::FileInfo;

/// Result of text extraction from a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub full_text: String,
    pub file_info: FileInfo,
    pub language_detected: Option<String>,
}

/// Text extraction collaborator. OCR and office/PDF engines plug in here.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<ExtractionResult, ExtractionError>;
}

//! Text-only extraction: reads UTF-8 text files directly.
//!
//! Returns `ExtractionError::UnsupportedFormat` for PDFs, images and office
//! documents. Those need an OCR or office engine behind `TextExtractor`.

use std::path::Path;

use super::types::{ExtractionResult, TextExtractor};
use super::ExtractionError;
use crate::pipeline::import::{detect_format, FileCategory};

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractionResult, ExtractionError> {
        let file_info = detect_format(path)?;

        if file_info.category.needs_ocr() {
            return Err(ExtractionError::UnsupportedFormat(format!(
                "{} ({}) needs OCR",
                file_info.name, file_info.mime_type
            )));
        }
        if file_info.category != FileCategory::PlainText {
            return Err(ExtractionError::UnsupportedFormat(format!(
                "{} ({})",
                file_info.name, file_info.mime_type
            )));
        }

        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ExtractionError::EncodingError(e.to_string()))?;
        let full_text = sanitize_extracted_text(&text);

        tracing::debug!(
            file = %path.display(),
            text_length = full_text.len(),
            "PlainTextExtractor: extraction complete"
        );

        Ok(ExtractionResult {
            full_text,
            file_info,
            language_detected: None,
        })
    }
}

/// Strip a UTF-8 BOM, normalise line endings and drop NUL/control noise.
pub fn sanitize_extracted_text(text: &str) -> String {
    text.trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

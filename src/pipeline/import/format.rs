use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ImportError;

/// Broad file categories we recognise
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Pdf,
    Image,
    OfficeDocument,
    PlainText,
    Unsupported,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::OfficeDocument => "office_document",
            Self::PlainText => "plain_text",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn needs_ocr(&self) -> bool {
        matches!(self, Self::Image)
    }
}

/// Facts about an input file, passed to the metadata analyzer as context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub name: String,
    pub extension: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub category: FileCategory,
}

/// Detect file format from magic bytes (NOT file extensions).
pub fn detect_format(path: &Path) -> Result<FileInfo, ImportError> {
    let size_bytes = std::fs::metadata(path)?.len();

    // Read first 16 bytes for magic number detection
    let mut file = std::fs::File::open(path)?;
    let mut header = [0u8; 16];
    let bytes_read = file.read(&mut header)?;

    let (mime_type, category) = match &header[..bytes_read.min(8)] {
        // PDF: starts with %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => ("application/pdf", FileCategory::Pdf),
        // JPEG: starts with FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => ("image/jpeg", FileCategory::Image),
        // PNG: starts with 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => ("image/png", FileCategory::Image),
        // TIFF: little-endian (49 49 2A 00) or big-endian (4D 4D 00 2A)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => {
            ("image/tiff", FileCategory::Image)
        }
        // ZIP container: docx/xlsx/odt
        [0x50, 0x4B, 0x03, 0x04, ..] => ("application/zip", FileCategory::OfficeDocument),
        // HEIC/HEIF: "ftyp" at offset 4
        _ if bytes_read >= 12 && &header[4..8] == b"ftyp" => ("image/heic", FileCategory::Image),
        _ if is_likely_text(path)? => ("text/plain", FileCategory::PlainText),
        _ => ("application/octet-stream", FileCategory::Unsupported),
    };

    Ok(FileInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default(),
        size_bytes,
        mime_type: mime_type.to_string(),
        category,
    })
}

/// Check if a file is likely plain text (valid UTF-8, mostly printable)
fn is_likely_text(path: &Path) -> Result<bool, ImportError> {
    let mut file = std::fs::File::open(path)?;
    let mut buffer = vec![0u8; 4096];
    let n = file.read(&mut buffer)?;
    buffer.truncate(n);

    if n == 0 {
        return Ok(false);
    }

    // A multi-byte char may be cut at the buffer edge
    let text = match std::str::from_utf8(&buffer) {
        Ok(t) => t,
        Err(e) if n == 4096 && e.error_len().is_none() => {
            std::str::from_utf8(&buffer[..e.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return Ok(false),
    };

    // At least 80% printable characters (or whitespace)
    let total = text.chars().count();
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    Ok(printable as f64 / total.max(1) as f64 > 0.80)
}

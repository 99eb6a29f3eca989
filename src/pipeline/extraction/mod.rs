pub mod text_only;
pub mod types;

pub use text_only::*;
pub use types::*;

use thiserror::Error;

use crate::pipeline::import::ImportError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("Unsupported format for extraction: {0}")]
    UnsupportedFormat(String),

    #[error("Format detection failed: {0}")]
    Import(#[from] ImportError),
}

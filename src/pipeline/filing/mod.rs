pub mod folder_index;
pub mod operation;
pub mod path_builder;
pub mod quarantine;

pub use folder_index::*;
pub use operation::*;
pub use path_builder::*;
pub use quarantine::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sidecar serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Destination escapes the archive root: {0}")]
    OutsideArchive(PathBuf),
}

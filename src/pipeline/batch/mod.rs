pub mod processor;

pub use processor::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::pipeline::analysis::AnalysisError;
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::filing::FilingError;
use crate::pipeline::import::ImportError;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Input scan failed: {0}")]
    Import(#[from] ImportError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Metadata analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Filing failed: {0}")]
    Filing(#[from] FilingError),

    #[error("Record store error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Worker pool closed")]
    WorkerPoolClosed,
}

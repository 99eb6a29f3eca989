//! Metadata analyzers: turn extracted text into a metadata-shaped draft.
//!
//! Backends are selected by name through a static registry. A failing AI
//! backend surfaces as `Err`; the caller decides whether to fall back.

pub mod llm;
pub mod ollama;
pub mod openrouter;
pub mod parser;
pub mod prompt;
pub mod regex_analyzer;
pub mod registry;
pub mod types;

pub use llm::*;
pub use ollama::*;
pub use openrouter::*;
pub use parser::*;
pub use prompt::*;
pub use regex_analyzer::*;
pub use registry::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Cannot reach {service} at {url}")]
    Connection { service: &'static str, url: String },

    #[error("{service} returned error (status {status}): {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("OPENROUTER_API_KEY is not configured")]
    MissingApiKey,

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Unknown analyzer '{name}' (available: {available})")]
    UnknownAnalyzer { name: String, available: String },
}

use serde::{Deserialize, Serialize};

use super::AnalysisError;
use crate::pipeline::import::FileInfo;

/// What an analyzer may look at besides the document text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Nested map of existing archive directory names.
    pub folder_tree: serde_json::Value,
    /// Existing person folders and the category folders under each.
    pub folder_index: serde_json::Value,
    pub file_info: Option<FileInfo>,
}

/// Draft plus the exact exchange that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerOutput {
    pub prompt: Option<String>,
    pub raw_response: Option<String>,
    /// Metadata-shaped JSON, not yet validated.
    pub draft: serde_json::Value,
}

/// Pluggable metadata backend.
pub trait MetadataAnalyzer: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    fn analyze(
        &self,
        text: &str,
        context: &AnalysisContext,
    ) -> Result<AnalyzerOutput, AnalysisError>;
}

/// Chat/completion transport abstraction (allows mocking)
pub trait LlmClient: Send + Sync {
    fn generate(&self, prompt: &str, system: &str) -> Result<String, AnalysisError>;

    fn model(&self) -> &str;
}

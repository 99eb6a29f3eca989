//! Static name → constructor registry and the fallback policy.

use super::llm::LlmAnalyzer;
use super::ollama::OllamaClient;
use super::openrouter::OpenRouterClient;
use super::regex_analyzer::RegexAnalyzer;
use super::types::{AnalysisContext, AnalyzerOutput, MetadataAnalyzer};
use super::AnalysisError;
use crate::config::AppConfig;

type AnalyzerFactory = fn(&AppConfig) -> Result<Box<dyn MetadataAnalyzer>, AnalysisError>;

const ANALYZERS: &[(&str, AnalyzerFactory)] = &[
    ("openrouter", openrouter_analyzer),
    ("ollama", ollama_analyzer),
    ("regex", regex_analyzer),
];

fn openrouter_analyzer(config: &AppConfig) -> Result<Box<dyn MetadataAnalyzer>, AnalysisError> {
    let client = OpenRouterClient::new(&config.openrouter)?;
    Ok(Box::new(LlmAnalyzer::new("openrouter", client)))
}

fn ollama_analyzer(config: &AppConfig) -> Result<Box<dyn MetadataAnalyzer>, AnalysisError> {
    let client = OllamaClient::new(&config.ollama)?;
    Ok(Box::new(LlmAnalyzer::new("ollama", client)))
}

fn regex_analyzer(_config: &AppConfig) -> Result<Box<dyn MetadataAnalyzer>, AnalysisError> {
    Ok(Box::new(RegexAnalyzer))
}

pub fn analyzer_names() -> Vec<&'static str> {
    ANALYZERS.iter().map(|(name, _)| *name).collect()
}

/// Construct the analyzer registered under `name` (case-insensitive).
pub fn create_analyzer(
    name: &str,
    config: &AppConfig,
) -> Result<Box<dyn MetadataAnalyzer>, AnalysisError> {
    let wanted = name.trim().to_lowercase();
    let (_, factory) = ANALYZERS
        .iter()
        .find(|(registered, _)| *registered == wanted)
        .ok_or_else(|| AnalysisError::UnknownAnalyzer {
            name: name.to_string(),
            available: analyzer_names().join(", "),
        })?;
    factory(config)
}

/// Like `create_analyzer`, but a backend that cannot be constructed (e.g. no
/// API key) degrades to the regex analyzer. Unknown names are still errors.
pub fn create_analyzer_or_regex(
    name: &str,
    config: &AppConfig,
) -> Result<Box<dyn MetadataAnalyzer>, AnalysisError> {
    match create_analyzer(name, config) {
        Ok(analyzer) => Ok(analyzer),
        Err(e @ AnalysisError::UnknownAnalyzer { .. }) => Err(e),
        Err(e) => {
            tracing::warn!(analyzer = name, error = %e, "Analyzer unavailable, using regex analyzer");
            Ok(Box::new(RegexAnalyzer))
        }
    }
}

/// What to do when the configured analyzer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPolicy {
    FallbackToRegex,
    Surface,
}

/// Run `analyzer`, applying `policy` to its failure.
pub fn analyze_with_policy(
    analyzer: &dyn MetadataAnalyzer,
    text: &str,
    context: &AnalysisContext,
    policy: AnalysisPolicy,
) -> Result<AnalyzerOutput, AnalysisError> {
    match analyzer.analyze(text, context) {
        Ok(output) => Ok(output),
        Err(e) if policy == AnalysisPolicy::FallbackToRegex => {
            tracing::warn!(
                analyzer = analyzer.name(),
                error = %e,
                "Analyzer failed, falling back to regex analyzer"
            );
            RegexAnalyzer.analyze(text, context)
        }
        Err(e) => Err(e),
    }
}

use super::parser::parse_draft;
use super::prompt::{build_metadata_prompt, METADATA_SYSTEM_PROMPT};
use super::types::{AnalysisContext, AnalyzerOutput, LlmClient, MetadataAnalyzer};
use super::AnalysisError;

/// Prompt an LLM and parse its reply into a draft.
pub struct LlmAnalyzer<C: LlmClient> {
    name: &'static str,
    client: C,
}

impl<C: LlmClient> LlmAnalyzer<C> {
    pub fn new(name: &'static str, client: C) -> Self {
        Self { name, client }
    }
}

impl<C: LlmClient> MetadataAnalyzer for LlmAnalyzer<C> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn analyze(
        &self,
        text: &str,
        context: &AnalysisContext,
    ) -> Result<AnalyzerOutput, AnalysisError> {
        let prompt = build_metadata_prompt(text, context);
        let raw_response = self.client.generate(&prompt, METADATA_SYSTEM_PROMPT)?;
        let draft = parse_draft(&raw_response)?;

        tracing::debug!(
            analyzer = self.name,
            model = self.client.model(),
            response_length = raw_response.len(),
            "Metadata draft received"
        );

        Ok(AnalyzerOutput {
            prompt: Some(prompt),
            raw_response: Some(raw_response),
            draft,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analysis::ollama::MockLlmClient;

    #[test]
    fn returns_prompt_response_and_draft() {
        let analyzer = LlmAnalyzer::new(
            "mock",
            MockLlmClient::new("```json\n{\"category\": \"Finance\"}\n```"),
        );
        let output = analyzer.analyze("bank statement", &AnalysisContext::default()).unwrap();

        assert_eq!(output.draft["category"], "Finance");
        assert!(output.prompt.unwrap().contains("bank statement"));
        assert!(output.raw_response.unwrap().starts_with("```json"));
    }

    #[test]
    fn transport_failure_is_surfaced() {
        let analyzer = LlmAnalyzer::new("mock", MockLlmClient::unreachable("down"));
        let err = analyzer.analyze("x", &AnalysisContext::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Connection { .. }));
    }

    #[test]
    fn unparsable_reply_is_surfaced() {
        let analyzer = LlmAnalyzer::new("mock", MockLlmClient::new("sorry, no idea"));
        assert!(analyzer.analyze("x", &AnalysisContext::default()).is_err());
    }
}

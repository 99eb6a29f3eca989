use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use super::types::{AnalysisContext, AnalyzerOutput, MetadataAnalyzer};
use super::AnalysisError;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap());

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+(?:[.,][0-9]{2})?)").unwrap());

/// Local analyzer: first ISO date and first number-like amount. Used on its
/// own for offline runs and as the fallback when an AI backend fails.
pub struct RegexAnalyzer;

impl MetadataAnalyzer for RegexAnalyzer {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn analyze(
        &self,
        text: &str,
        _context: &AnalysisContext,
    ) -> Result<AnalyzerOutput, AnalysisError> {
        let date = DATE_RE.captures(text).map(|c| c[1].to_string());
        let amount = AMOUNT_RE.captures(text).map(|c| c[1].to_string());

        Ok(AnalyzerOutput {
            prompt: None,
            raw_response: None,
            draft: json!({
                "category": null,
                "subcategory": null,
                "issuer": null,
                "person": null,
                "doc_type": null,
                "date": date,
                "amount": amount,
                "tags": [],
                "suggested_filename": null,
                "description": null,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_date_and_amount() {
        let output = RegexAnalyzer
            .analyze("Total 123.45 on 2023-05-17", &AnalysisContext::default())
            .unwrap();
        assert_eq!(output.draft["date"], "2023-05-17");
        assert_eq!(output.draft["amount"], "123.45");
        assert!(output.prompt.is_none());
        assert!(output.raw_response.is_none());
    }

    #[test]
    fn accepts_comma_decimal() {
        let output = RegexAnalyzer
            .analyze("Summe: 99,90 EUR", &AnalysisContext::default())
            .unwrap();
        assert_eq!(output.draft["amount"], "99,90");
        assert!(output.draft["date"].is_null());
    }

    #[test]
    fn empty_text_gives_empty_draft() {
        let output = RegexAnalyzer.analyze("", &AnalysisContext::default()).unwrap();
        assert!(output.draft["amount"].is_null());
        assert_eq!(output.draft["tags"], json!([]));
    }
}

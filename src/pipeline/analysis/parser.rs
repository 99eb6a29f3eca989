use super::AnalysisError;

/// Parse a model reply into a JSON draft.
///
/// Accepts bare JSON, a fenced ```json block, or JSON embedded in prose.
/// The result may be an object or an array; shape is checked downstream.
pub fn parse_draft(response: &str) -> Result<serde_json::Value, AnalysisError> {
    let body = extract_fenced_block(response).unwrap_or(response).trim();
    if body.is_empty() {
        return Err(AnalysisError::MalformedResponse("Empty response".into()));
    }

    if let Ok(value) = serde_json::from_str(body) {
        return Ok(value);
    }

    let embedded = extract_embedded_json(body)
        .ok_or_else(|| AnalysisError::MalformedResponse("No JSON object found".into()))?;
    serde_json::from_str(embedded).map_err(|e| AnalysisError::JsonParsing(e.to_string()))
}

/// Contents of the first ``` fence, with an optional `json` language tag.
fn extract_fenced_block(response: &str) -> Option<&str> {
    let start = response.find("```")? + 3;
    let rest = &response[start..];
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let end = rest.find("```")?;
    Some(&rest[..end])
}

/// Slice from the first `{`/`[` to the last matching closer.
fn extract_embedded_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

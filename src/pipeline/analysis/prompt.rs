use super::types::AnalysisContext;

/// Documents longer than this are cut before prompting.
pub const MAX_PROMPT_TEXT_CHARS: usize = 12_000;

pub const METADATA_SYSTEM_PROMPT: &str = r#"
You are an assistant that extracts structured metadata from documents so they
can be filed into a personal archive. Output a single JSON object and nothing
else. Use null for any field not present in the document. Never invent values.
"#;

/// Build the metadata extraction prompt for one document.
pub fn build_metadata_prompt(text: &str, context: &AnalysisContext) -> String {
    let tree_json = json_or_empty(&context.folder_tree);
    let index_json = json_or_empty(&context.folder_index);

    let (name, extension, size, file_type) = match &context.file_info {
        Some(info) => (
            info.name.as_str(),
            info.extension.as_str(),
            info.size_bytes.to_string(),
            info.mime_type.as_str(),
        ),
        None => ("unknown", "", "unknown".to_string(), "unknown"),
    };

    let text = truncate_chars(text, MAX_PROMPT_TEXT_CHARS);

    format!(
        r#"Original file name: {name}
Extension: {extension}
Size: {size}
File type: {file_type}
Possible document types include: contracts, receipts, invoices, bank statements, notifications, identity documents, advertisement.

Existing folder tree (JSON):
{tree_json}

Existing folders index (JSON, person -> list of category folders):
{index_json}

Choose person and category strictly from the existing folders index when a match exists.
Set needs_new_folder to true only when no existing folder fits; then propose a new category/subcategory.
Field "person" must be in the form "Surname Given Patronymic". Do not put the person's name into category or subcategory.
Dates must be ISO-8601 (YYYY-MM-DD).

Return a JSON object with the fields:
category, subcategory, needs_new_folder (boolean), issuer, person, doc_type, date, amount,
counterparty, document_number, due_date, currency, tags_ru (list of strings),
tags_en (list of strings), suggested_filename, description.

<document>
{text}
</document>"#
    )
}

fn json_or_empty(value: &serde_json::Value) -> String {
    if value.is_null() {
        "{}".to_string()
    } else {
        value.to_string()
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

//! Deterministic extractors run by the resolver after the AI draft.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

const MILITARY_ID_MARKER: &str = "военный билет";

static MILITARY_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:дата\s+выдачи|действителен\s+до|issue\s+date|valid\s+until)[^\d\n]{0,20}(\d{2})[./-](\d{2})[./-](\d{4})",
    )
    .unwrap()
});

static SURNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*(?:фамилия|surname)[ \t]*:[ \t]*(\S[^\n]*)$").unwrap());

static GIVEN_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*(?:имя|name)[ \t]*:[ \t]*(\S[^\n]*)$").unwrap());

static PATRONYMIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*(?:отчество|patronymic)[ \t]*:[ \t]*(\S[^\n]*)$").unwrap());

/// Issue/validity date from a military ID, as ISO-8601.
/// `None` unless the text is a military ID.
pub fn extract_military_id_date(text: &str) -> Option<String> {
    if !text.to_lowercase().contains(MILITARY_ID_MARKER) {
        return None;
    }
    MILITARY_DATE_RE.captures_iter(text).find_map(|caps| {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
    })
}

/// Join whichever of "Surname:", "Name:", "Patronymic:" (Cyrillic or
/// Latin labels) are present, in that order.
pub fn extract_labeled_person(text: &str) -> Option<String> {
    let parts: Vec<String> = [&*SURNAME_RE, &*GIVEN_NAME_RE, &*PATRONYMIC_RE]
        .iter()
        .filter_map(|re| re.captures(text))
        .map(|caps| caps[1].trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();

    (!parts.is_empty()).then(|| parts.join(" "))
}

//! Machine-readable zone (TD3 passport) parser.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static MRZ_PASSPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"P<(?P<country>[A-Z]{3})(?P<names>[A-Z<]+)\n",
        r"(?P<number>[A-Z0-9<]{9})(?P<number_check>\d)",
        r"[A-Z]{3}",
        r"(?P<birth>\d{6})\d",
        r"[MF<]",
        r"(?P<expiry>\d{6})\d",
        r"[A-Z0-9<]+",
    ))
    .unwrap()
});

/// Fields recovered from an MRZ. All `None` when no zone was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MrzData {
    pub passport_number: Option<String>,
    /// "SURNAME GIVEN", upper-case as printed.
    pub person: Option<String>,
    pub date_of_birth: Option<String>,
    pub expiration_date: Option<String>,
}

impl MrzData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Scan `text` for a TD3 zone. Never fails; no zone yields an empty result.
pub fn parse_mrz(text: &str) -> MrzData {
    let normalized = text
        .to_uppercase()
        .lines()
        .map(|line| line.trim().replace(' ', ""))
        .collect::<Vec<_>>()
        .join("\n");

    let Some(caps) = MRZ_PASSPORT_RE.captures(&normalized) else {
        return MrzData::default();
    };

    let mut names = caps["names"].split("<<");
    let surname = names.next().unwrap_or_default().replace('<', " ");
    let given = names.next().unwrap_or_default().replace('<', " ");
    let person = format!("{} {}", surname.trim(), given.trim()).trim().to_string();

    let number = format!("{}{}", &caps["number"], &caps["number_check"]).replace('<', "");

    MrzData {
        passport_number: Some(number).filter(|n| !n.is_empty()),
        person: Some(person).filter(|p| !p.is_empty()),
        date_of_birth: format_mrz_date(&caps["birth"]),
        expiration_date: format_mrz_date(&caps["expiry"]),
    }
}

/// YYMMDD → YYYY-MM-DD; years 50–99 are 19xx, 00–49 are 20xx.
fn format_mrz_date(raw: &str) -> Option<String> {
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = raw[0..2].parse().ok()?;
    let month: u32 = raw[2..4].parse().ok()?;
    let day: u32 = raw[4..6].parse().ok()?;
    let century = if year >= 50 { 1900 } else { 2000 };
    NaiveDate::from_ymd_opt(century + year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

//! Filesystem-safe names and person-name canonicalization.
//!
//! Everything here is pure: no I/O, never fails.

use std::path::{Path, PathBuf};

/// Characters that are invalid in a filename on at least one target platform.
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const REPLACEMENT: char = '_';

/// Lower-case endings that mark a token as a likely surname.
const SURNAME_SUFFIXES: &[&str] = &[
    // Cyrillic
    "ов", "ова", "ев", "ева", "ёв", "ёва", "ин", "ина", "ын", "ына", "ий", "ый", "ая",
    "ко", "юк", "ич", "енко", "ский", "ская", "цкий", "цкая",
    // Latin
    "ov", "ova", "ev", "eva", "in", "ina", "sky", "skiy", "skaya", "enko", "ko", "uk", "ich",
];

/// Replace every character in `< > : " / \ | ? *` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if INVALID_CHARS.contains(&c) { REPLACEMENT } else { c })
        .collect()
}

/// Directory-segment variant: also strips every `..` and trims leading
/// replacement characters and surrounding whitespace.
pub fn sanitize_dirname(name: &str) -> String {
    let mut clean = sanitize_filename(name);
    while clean.contains("..") {
        clean = clean.replace("..", "");
    }
    let clean = clean
        .trim_start_matches(|c: char| c == REPLACEMENT || c.is_whitespace())
        .trim_end();
    // A lone "." would resolve to the parent segment itself
    if clean.chars().all(|c| c == '.') {
        return String::new();
    }
    clean.to_string()
}

/// `{path}.json`, next to the document it describes.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// Best-effort Cyrillic → Latin. Characters without a mapping pass through.
pub fn transliterate(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let lower: String = c.to_lowercase().collect();
        match latin_for(&lower) {
            Some(latin) if c.is_uppercase() => {
                let mut chars = latin.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                }
            }
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

fn latin_for(lower: &str) -> Option<&'static str> {
    let latin = match lower {
        "а" => "a", "б" => "b", "в" => "v", "г" => "g", "д" => "d",
        "е" => "e", "ё" => "e", "ж" => "zh", "з" => "z", "и" => "i",
        "й" => "y", "к" => "k", "л" => "l", "м" => "m", "н" => "n",
        "о" => "o", "п" => "p", "р" => "r", "с" => "s", "т" => "t",
        "у" => "u", "ф" => "f", "х" => "kh", "ц" => "ts", "ч" => "ch",
        "ш" => "sh", "щ" => "shch", "ъ" => "", "ы" => "y", "ь" => "",
        "э" => "e", "ю" => "yu", "я" => "ya",
        "і" => "i", "ї" => "yi", "є" => "ye", "ґ" => "g",
        _ => return None,
    };
    Some(latin)
}

fn looks_like_surname(token: &str) -> bool {
    let lower = token.to_lowercase();
    let len = lower.chars().count();
    SURNAME_SUFFIXES
        .iter()
        .any(|suffix| len > suffix.chars().count() && lower.ends_with(suffix))
}

fn title_case(token: &str) -> String {
    token
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Canonical "Surname Given[ Patronymic]" form, or `None` for blank input.
pub fn normalize_person_name(raw: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for token in raw.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        let lower = token.to_lowercase();
        if !parts.iter().any(|p| p.to_lowercase() == lower) {
            parts.push(token);
        }
    }
    if parts.is_empty() {
        return None;
    }

    match parts.len() {
        2 if looks_like_surname(parts[1]) && !looks_like_surname(parts[0]) => parts.swap(0, 1),
        3 if looks_like_surname(parts[1]) && !looks_like_surname(parts[0]) => parts.swap(0, 1),
        _ => {}
    }

    Some(parts.iter().map(|p| title_case(p)).collect::<Vec<_>>().join(" "))
}

/// Order-insensitive lookup key: lower-cased, whitespace tokens sorted.
pub fn person_key(name: &str) -> String {
    let mut tokens: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
    tokens.sort();
    tokens.join(" ")
}

pub fn category_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_each_invalid_char() {
        assert_eq!(sanitize_filename("inva:lid/na*me?"), "inva_lid_na_me_");
        assert_eq!(sanitize_filename(r#"a<b>c"d\e|f"#), "a_b_c_d_e_f");
        assert_eq!(sanitize_filename("Счёт №5"), "Счёт №5");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in ["", "plain", "a:b/c", "<<>>", "../../etc/passwd", "Иванов|Иван", "??*"] {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once);
            let dir_once = sanitize_dirname(input);
            assert_eq!(sanitize_dirname(&dir_once), dir_once);
        }
    }

    #[test]
    fn dirname_strips_traversal() {
        for input in ["../../etc", "a/../../etc/x", "....//etc", ". . /../.../...."] {
            let clean = sanitize_dirname(input);
            assert!(!clean.contains(".."), "{input:?} -> {clean:?}");
            assert!(!clean.contains('/'));
        }
        assert_eq!(sanitize_dirname("../../etc"), "etc");
    }

    #[test]
    fn dirname_trims_leading_replacements_and_space() {
        assert_eq!(sanitize_dirname("  :Finance  "), "Finance");
        assert_eq!(sanitize_dirname("___Banks"), "Banks");
        assert_eq!(sanitize_dirname("..."), "");
    }

    #[test]
    fn sidecar_appends_json() {
        assert_eq!(
            sidecar_path(Path::new("/a/2024-01-01__x.pdf")),
            PathBuf::from("/a/2024-01-01__x.pdf.json")
        );
    }

    #[test]
    fn transliterates_cyrillic_and_keeps_the_rest() {
        assert_eq!(transliterate("Иванов Иван"), "Ivanov Ivan");
        assert_eq!(transliterate("Щука-Жук"), "Shchuka-Zhuk");
        assert_eq!(transliterate("Счёт_2024.pdf"), "Schet_2024.pdf");
        assert_eq!(transliterate("Müller"), "Müller");
    }

    #[test]
    fn surname_moves_first() {
        assert_eq!(normalize_person_name("Иван Иванов").as_deref(), Some("Иванов Иван"));
        assert_eq!(normalize_person_name("Ivan Ivanov").as_deref(), Some("Ivanov Ivan"));
        assert_eq!(normalize_person_name("Ivanov Ivan").as_deref(), Some("Ivanov Ivan"));
    }

    #[test]
    fn three_part_names_keep_patronymic_last() {
        assert_eq!(
            normalize_person_name("иванов, иван, иванович").as_deref(),
            Some("Иванов Иван Иванович")
        );
        assert_eq!(
            normalize_person_name("Иван Петров Сергеевич").as_deref(),
            Some("Петров Иван Сергеевич")
        );
    }

    #[test]
    fn duplicate_tokens_are_dropped() {
        assert_eq!(
            normalize_person_name("Иванов иванов Иван").as_deref(),
            Some("Иванов Иван")
        );
    }

    #[test]
    fn hyphenated_tokens_title_case_each_piece() {
        assert_eq!(
            normalize_person_name("анна-мария SMITH-JONES").as_deref(),
            Some("Анна-Мария Smith-Jones")
        );
    }

    #[test]
    fn blank_name_is_none() {
        assert_eq!(normalize_person_name("  , "), None);
    }

    #[test]
    fn key_matches_regardless_of_input_order() {
        let a = normalize_person_name("Ivanov Ivan").unwrap();
        let b = normalize_person_name("Ivan Ivanov").unwrap();
        assert_eq!(person_key(&a), person_key(&b));
        assert_eq!(person_key("Ivan Ivanov"), person_key("ivanov  IVAN"));
        assert_eq!(category_key("  Finance "), "finance");
    }
}

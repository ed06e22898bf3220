//! Category Key Canonicalizer: stable keys and display names for skill categories.
//!
//! Keys are lower-case, underscore-delimited, with `___` standing in for a
//! joining conjunction: "Tools & Platforms" → `tools___platforms`.

use std::sync::OnceLock;

use regex::Regex;

/// Separator that marks a joined category ("A & B", "A and B").
pub const JOIN_SEPARATOR: &str = "___";

/// Display name used when a key is empty and nothing better is known.
const FALLBACK_DISPLAY_NAME: &str = "New Category";

fn join_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // `&` or the whole word `and`, or an existing run of 3+ underscores.
    PATTERN.get_or_init(|| {
        Regex::new(r"\s*(?:&|\band\b)\s*|_{3,}").expect("join pattern is a valid regex")
    })
}

/// Turns an arbitrary category label into its canonical key.
///
/// Empty (or all-punctuation) input yields an empty key; callers discard those.
/// Canonicalizing an already-canonical key returns it unchanged.
pub fn canonicalize(label: &str) -> String {
    let lowered = label.trim().to_lowercase();

    join_pattern()
        .split(&lowered)
        .map(canonicalize_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(JOIN_SEPARATOR)
}

/// Maps a conjunction-free fragment onto `[a-z0-9_]`, collapsing and trimming underscores.
fn canonicalize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

/// Expands a canonical key into a title-cased display name.
pub fn humanize(key: &str) -> String {
    if key.trim().is_empty() {
        return FALLBACK_DISPLAY_NAME.to_string();
    }

    key.split(JOIN_SEPARATOR)
        .map(|part| {
            part.split('_')
                .filter(|w| !w.is_empty())
                .map(title_case_word)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" & ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Picks the display name for a category.
///
/// An explicit name is kept when it already reads as human text (no underscore
/// and not entirely lower-case). Anything else, including a legitimately
/// lower-case human title, is rebuilt from the canonical key.
pub fn resolve_display_name(display_name: Option<&str>, canonical_key: &str) -> String {
    let raw = display_name.map(str::trim).unwrap_or_default();
    if raw.is_empty() || raw.contains('_') || raw == raw.to_lowercase() {
        return humanize(canonical_key);
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_simple_label() {
        assert_eq!(canonicalize("  Technical Skills "), "technical_skills");
    }

    #[test]
    fn test_canonicalize_ampersand_join() {
        assert_eq!(canonicalize("Tools & Platforms"), "tools___platforms");
    }

    #[test]
    fn test_canonicalize_and_join() {
        assert_eq!(
            canonicalize("Data Analysis and Visualization"),
            "data_analysis___visualization"
        );
    }

    #[test]
    fn test_canonicalize_and_inside_word_is_not_a_join() {
        assert_eq!(canonicalize("Brand Strategy"), "brand_strategy");
        assert_eq!(canonicalize("Handling"), "handling");
    }

    #[test]
    fn test_canonicalize_collapses_punctuation() {
        assert_eq!(canonicalize("--C++ / Rust!!"), "c_rust");
    }

    #[test]
    fn test_canonicalize_empty_input() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("   "), "");
        assert_eq!(canonicalize("&"), "");
        assert_eq!(canonicalize("!!!"), "");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let samples = [
            "Tools & Platforms",
            "tools___platforms",
            "a____b",
            "Rock and Roll",
            "x-and-y",
            "__leading and trailing__",
            "Communication & Collaboration & Teamwork",
            "Ünïcödé Skills",
            "a & & b",
            "AND",
            "rock_and_roll",
        ];
        for sample in samples {
            let once = canonicalize(sample);
            assert_eq!(canonicalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_humanize_join_and_words() {
        assert_eq!(
            humanize("data_analysis___visualization"),
            "Data Analysis & Visualization"
        );
        assert_eq!(humanize("technical"), "Technical");
    }

    #[test]
    fn test_humanize_empty_key() {
        assert_eq!(humanize(""), "New Category");
    }

    #[test]
    fn test_resolve_display_name_repairs_machine_key() {
        assert_eq!(
            resolve_display_name(Some("technical_skills"), "technical_skills"),
            "Technical Skills"
        );
    }

    #[test]
    fn test_resolve_display_name_keeps_human_name() {
        assert_eq!(
            resolve_display_name(Some("Tools & Platforms"), "tools___platforms"),
            "Tools & Platforms"
        );
    }

    #[test]
    fn test_resolve_display_name_lowercase_is_humanized() {
        assert_eq!(resolve_display_name(Some("languages"), "languages"), "Languages");
        assert_eq!(resolve_display_name(None, "soft_skills"), "Soft Skills");
        assert_eq!(resolve_display_name(Some("  "), "soft_skills"), "Soft Skills");
    }
}

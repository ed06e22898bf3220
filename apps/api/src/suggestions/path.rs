//! Target paths: dotted/indexed addresses into the document such as
//! `experience.1.achievements.2`, `projects.0` or `skills.technical`.

use std::sync::OnceLock;

use regex::Regex;

fn bracket_index() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[\s*(\d+)\s*\]").expect("bracket pattern is a valid regex"))
}

fn trailing_index() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.*[^_])_\d+$").expect("index suffix pattern is a valid regex"))
}

fn underscore_bullet_id() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^experience_(\d+)_achievements_(\d+)$").expect("bullet id pattern is a valid regex")
    })
}

/// Normalizes the path spellings the suggestion service has used over time.
///
/// `experience[0].bullets[2]` and `experience_0_achievements_2` both become
/// `experience.0.achievements.2`. Segments are trimmed and empty ones dropped,
/// so a category label keeps its inner spaces. Returns `None` for blank input.
pub fn canonicalize_path(raw: &str) -> Option<String> {
    let dotted = bracket_index().replace_all(raw.trim(), ".$1");
    let path = underscore_bullet_id().replace(&dotted, "experience.$1.achievements.$2");

    let segments: Vec<&str> = path
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| if s == "bullets" { "achievements" } else { s })
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("."))
}

/// What a target path points at, as far as the applicator is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Title,
    Summary,
    Experience {
        experience: usize,
        achievement: Option<usize>,
    },
    Project {
        index: usize,
    },
    /// Category label with any `skills.` prefix and trailing index stripped.
    SkillCategory {
        label: String,
    },
    Unrecognized,
}

/// Parses a (canonical) target path into an anchor.
pub fn parse_anchor(path: &str) -> Anchor {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let index_at = |i: usize| segments.get(i).and_then(|s| s.parse::<usize>().ok());

    match segments.first().copied() {
        Some("title") | Some("professionalTitle") => Anchor::Title,
        Some("summary") | Some("professionalSummary") => Anchor::Summary,
        Some("experience") => match index_at(1) {
            Some(experience) => {
                let achievement = match segments.get(2).copied() {
                    Some("achievements") => index_at(3),
                    _ => None,
                };
                Anchor::Experience {
                    experience,
                    achievement,
                }
            }
            None => Anchor::Unrecognized,
        },
        Some("projects") => match index_at(1) {
            Some(index) => Anchor::Project { index },
            None => Anchor::Unrecognized,
        },
        Some("skills") => skill_category_anchor(&segments[1..]),
        Some(_) => Anchor::Unrecognized,
        None => Anchor::Unrecognized,
    }
}

/// Parses the target path of a skills-section suggestion.
///
/// The `skills.` prefix is optional: `tools`, `skills.tools` and the older
/// `technical_0` spelling all name a category. A trailing `.N` or `_N`
/// index is dropped.
pub fn parse_skill_category(path: &str) -> Anchor {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let rest = match segments.first().copied() {
        Some("skills") => &segments[1..],
        _ => &segments[..],
    };
    match skill_category_anchor(rest) {
        Anchor::SkillCategory { label } => {
            let label = match trailing_index().captures(&label) {
                Some(caps) => caps[1].to_string(),
                None => label,
            };
            Anchor::SkillCategory { label }
        }
        other => other,
    }
}

fn skill_category_anchor(rest: &[&str]) -> Anchor {
    let mut rest = rest.to_vec();
    if rest.last().is_some_and(|s| s.parse::<usize>().is_ok()) {
        rest.pop();
    }
    if rest.is_empty() {
        return Anchor::Unrecognized;
    }
    Anchor::SkillCategory {
        label: rest.join("."),
    }
}

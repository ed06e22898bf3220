//! Suggestion records produced by the suggestion service.
//!
//! Raw service rows come in several historical shapes (`before`/`after`,
//! `original_content`/`suggested_content`, `suggestion_type` vocabularies).
//! They are normalized into `Suggestion` on deserialization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::suggestions::path::canonicalize_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Title,
    Summary,
    Experience,
    Projects,
    Skills,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Title,
        Section::Summary,
        Section::Experience,
        Section::Projects,
        Section::Skills,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Title => "title",
            Section::Summary => "summary",
            Section::Experience => "experience",
            Section::Projects => "projects",
            Section::Skills => "skills",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "title" | "professionalTitle" => Ok(Section::Title),
            "summary" | "professionalSummary" => Ok(Section::Summary),
            "experience" | "experiences" => Ok(Section::Experience),
            "projects" | "project" => Ok(Section::Projects),
            "skills" | "skill" => Ok(Section::Skills),
            other => Err(format!("unknown section '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    TitleEdit,
    SummaryEdit,
    ExperienceBulletEdit,
    ExperienceBulletAdd,
    ProjectDescriptionEdit,
    SkillAdd,
    SkillRemove,
}

impl SuggestionType {
    /// Picks the concrete type for a section from the service's loose vocabulary.
    /// The section decides the family; the raw type only refines it.
    fn resolve(raw: Option<&str>, section: Section, has_original: bool) -> Self {
        let raw = raw.map(|r| r.trim().to_lowercase()).unwrap_or_default();
        match section {
            Section::Title => SuggestionType::TitleEdit,
            Section::Summary => SuggestionType::SummaryEdit,
            Section::Projects => SuggestionType::ProjectDescriptionEdit,
            Section::Experience => match raw.as_str() {
                "experience_bullet_add" | "bullet_add" | "addition" | "add" => {
                    SuggestionType::ExperienceBulletAdd
                }
                "experience_bullet_edit" | "modification" => SuggestionType::ExperienceBulletEdit,
                _ if has_original => SuggestionType::ExperienceBulletEdit,
                _ => SuggestionType::ExperienceBulletAdd,
            },
            Section::Skills => match raw.as_str() {
                "skill_remove" | "skill_removal" | "removal" | "remove" => {
                    SuggestionType::SkillRemove
                }
                _ => SuggestionType::SkillAdd,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl SuggestionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SuggestionStatus::Pending)
    }
}

/// An AI-proposed edit to one field or skill of the document.
/// Immutable apart from `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSuggestion")]
pub struct Suggestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    pub section: Section,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    pub suggested: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// 0–100.
    pub confidence: f64,
    pub ats_keywords: Vec<String>,
    pub status: SuggestionStatus,
    /// Priority for a skill category created by this suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_priority: Option<i32>,
}

impl Suggestion {
    /// Trimmed `original`, if any text remains.
    pub fn original_text(&self) -> Option<&str> {
        self.original
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
    }

    pub fn suggested_text(&self) -> &str {
        self.suggested.trim()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type", alias = "suggestion_type", alias = "suggestionType")]
    kind: Option<String>,
    section: String,
    #[serde(default, alias = "target_path", alias = "target_id", alias = "targetId")]
    target_path: Option<String>,
    #[serde(default, alias = "before", alias = "original_content")]
    original: Option<String>,
    #[serde(default, alias = "after", alias = "suggested_content")]
    suggested: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "ats_keywords", alias = "keywords")]
    ats_keywords: Vec<String>,
    #[serde(default)]
    status: Option<SuggestionStatus>,
    /// Storage rows encode status as `accepted` + `applied_at`.
    #[serde(default)]
    accepted: Option<bool>,
    #[serde(default, alias = "applied_at")]
    applied_at: Option<String>,
    #[serde(default, alias = "category_priority", alias = "priority")]
    category_priority: Option<i32>,
}

impl TryFrom<RawSuggestion> for Suggestion {
    type Error = String;

    fn try_from(raw: RawSuggestion) -> Result<Self, Self::Error> {
        let section: Section = raw.section.parse()?;
        let original = raw.original.filter(|o| !o.trim().is_empty());
        let kind = SuggestionType::resolve(raw.kind.as_deref(), section, original.is_some());

        let status = match (raw.status, raw.accepted) {
            (Some(status), _) => status,
            (None, Some(true)) => SuggestionStatus::Accepted,
            (None, Some(false)) if raw.applied_at.is_some() => SuggestionStatus::Declined,
            _ => SuggestionStatus::Pending,
        };

        let confidence = raw
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);

        Ok(Suggestion {
            id: raw
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            kind,
            section,
            target_path: raw.target_path.as_deref().and_then(canonicalize_path),
            original,
            suggested: raw.suggested.unwrap_or_default(),
            rationale: raw.rationale.filter(|r| !r.trim().is_empty()),
            confidence,
            ats_keywords: raw.ats_keywords,
            status,
            category_priority: raw.category_priority,
        })
    }
}

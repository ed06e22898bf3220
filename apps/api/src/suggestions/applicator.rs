//! Suggestion Applicator: applies one pending suggestion to a document snapshot.
//!
//! Works on a cloned draft: the caller either gets the whole changed document
//! or an error with its own snapshot untouched. Missing or stale targets never
//! fail the apply; they degrade to an append or a no-op, and the report says which.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::models::document::{skills_map_contains, DocumentSnapshot, ExperienceEntry, FlatSkill};
use crate::models::suggestion::{Section, Suggestion, SuggestionType};
use crate::skills::canonical::canonicalize;
use crate::skills::plan::{SkillEntry, SkillSource, SkillStatus};
use crate::skills::projector::project_plan_to_flattened_skills;
use crate::skills::skill_identity;
use crate::suggestions::path::{parse_anchor, parse_skill_category, Anchor};

/// Category used for skill additions that name none.
const DEFAULT_SKILL_CATEGORY: &str = "technical";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("Invalid suggestion {id}: {reason}")]
    InvalidSuggestion { id: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    AlreadyResolved,
    DuplicateBullet,
    DuplicateSkill,
    TargetOutOfRange,
    CategoryNotFound,
    SkillNotFound,
}

/// What the apply did to the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplyEffect {
    FieldReplaced { field: &'static str },
    BulletReplaced { experience: usize, achievement: usize },
    BulletInserted { experience: usize, achievement: usize },
    ProjectDescriptionReplaced { project: usize },
    SkillsAdded { category: String, skills: Vec<String> },
    SkillsRemoved { category: Option<String>, skills: Vec<String> },
    NoOp { reason: NoOpReason },
}

/// Recovery steps taken on the way to the effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// The original text was gone; the bullet at the path index was replaced.
    StaleIndex,
    /// Neither text nor index matched; the suggestion was appended.
    AppendedAfterAnchorMiss,
    /// The path's experience index was out of range; all experiences were searched.
    SearchedAllExperiences,
    /// The document had no experience entry to attach to.
    ExperienceCreated,
    /// The project was located by its description text.
    MatchedProjectText,
    /// The skill suggestion named no category.
    DefaultCategory,
    /// The plan had no such category; one was appended.
    CategoryCreated,
    /// The category exists only in the flattened map, outside the plan.
    UnmanagedCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyReport {
    pub effect: ApplyEffect,
    pub fallbacks: Vec<Fallback>,
}

impl ApplyReport {
    pub fn no_op(reason: NoOpReason) -> Self {
        Self {
            effect: ApplyEffect::NoOp { reason },
            fallbacks: Vec::new(),
        }
    }

    pub fn changed_document(&self) -> bool {
        !matches!(self.effect, ApplyEffect::NoOp { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Applied {
    pub document: DocumentSnapshot,
    pub report: ApplyReport,
}

/// Rejects suggestions that cannot be applied no matter what the document holds.
pub fn validate(suggestion: &Suggestion) -> Result<(), ApplyError> {
    let invalid = |reason: &str| ApplyError::InvalidSuggestion {
        id: suggestion.id.clone(),
        reason: reason.to_string(),
    };

    if suggestion.kind == SuggestionType::SkillRemove {
        if suggestion.original_text().is_none() && suggestion.suggested_text().is_empty() {
            return Err(invalid("skill removal names no skill"));
        }
        return Ok(());
    }
    if suggestion.suggested_text().is_empty() {
        return Err(invalid("missing suggested text"));
    }
    Ok(())
}

/// Applies `suggestion` to a copy of `document`.
///
/// Terminal suggestions return the document unchanged with
/// `NoOpReason::AlreadyResolved`.
pub fn apply_suggestion(document: &DocumentSnapshot, suggestion: &Suggestion) -> Result<Applied, ApplyError> {
    if suggestion.status.is_terminal() {
        return Ok(Applied {
            document: document.clone(),
            report: ApplyReport::no_op(NoOpReason::AlreadyResolved),
        });
    }
    validate(suggestion)?;

    let mut draft = document.clone();
    let mut fallbacks = Vec::new();
    let anchor = match suggestion.section {
        Section::Skills => suggestion.target_path.as_deref().map(parse_skill_category),
        _ => suggestion.target_path.as_deref().map(parse_anchor),
    };

    let effect = match suggestion.section {
        Section::Title => {
            draft.title = suggestion.suggested_text().to_string();
            ApplyEffect::FieldReplaced {
                field: "professionalTitle",
            }
        }
        Section::Summary => {
            draft.summary = suggestion.suggested_text().to_string();
            ApplyEffect::FieldReplaced {
                field: "professionalSummary",
            }
        }
        Section::Experience => apply_experience(&mut draft, suggestion, anchor, &mut fallbacks),
        Section::Projects => apply_project(&mut draft, suggestion, anchor, &mut fallbacks),
        Section::Skills => apply_skills(&mut draft, suggestion, anchor, &mut fallbacks),
    };

    debug!(
        suggestion_id = %suggestion.id,
        section = %suggestion.section,
        ?effect,
        ?fallbacks,
        "Applied suggestion to draft"
    );

    let report = ApplyReport { effect, fallbacks };
    if !report.changed_document() {
        return Ok(Applied {
            document: document.clone(),
            report,
        });
    }
    Ok(Applied {
        document: draft,
        report,
    })
}

fn position_trimmed(items: &[String], text: &str) -> Option<usize> {
    let text = text.trim();
    items.iter().position(|item| item.trim() == text)
}

fn apply_experience(
    draft: &mut DocumentSnapshot,
    suggestion: &Suggestion,
    anchor: Option<Anchor>,
    fallbacks: &mut Vec<Fallback>,
) -> ApplyEffect {
    let original = suggestion.original_text();
    let suggested = suggestion.suggested_text();

    match anchor {
        Some(Anchor::Experience {
            experience,
            achievement,
        }) => {
            if experience >= draft.experience.len() {
                if let Some(original) = original {
                    for (exp_idx, entry) in draft.experience.iter_mut().enumerate() {
                        if let Some(pos) = position_trimmed(&entry.achievements, original) {
                            entry.achievements[pos] = suggested.to_string();
                            fallbacks.push(Fallback::SearchedAllExperiences);
                            return ApplyEffect::BulletReplaced {
                                experience: exp_idx,
                                achievement: pos,
                            };
                        }
                    }
                }
                return ApplyEffect::NoOp {
                    reason: NoOpReason::TargetOutOfRange,
                };
            }
            apply_bullet(
                &mut draft.experience[experience],
                experience,
                original,
                suggested,
                achievement,
                fallbacks,
            )
        }
        _ => {
            if draft.experience.is_empty() {
                draft.experience.push(ExperienceEntry::default());
                fallbacks.push(Fallback::ExperienceCreated);
            }
            apply_bullet(&mut draft.experience[0], 0, original, suggested, None, fallbacks)
        }
    }
}

fn apply_bullet(
    entry: &mut ExperienceEntry,
    experience: usize,
    original: Option<&str>,
    suggested: &str,
    index: Option<usize>,
    fallbacks: &mut Vec<Fallback>,
) -> ApplyEffect {
    let achievements = &mut entry.achievements;

    if let Some(original) = original {
        if let Some(pos) = position_trimmed(achievements, original) {
            achievements[pos] = suggested.to_string();
            return ApplyEffect::BulletReplaced {
                experience,
                achievement: pos,
            };
        }
        if let Some(pos) = index.filter(|i| *i < achievements.len()) {
            achievements[pos] = suggested.to_string();
            fallbacks.push(Fallback::StaleIndex);
            return ApplyEffect::BulletReplaced {
                experience,
                achievement: pos,
            };
        }
        if position_trimmed(achievements, suggested).is_some() {
            return ApplyEffect::NoOp {
                reason: NoOpReason::DuplicateBullet,
            };
        }
        achievements.push(suggested.to_string());
        fallbacks.push(Fallback::AppendedAfterAnchorMiss);
        return ApplyEffect::BulletInserted {
            experience,
            achievement: achievements.len() - 1,
        };
    }

    if position_trimmed(achievements, suggested).is_some() {
        return ApplyEffect::NoOp {
            reason: NoOpReason::DuplicateBullet,
        };
    }
    let at = index.map_or(achievements.len(), |i| i.min(achievements.len()));
    achievements.insert(at, suggested.to_string());
    ApplyEffect::BulletInserted {
        experience,
        achievement: at,
    }
}

fn apply_project(
    draft: &mut DocumentSnapshot,
    suggestion: &Suggestion,
    anchor: Option<Anchor>,
    fallbacks: &mut Vec<Fallback>,
) -> ApplyEffect {
    let suggested = suggestion.suggested_text().to_string();

    let target = match anchor {
        Some(Anchor::Project { index }) => Some(index).filter(|i| *i < draft.projects.len()),
        _ => suggestion.original_text().and_then(|original| {
            let found = draft
                .projects
                .iter()
                .position(|p| p.description.contains(original));
            if found.is_some() {
                fallbacks.push(Fallback::MatchedProjectText);
            }
            found
        }),
    };

    match target {
        Some(project) => {
            draft.projects[project].description = suggested;
            ApplyEffect::ProjectDescriptionReplaced { project }
        }
        None => ApplyEffect::NoOp {
            reason: NoOpReason::TargetOutOfRange,
        },
    }
}

/// Splits "Go, Rust" into individual skill names.
fn split_skill_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| skill_identity(n) == skill_identity(name)) {
            names.push(name.to_string());
        }
    }
    names
}

fn apply_skills(
    draft: &mut DocumentSnapshot,
    suggestion: &Suggestion,
    anchor: Option<Anchor>,
    fallbacks: &mut Vec<Fallback>,
) -> ApplyEffect {
    let label = match anchor {
        Some(Anchor::SkillCategory { label }) if !canonicalize(&label).is_empty() => Some(label),
        _ => None,
    };

    match suggestion.kind {
        SuggestionType::SkillRemove => {
            let name = suggestion
                .original_text()
                .unwrap_or_else(|| suggestion.suggested_text())
                .to_string();
            remove_skill(draft, label.as_deref(), &name, fallbacks)
        }
        _ => {
            let label = label.unwrap_or_else(|| {
                fallbacks.push(Fallback::DefaultCategory);
                DEFAULT_SKILL_CATEGORY.to_string()
            });
            let names = split_skill_list(suggestion.suggested_text());
            add_skills(draft, suggestion, &label, &names, fallbacks)
        }
    }
}

fn add_skills(
    draft: &mut DocumentSnapshot,
    suggestion: &Suggestion,
    label: &str,
    names: &[String],
    fallbacks: &mut Vec<Fallback>,
) -> ApplyEffect {
    let key = canonicalize(label);

    if let Some(plan) = draft.skills_plan.as_mut() {
        let (idx, created) =
            plan.ensure_category(label, suggestion.rationale.clone(), suggestion.category_priority);
        let category = &mut plan.categories[idx];
        if created {
            fallbacks.push(Fallback::CategoryCreated);
            // An ad hoc map category of the same key becomes part of the plan.
            if let Some((_, existing)) = draft.skills.iter().find(|(k, _)| canonicalize(k) == key) {
                category.skills.extend(existing.iter().map(|skill| {
                    let mut entry = SkillEntry::new(skill.name(), SkillStatus::Keep, SkillSource::Resume);
                    entry.proficiency = skill.proficiency().map(str::to_string);
                    entry
                }));
            }
        }
        let mut changed = Vec::new();
        for name in names {
            if category.accept_skill(name, suggestion.rationale.as_deref(), Some(suggestion.confidence)) {
                changed.push(name.clone());
            }
        }
        if changed.is_empty() && !created {
            return ApplyEffect::NoOp {
                reason: NoOpReason::DuplicateSkill,
            };
        }
        draft.skills = project_plan_to_flattened_skills(plan, &draft.skills);
        return ApplyEffect::SkillsAdded {
            category: key,
            skills: changed,
        };
    }

    // Unmanaged map: a skill must be unique across every category.
    let target_key = draft
        .skills
        .keys()
        .find(|k| canonicalize(k) == key)
        .cloned()
        .unwrap_or_else(|| key.clone());
    let mut added = Vec::new();
    for name in names {
        if skills_map_contains(&draft.skills, name) {
            continue;
        }
        draft
            .skills
            .entry(target_key.clone())
            .or_default()
            .push(FlatSkill::new(name, None));
        added.push(name.clone());
    }
    if added.is_empty() {
        return ApplyEffect::NoOp {
            reason: NoOpReason::DuplicateSkill,
        };
    }
    ApplyEffect::SkillsAdded {
        category: target_key,
        skills: added,
    }
}

fn remove_from_map_category(skills: &mut Vec<FlatSkill>, name: &str) -> usize {
    let identity = skill_identity(name);
    let before = skills.len();
    skills.retain(|s| s.identity() != identity);
    before - skills.len()
}

fn remove_skill(
    draft: &mut DocumentSnapshot,
    label: Option<&str>,
    name: &str,
    fallbacks: &mut Vec<Fallback>,
) -> ApplyEffect {
    let removed_effect = |category: Option<String>| ApplyEffect::SkillsRemoved {
        category,
        skills: vec![name.to_string()],
    };
    let not_found = ApplyEffect::NoOp {
        reason: NoOpReason::SkillNotFound,
    };

    if let Some(plan) = draft.skills_plan.as_mut() {
        let plan_removed = match label {
            Some(label) => match plan.category_index(label) {
                Some(idx) => plan.categories[idx].remove_skill(name),
                None => {
                    // Only an ad hoc map category can still hold it.
                    fallbacks.push(Fallback::UnmanagedCategory);
                    let key = canonicalize(label);
                    let removed = draft
                        .skills
                        .iter_mut()
                        .find(|(k, _)| canonicalize(k) == key)
                        .map(|(_, skills)| remove_from_map_category(skills, name));
                    return match removed {
                        None => ApplyEffect::NoOp {
                            reason: NoOpReason::CategoryNotFound,
                        },
                        Some(0) => not_found,
                        Some(_) => removed_effect(Some(key)),
                    };
                }
            },
            None => plan
                .categories
                .iter_mut()
                .map(|c| c.remove_skill(name))
                .sum(),
        };

        let mut flattened = project_plan_to_flattened_skills(plan, &draft.skills);
        let mut map_removed = 0;
        if label.is_none() {
            for skills in flattened.values_mut() {
                map_removed += remove_from_map_category(skills, name);
            }
        }
        if plan_removed + map_removed == 0 {
            return not_found;
        }
        draft.skills = flattened;
        return removed_effect(label.map(canonicalize));
    }

    match label {
        Some(label) => {
            let key = canonicalize(label);
            match draft.skills.iter_mut().find(|(k, _)| canonicalize(k) == key) {
                None => ApplyEffect::NoOp {
                    reason: NoOpReason::CategoryNotFound,
                },
                Some((_, skills)) => match remove_from_map_category(skills, name) {
                    0 => not_found,
                    _ => removed_effect(Some(key)),
                },
            }
        }
        None => {
            let removed: usize = draft
                .skills
                .values_mut()
                .map(|skills| remove_from_map_category(skills, name))
                .sum();
            if removed == 0 {
                not_found
            } else {
                removed_effect(None)
            }
        }
    }
}

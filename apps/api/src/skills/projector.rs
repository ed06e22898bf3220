//! Plan ⇄ Skills Projector.
//!
//! Plan → organized per-category view (for the skills panel) and plan →
//! flattened `category key → skills` map (for the document and renderer).
//! In the other direction, existing flattened skills seed a new plan, and direct
//! edits to the map are folded back into the plan.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::document::{FlatSkill, SkillsMap};
use crate::skills::canonical::{canonicalize, resolve_display_name};
use crate::skills::plan::{SkillCategory, SkillEntry, SkillSource, SkillStatus, SkillTaxonomyPlan};
use crate::skills::skill_identity;

/// One category of the organized skills view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizedCategory {
    pub canonical_key: String,
    pub display_name: String,
    pub skills: Vec<FlatSkill>,
    /// Pending Add/Promote entries, surfaced as plain names.
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub allow_proficiency: bool,
}

fn to_flat(entry: &SkillEntry) -> FlatSkill {
    FlatSkill::new(&entry.name, entry.proficiency.as_deref())
}

/// Skills already present in the map for a category, looked up by canonical
/// key, then by exact display name, then by any key canonicalizing to it.
fn existing_for<'a>(
    existing: &'a SkillsMap,
    canonical_key: &str,
    display_name: &str,
) -> Option<&'a Vec<FlatSkill>> {
    existing
        .get(canonical_key)
        .or_else(|| existing.get(display_name))
        .or_else(|| {
            existing
                .iter()
                .find(|(key, _)| canonicalize(key) == canonical_key)
                .map(|(_, skills)| skills)
        })
        .filter(|skills| !skills.is_empty())
}

/// Projects the plan into the ordered per-category view.
///
/// Categories are sorted by priority; ones with no resolvable key are skipped.
/// A category's skills come from the map when it already lists them, otherwise
/// from its Keep/Accepted plan entries.
pub fn project_plan_to_organized_view(
    plan: &SkillTaxonomyPlan,
    existing: &SkillsMap,
) -> Vec<OrganizedCategory> {
    plan.sorted_categories()
        .into_iter()
        .filter_map(|category| {
            let canonical_key = category.resolved_key();
            if canonical_key.is_empty() {
                return None;
            }
            let display_name = category.resolved_display_name();

            let skills = match existing_for(existing, &canonical_key, &display_name) {
                Some(current) => dedupe_flat(current.iter().cloned()),
                None => dedupe_flat(category.committed().map(to_flat)),
            };
            let suggestions = category.pending().map(|e| e.name.clone()).collect();
            let allow_proficiency = skills.iter().any(|s| s.proficiency().is_some());

            Some(OrganizedCategory {
                canonical_key,
                display_name,
                skills,
                suggestions,
                rationale: category.rationale.clone(),
                allow_proficiency,
            })
        })
        .collect()
}

fn dedupe_flat(skills: impl Iterator<Item = FlatSkill>) -> Vec<FlatSkill> {
    let mut seen = HashSet::new();
    skills
        .filter(|s| !s.name().is_empty() && seen.insert(s.identity()))
        .collect()
}

/// Regenerates the flattened skills map from the plan.
///
/// Only Keep/Accepted entries are emitted, keyed by canonical key, with a
/// skill name appearing at most once across the whole map (first category by
/// priority wins). Categories with nothing to show are omitted. Map categories
/// the plan does not know about are carried over, minus any skill the plan
/// already placed elsewhere.
pub fn project_plan_to_flattened_skills(plan: &SkillTaxonomyPlan, existing: &SkillsMap) -> SkillsMap {
    let mut flattened = SkillsMap::new();
    let mut seen: HashSet<String> = HashSet::new();
    let plan_keys: HashSet<String> = plan.canonical_keys().into_iter().collect();

    for category in plan.sorted_categories() {
        let key = category.resolved_key();
        if key.is_empty() {
            continue;
        }
        let skills: Vec<FlatSkill> = category
            .committed()
            .filter(|e| !e.name.is_empty() && seen.insert(e.identity()))
            .map(to_flat)
            .collect();
        if !skills.is_empty() {
            flattened.entry(key).or_default().extend(skills);
        }
    }

    for (key, skills) in existing {
        if plan_keys.contains(&canonicalize(key)) {
            continue;
        }
        let carried: Vec<FlatSkill> = skills
            .iter()
            .filter(|s| seen.insert(s.identity()))
            .cloned()
            .collect();
        flattened.insert(key.clone(), carried);
    }

    flattened
}

/// Builds a first plan from an unmanaged skills map.
///
/// Every skill becomes a Keep entry sourced from the résumé; categories whose
/// keys canonicalize alike are merged and a skill is kept only in the first
/// category that lists it.
pub fn seed_plan_from_skills(skills: &SkillsMap) -> SkillTaxonomyPlan {
    let mut plan = SkillTaxonomyPlan::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (label, entries) in skills {
        let key = canonicalize(label);
        if key.is_empty() {
            continue;
        }
        let idx = match plan.category_index(&key) {
            Some(idx) => idx,
            None => {
                plan.categories.push(SkillCategory {
                    canonical_key: key.clone(),
                    display_name: resolve_display_name(Some(label), &key),
                    priority: Some(plan.categories.len() as i32),
                    rationale: None,
                    skills: Vec::new(),
                });
                plan.categories.len() - 1
            }
        };
        for skill in entries {
            if skill.name().is_empty() || !seen.insert(skill.identity()) {
                continue;
            }
            let mut entry = SkillEntry::new(skill.name(), SkillStatus::Keep, SkillSource::Resume);
            entry.proficiency = skill.proficiency().map(str::to_string);
            plan.categories[idx].skills.push(entry);
        }
    }

    plan
}

/// Folds direct edits of the flattened map back into the plan.
///
/// For every plan category the map lists: committed entries missing from the
/// map are dropped, names the map adds become Accepted entries, and
/// proficiency follows the map. Plan categories absent from the map are left
/// alone; deleting a whole category is an explicit operation.
pub fn sync_plan_with_flattened(plan: &mut SkillTaxonomyPlan, skills: &SkillsMap) {
    for category in &mut plan.categories {
        let key = category.resolved_key();
        if key.is_empty() {
            continue;
        }
        let Some(listed) = skills
            .iter()
            .find(|(label, _)| canonicalize(label) == key)
            .map(|(_, listed)| listed)
        else {
            continue;
        };

        let listed_ids: HashSet<String> = listed.iter().map(FlatSkill::identity).collect();
        category
            .skills
            .retain(|e| !e.status.is_committed() || listed_ids.contains(&e.identity()));

        for flat in listed {
            match category.position_of(flat.name()) {
                Some(idx) => {
                    let entry = &mut category.skills[idx];
                    if !entry.status.is_committed() {
                        entry.status = SkillStatus::Accepted;
                    }
                    entry.proficiency = flat.proficiency().map(str::to_string);
                }
                None => {
                    let mut entry =
                        SkillEntry::new(flat.name(), SkillStatus::Accepted, SkillSource::Tailored);
                    entry.proficiency = flat.proficiency().map(str::to_string);
                    category.skills.push(entry);
                }
            }
        }
    }
}

/// Whether the flattened map holds any skill name twice.
pub fn has_duplicate_skills(skills: &SkillsMap) -> bool {
    let mut seen = HashSet::new();
    skills
        .values()
        .flatten()
        .any(|s| !seen.insert(skill_identity(s.name())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, status: SkillStatus) -> SkillEntry {
        SkillEntry::new(name, status, SkillSource::Resume)
    }

    fn category(key: &str, priority: Option<i32>, skills: Vec<SkillEntry>) -> SkillCategory {
        SkillCategory {
            canonical_key: key.to_string(),
            priority,
            skills,
            ..Default::default()
        }
    }

    fn plain(names: &[&str]) -> Vec<FlatSkill> {
        names.iter().map(|n| FlatSkill::Plain(n.to_string())).collect()
    }

    #[test]
    fn test_flattened_keeps_only_committed_entries() {
        let plan = SkillTaxonomyPlan {
            categories: vec![
                category(
                    "technical",
                    Some(1),
                    vec![
                        entry("Python", SkillStatus::Keep),
                        entry("Go", SkillStatus::Accepted),
                        entry("Rust", SkillStatus::Add),
                        entry("Scala", SkillStatus::Promote),
                        entry("COBOL", SkillStatus::Remove),
                    ],
                ),
                category("tools", Some(2), vec![entry("Docker", SkillStatus::Keep)]),
            ],
            ..Default::default()
        };
        let map = project_plan_to_flattened_skills(&plan, &SkillsMap::new());

        assert_eq!(map.len(), 2);
        assert_eq!(map["technical"], plain(&["Python", "Go"]));
        assert_eq!(map["tools"], plain(&["Docker"]));
    }

    #[test]
    fn test_flattened_dedupes_across_categories_by_priority() {
        let plan = SkillTaxonomyPlan {
            categories: vec![
                category("tools", Some(5), vec![entry("sql", SkillStatus::Keep)]),
                category("data", Some(1), vec![entry("SQL", SkillStatus::Keep)]),
            ],
            ..Default::default()
        };
        let map = project_plan_to_flattened_skills(&plan, &SkillsMap::new());
        assert_eq!(map["data"], plain(&["SQL"]));
        assert!(!map.contains_key("tools"));
        assert!(!has_duplicate_skills(&map));
    }

    #[test]
    fn test_flattened_preserves_proficiency_and_unknown_categories() {
        let mut python = entry("Python", SkillStatus::Keep);
        python.proficiency = Some("Expert".into());
        let plan = SkillTaxonomyPlan {
            categories: vec![category("technical", None, vec![python])],
            ..Default::default()
        };
        let mut existing = SkillsMap::new();
        existing.insert("Technical".into(), plain(&["Stale"]));
        existing.insert("hobby_tools".into(), plain(&["Blender", "python"]));

        let map = project_plan_to_flattened_skills(&plan, &existing);

        assert_eq!(map["technical"], vec![FlatSkill::new("Python", Some("Expert"))]);
        assert!(!map.contains_key("Technical"));
        assert_eq!(map["hobby_tools"], plain(&["Blender"]));
    }

    #[test]
    fn test_organized_view_prefers_existing_map_skills() {
        let plan = SkillTaxonomyPlan {
            categories: vec![
                SkillCategory {
                    canonical_key: "tools___platforms".into(),
                    display_name: "tools___platforms".into(),
                    priority: Some(2),
                    rationale: Some("Infra heavy role".into()),
                    skills: vec![entry("Docker", SkillStatus::Keep), entry("Terraform", SkillStatus::Add)],
                },
                category("technical", Some(1), vec![entry("Python", SkillStatus::Keep)]),
            ],
            ..Default::default()
        };
        let mut existing = SkillsMap::new();
        existing.insert(
            "technical".into(),
            vec![FlatSkill::new("Python", Some("Expert")), FlatSkill::Plain("Go".into())],
        );

        let view = project_plan_to_organized_view(&plan, &existing);

        assert_eq!(view.len(), 2);
        assert_eq!(view[0].display_name, "Technical");
        assert_eq!(view[0].skills.len(), 2);
        assert!(view[0].allow_proficiency);
        assert_eq!(view[1].display_name, "Tools & Platforms");
        assert_eq!(view[1].skills, plain(&["Docker"]));
        assert_eq!(view[1].suggestions, vec!["Terraform"]);
        assert!(!view[1].allow_proficiency);
        assert_eq!(view[1].rationale.as_deref(), Some("Infra heavy role"));
    }

    #[test]
    fn test_organized_view_skips_unkeyed_categories() {
        let plan = SkillTaxonomyPlan {
            categories: vec![category("", None, vec![entry("Python", SkillStatus::Keep)])],
            ..Default::default()
        };
        assert!(project_plan_to_organized_view(&plan, &SkillsMap::new()).is_empty());
    }

    #[test]
    fn test_seed_plan_from_skills() {
        let mut skills = SkillsMap::new();
        skills.insert("Technical Skills".into(), vec![FlatSkill::new("Python", Some("Expert"))]);
        skills.insert("technical_skills".into(), plain(&["Go", "python"]));
        skills.insert("tools".into(), plain(&["Docker", "GO"]));

        let plan = seed_plan_from_skills(&skills);

        assert_eq!(plan.categories.len(), 2);
        let technical = &plan.categories[0];
        assert_eq!(technical.canonical_key, "technical_skills");
        assert_eq!(technical.display_name, "Technical Skills");
        let names: Vec<_> = technical.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Python", "Go"]);
        assert_eq!(technical.skills[0].proficiency.as_deref(), Some("Expert"));
        assert!(technical.skills.iter().all(|s| s.status == SkillStatus::Keep));
        assert_eq!(plan.categories[1].skills.len(), 1);
    }

    #[test]
    fn test_sync_plan_with_flattened_applies_pill_edits() {
        let mut plan = SkillTaxonomyPlan {
            categories: vec![
                category(
                    "technical",
                    None,
                    vec![
                        entry("Python", SkillStatus::Keep),
                        entry("Go", SkillStatus::Accepted),
                        entry("Rust", SkillStatus::Add),
                    ],
                ),
                category("tools", None, vec![entry("Docker", SkillStatus::Keep)]),
            ],
            ..Default::default()
        };
        let mut map = SkillsMap::new();
        map.insert("technical".into(), vec![FlatSkill::Plain("Go".into()), FlatSkill::new("Zig", Some("Novice"))]);

        sync_plan_with_flattened(&mut plan, &map);

        let technical: Vec<_> = plan.categories[0]
            .skills
            .iter()
            .map(|s| (s.name.as_str(), s.status))
            .collect();
        assert_eq!(
            technical,
            vec![
                ("Go", SkillStatus::Accepted),
                ("Rust", SkillStatus::Add),
                ("Zig", SkillStatus::Accepted)
            ]
        );
        assert_eq!(plan.categories[0].skills[2].proficiency.as_deref(), Some("Novice"));
        assert_eq!(plan.categories[1].skills.len(), 1);
    }

    #[test]
    fn test_plan_round_trips_through_flattened_map() {
        let plan = SkillTaxonomyPlan {
            categories: vec![
                category("technical", Some(1), vec![entry("Python", SkillStatus::Keep), entry("Go", SkillStatus::Accepted)]),
                category("soft_skills", Some(2), vec![entry("Mentoring", SkillStatus::Keep)]),
            ],
            ..Default::default()
        };
        let map = project_plan_to_flattened_skills(&plan, &SkillsMap::new());
        let total: usize = map.values().map(Vec::len).sum();
        assert_eq!(total, 3);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["soft_skills", "technical"]);
    }
}

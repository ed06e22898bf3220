use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::skills::{skill_identity, SkillTaxonomyPlan};

/// A skill as it appears in the flattened map: a bare name, or a name with a
/// proficiency level. Normalized on ingress from either a string or an object
/// carrying `skill`/`name` and `proficiency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, from = "RawFlatSkill")]
pub enum FlatSkill {
    Plain(String),
    Rated { skill: String, proficiency: String },
}

impl FlatSkill {
    pub fn new(name: &str, proficiency: Option<&str>) -> Self {
        let name = name.trim().to_string();
        match proficiency.map(str::trim).filter(|p| !p.is_empty()) {
            Some(level) => FlatSkill::Rated {
                skill: name,
                proficiency: level.to_string(),
            },
            None => FlatSkill::Plain(name),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FlatSkill::Plain(name) => name,
            FlatSkill::Rated { skill, .. } => skill,
        }
    }

    pub fn proficiency(&self) -> Option<&str> {
        match self {
            FlatSkill::Plain(_) => None,
            FlatSkill::Rated { proficiency, .. } => Some(proficiency),
        }
    }

    pub fn identity(&self) -> String {
        skill_identity(self.name())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlatSkill {
    Plain(String),
    Object {
        #[serde(default)]
        skill: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        proficiency: Option<String>,
    },
}

impl From<RawFlatSkill> for FlatSkill {
    fn from(raw: RawFlatSkill) -> Self {
        match raw {
            RawFlatSkill::Plain(name) => FlatSkill::new(&name, None),
            RawFlatSkill::Object {
                skill,
                name,
                proficiency,
            } => FlatSkill::new(&skill.or(name).unwrap_or_default(), proficiency.as_deref()),
        }
    }
}

/// Category key → skills, as rendered and edited by the user.
pub type SkillsMap = BTreeMap<String, Vec<FlatSkill>>;

/// Drops unnamed skills from every category of a freshly ingested map.
pub fn normalize_skills_map(map: &mut SkillsMap) {
    for skills in map.values_mut() {
        skills.retain(|s| !s.name().is_empty());
    }
}

/// Whether any category of `map` already holds `name`.
pub fn skills_map_contains(map: &SkillsMap, name: &str) -> bool {
    let identity = skill_identity(name);
    map.values().flatten().any(|s| s.identity() == identity)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub achievements: Vec<String>,
    /// Company, position, dates and anything else the engine never touches.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExperienceEntry {
    #[cfg(test)]
    pub fn with_achievements<I, S>(achievements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            achievements: achievements.into_iter().map(Into::into).collect(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectEntry {
    #[cfg(test)]
    pub fn with_description(description: &str) -> Self {
        Self {
            description: description.to_string(),
            extra: Map::new(),
        }
    }
}

/// Full résumé variant state. Fields the engine does not read or write are
/// carried through `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub personal_info: Value,
    #[serde(default, rename = "professionalTitle", alias = "title")]
    pub title: String,
    #[serde(default, rename = "professionalSummary", alias = "summary")]
    pub summary: String,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub skills: SkillsMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_plan: Option<SkillTaxonomyPlan>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentSnapshot {
    /// Repairs ingress data so internal logic can rely on its invariants.
    pub fn normalize(&mut self) {
        normalize_skills_map(&mut self.skills);
        if let Some(plan) = self.skills_plan.as_mut() {
            plan.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_skill_ingress_shapes() {
        let skills: Vec<FlatSkill> = serde_json::from_value(json!([
            "Python",
            {"skill": "SQL", "proficiency": "Expert"},
            {"name": "Docker"},
            {"skill": "Go", "proficiency": ""}
        ]))
        .unwrap();
        assert_eq!(skills[0], FlatSkill::Plain("Python".into()));
        assert_eq!(
            skills[1],
            FlatSkill::Rated {
                skill: "SQL".into(),
                proficiency: "Expert".into()
            }
        );
        assert_eq!(skills[2], FlatSkill::Plain("Docker".into()));
        assert_eq!(skills[3], FlatSkill::Plain("Go".into()));
    }

    #[test]
    fn test_flat_skill_serializes_untagged() {
        let value = serde_json::to_value(vec![
            FlatSkill::Plain("Python".into()),
            FlatSkill::new("SQL", Some("Expert")),
        ])
        .unwrap();
        assert_eq!(value, json!(["Python", {"skill": "SQL", "proficiency": "Expert"}]));
    }

    #[test]
    fn test_document_preserves_unknown_fields() {
        let raw = json!({
            "personalInfo": {"name": "Ada"},
            "professionalTitle": "Engineer",
            "professionalSummary": "Builds things",
            "experience": [{"company": "Acme", "achievements": ["Shipped X"]}],
            "projects": [{"name": "Tool", "description": "CLI"}],
            "skills": {"technical": ["Rust"]},
            "education": [{"school": "MIT"}]
        });
        let doc: DocumentSnapshot = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(doc.title, "Engineer");
        assert_eq!(doc.experience[0].achievements, vec!["Shipped X"]);
        assert_eq!(doc.experience[0].extra["company"], json!("Acme"));
        assert!(doc.extra.contains_key("education"));
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_skills_map_contains_ignores_case() {
        let mut map = SkillsMap::new();
        map.insert("tools".into(), vec![FlatSkill::Plain("Docker".into())]);
        assert!(skills_map_contains(&map, " docker "));
        assert!(!skills_map_contains(&map, "Kubernetes"));
    }
}

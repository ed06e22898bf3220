// Skill taxonomy: canonical category keys, the authoritative plan, and the
// projections between the plan and the flattened skills map on the document.

pub mod canonical;
pub mod plan;
pub mod projector;

pub use plan::SkillTaxonomyPlan;

/// Identity of a skill name: trimmed and compared case-insensitively.
pub fn skill_identity(name: &str) -> String {
    name.trim().to_lowercase()
}

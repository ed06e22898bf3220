//! Skill Taxonomy Plan: ordered categories and per-skill status.
//!
//! The plan is write-authoritative for which skills count. The flattened map on
//! the document is regenerated from it (see `skills::projector`).

use serde::{Deserialize, Serialize};

use crate::skills::canonical::{canonicalize, resolve_display_name};
use crate::skills::skill_identity;

/// Priority assigned to categories that carry none; they sort after everything else.
pub const MISSING_PRIORITY: i32 = 999;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    #[default]
    Keep,
    Accepted,
    /// Suggested addition, not yet committed.
    Add,
    /// Suggested promotion, not yet committed.
    Promote,
    Remove,
}

impl SkillStatus {
    /// Keep and Accepted are the statuses that appear in the flattened map.
    pub fn is_committed(self) -> bool {
        matches!(self, SkillStatus::Keep | SkillStatus::Accepted)
    }

    pub fn is_pending(self) -> bool {
        matches!(self, SkillStatus::Add | SkillStatus::Promote)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillSource {
    #[default]
    Resume,
    Tailored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSkillEntry")]
pub struct SkillEntry {
    pub name: String,
    pub status: SkillStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub source: SkillSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proficiency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl SkillEntry {
    pub fn new(name: &str, status: SkillStatus, source: SkillSource) -> Self {
        Self {
            name: name.trim().to_string(),
            status,
            rationale: None,
            source,
            proficiency: None,
            confidence: None,
        }
    }

    pub fn identity(&self) -> String {
        skill_identity(&self.name)
    }
}

/// Upstream plans store skills either as bare names or as objects keyed by
/// `name` or `skill`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSkillEntry {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        skill: Option<String>,
        #[serde(default)]
        status: SkillStatus,
        #[serde(default)]
        rationale: Option<String>,
        #[serde(default)]
        source: SkillSource,
        #[serde(default)]
        proficiency: Option<String>,
        #[serde(default)]
        confidence: Option<f64>,
    },
}

impl From<RawSkillEntry> for SkillEntry {
    fn from(raw: RawSkillEntry) -> Self {
        match raw {
            RawSkillEntry::Name(name) => SkillEntry::new(&name, SkillStatus::Keep, SkillSource::Resume),
            RawSkillEntry::Object {
                name,
                skill,
                status,
                rationale,
                source,
                proficiency,
                confidence,
            } => SkillEntry {
                name: name.or(skill).unwrap_or_default().trim().to_string(),
                status,
                rationale: rationale.filter(|r| !r.trim().is_empty()),
                source,
                proficiency: proficiency.filter(|p| !p.trim().is_empty()),
                confidence,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    #[serde(default)]
    pub canonical_key: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
}

impl SkillCategory {
    /// Creates an empty category from a free-form label.
    pub fn from_label(label: &str, rationale: Option<String>, priority: Option<i32>) -> Self {
        let canonical_key = canonicalize(label);
        let display_name = resolve_display_name(Some(label), &canonical_key);
        Self {
            canonical_key,
            display_name,
            priority,
            rationale,
            skills: Vec::new(),
        }
    }

    /// Canonical key, falling back to the display name when the stored key is blank.
    pub fn resolved_key(&self) -> String {
        if self.canonical_key.trim().is_empty() {
            canonicalize(&self.display_name)
        } else {
            canonicalize(&self.canonical_key)
        }
    }

    pub fn resolved_display_name(&self) -> String {
        resolve_display_name(Some(&self.display_name), &self.resolved_key())
    }

    pub fn sort_priority(&self) -> i32 {
        self.priority.unwrap_or(MISSING_PRIORITY)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        let identity = skill_identity(name);
        self.skills.iter().position(|s| s.identity() == identity)
    }

    pub fn committed(&self) -> impl Iterator<Item = &SkillEntry> {
        self.skills.iter().filter(|s| s.status.is_committed())
    }

    pub fn pending(&self) -> impl Iterator<Item = &SkillEntry> {
        self.skills.iter().filter(|s| s.status.is_pending())
    }

    /// Marks `name` as Accepted, appending it when absent.
    ///
    /// Returns `false` when the skill was already committed.
    pub fn accept_skill(&mut self, name: &str, rationale: Option<&str>, confidence: Option<f64>) -> bool {
        match self.position_of(name) {
            Some(idx) if self.skills[idx].status.is_committed() => false,
            Some(idx) => {
                self.skills[idx].status = SkillStatus::Accepted;
                true
            }
            None => {
                let mut entry = SkillEntry::new(name, SkillStatus::Accepted, SkillSource::Tailored);
                entry.rationale = rationale.map(str::to_string);
                entry.confidence = confidence;
                self.skills.push(entry);
                true
            }
        }
    }

    /// Drops every entry named `name`. Returns how many were removed.
    pub fn remove_skill(&mut self, name: &str) -> usize {
        let identity = skill_identity(name);
        let before = self.skills.len();
        self.skills.retain(|s| s.identity() != identity);
        before - self.skills.len()
    }

    /// Drops unnamed entries and collapses duplicates, keeping the first
    /// occurrence but upgrading it to a committed status if any duplicate had one.
    fn dedupe(&mut self) {
        let mut kept: Vec<SkillEntry> = Vec::with_capacity(self.skills.len());
        for entry in self.skills.drain(..) {
            if entry.name.is_empty() {
                continue;
            }
            match kept.iter_mut().find(|k| k.identity() == entry.identity()) {
                Some(existing) => {
                    if !existing.status.is_committed() && entry.status.is_committed() {
                        existing.status = entry.status;
                    }
                    if existing.proficiency.is_none() {
                        existing.proficiency = entry.proficiency;
                    }
                }
                None => kept.push(entry),
            }
        }
        self.skills = kept;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillTaxonomyPlan {
    #[serde(default)]
    pub categories: Vec<SkillCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default)]
    pub guiding_principles: Vec<String>,
}

impl SkillTaxonomyPlan {
    /// Categories ordered by ascending priority; ties keep plan order.
    pub fn sorted_categories(&self) -> Vec<&SkillCategory> {
        let mut sorted: Vec<&SkillCategory> = self.categories.iter().collect();
        sorted.sort_by_key(|c| c.sort_priority());
        sorted
    }

    /// Index of the category whose canonical key matches `label` once canonicalized.
    pub fn category_index(&self, label: &str) -> Option<usize> {
        let key = canonicalize(label);
        if key.is_empty() {
            return None;
        }
        self.categories.iter().position(|c| c.resolved_key() == key)
    }

    /// Finds the category for `label`, appending a new one seeded from the label when missing.
    /// Returns the index and whether the category was created.
    pub fn ensure_category(
        &mut self,
        label: &str,
        rationale: Option<String>,
        priority: Option<i32>,
    ) -> (usize, bool) {
        if let Some(idx) = self.category_index(label) {
            return (idx, false);
        }
        self.categories
            .push(SkillCategory::from_label(label, rationale, priority));
        (self.categories.len() - 1, true)
    }

    /// Explicit whole-category deletion. Returns the removed category.
    pub fn remove_category(&mut self, label: &str) -> Option<SkillCategory> {
        self.category_index(label).map(|idx| self.categories.remove(idx))
    }

    /// Canonical keys of every category the plan knows about.
    pub fn canonical_keys(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(SkillCategory::resolved_key)
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Repairs upstream data: fills canonical keys, merges categories sharing
    /// a key, and removes duplicate or unnamed skills within each category.
    /// Categories without a resolvable key are left untouched.
    pub fn normalize(&mut self) {
        let mut merged: Vec<SkillCategory> = Vec::with_capacity(self.categories.len());
        for mut category in self.categories.drain(..) {
            let key = category.resolved_key();
            if !key.is_empty() {
                category.canonical_key = key.clone();
            }
            match merged
                .iter_mut()
                .find(|c| !key.is_empty() && c.canonical_key == key)
            {
                Some(existing) => {
                    existing.skills.append(&mut category.skills);
                    if existing.priority.is_none() {
                        existing.priority = category.priority;
                    }
                    if existing.rationale.is_none() {
                        existing.rationale = category.rationale;
                    }
                }
                None => merged.push(category),
            }
        }
        for category in &mut merged {
            category.dedupe();
        }
        self.categories = merged;
    }
}

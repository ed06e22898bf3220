//! The reconciliation session: one open document, its skill plan and its
//! suggestion list, mutated only through the operations below.
//!
//! Every successful change bumps `revision`; the registry uses the bump to
//! decide whether a snapshot has to be handed to the persistence bridge.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::document::{DocumentSnapshot, SkillsMap};
use crate::models::suggestion::{Section, Suggestion, SuggestionStatus};
use crate::skills::canonical::canonicalize;
use crate::skills::projector::{
    has_duplicate_skills, project_plan_to_flattened_skills, project_plan_to_organized_view, seed_plan_from_skills,
    sync_plan_with_flattened, OrganizedCategory,
};
use crate::skills::{skill_identity, SkillTaxonomyPlan};
use crate::store::StoredVariant;
use crate::suggestions::applicator::{apply_suggestion, ApplyError, ApplyReport, NoOpReason};
use crate::suggestions::lifecycle::{LifecycleError, SuggestionBook, SuggestionStats, Transition};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Suggestion {0} not found")]
    SuggestionNotFound(String),

    #[error("Invalid suggestion {id}: {reason}")]
    InvalidSuggestion { id: String, reason: String },

    #[error("Skill category '{0}' not found")]
    CategoryNotFound(String),

    #[error("Skill '{skill}' not found in category '{category}'")]
    SkillNotFound { category: String, skill: String },
}

impl From<LifecycleError> for SessionError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::NotFound(id) => SessionError::SuggestionNotFound(id),
        }
    }
}

impl From<ApplyError> for SessionError {
    fn from(e: ApplyError) -> Self {
        match e {
            ApplyError::InvalidSuggestion { id, reason } => SessionError::InvalidSuggestion { id, reason },
        }
    }
}

/// Result of accepting, declining or applying a suggestion.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub suggestion: Suggestion,
    /// Present when the suggestion's effect was run against the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ApplyReport>,
    pub already_resolved: bool,
}

#[derive(Debug, Clone)]
pub struct ReconciliationSession {
    variant_id: Uuid,
    revision: u64,
    document: DocumentSnapshot,
    suggestions: SuggestionBook,
}

impl ReconciliationSession {
    pub fn new(variant_id: Uuid, stored: StoredVariant) -> Self {
        let mut document = stored.document;
        document.normalize();
        Self {
            variant_id,
            revision: stored.revision,
            document,
            suggestions: SuggestionBook::new(stored.suggestions),
        }
    }

    pub fn variant_id(&self) -> Uuid {
        self.variant_id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn document(&self) -> &DocumentSnapshot {
        &self.document
    }

    pub fn snapshot(&self) -> StoredVariant {
        StoredVariant {
            revision: self.revision,
            document: self.document.clone(),
            suggestions: self.suggestions.all().to_vec(),
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // ── Suggestion decisions ────────────────────────────────────────────────

    /// Applies a tracked pending suggestion and marks it Accepted.
    ///
    /// An already resolved suggestion is returned as is without touching the
    /// document. A malformed one is rejected and stays pending.
    pub fn accept(&mut self, id: &str) -> Result<Resolution, SessionError> {
        let suggestion = self
            .suggestions
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::SuggestionNotFound(id.to_string()))?;

        if suggestion.status.is_terminal() {
            return Ok(Resolution {
                suggestion,
                report: Some(ApplyReport::no_op(NoOpReason::AlreadyResolved)),
                already_resolved: true,
            });
        }

        let applied = apply_suggestion(&self.document, &suggestion)?;
        self.document = applied.document;
        self.suggestions.resolve(id, SuggestionStatus::Accepted)?;
        self.touch();

        if !applied.report.fallbacks.is_empty() {
            warn!(
                suggestion_id = %id,
                fallbacks = ?applied.report.fallbacks,
                "Suggestion target no longer matched; applied with fallback"
            );
        }
        info!(variant_id = %self.variant_id, suggestion_id = %id, revision = self.revision, "Suggestion accepted");

        Ok(Resolution {
            suggestion: self.tracked(id)?,
            report: Some(applied.report),
            already_resolved: false,
        })
    }

    pub fn decline(&mut self, id: &str) -> Result<Resolution, SessionError> {
        let transition = self.suggestions.resolve(id, SuggestionStatus::Declined)?;
        let already_resolved = matches!(transition, Transition::AlreadyResolved(_));
        if !already_resolved {
            self.touch();
        }
        Ok(Resolution {
            suggestion: self.tracked(id)?,
            report: None,
            already_resolved,
        })
    }

    /// Applies a suggestion supplied by the caller. A tracked id goes through
    /// `accept`; an untracked one is applied and recorded as Accepted.
    pub fn apply(&mut self, suggestion: Suggestion) -> Result<Resolution, SessionError> {
        if self.suggestions.get(&suggestion.id).is_some() {
            return self.accept(&suggestion.id);
        }

        let applied = apply_suggestion(&self.document, &suggestion)?;
        if suggestion.status.is_terminal() {
            return Ok(Resolution {
                suggestion,
                report: Some(applied.report),
                already_resolved: true,
            });
        }

        self.document = applied.document;
        let mut recorded = suggestion;
        recorded.status = SuggestionStatus::Accepted;
        self.suggestions.push(recorded.clone());
        self.touch();
        info!(variant_id = %self.variant_id, suggestion_id = %recorded.id, "Untracked suggestion applied");

        Ok(Resolution {
            suggestion: recorded,
            report: Some(applied.report),
            already_resolved: false,
        })
    }

    /// Replaces the suggestion list with a freshly generated batch.
    pub fn load_suggestions(&mut self, suggestions: Vec<Suggestion>) -> usize {
        self.suggestions.replace_all(suggestions);
        if self.suggestions.is_empty() {
            warn!(variant_id = %self.variant_id, "Suggestion source returned no usable suggestions");
        }
        self.touch();
        info!(variant_id = %self.variant_id, count = self.suggestions.len(), "Suggestions loaded");
        self.suggestions.len()
    }

    pub fn discard(&mut self, id: &str) -> Result<Suggestion, SessionError> {
        let removed = self.suggestions.discard(id)?;
        self.touch();
        Ok(removed)
    }

    fn tracked(&self, id: &str) -> Result<Suggestion, SessionError> {
        self.suggestions
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::SuggestionNotFound(id.to_string()))
    }

    // ── Direct edits ────────────────────────────────────────────────────────

    /// Replaces the document with a user-edited one. The plan follows the
    /// edited skills map and the map is then re-derived from the plan.
    pub fn replace_document(&mut self, mut document: DocumentSnapshot) -> &DocumentSnapshot {
        document.normalize();
        if let Some(plan) = document.skills_plan.as_mut() {
            sync_plan_with_flattened(plan, &document.skills);
            document.skills = project_plan_to_flattened_skills(plan, &document.skills);
        } else if has_duplicate_skills(&document.skills) {
            warn!(variant_id = %self.variant_id, "Edited skills list a skill under more than one category");
        }
        self.document = document;
        self.touch();
        &self.document
    }

    /// Deletes one skill pill from a category.
    pub fn remove_skill(&mut self, category: &str, skill: &str) -> Result<&SkillsMap, SessionError> {
        let key = canonicalize(category);
        let identity = skill_identity(skill);
        let not_found = || SessionError::SkillNotFound {
            category: category.to_string(),
            skill: skill.to_string(),
        };

        let map_category = self.document.skills.iter_mut().find(|(k, _)| canonicalize(k) == key);
        let plan_idx = self
            .document
            .skills_plan
            .as_ref()
            .and_then(|plan| plan.category_index(category));
        if map_category.is_none() && plan_idx.is_none() {
            return Err(SessionError::CategoryNotFound(category.to_string()));
        }

        let mut removed = 0;
        if let Some((_, skills)) = map_category {
            let before = skills.len();
            skills.retain(|s| s.identity() != identity);
            removed += before - skills.len();
        }
        if let (Some(plan), Some(idx)) = (self.document.skills_plan.as_mut(), plan_idx) {
            removed += plan.categories[idx].remove_skill(skill);
            self.document.skills = project_plan_to_flattened_skills(plan, &self.document.skills);
        }
        if removed == 0 {
            return Err(not_found());
        }
        self.touch();
        Ok(&self.document.skills)
    }

    /// Deletes a whole category from the plan and the skills map.
    pub fn remove_category(&mut self, category: &str) -> Result<&SkillsMap, SessionError> {
        let key = canonicalize(category);
        let from_plan = self
            .document
            .skills_plan
            .as_mut()
            .and_then(|plan| plan.remove_category(category))
            .is_some();
        let before = self.document.skills.len();
        self.document.skills.retain(|k, _| canonicalize(k) != key);
        let from_map = self.document.skills.len() != before;

        if !from_plan && !from_map {
            return Err(SessionError::CategoryNotFound(category.to_string()));
        }
        if let Some(plan) = self.document.skills_plan.as_ref() {
            self.document.skills = project_plan_to_flattened_skills(plan, &self.document.skills);
        }
        self.touch();
        info!(variant_id = %self.variant_id, category = %key, "Skill category removed");
        Ok(&self.document.skills)
    }

    /// Seeds a plan from the flattened skills when the document has none.
    pub fn materialize_plan(&mut self) -> &SkillTaxonomyPlan {
        if self.document.skills_plan.is_none() {
            let plan = seed_plan_from_skills(&self.document.skills);
            self.document.skills = project_plan_to_flattened_skills(&plan, &self.document.skills);
            info!(
                variant_id = %self.variant_id,
                categories = plan.categories.len(),
                "Materialized skill plan from flattened skills"
            );
            self.document.skills_plan = Some(plan);
            self.touch();
        }
        self.document.skills_plan.get_or_insert_with(SkillTaxonomyPlan::default)
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn organized_skills(&self) -> Vec<OrganizedCategory> {
        match &self.document.skills_plan {
            Some(plan) => project_plan_to_organized_view(plan, &self.document.skills),
            None => project_plan_to_organized_view(&seed_plan_from_skills(&self.document.skills), &self.document.skills),
        }
    }

    pub fn flattened_skills(&self) -> SkillsMap {
        match &self.document.skills_plan {
            Some(plan) => project_plan_to_flattened_skills(plan, &self.document.skills),
            None => self.document.skills.clone(),
        }
    }

    pub fn suggestions_for_section(&self, section: Option<Section>) -> Vec<Suggestion> {
        self.suggestions.list_pending(section).into_iter().cloned().collect()
    }

    pub fn suggestion_for_path(&self, path: &str) -> Option<Suggestion> {
        self.suggestions.find_for_target_path(path).cloned()
    }

    pub fn stats(&self) -> SuggestionStats {
        self.suggestions.stats()
    }
}

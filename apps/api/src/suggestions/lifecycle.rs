//! Suggestion list for one session: status transitions, queries and stats.
//!
//! `Pending → Accepted` and `Pending → Declined` are the only transitions.
//! Resolving a terminal suggestion again reports `AlreadyResolved` and changes
//! nothing, so a double-fired accept can never re-apply an effect.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::suggestion::{Section, Suggestion, SuggestionStatus};
use crate::suggestions::path::canonicalize_path;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Suggestion {0} not found")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied(SuggestionStatus),
    AlreadyResolved(SuggestionStatus),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionStats {
    pub section: Section,
    pub accepted: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuggestionStats {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub declined: usize,
    pub by_section: Vec<SectionStats>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionBook {
    items: Vec<Suggestion>,
}

impl SuggestionBook {
    /// Builds a book, keeping the first suggestion for any repeated id.
    pub fn new(suggestions: Vec<Suggestion>) -> Self {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            if seen.insert(suggestion.id.clone()) {
                items.push(suggestion);
            } else {
                warn!(suggestion_id = %suggestion.id, "Dropping suggestion with duplicate id");
            }
        }
        Self { items }
    }

    /// Replaces the list with a freshly generated batch. A suggestion already
    /// resolved under the same id keeps its terminal status.
    pub fn replace_all(&mut self, incoming: Vec<Suggestion>) {
        let mut next = SuggestionBook::new(incoming);
        for suggestion in &mut next.items {
            if let Some(previous) = self.get(&suggestion.id) {
                if previous.status.is_terminal() {
                    suggestion.status = previous.status;
                }
            }
        }
        *self = next;
    }

    pub fn all(&self) -> &[Suggestion] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Suggestion> {
        self.items.iter().find(|s| s.id == id)
    }

    /// Adds a suggestion unless its id is already tracked.
    pub fn push(&mut self, suggestion: Suggestion) -> bool {
        if self.get(&suggestion.id).is_some() {
            return false;
        }
        self.items.push(suggestion);
        true
    }

    /// Pending suggestions, optionally limited to one section, highest
    /// confidence first. Ties keep generation order.
    pub fn list_pending(&self, section: Option<Section>) -> Vec<&Suggestion> {
        let mut pending: Vec<&Suggestion> = self
            .items
            .iter()
            .filter(|s| s.status == SuggestionStatus::Pending)
            .filter(|s| section.map_or(true, |sec| s.section == sec))
            .collect();
        pending.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        pending
    }

    /// Moves a pending suggestion into `status`.
    pub fn resolve(&mut self, id: &str, status: SuggestionStatus) -> Result<Transition, LifecycleError> {
        let suggestion = self
            .items
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;

        if suggestion.status.is_terminal() || !status.is_terminal() {
            return Ok(Transition::AlreadyResolved(suggestion.status));
        }
        suggestion.status = status;
        info!(suggestion_id = %id, ?status, section = %suggestion.section, "Suggestion resolved");
        Ok(Transition::Applied(status))
    }

    /// The pending suggestion anchored exactly at `path`; the most confident
    /// one wins when several share it.
    pub fn find_for_target_path(&self, path: &str) -> Option<&Suggestion> {
        let path = canonicalize_path(path)?;
        self.items
            .iter()
            .filter(|s| s.status == SuggestionStatus::Pending)
            .filter(|s| s.target_path.as_deref() == Some(path.as_str()))
            .fold(None, |best: Option<&Suggestion>, s| match best {
                Some(b) if b.confidence >= s.confidence => Some(b),
                _ => Some(s),
            })
    }

    /// Drops a suggestion from the list outright.
    pub fn discard(&mut self, id: &str) -> Result<Suggestion, LifecycleError> {
        let idx = self
            .items
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;
        Ok(self.items.remove(idx))
    }

    pub fn stats(&self) -> SuggestionStats {
        let mut stats = SuggestionStats {
            total: self.items.len(),
            ..Default::default()
        };
        for section in Section::ALL {
            let in_section = self.items.iter().filter(|s| s.section == section);
            let mut entry = SectionStats {
                section,
                accepted: 0,
                pending: 0,
            };
            for s in in_section {
                match s.status {
                    SuggestionStatus::Pending => entry.pending += 1,
                    SuggestionStatus::Accepted => entry.accepted += 1,
                    SuggestionStatus::Declined => stats.declined += 1,
                }
            }
            stats.pending += entry.pending;
            stats.accepted += entry.accepted;
            stats.by_section.push(entry);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::suggestion::SuggestionType;

    fn make(id: &str, section: Section, path: Option<&str>, confidence: f64) -> Suggestion {
        Suggestion {
            id: id.into(),
            kind: SuggestionType::SummaryEdit,
            section,
            target_path: path.map(str::to_string),
            original: None,
            suggested: format!("text for {id}"),
            rationale: None,
            confidence,
            ats_keywords: vec![],
            status: SuggestionStatus::Pending,
            category_priority: None,
        }
    }

    fn book() -> SuggestionBook {
        SuggestionBook::new(vec![
            make("a", Section::Summary, Some("summary"), 40.0),
            make("b", Section::Experience, Some("experience.0.achievements.1"), 70.0),
            make("c", Section::Experience, Some("experience.0.achievements.1"), 90.0),
            make("d", Section::Skills, Some("skills.technical"), 70.0),
        ])
    }

    #[test]
    fn test_new_drops_duplicate_ids() {
        let book = SuggestionBook::new(vec![
            make("a", Section::Summary, None, 10.0),
            make("a", Section::Title, None, 20.0),
        ]);
        assert_eq!(book.len(), 1);
        assert_eq!(book.all()[0].section, Section::Summary);
    }

    #[test]
    fn test_list_pending_orders_by_confidence() {
        let book = book();
        let ids: Vec<_> = book.list_pending(None).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "d", "a"]);

        let ids: Vec<_> = book
            .list_pending(Some(Section::Experience))
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_resolve_is_terminal() {
        let mut book = book();
        assert_eq!(
            book.resolve("a", SuggestionStatus::Accepted).unwrap(),
            Transition::Applied(SuggestionStatus::Accepted)
        );
        assert_eq!(
            book.resolve("a", SuggestionStatus::Declined).unwrap(),
            Transition::AlreadyResolved(SuggestionStatus::Accepted)
        );
        assert_eq!(book.get("a").unwrap().status, SuggestionStatus::Accepted);
        assert!(book.list_pending(Some(Section::Summary)).is_empty());
    }

    #[test]
    fn test_resolve_unknown_id() {
        let mut book = book();
        assert_eq!(
            book.resolve("zz", SuggestionStatus::Declined),
            Err(LifecycleError::NotFound("zz".into()))
        );
    }

    #[test]
    fn test_find_for_target_path_prefers_confidence() {
        let mut book = book();
        assert_eq!(book.find_for_target_path("experience[0].bullets[1]").unwrap().id, "c");

        book.resolve("c", SuggestionStatus::Declined).unwrap();
        assert_eq!(book.find_for_target_path("experience.0.achievements.1").unwrap().id, "b");
        assert!(book.find_for_target_path("experience.0").is_none());
        assert!(book.find_for_target_path("").is_none());
    }

    #[test]
    fn test_replace_all_keeps_terminal_status() {
        let mut book = book();
        book.resolve("b", SuggestionStatus::Accepted).unwrap();
        book.replace_all(vec![
            make("b", Section::Experience, None, 50.0),
            make("e", Section::Title, None, 50.0),
        ]);
        assert_eq!(book.len(), 2);
        assert_eq!(book.get("b").unwrap().status, SuggestionStatus::Accepted);
        assert_eq!(book.get("e").unwrap().status, SuggestionStatus::Pending);
    }

    #[test]
    fn test_discard_and_stats() {
        let mut book = book();
        book.resolve("a", SuggestionStatus::Accepted).unwrap();
        book.resolve("b", SuggestionStatus::Declined).unwrap();
        assert_eq!(book.discard("d").unwrap().id, "d");
        assert!(book.discard("d").is_err());

        let stats = book.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.declined, 1);
        assert_eq!(stats.pending, 1);
        let experience = stats
            .by_section
            .iter()
            .find(|s| s.section == Section::Experience)
            .unwrap();
        assert_eq!((experience.accepted, experience.pending), (0, 1));
    }
}

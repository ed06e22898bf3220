//! Suggestion source: produces suggestions for a document and a target job.
//!
//! `AppState` holds an `Arc<dyn SuggestionSource>`; the LLM-backed source is
//! the production backend.

pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::document::DocumentSnapshot;
use crate::models::suggestion::Suggestion;
use crate::source::prompts::{SUGGESTION_PROMPT_TEMPLATE, SUGGESTION_SYSTEM};
use crate::suggestions::applicator::validate;

/// The job a variant is being tailored to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobContext {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl JobContext {
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.description.trim().is_empty()
    }
}

#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn generate(
        &self,
        document: &DocumentSnapshot,
        job: &JobContext,
    ) -> Result<Vec<Suggestion>, AppError>;
}

/// Suggestion source backed by Claude.
pub struct LlmSuggestionSource(pub LlmClient);

#[derive(Debug, Deserialize)]
struct RawSuggestionBatch {
    #[serde(default)]
    suggestions: Vec<Value>,
}

#[async_trait]
impl SuggestionSource for LlmSuggestionSource {
    async fn generate(
        &self,
        document: &DocumentSnapshot,
        job: &JobContext,
    ) -> Result<Vec<Suggestion>, AppError> {
        let prompt = build_prompt(document, job)?;
        let batch: RawSuggestionBatch = self
            .0
            .call_json(&prompt, SUGGESTION_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Suggestion generation failed: {e}")))?;

        let suggestions = normalize_batch(batch.suggestions);
        info!(count = suggestions.len(), job_title = %job.title, "Generated suggestions");
        Ok(suggestions)
    }
}

fn build_prompt(document: &DocumentSnapshot, job: &JobContext) -> Result<String, AppError> {
    let resume_json = serde_json::to_string_pretty(document)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize document: {e}")))?;
    Ok(SUGGESTION_PROMPT_TEMPLATE
        .replace("{job_title}", job.title.trim())
        .replace("{company}", job.company.as_deref().unwrap_or("an unnamed company"))
        .replace("{keywords}", &job.keywords.join(", "))
        .replace("{job_description}", job.description.trim())
        .replace("{resume_json}", &resume_json))
}

/// Parses raw model rows, dropping any that do not form an applicable suggestion.
fn normalize_batch(rows: Vec<Value>) -> Vec<Suggestion> {
    rows.into_iter()
        .filter_map(|row| {
            let suggestion: Suggestion = match serde_json::from_value(row) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Dropping unparseable suggestion: {e}");
                    return None;
                }
            };
            match validate(&suggestion) {
                Ok(()) => Some(suggestion),
                Err(e) => {
                    warn!("Dropping suggestion: {e}");
                    None
                }
            }
        })
        .collect()
}

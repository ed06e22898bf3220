use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::{DocumentSnapshot, SkillsMap};
use crate::models::suggestion::{Section, Suggestion};
use crate::session::engine::Resolution;
use crate::session::persistence::{PersistMode, PersistStatus};
use crate::session::registry::Mutation;
use crate::skills::projector::OrganizedCategory;
use crate::skills::SkillTaxonomyPlan;
use crate::source::JobContext;
use crate::state::AppState;
use crate::suggestions::lifecycle::SuggestionStats;

#[derive(Serialize)]
pub struct SessionResponse {
    pub variant_id: Uuid,
    pub revision: u64,
    pub document: DocumentSnapshot,
    pub stats: SuggestionStats,
    pub persistence: PersistStatus,
}

#[derive(Serialize)]
pub struct CloseSessionResponse {
    pub variant_id: Uuid,
    pub closed: bool,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub revision: u64,
    pub document: DocumentSnapshot,
}

#[derive(Serialize)]
pub struct SuggestionListResponse {
    pub suggestions: Vec<Suggestion>,
}

#[derive(Serialize)]
pub struct LookupResponse {
    pub suggestion: Option<Suggestion>,
}

#[derive(Serialize)]
pub struct ResolutionResponse {
    #[serde(flatten)]
    pub resolution: Resolution,
    pub document: DocumentSnapshot,
}

#[derive(Serialize)]
pub struct DiscardResponse {
    pub discarded: Suggestion,
}

#[derive(Serialize)]
pub struct OrganizedSkillsResponse {
    pub categories: Vec<OrganizedCategory>,
}

#[derive(Serialize)]
pub struct SkillsResponse {
    pub skills: SkillsMap,
}

#[derive(Serialize)]
pub struct PlanResponse {
    pub plan: SkillTaxonomyPlan,
    pub skills: SkillsMap,
}

#[derive(Deserialize)]
pub struct SectionQuery {
    pub section: Option<String>,
}

#[derive(Deserialize)]
pub struct PathQuery {
    pub path: String,
}

/// POST /api/v1/variants/:variant_id/session
pub async fn handle_open_session(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let persistence = handle.persist_status();
    let response = handle
        .read(|s| SessionResponse {
            variant_id,
            revision: s.revision(),
            document: s.document().clone(),
            stats: s.stats(),
            persistence,
        })
        .await;
    Ok(Json(response))
}

/// DELETE /api/v1/variants/:variant_id/session
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Json<CloseSessionResponse> {
    let closed = state.sessions.close(variant_id).await;
    Json(CloseSessionResponse { variant_id, closed })
}

/// GET /api/v1/variants/:variant_id/document
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let response = handle
        .read(|s| DocumentResponse {
            revision: s.revision(),
            document: s.document().clone(),
        })
        .await;
    Ok(Json(response))
}

/// PUT /api/v1/variants/:variant_id/document
pub async fn handle_replace_document(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<Mutation<DocumentResponse>>, AppError> {
    let document: DocumentSnapshot = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Invalid document: {e}")))?;
    let handle = state.sessions.open(variant_id).await?;
    let mutation = handle.mutate(PersistMode::Debounced, |s| {
        let document = s.replace_document(document).clone();
        Ok(DocumentResponse {
            revision: s.revision(),
            document,
        })
    })
    .await?;
    Ok(Json(mutation))
}

/// POST /api/v1/variants/:variant_id/suggestions/generate
pub async fn handle_generate_suggestions(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
    Json(job): Json<JobContext>,
) -> Result<Json<Mutation<SuggestionListResponse>>, AppError> {
    if job.is_empty() {
        return Err(AppError::Validation(
            "Job context needs a title or a description".to_string(),
        ));
    }
    let handle = state.sessions.open(variant_id).await?;
    let document = handle.read(|s| s.document().clone()).await;

    let generated = state.source.generate(&document, &job).await?;
    info!(%variant_id, count = generated.len(), "Loading generated suggestions");

    let mutation = handle.mutate(PersistMode::Immediate, |s| {
        s.load_suggestions(generated);
        Ok(SuggestionListResponse {
            suggestions: s.suggestions_for_section(None),
        })
    })
    .await?;
    Ok(Json(mutation))
}

/// GET /api/v1/variants/:variant_id/suggestions?section=
pub async fn handle_list_suggestions(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
    Query(params): Query<SectionQuery>,
) -> Result<Json<SuggestionListResponse>, AppError> {
    let section = params
        .section
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Section>())
        .transpose()
        .map_err(AppError::Validation)?;
    let handle = state.sessions.open(variant_id).await?;
    let suggestions = handle.read(|s| s.suggestions_for_section(section)).await;
    Ok(Json(SuggestionListResponse { suggestions }))
}

/// GET /api/v1/variants/:variant_id/suggestions/lookup?path=
pub async fn handle_lookup_suggestion(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
    Query(params): Query<PathQuery>,
) -> Result<Json<LookupResponse>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let suggestion = handle.read(|s| s.suggestion_for_path(&params.path)).await;
    Ok(Json(LookupResponse { suggestion }))
}

/// GET /api/v1/variants/:variant_id/suggestions/stats
pub async fn handle_suggestion_stats(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Result<Json<SuggestionStats>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    Ok(Json(handle.read(|s| s.stats()).await))
}

/// POST /api/v1/variants/:variant_id/suggestions/apply
pub async fn handle_apply_suggestion(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<Mutation<ResolutionResponse>>, AppError> {
    let suggestion: Suggestion = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Invalid suggestion: {e}")))?;
    let handle = state.sessions.open(variant_id).await?;
    let mutation = handle.mutate(PersistMode::Immediate, |s| {
        let resolution = s.apply(suggestion)?;
        Ok(ResolutionResponse {
            resolution,
            document: s.document().clone(),
        })
    })
    .await?;
    Ok(Json(mutation))
}

/// POST /api/v1/variants/:variant_id/suggestions/:id/accept
pub async fn handle_accept_suggestion(
    State(state): State<AppState>,
    Path((variant_id, id)): Path<(Uuid, String)>,
) -> Result<Json<Mutation<ResolutionResponse>>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let mutation = handle.mutate(PersistMode::Immediate, |s| {
        let resolution = s.accept(&id)?;
        Ok(ResolutionResponse {
            resolution,
            document: s.document().clone(),
        })
    })
    .await?;
    Ok(Json(mutation))
}

/// POST /api/v1/variants/:variant_id/suggestions/:id/decline
pub async fn handle_decline_suggestion(
    State(state): State<AppState>,
    Path((variant_id, id)): Path<(Uuid, String)>,
) -> Result<Json<Mutation<ResolutionResponse>>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let mutation = handle.mutate(PersistMode::Immediate, |s| {
        let resolution = s.decline(&id)?;
        Ok(ResolutionResponse {
            resolution,
            document: s.document().clone(),
        })
    })
    .await?;
    Ok(Json(mutation))
}

/// DELETE /api/v1/variants/:variant_id/suggestions/:id
pub async fn handle_discard_suggestion(
    State(state): State<AppState>,
    Path((variant_id, id)): Path<(Uuid, String)>,
) -> Result<Json<Mutation<DiscardResponse>>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let mutation = handle.mutate(PersistMode::Immediate, |s| {
        Ok(DiscardResponse {
            discarded: s.discard(&id)?,
        })
    })
    .await?;
    Ok(Json(mutation))
}

/// GET /api/v1/variants/:variant_id/skills/organized
pub async fn handle_organized_skills(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Result<Json<OrganizedSkillsResponse>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let categories = handle.read(|s| s.organized_skills()).await;
    Ok(Json(OrganizedSkillsResponse { categories }))
}

/// GET /api/v1/variants/:variant_id/skills/flattened
pub async fn handle_flattened_skills(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Result<Json<SkillsResponse>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let skills = handle.read(|s| s.flattened_skills()).await;
    Ok(Json(SkillsResponse { skills }))
}

/// POST /api/v1/variants/:variant_id/skills/plan
pub async fn handle_materialize_plan(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Result<Json<Mutation<PlanResponse>>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let mutation = handle.mutate(PersistMode::Immediate, |s| {
        let plan = s.materialize_plan().clone();
        Ok(PlanResponse {
            plan,
            skills: s.document().skills.clone(),
        })
    })
    .await?;
    Ok(Json(mutation))
}

/// DELETE /api/v1/variants/:variant_id/skills/categories/:category
pub async fn handle_remove_category(
    State(state): State<AppState>,
    Path((variant_id, category)): Path<(Uuid, String)>,
) -> Result<Json<Mutation<SkillsResponse>>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let mutation = handle.mutate(PersistMode::Immediate, |s| {
        Ok(SkillsResponse {
            skills: s.remove_category(&category)?.clone(),
        })
    })
    .await?;
    Ok(Json(mutation))
}

/// DELETE /api/v1/variants/:variant_id/skills/categories/:category/:skill
pub async fn handle_remove_skill(
    State(state): State<AppState>,
    Path((variant_id, category, skill)): Path<(Uuid, String, String)>,
) -> Result<Json<Mutation<SkillsResponse>>, AppError> {
    let handle = state.sessions.open(variant_id).await?;
    let mutation = handle.mutate(PersistMode::Debounced, |s| {
        Ok(SkillsResponse {
            skills: s.remove_skill(&category, &skill)?.clone(),
        })
    })
    .await?;
    Ok(Json(mutation))
}

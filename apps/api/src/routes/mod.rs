pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session and document
        .route(
            "/api/v1/variants/:variant_id/session",
            post(handlers::handle_open_session).delete(handlers::handle_close_session),
        )
        .route(
            "/api/v1/variants/:variant_id/document",
            get(handlers::handle_get_document).put(handlers::handle_replace_document),
        )
        // Suggestions
        .route(
            "/api/v1/variants/:variant_id/suggestions",
            get(handlers::handle_list_suggestions),
        )
        .route(
            "/api/v1/variants/:variant_id/suggestions/generate",
            post(handlers::handle_generate_suggestions),
        )
        .route(
            "/api/v1/variants/:variant_id/suggestions/lookup",
            get(handlers::handle_lookup_suggestion),
        )
        .route(
            "/api/v1/variants/:variant_id/suggestions/stats",
            get(handlers::handle_suggestion_stats),
        )
        .route(
            "/api/v1/variants/:variant_id/suggestions/apply",
            post(handlers::handle_apply_suggestion),
        )
        .route(
            "/api/v1/variants/:variant_id/suggestions/:id",
            delete(handlers::handle_discard_suggestion),
        )
        .route(
            "/api/v1/variants/:variant_id/suggestions/:id/accept",
            post(handlers::handle_accept_suggestion),
        )
        .route(
            "/api/v1/variants/:variant_id/suggestions/:id/decline",
            post(handlers::handle_decline_suggestion),
        )
        // Skills
        .route(
            "/api/v1/variants/:variant_id/skills/organized",
            get(handlers::handle_organized_skills),
        )
        .route(
            "/api/v1/variants/:variant_id/skills/flattened",
            get(handlers::handle_flattened_skills),
        )
        .route(
            "/api/v1/variants/:variant_id/skills/plan",
            post(handlers::handle_materialize_plan),
        )
        .route(
            "/api/v1/variants/:variant_id/skills/categories/:category",
            delete(handlers::handle_remove_category),
        )
        .route(
            "/api/v1/variants/:variant_id/skills/categories/:category/:skill",
            delete(handlers::handle_remove_skill),
        )
        .with_state(state)
}

use std::sync::Arc;

use crate::session::SessionRegistry;
use crate::source::SuggestionSource;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Open reconciliation sessions, one per variant.
    pub sessions: Arc<SessionRegistry>,
    /// Pluggable suggestion source. Default: LlmSuggestionSource.
    pub source: Arc<dyn SuggestionSource>,
}

//! Persistence store contract: `load(variant)` / `save(variant, snapshot)`.
//!
//! Writes carry the session revision. A store must reject a write whose
//! revision is lower than the one it already holds, so out-of-order
//! completion can never leave an older snapshot as the final state.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::document::DocumentSnapshot;
use crate::models::suggestion::Suggestion;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stale write rejected (revision {attempted})")]
    StaleWrite { attempted: u64 },
}

/// Everything persisted for one variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredVariant {
    pub revision: u64,
    pub document: DocumentSnapshot,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

#[async_trait]
pub trait VariantStore: Send + Sync {
    async fn load(&self, variant_id: Uuid) -> Result<Option<StoredVariant>, StoreError>;

    async fn save(&self, variant_id: Uuid, variant: &StoredVariant) -> Result<(), StoreError>;
}

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::document::DocumentSnapshot;
use crate::models::suggestion::Suggestion;
use crate::models::variant::VariantRow;
use crate::store::{StoreError, StoredVariant, VariantStore};

/// `resume_variants`-backed store.
#[derive(Clone)]
pub struct PgVariantStore {
    pool: PgPool,
}

impl PgVariantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the variants table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resume_variants (
                id          UUID PRIMARY KEY,
                revision    BIGINT NOT NULL DEFAULT 0,
                document    JSONB NOT NULL,
                suggestions JSONB NOT NULL DEFAULT '[]'::jsonb,
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        info!("resume_variants table ready");
        Ok(())
    }
}

/// Suggestion rows that no longer parse are dropped rather than failing the load.
fn decode_suggestions(value: Value) -> Vec<Suggestion> {
    match value {
        Value::Array(rows) => rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<Suggestion>(row) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!("Skipping stored suggestion that failed to parse: {e}");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl VariantStore for PgVariantStore {
    async fn load(&self, variant_id: Uuid) -> Result<Option<StoredVariant>, StoreError> {
        let row: Option<VariantRow> = sqlx::query_as(
            "SELECT id, revision, document, suggestions, updated_at FROM resume_variants WHERE id = $1",
        )
        .bind(variant_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let document: DocumentSnapshot = serde_json::from_value(row.document)?;
        debug!(variant_id = %row.id, revision = row.revision, updated_at = %row.updated_at, "Loaded variant");
        Ok(Some(StoredVariant {
            revision: u64::try_from(row.revision).unwrap_or_default(),
            document,
            suggestions: decode_suggestions(row.suggestions),
        }))
    }

    async fn save(&self, variant_id: Uuid, variant: &StoredVariant) -> Result<(), StoreError> {
        let revision = i64::try_from(variant.revision).unwrap_or(i64::MAX);
        let document = serde_json::to_value(&variant.document)?;
        let suggestions = serde_json::to_value(&variant.suggestions)?;

        // Upsert that only lands when it is at least as new as the stored row.
        let result = sqlx::query(
            r#"
            INSERT INTO resume_variants (id, revision, document, suggestions, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (id) DO UPDATE
               SET revision = EXCLUDED.revision,
                   document = EXCLUDED.document,
                   suggestions = EXCLUDED.suggestions,
                   updated_at = now()
             WHERE resume_variants.revision <= EXCLUDED.revision
            "#,
        )
        .bind(variant_id)
        .bind(revision)
        .bind(document)
        .bind(suggestions)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::StaleWrite {
                attempted: variant.revision,
            });
        }
        debug!(%variant_id, revision, "Saved variant");
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One row of `resume_variants`. `document` and `suggestions` are stored as
/// the serialized `DocumentSnapshot` and suggestion list.
#[derive(Debug, Clone, FromRow)]
pub struct VariantRow {
    pub id: Uuid,
    pub revision: i64,
    pub document: Value,
    pub suggestions: Value,
    pub updated_at: DateTime<Utc>,
}

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::store::postgres::PgVariantStore;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Builds the variant store on `pool`, creating its table if needed.
pub async fn create_variant_store(pool: PgPool) -> Result<PgVariantStore> {
    let store = PgVariantStore::new(pool);
    store.ensure_schema().await?;
    Ok(store)
}

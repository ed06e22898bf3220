use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::store::{StoreError, StoredVariant, VariantStore};

/// Test store with the same stale-write rule as Postgres.
#[derive(Default)]
pub struct InMemoryVariantStore {
    variants: Mutex<HashMap<Uuid, StoredVariant>>,
    saves: Mutex<Vec<(Uuid, u64)>>,
    failing: AtomicBool,
}

impl InMemoryVariantStore {
    pub fn with_variant(variant_id: Uuid, variant: StoredVariant) -> Self {
        let store = Self::default();
        store.variants.lock().unwrap().insert(variant_id, variant);
        store
    }

    /// Makes every following save fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, variant_id: Uuid) -> Option<StoredVariant> {
        self.variants.lock().unwrap().get(&variant_id).cloned()
    }

    /// Revisions of every successful save, in order.
    pub fn saved_revisions(&self) -> Vec<u64> {
        self.saves.lock().unwrap().iter().map(|(_, r)| *r).collect()
    }
}

#[async_trait]
impl VariantStore for InMemoryVariantStore {
    async fn load(&self, variant_id: Uuid) -> Result<Option<StoredVariant>, StoreError> {
        Ok(self.get(variant_id))
    }

    async fn save(&self, variant_id: Uuid, variant: &StoredVariant) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut variants = self.variants.lock().unwrap();
        if let Some(current) = variants.get(&variant_id) {
            if current.revision > variant.revision {
                return Err(StoreError::StaleWrite {
                    attempted: variant.revision,
                });
            }
        }
        variants.insert(variant_id, variant.clone());
        self.saves.lock().unwrap().push((variant_id, variant.revision));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_lower_revision() {
        let id = Uuid::new_v4();
        let store = InMemoryVariantStore::default();
        let newer = StoredVariant {
            revision: 5,
            ..Default::default()
        };
        store.save(id, &newer).await.unwrap();

        let older = StoredVariant {
            revision: 3,
            ..Default::default()
        };
        assert!(matches!(
            store.save(id, &older).await,
            Err(StoreError::StaleWrite { attempted: 3 })
        ));
        assert_eq!(store.get(id).unwrap().revision, 5);
    }
}

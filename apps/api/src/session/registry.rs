//! Open sessions, one per variant.
//!
//! A mutation marks the session in flight and is rejected with `Busy` while
//! another one is running; reads only wait for the session lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::engine::{ReconciliationSession, SessionError};
use crate::session::persistence::{PersistMode, PersistStatus, PersistenceBridge};
use crate::store::VariantStore;

/// How long an immediate mutation waits for its write before responding.
const IMMEDIATE_WRITE_WAIT: Duration = Duration::from_secs(2);

/// A mutation's value plus the latest persistence warning, if any.
///
/// For immediate mutations the warning reflects this mutation's own write
/// when it finished within `IMMEDIATE_WRITE_WAIT`. Debounced writes land
/// later, so their failures show up on a following response.
#[derive(Debug, Serialize)]
pub struct Mutation<R> {
    #[serde(flatten)]
    pub value: R,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_warning: Option<String>,
}

pub struct SessionHandle {
    session: Mutex<ReconciliationSession>,
    in_flight: AtomicBool,
    bridge: PersistenceBridge,
}

/// Clears the in-flight mark when the mutation ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionHandle {
    fn new(session: ReconciliationSession, bridge: PersistenceBridge) -> Self {
        Self {
            session: Mutex::new(session),
            in_flight: AtomicBool::new(false),
            bridge,
        }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&ReconciliationSession) -> R) -> R {
        let session = self.session.lock().await;
        f(&session)
    }

    fn begin_mutation(&self) -> Result<InFlight<'_>, AppError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| AppError::Busy("Another change to this document is in progress".to_string()))?;
        Ok(InFlight(&self.in_flight))
    }

    /// Runs `f` on the session. When it changed anything, the new snapshot is
    /// handed to the persistence bridge with `mode`; immediate snapshots are
    /// given a short wait so a failed write is reported to this caller.
    pub async fn mutate<R>(
        &self,
        mode: PersistMode,
        f: impl FnOnce(&mut ReconciliationSession) -> Result<R, SessionError>,
    ) -> Result<Mutation<R>, AppError> {
        let _in_flight = self.begin_mutation()?;

        let (value, submitted) = {
            let mut session = self.session.lock().await;
            let before = session.revision();
            let value = f(&mut *session)?;
            let submitted = if session.revision() != before {
                debug!(variant_id = %session.variant_id(), revision = session.revision(), ?mode, "Handing snapshot to persistence");
                self.bridge.submit(session.snapshot(), mode);
                Some(session.revision())
            } else {
                None
            };
            (value, submitted)
        };

        if let (Some(revision), PersistMode::Immediate) = (submitted, mode) {
            self.bridge.settled(revision, IMMEDIATE_WRITE_WAIT).await;
        }

        Ok(Mutation {
            value,
            persist_warning: self.bridge.warning(),
        })
    }

    pub fn persist_status(&self) -> PersistStatus {
        self.bridge.status()
    }
}

pub struct SessionRegistry {
    store: Arc<dyn VariantStore>,
    debounce: Duration,
    sessions: RwLock<HashMap<Uuid, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn VariantStore>, debounce: Duration) -> Self {
        Self {
            store,
            debounce,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the open session for `variant_id`, loading it from the store
    /// on first use.
    pub async fn open(&self, variant_id: Uuid) -> Result<Arc<SessionHandle>, AppError> {
        if let Some(handle) = self.sessions.read().await.get(&variant_id) {
            return Ok(handle.clone());
        }

        let stored = self
            .store
            .load(variant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Variant {variant_id} not found")))?;

        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(variant_id).or_insert_with(|| {
            info!(%variant_id, revision = stored.revision, "Opened reconciliation session");
            let bridge = PersistenceBridge::spawn(variant_id, self.store.clone(), self.debounce);
            Arc::new(SessionHandle::new(ReconciliationSession::new(variant_id, stored), bridge))
        });
        Ok(handle.clone())
    }

    /// Forgets the session for `variant_id` and stops its writer after any
    /// pending snapshot is flushed. Returns false when no session was open.
    ///
    /// If a request still holds the session, the flush happens when that
    /// request lets go of it.
    pub async fn close(&self, variant_id: Uuid) -> bool {
        let Some(handle) = self.sessions.write().await.remove(&variant_id) else {
            return false;
        };
        info!(%variant_id, "Closed reconciliation session");
        match Arc::try_unwrap(handle) {
            Ok(handle) => handle.bridge.close().await,
            Err(_) => debug!(%variant_id, "Session still in use; writer stops when it is released"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::DocumentSnapshot;
    use crate::store::memory::InMemoryVariantStore;
    use crate::store::StoredVariant;

    fn registry_with(id: Uuid) -> (SessionRegistry, Arc<InMemoryVariantStore>) {
        let store = Arc::new(InMemoryVariantStore::with_variant(
            id,
            StoredVariant {
                revision: 1,
                document: DocumentSnapshot {
                    title: "Engineer".into(),
                    ..Default::default()
                },
                suggestions: vec![],
            },
        ));
        (SessionRegistry::new(store.clone(), Duration::from_millis(1500)), store)
    }

    #[tokio::test]
    async fn test_open_loads_once() {
        let id = Uuid::new_v4();
        let (registry, _) = registry_with(id);
        let first = registry.open(id).await.unwrap();
        let second = registry.open(id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.read(|s| s.document().title.clone()).await, "Engineer");
    }

    #[tokio::test]
    async fn test_open_unknown_variant() {
        let (registry, _) = registry_with(Uuid::new_v4());
        assert!(matches!(registry.open(Uuid::new_v4()).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_mutation_is_rejected() {
        let id = Uuid::new_v4();
        let (registry, _) = registry_with(id);
        let handle = registry.open(id).await.unwrap();

        let in_flight = handle.begin_mutation().unwrap();
        let result = handle.mutate(PersistMode::Immediate, |s| s.decline("any")).await;
        assert!(matches!(result, Err(AppError::Busy(_))));
        drop(in_flight);

        let result = handle.mutate(PersistMode::Immediate, |s| s.decline("any")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pending_read_does_not_make_mutation_busy() {
        let id = Uuid::new_v4();
        let (registry, _) = registry_with(id);
        let handle = registry.open(id).await.unwrap();

        let reader = handle.clone();
        let guard = handle.session.lock().await;
        let read = tokio::spawn(async move { reader.read(|s| s.revision()).await });
        let mutation = {
            let handle = handle.clone();
            tokio::spawn(async move {
                handle
                    .mutate(PersistMode::Debounced, |s| {
                        let mut doc = s.document().clone();
                        doc.title = "Lead Engineer".into();
                        s.replace_document(doc);
                        Ok(())
                    })
                    .await
                    .map(|_| ())
            })
        };
        tokio::task::yield_now().await;
        drop(guard);

        assert!(read.await.unwrap() >= 1);
        assert!(mutation.await.unwrap().is_ok());
        assert_eq!(handle.read(|s| s.document().title.clone()).await, "Lead Engineer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_persists_only_on_change() {
        let id = Uuid::new_v4();
        let (registry, store) = registry_with(id);
        let handle = registry.open(id).await.unwrap();

        let _ = handle.mutate(PersistMode::Immediate, |s| s.decline("missing")).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.saved_revisions().is_empty());

        handle
            .mutate(PersistMode::Debounced, |s| {
                let mut doc = s.document().clone();
                doc.title = "Staff Engineer".into();
                s.replace_document(doc);
                Ok(())
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(store.saved_revisions(), vec![2]);
        assert_eq!(store.get(id).unwrap().document.title, "Staff Engineer");
        assert_eq!(handle.persist_status().last_saved_revision, Some(2));
    }

    #[tokio::test]
    async fn test_immediate_failure_reported_to_its_caller() {
        let id = Uuid::new_v4();
        let (registry, store) = registry_with(id);
        let handle = registry.open(id).await.unwrap();
        store.set_failing(true);

        let mutation = handle
            .mutate(PersistMode::Immediate, |s| {
                let mut doc = s.document().clone();
                doc.summary = "Ships reliable services.".into();
                s.replace_document(doc);
                Ok(())
            })
            .await
            .unwrap();
        assert!(mutation.persist_warning.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_and_reopen_reloads() {
        let id = Uuid::new_v4();
        let (registry, store) = registry_with(id);
        let handle = registry.open(id).await.unwrap();

        handle
            .mutate(PersistMode::Debounced, |s| {
                let mut doc = s.document().clone();
                doc.title = "Principal Engineer".into();
                s.replace_document(doc);
                Ok(())
            })
            .await
            .unwrap();
        drop(handle);
        assert!(store.saved_revisions().is_empty());

        assert!(registry.close(id).await);
        assert_eq!(store.saved_revisions(), vec![2]);
        assert!(!registry.close(id).await);

        let reopened = registry.open(id).await.unwrap();
        assert_eq!(reopened.read(|s| s.revision()).await, 2);
        assert_eq!(reopened.read(|s| s.document().title.clone()).await, "Principal Engineer");
    }
}

//! Persistence bridge: hands the latest snapshot of a session to the store.
//!
//! One writer task per session drains a channel of snapshots. Debounced
//! snapshots are coalesced until the window elapses with no newer edit;
//! immediate snapshots are written at once and supersede anything pending.
//! Failures are logged and kept as a warning for the caller; the engine
//! never retries a write itself.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::{StoreError, StoredVariant, VariantStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Suggestion decisions: written without delay.
    Immediate,
    /// Incidental edits: coalesced over the debounce window.
    Debounced,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistStatus {
    /// Highest revision the writer has finished with, saved or not.
    pub last_attempted_revision: Option<u64>,
    pub last_saved_revision: Option<u64>,
    pub last_error: Option<String>,
}

struct PersistRequest {
    snapshot: StoredVariant,
    mode: PersistMode,
}

pub struct PersistenceBridge {
    tx: mpsc::UnboundedSender<PersistRequest>,
    status: watch::Receiver<PersistStatus>,
    writer: JoinHandle<()>,
}

impl PersistenceBridge {
    /// Starts the writer task for `variant_id`. It runs until the bridge is
    /// dropped, flushing any pending debounced snapshot on the way out.
    pub fn spawn(variant_id: Uuid, store: Arc<dyn VariantStore>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(PersistStatus::default());
        let writer = tokio::spawn(run_writer(variant_id, store, debounce, rx, status_tx));
        Self { tx, status, writer }
    }

    pub fn submit(&self, snapshot: StoredVariant, mode: PersistMode) {
        let revision = snapshot.revision;
        if self.tx.send(PersistRequest { snapshot, mode }).is_err() {
            warn!(revision, "Persistence writer has stopped; snapshot not handed off");
        }
    }

    pub fn status(&self) -> PersistStatus {
        self.status.borrow().clone()
    }

    /// Latest write failure, if the last attempt failed.
    pub fn warning(&self) -> Option<String> {
        self.status.borrow().last_error.clone()
    }

    /// Waits up to `within` for the writer to finish with `revision`.
    /// Returns false when the write is still in flight.
    pub async fn settled(&self, revision: u64, within: Duration) -> bool {
        let mut status = self.status.clone();
        let done = status.wait_for(|s| s.last_attempted_revision.is_some_and(|r| r >= revision));
        let settled = matches!(timeout(within, done).await, Ok(Ok(_)));
        if !settled {
            debug!(revision, "Snapshot write still in flight");
        }
        settled
    }

    /// Stops the writer once it has flushed anything pending.
    pub async fn close(self) {
        let Self { tx, writer, .. } = self;
        drop(tx);
        if let Err(e) = writer.await {
            warn!("Persistence writer ended abnormally: {e}");
        }
    }
}

async fn run_writer(
    variant_id: Uuid,
    store: Arc<dyn VariantStore>,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<PersistRequest>,
    status: watch::Sender<PersistStatus>,
) {
    let mut pending: Option<StoredVariant> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            request = rx.recv() => match request {
                Some(PersistRequest { snapshot, mode: PersistMode::Immediate }) => {
                    pending = None;
                    deadline = None;
                    write(variant_id, store.as_ref(), &snapshot, &status).await;
                }
                Some(PersistRequest { snapshot, mode: PersistMode::Debounced }) => {
                    pending = Some(snapshot);
                    deadline = Some(Instant::now() + debounce);
                }
                None => {
                    if let Some(snapshot) = pending.take() {
                        write(variant_id, store.as_ref(), &snapshot, &status).await;
                    }
                    break;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                if let Some(snapshot) = pending.take() {
                    write(variant_id, store.as_ref(), &snapshot, &status).await;
                }
            }
        }
    }
}

async fn write(
    variant_id: Uuid,
    store: &dyn VariantStore,
    snapshot: &StoredVariant,
    status: &watch::Sender<PersistStatus>,
) {
    let revision = snapshot.revision;
    let outcome = store.save(variant_id, snapshot).await;
    status.send_modify(|s| {
        s.last_attempted_revision = s.last_attempted_revision.max(Some(revision));
        match outcome {
            Ok(()) => {
                info!(%variant_id, revision, "Persisted variant snapshot");
                s.last_saved_revision = Some(revision);
                s.last_error = None;
            }
            Err(StoreError::StaleWrite { attempted }) => {
                warn!(%variant_id, attempted, "Store already holds a newer snapshot; write skipped");
            }
            Err(e) => {
                warn!(%variant_id, revision, "Failed to persist variant snapshot: {e}");
                s.last_error = Some(e.to_string());
            }
        }
    });
}

mod approval;
mod conflict;
mod error;
mod queries;
mod submit;
mod suggest;

pub use conflict::find_conflict;
pub use error::EngineError;
pub use submit::{ConflictReport, SubmitOutcome};

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info, warn};

use crate::catalog::ResourceCatalog;
use crate::clock::Clock;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedResourceState = Arc<RwLock<ResourceState>>;

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit:
/// block for the first append, drain whatever else is already queued, then
/// one flush + fsync for the whole batch.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let WalCommand::Append { event, response } = cmd else {
            handle_non_append(&mut wal, cmd);
            continue;
        };
        let mut batch = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }

        metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
        let flush_start = std::time::Instant::now();
        let result = flush_batch(&mut wal, &batch);
        metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            warn!(
                error = %e,
                batch = batch.len(),
                path = %wal.path().display(),
                "WAL flush failed"
            );
        }
        for (_, tx) in batch {
            let r = match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            };
            let _ = tx.send(r);
        }

        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

/// Append and sync the batch. On any failure the unflushed bytes are
/// discarded, so events whose callers saw an error never reach disk later.
fn flush_batch(
    wal: &mut Wal,
    batch: &[(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let result = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event))
        .and_then(|()| wal.flush_sync());
    if result.is_err() {
        if let Err(e) = wal.discard_unflushed() {
            warn!(
                error = %e,
                path = %wal.path().display(),
                "WAL rollback failed, appends refused"
            );
        }
    }
    result
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let _ = response.send(wal.compact(&events));
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => {}
    }
}

/// Apply an event to a hall's state. Caller holds the lock.
fn apply_to_resource(
    rs: &mut ResourceState,
    event: &Event,
    index: &DashMap<ReservationId, ResourceId>,
) {
    match event {
        Event::Submitted { reservation } => {
            index.insert(reservation.id, reservation.resource_id.clone());
            rs.insert_reservation(reservation.clone());
        }
        Event::Decided { entries, .. } => {
            for entry in entries {
                rs.record_decision(entry);
            }
        }
        Event::Snapshot {
            resource_id,
            reservations,
            decisions,
        } => {
            *rs = ResourceState::new();
            for r in reservations {
                index.insert(r.id, resource_id.clone());
                rs.insert_reservation(r.clone());
            }
            rs.decisions = decisions.clone();
        }
    }
}

/// Write event to WAL via the background group-commit writer.
async fn wal_append(wal_tx: &mpsc::Sender<WalCommand>, event: &Event) -> Result<(), EngineError> {
    let (tx, rx) = oneshot::channel();
    wal_tx
        .send(WalCommand::Append {
            event: event.clone(),
            response: tx,
        })
        .await
        .map_err(|_| EngineError::StoreFailure("WAL writer shut down".into()))?;
    rx.await
        .map_err(|_| EngineError::StoreFailure("WAL writer dropped response".into()))?
        .map_err(|e| EngineError::StoreFailure(e.to_string()))
}

/// The booking arbitration engine: one lock per hall, every change written
/// to the WAL before it becomes visible.
pub struct Engine {
    state: DashMap<ResourceId, SharedResourceState>,
    /// Reverse lookup: reservation id → hall.
    reservation_index: Arc<DashMap<ReservationId, ResourceId>>,
    /// Held shared by every mutation and exclusively by compaction, so a
    /// snapshot never misses an in-flight commit.
    commit_gate: Arc<RwLock<()>>,
    wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    catalog: Arc<dyn ResourceCatalog>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Replay the WAL at `wal_path` and start its writer task. Must run inside
    /// a tokio runtime.
    pub fn new(
        wal_path: PathBuf,
        catalog: Arc<dyn ResourceCatalog>,
        clock: Arc<dyn Clock>,
        notify: Arc<NotifyHub>,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let reservation_index = DashMap::new();
        let mut halls: HashMap<ResourceId, ResourceState> = HashMap::new();
        for event in &events {
            let rs = halls.entry(event.resource_id().clone()).or_default();
            apply_to_resource(rs, event, &reservation_index);
        }

        info!(
            path = %wal_path.display(),
            events = events.len(),
            halls = halls.len(),
            reservations = reservation_index.len(),
            "engine replayed WAL"
        );

        Ok(Self {
            state: halls
                .into_iter()
                .map(|(id, rs)| (id, Arc::new(RwLock::new(rs))))
                .collect(),
            reservation_index: Arc::new(reservation_index),
            commit_gate: Arc::new(RwLock::new(())),
            wal_tx,
            notify,
            catalog,
            clock,
        })
    }

    pub fn now_ms(&self) -> Ms {
        self.clock.now_ms()
    }

    /// Shared permit every mutation holds for its whole duration.
    pub(super) async fn commit_permit(&self) -> OwnedRwLockReadGuard<()> {
        self.commit_gate.clone().read_owned().await
    }

    /// WAL-append, then apply, then notify. Nothing is applied if the append fails.
    ///
    /// The commit runs on its own task holding the permit and the hall lock, so
    /// a caller that stops waiting cannot leave an appended event unapplied.
    /// The hall guard is handed back once the event is visible.
    pub(super) async fn persist_and_apply(
        &self,
        permit: OwnedRwLockReadGuard<()>,
        mut guard: OwnedRwLockWriteGuard<ResourceState>,
        event: Event,
    ) -> Result<OwnedRwLockWriteGuard<ResourceState>, EngineError> {
        let wal_tx = self.wal_tx.clone();
        let index = self.reservation_index.clone();
        let notify = self.notify.clone();
        let commit = tokio::spawn(async move {
            let _permit = permit;
            wal_append(&wal_tx, &event).await?;
            apply_to_resource(&mut guard, &event, &index);
            notify.send(&event);
            Ok::<_, EngineError>(guard)
        });
        commit
            .await
            .map_err(|e| EngineError::StoreFailure(format!("commit task failed: {e}")))?
    }

    pub(super) fn get_resource(&self, id: &ResourceId) -> Option<SharedResourceState> {
        self.state.get(id).map(|e| e.value().clone())
    }

    /// State for a hall, created empty on first use.
    pub(super) fn resource_or_default(&self, id: &ResourceId) -> SharedResourceState {
        self.state
            .entry(id.clone())
            .or_insert_with(|| Arc::new(RwLock::new(ResourceState::new())))
            .clone()
    }

    pub(super) fn resource_for_reservation(&self, id: &ReservationId) -> Option<ResourceId> {
        self.reservation_index.get(id).map(|e| e.value().clone())
    }

    /// Lookup reservation → hall, acquire the hall's write lock.
    pub(super) async fn resolve_reservation_write(
        &self,
        id: &ReservationId,
    ) -> Result<(ResourceId, OwnedRwLockWriteGuard<ResourceState>), EngineError> {
        let resource_id = self
            .resource_for_reservation(id)
            .ok_or(EngineError::NotFound(*id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::NotFound(*id))?;
        Ok((resource_id, rs.write_owned().await))
    }

    /// Rewrite the WAL as one snapshot per hall.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _exclusive = self.commit_gate.write().await;

        let mut resource_ids: Vec<ResourceId> =
            self.state.iter().map(|e| e.key().clone()).collect();
        resource_ids.sort();
        let mut events = Vec::with_capacity(resource_ids.len());
        for resource_id in resource_ids {
            let Some(rs) = self.get_resource(&resource_id) else {
                continue;
            };
            let guard = rs.read().await;
            events.push(Event::Snapshot {
                resource_id,
                reservations: guard.reservations.clone(),
                decisions: guard.decisions.clone(),
            });
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::StoreFailure("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::StoreFailure("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::StoreFailure(e.to_string()))?;
        debug!("WAL compacted");
        Ok(())
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

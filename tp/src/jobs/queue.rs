//! JobWriteQueue - per-job serialized writes with collapsing

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use jobstore::{JobStore, JobUpdate, StoreResult, WriteOutcome};
use tracing::{debug, warn};

/// Write state for one job id
struct Slot {
    /// The single update waiting behind the in-flight one
    pending: Option<JobUpdate>,
    /// A drain task is alive for this job
    draining: bool,
    /// Flushes in progress; while non-zero, enqueued updates are dropped
    flushing: usize,
    /// Bumped by every flush; a drain started before it drops its first update
    epoch: u64,
    /// Held for the duration of every store write
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            pending: None,
            draining: false,
            flushing: 0,
            epoch: 0,
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn is_idle(&self) -> bool {
        !self.draining && self.flushing == 0 && self.pending.is_none()
    }
}

/// Serializes writes to job records
///
/// At most one write per job is in flight. Progress updates that arrive
/// while a write is running collapse into a single pending update, so only
/// the newest one is written next. `flush` is for terminal writes: nothing
/// enqueued before or during it can land after it.
#[derive(Clone)]
pub struct JobWriteQueue {
    store: Arc<dyn JobStore>,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl JobWriteQueue {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Queue a write without waiting for it
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, job_id: &str, update: JobUpdate) {
        let mut slots = self.slots();
        let slot = slots.entry(job_id.to_string()).or_insert_with(Slot::new);

        if slot.flushing > 0 {
            debug!(%job_id, "JobWriteQueue::enqueue: flush in progress, dropping update");
            return;
        }

        if slot.draining {
            let replaced = slot.pending.replace(update).is_some();
            debug!(%job_id, replaced, "JobWriteQueue::enqueue: write in flight, pending replaced");
            return;
        }

        slot.draining = true;
        let epoch = slot.epoch;
        debug!(%job_id, "JobWriteQueue::enqueue: starting drain");
        tokio::spawn(self.clone().drain(job_id.to_string(), update, epoch));
    }

    async fn drain(self, job_id: String, first: JobUpdate, epoch: u64) {
        let mut first = Some(first);
        loop {
            let gate = match self.slots().get(&job_id) {
                Some(slot) => slot.gate.clone(),
                None => return,
            };
            let _write = gate.lock().await;

            let update = {
                let mut slots = self.slots();
                let Some(slot) = slots.get_mut(&job_id) else {
                    return;
                };
                let carried = first.take().filter(|_| slot.epoch == epoch);
                match carried.or_else(|| slot.pending.take()) {
                    Some(update) => update,
                    None => {
                        slot.draining = false;
                        if slot.is_idle() {
                            slots.remove(&job_id);
                        }
                        debug!(%job_id, "JobWriteQueue::drain: idle");
                        return;
                    }
                }
            };

            match self.store.update(&job_id, update).await {
                Ok(WriteOutcome::Applied) => {}
                Ok(WriteOutcome::Stale { current_generation }) => {
                    debug!(%job_id, ?current_generation, "JobWriteQueue::drain: stale write skipped");
                }
                Err(e) => warn!(%job_id, error = %e, "JobWriteQueue::drain: write failed"),
            }
        }
    }

    /// Write a terminal update once everything queued before it has settled
    ///
    /// Any pending update is discarded. Returns after the final write landed.
    pub async fn flush(&self, job_id: &str, final_update: JobUpdate) -> StoreResult<WriteOutcome> {
        debug!(%job_id, status = ?final_update.status, "JobWriteQueue::flush: called");
        let gate = {
            let mut slots = self.slots();
            let slot = slots.entry(job_id.to_string()).or_insert_with(Slot::new);
            slot.flushing += 1;
            slot.epoch += 1;
            if slot.pending.take().is_some() {
                debug!(%job_id, "JobWriteQueue::flush: discarded pending update");
            }
            slot.gate.clone()
        };

        let result = {
            let _write = gate.lock().await;
            self.store.update(job_id, final_update).await
        };

        let mut slots = self.slots();
        if let Some(slot) = slots.get_mut(job_id) {
            slot.flushing -= 1;
            if slot.is_idle() {
                slots.remove(job_id);
            }
        }
        debug!(%job_id, ok = result.is_ok(), "JobWriteQueue::flush: landed");
        result
    }

    /// Jobs with queued or in-flight writes
    pub fn active_jobs(&self) -> usize {
        self.slots().len()
    }
}

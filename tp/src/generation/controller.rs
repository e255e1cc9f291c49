//! GenerationController - latest-wins scheduling per session key

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jobstore::GenerationMode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::GenerationConfig;
use super::error::GenerationError;
use super::record::{GenerationRecord, GenerationState, GenerationStatus, ScheduleOutcome};
use super::runner::{GenerationRunner, GenerationTask, LatestGuard, Records, lock_records};
use crate::domain::PlannerSnapshot;

fn new_generation_id() -> String {
    format!("gen-{}", uuid::Uuid::now_v7())
}

/// A record claimed for a generation that has no job yet
struct Claim {
    generation_id: String,
    mode: GenerationMode,
    token: CancellationToken,
    snapshot: PlannerSnapshot,
    current_job_id: Option<String>,
}

impl Claim {
    fn take(record: &mut GenerationRecord, snapshot: PlannerSnapshot) -> Self {
        let generation_id = new_generation_id();
        let mode = record.next_mode();
        let token = record.claim(&generation_id, mode, snapshot.clone());
        Self {
            generation_id,
            mode,
            token,
            snapshot,
            current_job_id: record.job_id.clone(),
        }
    }
}

/// Decision taken under the lock, acted on after it is released
enum Scheduled {
    Start(Claim),
    Queued {
        outcome: ScheduleOutcome,
        notify: Option<(Option<String>, Option<String>)>,
    },
}

/// Decides when generations run for each session key
///
/// At most one generation per key is in flight. Edits that arrive meanwhile
/// collapse into a single pending snapshot; the newest one wins. The first
/// generation for a key is a draft and starts immediately, later ones refine
/// after a debounce. The record lock is never held across an await.
#[derive(Clone)]
pub struct GenerationController {
    runner: Arc<dyn GenerationRunner>,
    config: GenerationConfig,
    records: Records,
}

impl GenerationController {
    pub fn new(runner: Arc<dyn GenerationRunner>, config: GenerationConfig) -> Self {
        Self {
            runner,
            config,
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Hand a new snapshot to the controller
    pub async fn schedule(&self, key: &str, snapshot: PlannerSnapshot) -> Result<ScheduleOutcome, GenerationError> {
        debug!(%key, "GenerationController::schedule: called");
        let scheduled = {
            let mut records = lock_records(&self.records);
            let record = records.entry(key.to_string()).or_default();
            let mode = record.next_mode();

            if record.state == GenerationState::Idle && mode == GenerationMode::Draft {
                Scheduled::Start(Claim::take(record, snapshot))
            } else {
                let replaced = record.pending_snapshot.replace(snapshot).is_some();
                let notify = if record.in_flight {
                    Some((record.job_id.clone(), record.generation_id.clone()))
                } else {
                    if record.state == GenerationState::Idle {
                        record.state = GenerationState::Refining;
                    }
                    self.arm_debounce(key, record);
                    None
                };
                debug!(%key, replaced, in_flight = record.in_flight, "GenerationController::schedule: queued");
                Scheduled::Queued {
                    outcome: ScheduleOutcome {
                        job_id: record.job_id.clone(),
                        generation_id: record.generation_id.clone(),
                        mode,
                        queued: true,
                        state: record.state,
                    },
                    notify,
                }
            }
        };

        match scheduled {
            Scheduled::Queued { outcome, notify } => {
                if let Some((job_id, generation_id)) = notify {
                    self.runner.on_queued(key, job_id.as_deref(), generation_id.as_deref());
                }
                Ok(outcome)
            }
            Scheduled::Start(claim) => {
                let generation_id = claim.generation_id.clone();
                let mode = claim.mode;
                let job_id = self.launch(key, claim).await?;
                let state = self.get_state(key).map(|s| s.state).unwrap_or_default();
                Ok(ScheduleOutcome {
                    generation_id: job_id.as_ref().map(|_| generation_id),
                    job_id,
                    mode,
                    queued: false,
                    state,
                })
            }
        }
    }

    /// Stop whatever is running or waiting for `key`
    ///
    /// Idempotent; unknown keys are ignored.
    pub fn cancel(&self, key: &str) {
        let mut records = lock_records(&self.records);
        let Some(record) = records.get_mut(key) else {
            debug!(%key, "GenerationController::cancel: unknown key");
            return;
        };
        record.disarm_debounce();
        if let Some(token) = record.token.take() {
            token.cancel();
            info!(%key, generation_id = ?record.generation_id, "Generation cancelled");
        }
        record.pending_snapshot = None;
        record.generation_id = None;
        record.in_flight = false;
        record.state = GenerationState::Idle;
    }

    /// Cancel and forget `key`
    pub fn clear(&self, key: &str) {
        self.cancel(key);
        if lock_records(&self.records).remove(key).is_some() {
            debug!(%key, "GenerationController::clear: record removed");
        }
    }

    pub fn get_state(&self, key: &str) -> Option<GenerationStatus> {
        lock_records(&self.records).get(key).map(|record| record.status(key))
    }

    /// Keys the controller currently tracks
    pub fn keys(&self) -> Vec<String> {
        lock_records(&self.records).keys().cloned().collect()
    }

    fn arm_debounce(&self, key: &str, record: &mut GenerationRecord) {
        record.disarm_debounce();
        let epoch = record.debounce_epoch;
        let controller = self.clone();
        let key = key.to_string();
        let delay = self.config.debounce();
        debug!(%key, epoch, ?delay, "GenerationController::arm_debounce: armed");
        record.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.fire(&key, epoch).await;
        }));
    }

    async fn fire(&self, key: &str, epoch: u64) {
        let claim = {
            let mut records = lock_records(&self.records);
            let Some(record) = records.get_mut(key) else {
                return;
            };
            if record.debounce_epoch != epoch || record.in_flight {
                debug!(%key, epoch, "GenerationController::fire: superseded timer");
                return;
            }
            record.debounce = None;
            let snapshot = record
                .pending_snapshot
                .take()
                .or_else(|| record.current_snapshot.clone());
            let Some(snapshot) = snapshot else {
                record.state = GenerationState::Idle;
                return;
            };
            Claim::take(record, snapshot)
        };

        if let Err(e) = self.launch(key, claim).await {
            warn!(%key, error = %e, "Failed to start generation");
        }
    }

    /// Get a job for a claimed record and spawn the generation
    ///
    /// Returns `None` when the claim was cancelled while the job was prepared.
    async fn launch(&self, key: &str, claim: Claim) -> Result<Option<String>, GenerationError> {
        let ensured = self
            .runner
            .ensure_job_id(
                key,
                &claim.snapshot,
                claim.mode,
                &claim.generation_id,
                claim.current_job_id.as_deref(),
            )
            .await;

        let job_id = {
            let mut records = lock_records(&self.records);
            let Some(record) = records.get_mut(key) else {
                return Ok(None);
            };
            if !record.is_current(&claim.generation_id) {
                debug!(%key, generation_id = %claim.generation_id, "GenerationController::launch: claim lost");
                return Ok(None);
            }
            match ensured {
                Ok(job_id) => {
                    record.job_id = Some(job_id.clone());
                    job_id
                }
                Err(e) => {
                    record.release();
                    self.hand_off(key, record);
                    return Err(e);
                }
            }
        };

        info!(%key, %job_id, generation_id = %claim.generation_id, mode = %claim.mode, "Generation started");
        let task = GenerationTask {
            key: key.to_string(),
            job_id: job_id.clone(),
            generation_id: claim.generation_id.clone(),
            mode: claim.mode,
            snapshot: claim.snapshot,
            guard: LatestGuard::new(self.records.clone(), key, &claim.generation_id, claim.token.clone()),
            token: claim.token,
        };
        tokio::spawn(self.clone().run(task));
        Ok(Some(job_id))
    }

    async fn run(self, task: GenerationTask) {
        let key = task.key.clone();
        let generation_id = task.generation_id.clone();
        let mode = task.mode;
        let produced = match self.runner.run_generation(task).await {
            Ok(()) => true,
            Err(e) => {
                debug!(%key, %generation_id, error = %e, "GenerationController::run: no itinerary");
                false
            }
        };
        self.complete(&key, &generation_id, mode, produced);
    }

    fn complete(&self, key: &str, generation_id: &str, mode: GenerationMode, produced: bool) {
        let mut records = lock_records(&self.records);
        let Some(record) = records.get_mut(key) else {
            return;
        };
        let cancelled = record.token.as_ref().is_some_and(|t| t.is_cancelled());
        if !record.is_current(generation_id) || cancelled {
            debug!(%key, %generation_id, "GenerationController::complete: superseded");
            return;
        }
        if mode == GenerationMode::Draft && produced {
            record.has_draft_completed = true;
        }
        record.token = None;
        record.in_flight = false;
        self.hand_off(key, record);
        debug!(%key, %generation_id, state = %record.state, "GenerationController::complete: handed off");
    }

    /// Settle an idle record: start the debounce for waiting edits or go idle
    fn hand_off(&self, key: &str, record: &mut GenerationRecord) {
        if record.pending_snapshot.is_some() {
            record.state = GenerationState::Refining;
            self.arm_debounce(key, record);
        } else {
            record.state = GenerationState::Idle;
        }
    }
}

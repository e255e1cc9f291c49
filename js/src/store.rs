//! JobStore trait and the in-memory arena implementation

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::job::{GenerationMode, Job, JobUpdate};

/// Outcome of an update against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The update landed
    Applied,
    /// The job has moved on to another generation; nothing was written
    Stale { current_generation: Option<String> },
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Persistence collaborator for jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job
    async fn create(&self, job: Job) -> StoreResult<String>;

    /// Fetch a job by id
    async fn get(&self, id: &str) -> StoreResult<Option<Job>>;

    /// Apply a partial update, honouring its generation guard
    async fn update(&self, id: &str, update: JobUpdate) -> StoreResult<WriteOutcome>;

    /// Re-point an existing job at a new generation
    async fn reset(&self, id: &str, generation_id: &str, mode: GenerationMode) -> StoreResult<()>;

    /// Forget a job
    async fn remove(&self, id: &str) -> StoreResult<bool>;

    /// Drop jobs whose last update is older than the TTL; returns how many
    async fn sweep(&self) -> StoreResult<usize>;
}

/// Arena of jobs keyed by id, expired by TTL from `updated_at`
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
}

impl MemoryJobStore {
    pub fn new(ttl_ms: i64) -> Self {
        Self::with_clock(ttl_ms, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_ms: i64, clock: Arc<dyn Clock>) -> Self {
        debug!(ttl_ms, "MemoryJobStore::with_clock: called");
        Self {
            jobs: RwLock::new(HashMap::new()),
            clock,
            ttl_ms,
        }
    }

    /// Current time according to the store's clock
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expire jobs idle for longer than the TTL
    pub fn sweep_expired(&self) -> StoreResult<usize> {
        let cutoff = self.clock.now_ms() - self.ttl_ms;
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        let before = jobs.len();
        jobs.retain(|_, job| job.updated_at >= cutoff);
        let removed = before - jobs.len();
        if removed > 0 {
            info!(removed, remaining = jobs.len(), "MemoryJobStore: swept expired jobs");
        }
        Ok(removed)
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("job map lock poisoned".to_string())
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: Job) -> StoreResult<String> {
        debug!(id = %job.id, "MemoryJobStore::create: called");
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id));
        }
        let id = job.id.clone();
        jobs.insert(id.clone(), job);
        Ok(id)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Job>> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        Ok(jobs.get(id).cloned())
    }

    async fn update(&self, id: &str, update: JobUpdate) -> StoreResult<WriteOutcome> {
        let now = self.clock.now_ms();
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        let job = jobs.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !job.accepts(&update) {
            debug!(%id, expected = ?update.expected_generation, current = ?job.generation_id, "MemoryJobStore::update: stale generation, rejecting");
            return Ok(WriteOutcome::Stale {
                current_generation: job.generation_id.clone(),
            });
        }

        job.apply(update, now);
        Ok(WriteOutcome::Applied)
    }

    async fn reset(&self, id: &str, generation_id: &str, mode: GenerationMode) -> StoreResult<()> {
        debug!(%id, %generation_id, ?mode, "MemoryJobStore::reset: called");
        let now = self.clock.now_ms();
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        let job = jobs.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        job.reset(generation_id, mode, now);
        Ok(())
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        Ok(jobs.remove(id).is_some())
    }

    async fn sweep(&self) -> StoreResult<usize> {
        self.sweep_expired()
    }
}

//! The seam between the controller and whatever actually generates

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jobstore::GenerationMode;
use tokio_util::sync::CancellationToken;

use super::error::GenerationError;
use super::record::GenerationRecord;
use crate::domain::PlannerSnapshot;

pub(crate) type Records = Arc<Mutex<HashMap<String, GenerationRecord>>>;

pub(crate) fn lock_records(records: &Records) -> std::sync::MutexGuard<'_, HashMap<String, GenerationRecord>> {
    match records.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Answers whether a generation may still produce visible effects
#[derive(Clone)]
pub struct LatestGuard {
    records: Records,
    key: String,
    generation_id: String,
    token: CancellationToken,
}

impl LatestGuard {
    pub(crate) fn new(records: Records, key: &str, generation_id: &str, token: CancellationToken) -> Self {
        Self {
            records,
            key: key.to_string(),
            generation_id: generation_id.to_string(),
            token,
        }
    }

    /// True while the record still points at this generation and it was not cancelled
    pub fn is_latest(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        lock_records(&self.records)
            .get(&self.key)
            .is_some_and(|record| record.is_current(&self.generation_id))
    }
}

impl std::fmt::Debug for LatestGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatestGuard")
            .field("key", &self.key)
            .field("generation_id", &self.generation_id)
            .finish()
    }
}

/// Everything a runner needs to carry out one generation
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub key: String,
    pub job_id: String,
    pub generation_id: String,
    pub mode: GenerationMode,
    pub snapshot: PlannerSnapshot,
    pub token: CancellationToken,
    pub guard: LatestGuard,
}

impl GenerationTask {
    pub fn is_latest(&self) -> bool {
        self.guard.is_latest()
    }
}

/// Does the work the controller schedules
#[async_trait]
pub trait GenerationRunner: Send + Sync + 'static {
    /// Create or re-stamp the job a generation will report into
    async fn ensure_job_id(
        &self,
        key: &str,
        snapshot: &PlannerSnapshot,
        mode: GenerationMode,
        generation_id: &str,
        current_job_id: Option<&str>,
    ) -> Result<String, GenerationError>;

    /// Run one generation to its end
    ///
    /// Outcomes are reported through the job. An error only tells the
    /// controller that no itinerary came out of this run.
    async fn run_generation(&self, task: GenerationTask) -> Result<(), GenerationError>;

    /// A newer snapshot is waiting behind the in-flight generation
    fn on_queued(&self, _key: &str, _job_id: Option<&str>, _generation_id: Option<&str>) {}
}

#[cfg(test)]
pub mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// One observed call to `run_generation`
    #[derive(Debug, Clone, PartialEq)]
    pub struct RunRecord {
        pub request: String,
        pub mode: GenerationMode,
        pub generation_id: String,
        pub job_id: String,
        /// Whether the run finished while still latest
        pub completed: bool,
    }

    /// Runner that sleeps for a fixed time and records what it saw
    pub struct MockRunner {
        pub delay: Duration,
        pub runs: Mutex<Vec<RunRecord>>,
        pub started: Mutex<Vec<String>>,
        pub ensure_calls: Mutex<Vec<(GenerationMode, Option<String>)>>,
        pub queued: AtomicUsize,
        pub fail_ensure: AtomicUsize,
        pub fail_runs: AtomicUsize,
        jobs: AtomicUsize,
    }

    impl MockRunner {
        pub fn new(delay_ms: u64) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                runs: Mutex::new(Vec::new()),
                started: Mutex::new(Vec::new()),
                ensure_calls: Mutex::new(Vec::new()),
                queued: AtomicUsize::new(0),
                fail_ensure: AtomicUsize::new(0),
                fail_runs: AtomicUsize::new(0),
                jobs: AtomicUsize::new(0),
            }
        }

        pub fn runs(&self) -> Vec<RunRecord> {
            self.runs.lock().unwrap().clone()
        }

        pub fn started(&self) -> Vec<String> {
            self.started.lock().unwrap().clone()
        }

        pub fn completed_requests(&self) -> Vec<String> {
            self.runs()
                .into_iter()
                .filter(|r| r.completed)
                .map(|r| r.request)
                .collect()
        }
    }

    #[async_trait]
    impl GenerationRunner for MockRunner {
        async fn ensure_job_id(
            &self,
            _key: &str,
            _snapshot: &PlannerSnapshot,
            mode: GenerationMode,
            _generation_id: &str,
            current_job_id: Option<&str>,
        ) -> Result<String, GenerationError> {
            self.ensure_calls
                .lock()
                .unwrap()
                .push((mode, current_job_id.map(str::to_string)));
            if self.fail_ensure.load(Ordering::SeqCst) > 0 {
                self.fail_ensure.fetch_sub(1, Ordering::SeqCst);
                return Err(GenerationError::Job(jobstore::StoreError::Unavailable("down".into())));
            }
            match current_job_id {
                Some(id) => Ok(id.to_string()),
                None => Ok(format!("job-{}", self.jobs.fetch_add(1, Ordering::SeqCst) + 1)),
            }
        }

        async fn run_generation(&self, task: GenerationTask) -> Result<(), GenerationError> {
            self.started.lock().unwrap().push(task.snapshot.request.clone());
            tokio::select! {
                _ = task.token.cancelled() => {}
                _ = tokio::time::sleep(self.delay) => {}
            }
            self.runs.lock().unwrap().push(RunRecord {
                request: task.snapshot.request.clone(),
                mode: task.mode,
                generation_id: task.generation_id.clone(),
                job_id: task.job_id.clone(),
                completed: task.is_latest(),
            });
            if self.fail_runs.load(Ordering::SeqCst) > 0 {
                self.fail_runs.fetch_sub(1, Ordering::SeqCst);
                return Err(GenerationError::Failed("no itinerary".into()));
            }
            Ok(())
        }

        fn on_queued(&self, _key: &str, _job_id: Option<&str>, _generation_id: Option<&str>) {
            self.queued.fetch_add(1, Ordering::SeqCst);
        }
    }
}

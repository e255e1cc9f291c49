//! TripService - the controller, planner and job store wired together

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eyre::{Context, Result};
use jobstore::{
    Clock, GenerationMode, Job, JobProgress, JobStore, JobUpdate, MemoryJobStore, StoreError, StoreResult, SystemClock,
    WriteOutcome,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{ItineraryPlan, PlannerSnapshot};
use crate::generation::{
    GenerationConfig, GenerationController, GenerationError, GenerationRunner, GenerationStatus, GenerationTask,
    LatestGuard, ScheduleOutcome,
};
use crate::jobs::{JobWriteQueue, ProgressReporter};
use crate::llm;
use crate::planner::{PipelineContext, Planner};
use crate::tools::Toolbox;

/// Pipeline context for a generation that reports into a job
struct JobContext {
    guard: LatestGuard,
    token: CancellationToken,
    reporter: Arc<ProgressReporter>,
}

impl PipelineContext for JobContext {
    fn is_latest(&self) -> bool {
        self.guard.is_latest()
    }

    fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn progress(&self, progress: JobProgress) {
        self.reporter.report(progress);
    }

    fn preview(&self, plan: &ItineraryPlan) {
        match serde_json::to_value(plan) {
            Ok(value) => self.reporter.preview(value),
            Err(e) => warn!(error = %e, "Failed to serialize preview plan"),
        }
    }
}

/// Runs planner generations and keeps their jobs up to date
pub struct PlannerRunner {
    planner: Arc<Planner>,
    queue: JobWriteQueue,
    clock: Arc<dyn Clock>,
}

impl PlannerRunner {
    pub fn new(planner: Arc<Planner>, queue: JobWriteQueue) -> Self {
        Self {
            planner,
            queue,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn store(&self) -> &Arc<dyn JobStore> {
        self.queue.store()
    }

    async fn finish(&self, task: &GenerationTask, reporter: &ProgressReporter, update: JobUpdate) {
        if !task.is_latest() {
            debug!(job_id = %task.job_id, "PlannerRunner::finish: superseded, skipping terminal write");
            return;
        }
        match reporter.finish(update).await {
            Ok(WriteOutcome::Applied) => {}
            Ok(WriteOutcome::Stale { current_generation }) => {
                debug!(job_id = %task.job_id, ?current_generation, "PlannerRunner::finish: job moved on");
            }
            Err(e) => warn!(job_id = %task.job_id, error = %e, "Failed to write final job state"),
        }
    }
}

#[async_trait]
impl GenerationRunner for PlannerRunner {
    async fn ensure_job_id(
        &self,
        key: &str,
        _snapshot: &PlannerSnapshot,
        mode: GenerationMode,
        generation_id: &str,
        current_job_id: Option<&str>,
    ) -> Result<String, GenerationError> {
        debug!(%key, %mode, %generation_id, ?current_job_id, "PlannerRunner::ensure_job_id: called");
        if let Some(job_id) = current_job_id {
            match self.store().reset(job_id, generation_id, mode).await {
                Ok(()) => return Ok(job_id.to_string()),
                Err(StoreError::NotFound(_)) => {
                    debug!(%key, %job_id, "PlannerRunner::ensure_job_id: job expired, creating a new one");
                }
                Err(e) => return Err(e.into()),
            }
        }
        let job = Job::new(generation_id, mode, self.clock.now_ms());
        Ok(self.store().create(job).await?)
    }

    async fn run_generation(&self, task: GenerationTask) -> Result<(), GenerationError> {
        debug!(key = %task.key, job_id = %task.job_id, mode = %task.mode, "PlannerRunner::run_generation: called");
        let reporter = Arc::new(ProgressReporter::new(
            self.queue.clone(),
            &task.job_id,
            &task.generation_id,
        ));
        reporter.report(JobProgress::new("starting", format!("Starting {} generation", task.mode)));
        let ctx = JobContext {
            guard: task.guard.clone(),
            token: task.token.clone(),
            reporter: reporter.clone(),
        };

        match self.planner.generate(&task.snapshot, &ctx).await {
            Ok(plan) => {
                let value = serde_json::to_value(&plan)
                    .map_err(|e| GenerationError::Failed(format!("Failed to serialize plan: {}", e)))?;
                self.finish(&task, &reporter, JobUpdate::complete(value)).await;
                info!(key = %task.key, job_id = %task.job_id, days = plan.days.len(), "Itinerary complete");
                Ok(())
            }
            Err(e) if e.is_superseded() => {
                debug!(key = %task.key, generation_id = %task.generation_id, "PlannerRunner::run_generation: superseded");
                Err(GenerationError::Failed(e.to_string()))
            }
            Err(e) => {
                warn!(key = %task.key, job_id = %task.job_id, error = %e, "Generation failed");
                self.finish(&task, &reporter, JobUpdate::failed(e.to_string())).await;
                Err(GenerationError::Failed(e.to_string()))
            }
        }
    }

    fn on_queued(&self, key: &str, job_id: Option<&str>, generation_id: Option<&str>) {
        info!(%key, ?job_id, ?generation_id, "Newer request queued behind the running generation");
    }
}

/// Periodically drop expired jobs until `token` is cancelled
pub fn spawn_sweeper(store: Arc<dyn JobStore>, interval: Duration, token: CancellationToken) {
    debug!(?interval, "spawn_sweeper: called");
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            match store.sweep().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "spawn_sweeper: expired jobs removed"),
                Err(e) => warn!(error = %e, "Job sweep failed"),
            }
        }
        debug!("spawn_sweeper: stopped");
    });
}

/// Entry point for callers: schedule snapshots, watch jobs
pub struct TripService {
    controller: GenerationController,
    store: Arc<dyn JobStore>,
    sweeper: CancellationToken,
}

impl TripService {
    pub fn new(planner: Arc<Planner>, store: Arc<dyn JobStore>, generation: GenerationConfig) -> Self {
        let runner = PlannerRunner::new(planner, JobWriteQueue::new(store.clone()));
        Self::with_runner(Arc::new(runner), store, generation)
    }

    pub fn with_runner(runner: Arc<dyn GenerationRunner>, store: Arc<dyn JobStore>, generation: GenerationConfig) -> Self {
        Self {
            controller: GenerationController::new(runner, generation),
            store,
            sweeper: CancellationToken::new(),
        }
    }

    /// Build the HTTP-backed service described by config
    ///
    /// Must be called inside the runtime; starts the job sweeper.
    pub fn from_config(config: &Config) -> Result<Self> {
        debug!("TripService::from_config: called");
        let llm = llm::create_client(&config.llm).context("Failed to create LLM client")?;
        let tools = Toolbox::from_config(config).context("Failed to set up place, route and host tools")?;
        let planner = Arc::new(Planner::from_config(config, llm, tools));
        let ttl_ms = i64::try_from(config.jobs.ttl_ms).unwrap_or(i64::MAX);
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new(ttl_ms));
        let service = Self::new(planner, store, config.generation.clone());
        service.start_sweeper(Duration::from_millis(config.jobs.sweep_interval_ms));
        Ok(service)
    }

    pub fn start_sweeper(&self, interval: Duration) {
        spawn_sweeper(self.store.clone(), interval, self.sweeper.clone());
    }

    pub fn controller(&self) -> &GenerationController {
        &self.controller
    }

    pub async fn schedule(&self, key: &str, snapshot: PlannerSnapshot) -> Result<ScheduleOutcome, GenerationError> {
        self.controller.schedule(key, snapshot).await
    }

    pub fn cancel(&self, key: &str) {
        self.controller.cancel(key);
    }

    pub fn clear(&self, key: &str) {
        self.controller.clear(key);
    }

    pub fn get_state(&self, key: &str) -> Option<GenerationStatus> {
        self.controller.get_state(key)
    }

    pub async fn job(&self, job_id: &str) -> StoreResult<Option<Job>> {
        self.store.get(job_id).await
    }

    /// Poll a job until it is terminal or gone
    pub async fn wait_for_job(&self, job_id: &str, poll: Duration) -> StoreResult<Option<Job>> {
        loop {
            match self.store.get(job_id).await? {
                Some(job) if job.status.is_terminal() => return Ok(Some(job)),
                Some(_) => tokio::time::sleep(poll).await,
                None => return Ok(None),
            }
        }
    }

    /// Poll until nothing runs or waits for `key`
    pub async fn wait_idle(&self, key: &str, poll: Duration) -> Option<GenerationStatus> {
        loop {
            match self.controller.get_state(key) {
                Some(status) if status.has_in_flight_request || status.has_pending_snapshot => {
                    tokio::time::sleep(poll).await;
                }
                other => return other,
            }
        }
    }
}

impl Drop for TripService {
    fn drop(&mut self) {
        self.sweeper.cancel();
    }
}

#[cfg(test)]
mod tests {
    use jobstore::{JobStatus, ManualClock};

    use super::*;
    use crate::planner::test_support::{ROUTE_66_DRAFT, TestPlanner};
    use crate::tools::mock::{MockResolver, MockRouter};

    const POLL: Duration = Duration::from_millis(50);

    fn service(responses: Vec<String>) -> (TripService, Arc<dyn JobStore>) {
        let TestPlanner { planner, .. } = TestPlanner::build(MockResolver::us_cities(), MockRouter::default(), responses, 0);
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new(60_000));
        let service = TripService::new(Arc::new(planner), store.clone(), GenerationConfig::default());
        (service, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_completes_job() {
        let (service, _) = service(vec![ROUTE_66_DRAFT.to_string()]);
        let outcome = service
            .schedule("trip", PlannerSnapshot::new("5-day road trip LA to Chicago"))
            .await
            .unwrap();
        assert!(!outcome.queued);
        let job_id = outcome.job_id.unwrap();

        let job = service.wait_for_job(&job_id, POLL).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.progress.stage, "complete");
        let plan: ItineraryPlan = serde_json::from_value(job.plan.unwrap()).unwrap();
        assert_eq!(plan.days.len(), 5);

        let status = service.wait_idle("trip", POLL).await.unwrap();
        assert!(status.has_draft_completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_terminal_error() {
        let (service, _) = service(vec!["I cannot plan that".to_string()]);
        let outcome = service.schedule("trip", PlannerSnapshot::new("nowhere")).await.unwrap();
        let job = service
            .wait_for_job(outcome.job_id.as_deref().unwrap(), POLL)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.error.is_some());
        assert!(job.plan.is_none());

        let status = service.wait_idle("trip", POLL).await.unwrap();
        assert!(!status.has_draft_completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refine_reuses_job() {
        let (service, _) = service(vec![ROUTE_66_DRAFT.to_string(), ROUTE_66_DRAFT.to_string()]);
        let first = service.schedule("trip", PlannerSnapshot::new("LA to Chicago")).await.unwrap();
        let job_id = first.job_id.unwrap();
        service.wait_idle("trip", POLL).await;

        let second = service
            .schedule("trip", PlannerSnapshot::new("LA to Chicago, slower pace"))
            .await
            .unwrap();
        assert!(second.queued);
        assert_eq!(second.mode, GenerationMode::Refine);
        assert_eq!(second.job_id.as_deref(), Some(job_id.as_str()));

        service.wait_idle("trip", POLL).await;
        let job = service.job(&job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.generation_mode, GenerationMode::Refine);
    }

    #[tokio::test]
    async fn test_ensure_job_id_replaces_expired_job() {
        let TestPlanner { planner, .. } = TestPlanner::build(MockResolver::us_cities(), MockRouter::default(), vec![], 0);
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new(60_000));
        let runner = PlannerRunner::new(Arc::new(planner), JobWriteQueue::new(store.clone()));

        let snapshot = PlannerSnapshot::new("x");
        let created = runner
            .ensure_job_id("k", &snapshot, GenerationMode::Draft, "gen-1", None)
            .await
            .unwrap();
        let same = runner
            .ensure_job_id("k", &snapshot, GenerationMode::Refine, "gen-2", Some(&created))
            .await
            .unwrap();
        assert_eq!(created, same);
        let job = store.get(&same).await.unwrap().unwrap();
        assert_eq!(job.generation_id.as_deref(), Some("gen-2"));

        let replaced = runner
            .ensure_job_id("k", &snapshot, GenerationMode::Draft, "gen-3", Some("job-gone"))
            .await
            .unwrap();
        assert_ne!(replaced, "job-gone");
        assert!(store.get(&replaced).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_jobs() {
        let clock = Arc::new(ManualClock::new(0));
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::with_clock(1_000, clock.clone()));
        let job_id = store.create(Job::new("gen-1", GenerationMode::Draft, 0)).await.unwrap();

        let token = CancellationToken::new();
        spawn_sweeper(store.clone(), Duration::from_millis(100), token.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.get(&job_id).await.unwrap().is_some());

        clock.advance(5_000);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.get(&job_id).await.unwrap().is_none());
        token.cancel();
    }
}

//! Progress reporting for one generation

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use jobstore::{JobProgress, JobStatus, JobUpdate, StoreResult, WriteOutcome};
use serde_json::Value;
use tracing::debug;

use super::queue::JobWriteQueue;

/// Writes one generation's progress to its job
///
/// Every update is guarded by the generation id, so a superseded generation
/// can no longer touch the job. Within a stage, counters never go backwards.
/// After `finish` nothing more is written.
pub struct ProgressReporter {
    queue: JobWriteQueue,
    job_id: String,
    generation_id: String,
    last: Mutex<Option<JobProgress>>,
    finished: AtomicBool,
}

impl ProgressReporter {
    pub fn new(queue: JobWriteQueue, job_id: impl Into<String>, generation_id: impl Into<String>) -> Self {
        Self {
            queue,
            job_id: job_id.into(),
            generation_id: generation_id.into(),
            last: Mutex::new(None),
            finished: AtomicBool::new(false),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Whether `next` would move a counter backwards within the same stage
    fn regresses(last: Option<&JobProgress>, next: &JobProgress) -> bool {
        match (last, next.current) {
            (Some(last), Some(current)) if last.stage == next.stage => last.current.is_some_and(|c| current < c),
            _ => false,
        }
    }

    pub fn report(&self, progress: JobProgress) {
        if self.finished.load(Ordering::SeqCst) {
            return;
        }
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if Self::regresses(last.as_ref(), &progress) {
            debug!(job_id = %self.job_id, stage = %progress.stage, "ProgressReporter::report: skipping regression");
            return;
        }
        *last = Some(progress.clone());
        self.queue.enqueue(
            &self.job_id,
            JobUpdate::progress(progress).guarded_by(&self.generation_id),
        );
    }

    /// Attach an early plan while the job keeps running
    pub fn preview(&self, plan: Value) {
        if self.finished.load(Ordering::SeqCst) {
            return;
        }
        let update = JobUpdate {
            status: Some(JobStatus::Running),
            progress: Some(JobProgress::new("preview", "Rough itinerary ready, locating places")),
            plan: Some(plan),
            ..Default::default()
        };
        self.queue.enqueue(&self.job_id, update.guarded_by(&self.generation_id));
    }

    /// Terminal write; later reports are ignored
    pub async fn finish(&self, update: JobUpdate) -> StoreResult<WriteOutcome> {
        self.finished.store(true, Ordering::SeqCst);
        debug!(job_id = %self.job_id, status = ?update.status, "ProgressReporter::finish: called");
        self.queue
            .flush(&self.job_id, update.guarded_by(&self.generation_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use jobstore::{GenerationMode, Job, JobStore, MemoryJobStore};

    use super::*;

    async fn setup() -> (Arc<MemoryJobStore>, ProgressReporter) {
        let store = Arc::new(MemoryJobStore::new(60_000));
        let job_id = store.create(Job::new("gen-1", GenerationMode::Draft, 0)).await.unwrap();
        let reporter = ProgressReporter::new(JobWriteQueue::new(store.clone()), job_id, "gen-1");
        (store, reporter)
    }

    async fn job(store: &MemoryJobStore, reporter: &ProgressReporter) -> Job {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.get(reporter.job_id()).await.unwrap().unwrap()
    }

    #[test]
    fn test_regresses() {
        let two = JobProgress::new("hydrating", "").with_count(2, 5);
        let one = JobProgress::new("hydrating", "").with_count(1, 5);
        let other = JobProgress::new("validating", "");
        assert!(ProgressReporter::regresses(Some(&two), &one));
        assert!(!ProgressReporter::regresses(Some(&one), &two));
        assert!(!ProgressReporter::regresses(Some(&two), &other));
        assert!(!ProgressReporter::regresses(None, &one));
    }

    #[tokio::test]
    async fn test_counters_never_go_backwards() {
        let (store, reporter) = setup().await;
        reporter.report(JobProgress::new("hydrating", "3").with_count(3, 5));
        assert_eq!(job(&store, &reporter).await.progress.current, Some(3));

        reporter.report(JobProgress::new("hydrating", "2").with_count(2, 5));
        assert_eq!(job(&store, &reporter).await.progress.current, Some(3));

        reporter.report(JobProgress::new("hydrating", "4").with_count(4, 5));
        assert_eq!(job(&store, &reporter).await.progress.current, Some(4));
    }

    #[tokio::test]
    async fn test_finish_is_final() {
        let (store, reporter) = setup().await;
        reporter.report(JobProgress::new("drafting", "Drafting"));
        reporter
            .finish(JobUpdate::complete(serde_json::json!({"days": []})))
            .await
            .unwrap();
        reporter.report(JobProgress::new("hydrating", "late").with_count(5, 5));
        reporter.preview(serde_json::json!({"late": true}));

        let job = job(&store, &reporter).await;
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.plan, Some(serde_json::json!({"days": []})));
    }

    #[tokio::test]
    async fn test_superseded_generation_cannot_write() {
        let (store, reporter) = setup().await;
        store.reset(reporter.job_id(), "gen-2", GenerationMode::Refine).await.unwrap();
        reporter.report(JobProgress::new("drafting", "old"));
        let outcome = reporter.finish(JobUpdate::failed("old error")).await.unwrap();
        assert!(!outcome.is_applied());

        let job = job(&store, &reporter).await;
        assert_eq!(job.status, JobStatus::Draft);
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_preview_attaches_plan() {
        let (store, reporter) = setup().await;
        reporter.preview(serde_json::json!({"title": "rough"}));
        let job = job(&store, &reporter).await;
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.plan, Some(serde_json::json!({"title": "rough"})));
    }
}

//! Job record and update patches

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, no generation has started writing yet
    #[default]
    Draft,
    /// A generation is producing progress
    Running,
    /// Terminal: plan attached
    Complete,
    /// Terminal: error message attached
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Whether a generation builds a fresh itinerary or refines the last one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    Draft,
    Refine,
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Refine => write!(f, "refine"),
        }
    }
}

/// Progress snapshot shown to polling clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobProgress {
    pub stage: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

impl JobProgress {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
            current: None,
            total: None,
        }
    }

    /// Attach a current/total counter
    pub fn with_count(mut self, current: u32, total: u32) -> Self {
        self.current = Some(current);
        self.total = Some(total);
        self
    }
}

/// A generation job as seen by status-polling clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub generation_id: Option<String>,
    pub generation_mode: GenerationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Job {
    /// Create a new job for the given generation
    pub fn new(generation_id: impl Into<String>, mode: GenerationMode, now_ms: i64) -> Self {
        let id = format!("job-{}", uuid::Uuid::now_v7());
        debug!(%id, ?mode, "Job::new: called");
        Self {
            id,
            status: JobStatus::Draft,
            progress: JobProgress::new("queued", "Waiting to start"),
            generation_id: Some(generation_id.into()),
            generation_mode: mode,
            plan: None,
            error: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Put the job back to its initial state for a new draft generation
    ///
    /// The id and creation time survive; everything the previous generation
    /// wrote is discarded.
    pub fn reset(&mut self, generation_id: impl Into<String>, mode: GenerationMode, now_ms: i64) {
        debug!(id = %self.id, ?mode, "Job::reset: called");
        self.status = JobStatus::Draft;
        self.progress = JobProgress::new("queued", "Waiting to start");
        self.generation_id = Some(generation_id.into());
        self.generation_mode = mode;
        if mode == GenerationMode::Draft {
            self.plan = None;
        }
        self.error = None;
        self.updated_at = now_ms;
    }

    /// Apply a patch. Callers check the generation guard first.
    pub fn apply(&mut self, update: JobUpdate, now_ms: i64) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(plan) = update.plan {
            self.plan = Some(plan);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        self.updated_at = now_ms;
    }

    /// Whether `update` may be applied given its generation guard
    pub fn accepts(&self, update: &JobUpdate) -> bool {
        match &update.expected_generation {
            Some(expected) => self.generation_id.as_deref() == Some(expected.as_str()),
            None => true,
        }
    }
}

/// Partial update to a job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<JobProgress>,
    pub plan: Option<Value>,
    pub error: Option<String>,
    /// Reject the update unless the job still belongs to this generation
    pub expected_generation: Option<String>,
}

impl JobUpdate {
    /// Progress write for a running generation
    pub fn progress(progress: JobProgress) -> Self {
        Self {
            status: Some(JobStatus::Running),
            progress: Some(progress),
            ..Default::default()
        }
    }

    /// Terminal success write
    pub fn complete(plan: Value) -> Self {
        Self {
            status: Some(JobStatus::Complete),
            progress: Some(JobProgress::new("complete", "Itinerary ready")),
            plan: Some(plan),
            ..Default::default()
        }
    }

    /// Terminal failure write
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: Some(JobStatus::Error),
            progress: Some(JobProgress::new("error", message.clone())),
            error: Some(message),
            ..Default::default()
        }
    }

    /// Guard this update with a generation id
    pub fn guarded_by(mut self, generation_id: impl Into<String>) -> Self {
        self.expected_generation = Some(generation_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_defaults() {
        let job = Job::new("gen-1", GenerationMode::Draft, 100);
        assert!(job.id.starts_with("job-"));
        assert_eq!(job.status, JobStatus::Draft);
        assert_eq!(job.generation_id.as_deref(), Some("gen-1"));
        assert_eq!(job.created_at, 100);
        assert_eq!(job.updated_at, 100);
    }

    #[test]
    fn test_apply_progress_marks_running() {
        let mut job = Job::new("gen-1", GenerationMode::Draft, 0);
        job.apply(JobUpdate::progress(JobProgress::new("drafting", "Drafting").with_count(1, 3)), 50);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress.current, Some(1));
        assert_eq!(job.progress.total, Some(3));
        assert_eq!(job.updated_at, 50);
    }

    #[test]
    fn test_reset_keeps_id_and_created_at() {
        let mut job = Job::new("gen-1", GenerationMode::Draft, 10);
        let id = job.id.clone();
        job.apply(JobUpdate::failed("boom"), 20);
        job.reset("gen-2", GenerationMode::Draft, 30);

        assert_eq!(job.id, id);
        assert_eq!(job.created_at, 10);
        assert_eq!(job.status, JobStatus::Draft);
        assert!(job.error.is_none());
        assert_eq!(job.generation_id.as_deref(), Some("gen-2"));
    }

    #[test]
    fn test_refine_reset_keeps_previous_plan() {
        let mut job = Job::new("gen-1", GenerationMode::Draft, 0);
        job.apply(JobUpdate::complete(serde_json::json!({"title": "Rome"})), 5);
        job.reset("gen-2", GenerationMode::Refine, 6);
        assert!(job.plan.is_some());
        assert_eq!(job.generation_mode, GenerationMode::Refine);
    }

    #[test]
    fn test_generation_guard() {
        let job = Job::new("gen-1", GenerationMode::Draft, 0);
        assert!(job.accepts(&JobUpdate::failed("x")));
        assert!(job.accepts(&JobUpdate::failed("x").guarded_by("gen-1")));
        assert!(!job.accepts(&JobUpdate::failed("x").guarded_by("gen-0")));
    }

    #[test]
    fn test_job_serializes_camel_case() {
        let job = Job::new("gen-1", GenerationMode::Refine, 0);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["generationMode"], "refine");
        assert_eq!(json["status"], "draft");
        assert!(json.get("plan").is_none());
    }
}

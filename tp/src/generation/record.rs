//! Per-key generation state

use jobstore::GenerationMode;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::PlannerSnapshot;

/// Where a session is in its generation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationState {
    #[default]
    Idle,
    /// A draft generation is running
    Drafting,
    /// A refinement is waiting out its debounce or running
    Refining,
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Drafting => write!(f, "DRAFTING"),
            Self::Refining => write!(f, "REFINING"),
        }
    }
}

/// Controller-owned bookkeeping for one session key
#[derive(Debug, Default)]
pub(crate) struct GenerationRecord {
    pub state: GenerationState,
    pub job_id: Option<String>,
    pub generation_id: Option<String>,
    pub mode: GenerationMode,
    /// Live token of the in-flight generation
    pub token: Option<CancellationToken>,
    pub current_snapshot: Option<PlannerSnapshot>,
    /// Latest snapshot waiting for its turn; never a queue
    pub pending_snapshot: Option<PlannerSnapshot>,
    pub has_draft_completed: bool,
    pub in_flight: bool,
    pub debounce: Option<JoinHandle<()>>,
    /// Bumped whenever the debounce timer is armed or disarmed
    pub debounce_epoch: u64,
}

impl GenerationRecord {
    /// Mode the next generation for this key runs in
    pub fn next_mode(&self) -> GenerationMode {
        if self.has_draft_completed {
            GenerationMode::Refine
        } else {
            GenerationMode::Draft
        }
    }

    pub fn disarm_debounce(&mut self) {
        self.debounce_epoch += 1;
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }

    /// Claim the record for a new generation and return its token
    pub fn claim(&mut self, generation_id: &str, mode: GenerationMode, snapshot: PlannerSnapshot) -> CancellationToken {
        let token = CancellationToken::new();
        self.state = match mode {
            GenerationMode::Draft => GenerationState::Drafting,
            GenerationMode::Refine => GenerationState::Refining,
        };
        self.generation_id = Some(generation_id.to_string());
        self.mode = mode;
        self.token = Some(token.clone());
        self.current_snapshot = Some(snapshot);
        self.in_flight = true;
        token
    }

    /// Give up a claim that never got a job
    pub fn release(&mut self) {
        self.token = None;
        self.generation_id = None;
        self.in_flight = false;
        self.state = GenerationState::Idle;
    }

    pub fn is_current(&self, generation_id: &str) -> bool {
        self.generation_id.as_deref() == Some(generation_id)
    }

    pub fn status(&self, key: &str) -> GenerationStatus {
        GenerationStatus {
            key: key.to_string(),
            state: self.state,
            job_id: self.job_id.clone(),
            generation_id: self.generation_id.clone(),
            mode: self.mode,
            has_pending_snapshot: self.pending_snapshot.is_some(),
            has_in_flight_request: self.in_flight,
            has_draft_completed: self.has_draft_completed,
        }
    }
}

/// Read-only view of a key's record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub key: String,
    pub state: GenerationState,
    pub job_id: Option<String>,
    pub generation_id: Option<String>,
    pub mode: GenerationMode,
    pub has_pending_snapshot: bool,
    pub has_in_flight_request: bool,
    pub has_draft_completed: bool,
}

/// What `schedule` did with a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutcome {
    pub job_id: Option<String>,
    pub generation_id: Option<String>,
    pub mode: GenerationMode,
    /// False only when a generation started right away
    pub queued: bool,
    pub state: GenerationState,
}

//! JobStore - generation job records for status polling
//!
//! A job is the externally visible face of one planning session: its status,
//! its latest progress message, and (once finished) the plan or the error.
//!
//! # Modules
//!
//! - [`job`] - the `Job` record and the `JobUpdate` patch applied to it
//! - [`store`] - the `JobStore` trait and the in-memory arena implementation
//! - [`clock`] - injectable time source so TTL sweeping is testable

pub mod clock;
pub mod error;
pub mod job;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock, now_ms};
pub use error::{StoreError, StoreResult};
pub use job::{GenerationMode, Job, JobProgress, JobStatus, JobUpdate};
pub use store::{JobStore, MemoryJobStore, WriteOutcome};

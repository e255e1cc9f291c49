//! Job writes
//!
//! The job store is only ever written through [`JobWriteQueue`]; each
//! generation talks to it through its own [`ProgressReporter`].

mod queue;
mod reporter;

pub use queue::JobWriteQueue;
pub use reporter::ProgressReporter;

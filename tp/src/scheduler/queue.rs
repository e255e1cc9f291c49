//! Queue types for the rate limiter

use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// A call waiting for its turn, type-erased
pub(crate) trait PendingCall: Send {
    /// The submitter stopped waiting for the result
    fn is_abandoned(&self) -> bool;

    fn start(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// A closure plus the channel its result goes back on
pub(crate) struct Call<F, T> {
    f: F,
    result_tx: oneshot::Sender<T>,
}

impl<F, Fut, T> PendingCall for Call<F, T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    fn is_abandoned(&self) -> bool {
        self.result_tx.is_closed()
    }

    fn start(self: Box<Self>) -> BoxFuture<'static, ()> {
        let Call { f, result_tx } = *self;
        async move {
            let output = f().await;
            // The caller may have given up while the call ran
            let _ = result_tx.send(output);
        }
        .boxed()
    }
}

/// An entry in the FIFO queue
pub(crate) struct QueuedCall {
    pub call: Box<dyn PendingCall>,
    pub submitted_at: Instant,
}

impl QueuedCall {
    pub fn new<F, Fut, T>(f: F, result_tx: oneshot::Sender<T>) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        Self {
            call: Box::new(Call { f, result_tx }),
            submitted_at: Instant::now(),
        }
    }
}

/// Statistics for the limiter
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LimiterStats {
    pub total_submitted: u64,
    pub total_executed: u64,
    /// Calls dropped unstarted because their caller had gone away
    pub total_skipped: u64,
    pub total_wait_time_ms: u64,
    pub peak_queue_depth: usize,
}

impl LimiterStats {
    /// Calls accepted but not yet started or skipped
    pub fn queued(&self) -> u64 {
        self.total_submitted
            .saturating_sub(self.total_executed)
            .saturating_sub(self.total_skipped)
    }

    pub fn average_wait_ms(&self) -> u64 {
        if self.total_executed == 0 {
            0
        } else {
            self.total_wait_time_ms / self.total_executed
        }
    }
}

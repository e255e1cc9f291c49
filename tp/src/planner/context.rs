//! What the pipeline needs to know about the generation driving it

use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::error::PlannerError;
use crate::domain::{ItineraryPlan, JobProgress};

/// Liveness and progress hooks for one pipeline run
pub trait PipelineContext: Send + Sync {
    /// True while the generation is still the one its session wants
    fn is_latest(&self) -> bool;

    /// Fires when the generation is cancelled
    fn token(&self) -> CancellationToken;

    fn progress(&self, progress: JobProgress);

    /// Un-hydrated plan available before the slow stage starts
    fn preview(&self, _plan: &ItineraryPlan) {}
}

/// A context that is always latest and discards progress
#[derive(Debug, Default)]
pub struct DetachedContext {
    token: CancellationToken,
}

impl DetachedContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineContext for DetachedContext {
    fn is_latest(&self) -> bool {
        !self.token.is_cancelled()
    }

    fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn progress(&self, _progress: JobProgress) {}
}

/// Err when the generation was cancelled or superseded
pub(crate) fn ensure_current(ctx: &dyn PipelineContext) -> Result<(), PlannerError> {
    if ctx.token().is_cancelled() {
        Err(PlannerError::Cancelled)
    } else if !ctx.is_latest() {
        Err(PlannerError::Stale)
    } else {
        Ok(())
    }
}

/// Await an external call, abandoning it on cancellation and re-checking
/// liveness once it returns
pub(crate) async fn guarded<F>(ctx: &dyn PipelineContext, fut: F) -> Result<F::Output, PlannerError>
where
    F: Future,
{
    let token = ctx.token();
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PlannerError::Cancelled),
        out = fut => {
            ensure_current(ctx)?;
            Ok(out)
        }
    }
}

#[cfg(test)]
pub mod mock {
    //! Recording context for planner tests

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Default)]
    pub struct RecordingContext {
        pub token: CancellationToken,
        pub stale: AtomicBool,
        pub progress: Mutex<Vec<JobProgress>>,
        pub previews: Mutex<Vec<ItineraryPlan>>,
    }

    impl RecordingContext {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn mark_stale(&self) {
            self.stale.store(true, Ordering::SeqCst);
        }

        pub fn stages(&self) -> Vec<String> {
            self.progress.lock().unwrap().iter().map(|p| p.stage.clone()).collect()
        }
    }

    impl PipelineContext for RecordingContext {
        fn is_latest(&self) -> bool {
            !self.stale.load(Ordering::SeqCst) && !self.token.is_cancelled()
        }

        fn token(&self) -> CancellationToken {
            self.token.clone()
        }

        fn progress(&self, progress: JobProgress) {
            self.progress.lock().unwrap().push(progress);
        }

        fn preview(&self, plan: &ItineraryPlan) {
            self.previews.lock().unwrap().push(plan.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::RecordingContext;
    use super::*;

    #[tokio::test]
    async fn test_guarded_passes_through() {
        let ctx = RecordingContext::new();
        let out = guarded(&ctx, async { 7 }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn test_guarded_cancelled_before_start() {
        let ctx = RecordingContext::new();
        ctx.token.cancel();
        let result = guarded(&ctx, async { 7 }).await;
        assert!(matches!(result, Err(PlannerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_guarded_stale_after_call() {
        let ctx = RecordingContext::new();
        let result = guarded(&ctx, async { ctx.mark_stale() }).await;
        assert!(matches!(result, Err(PlannerError::Stale)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_abandons_slow_call() {
        let ctx = RecordingContext::new();
        let token = ctx.token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            token.cancel();
        });
        let result = guarded(&ctx, tokio::time::sleep(std::time::Duration::from_secs(3600))).await;
        assert!(matches!(result, Err(PlannerError::Cancelled)));
    }

    #[test]
    fn test_detached_context() {
        let ctx = DetachedContext::new();
        assert!(ensure_current(&ctx).is_ok());
        ctx.token().cancel();
        assert!(matches!(ensure_current(&ctx), Err(PlannerError::Cancelled)));
    }
}

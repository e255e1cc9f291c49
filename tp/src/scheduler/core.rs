//! RateLimiter implementation

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::RateLimiterConfig;
use super::queue::{LimiterStats, QueuedCall};

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limiter is shut down")]
    Closed,

    #[error("Scheduled call was dropped before producing a result")]
    Dropped,
}

/// FIFO rate limiter
///
/// Calls are started strictly in submission order, with at least
/// `min_interval` between consecutive starts no matter who submitted them.
/// Each call runs on its own task, so a slow call never holds up the start
/// of the next one. A call whose caller stopped waiting is skipped without
/// using up a slot. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct RateLimiter {
    tx: mpsc::UnboundedSender<QueuedCall>,
    stats: Arc<Mutex<LimiterStats>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a limiter and spawn its drain loop
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &RateLimiterConfig) -> Self {
        debug!(?config, "RateLimiter::new: called");
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(Mutex::new(LimiterStats::default()));
        let min_interval = config.min_interval();

        tokio::spawn(drain_loop(rx, min_interval, stats.clone()));

        Self { tx, stats, min_interval }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Queue `f` and wait for its result
    pub async fn schedule<F, Fut, T>(&self, f: F) -> Result<T, RateLimitError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let call = QueuedCall::new(f, result_tx);

        if let Ok(mut stats) = self.stats.lock() {
            stats.total_submitted += 1;
            let depth = stats.queued() as usize;
            stats.peak_queue_depth = stats.peak_queue_depth.max(depth);
        }
        self.tx.send(call).map_err(|_| RateLimitError::Closed)?;

        result_rx.await.map_err(|_| RateLimitError::Dropped)
    }

    /// Snapshot of the limiter's counters
    pub fn stats(&self) -> LimiterStats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

async fn drain_loop(mut rx: mpsc::UnboundedReceiver<QueuedCall>, min_interval: Duration, stats: Arc<Mutex<LimiterStats>>) {
    debug!(?min_interval, "drain_loop: started");
    let mut last_start: Option<Instant> = None;

    while let Some(queued) = rx.recv().await {
        if queued.call.is_abandoned() {
            record_skip(&stats);
            continue;
        }
        if let Some(last) = last_start {
            let next = last + min_interval;
            if next > Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
        // The caller may have given up during the wait
        if queued.call.is_abandoned() {
            record_skip(&stats);
            continue;
        }

        let started = Instant::now();
        last_start = Some(started);
        let waited = started.duration_since(queued.submitted_at);

        match stats.lock() {
            Ok(mut stats) => {
                stats.total_executed += 1;
                stats.total_wait_time_ms += waited.as_millis() as u64;
            }
            Err(_) => warn!("drain_loop: stats lock poisoned"),
        }

        debug!(waited_ms = waited.as_millis() as u64, "drain_loop: starting call");
        tokio::spawn(queued.call.start());
    }

    debug!("drain_loop: all handles dropped, exiting");
}

fn record_skip(stats: &Mutex<LimiterStats>) {
    debug!("drain_loop: caller gone, skipping call");
    match stats.lock() {
        Ok(mut stats) => stats.total_skipped += 1,
        Err(_) => warn!("drain_loop: stats lock poisoned"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn limiter(ms: u64) -> RateLimiter {
        RateLimiter::new(&RateLimiterConfig { min_interval_ms: ms })
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_are_spaced() {
        let limiter = limiter(1100);
        let base = Instant::now();
        let starts = Arc::new(StdMutex::new(Vec::new()));

        let calls = (0..4).map(|_| {
            let starts = starts.clone();
            limiter.schedule(move || async move {
                starts.lock().unwrap().push(Instant::now());
            })
        });
        futures::future::join_all(calls).await;

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 4);
        assert!(starts[0].duration_since(base) < Duration::from_millis(10));
        for pair in starts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(1100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_order() {
        let limiter = limiter(100);
        let order = Arc::new(StdMutex::new(Vec::new()));

        let calls = (0..5).map(|i| {
            let order = order.clone();
            limiter.schedule(move || async move {
                order.lock().unwrap().push(i);
                i * 10
            })
        });
        let results: Vec<_> = futures::future::join_all(calls).await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        let values: Vec<i32> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 10, 20, 30, 40]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_does_not_block_next_start() {
        let limiter = limiter(1100);
        let base = Instant::now();

        let slow = limiter.schedule(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Instant::now()
        });
        let fast = limiter.schedule(|| async { Instant::now() });
        let (slow_done, fast_start) = tokio::join!(slow, fast);

        let fast_start = fast_start.unwrap().duration_since(base);
        assert!(fast_start >= Duration::from_millis(1100));
        assert!(fast_start < Duration::from_secs(2));
        assert!(slow_done.unwrap().duration_since(base) >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_limiter_starts_immediately_after_interval() {
        let limiter = limiter(1100);
        limiter.schedule(|| async {}).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let before = Instant::now();
        let started = limiter.schedule(|| async { Instant::now() }).await.unwrap();
        assert!(started.duration_since(before) < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats() {
        let limiter = limiter(500);
        let calls = (0..3).map(|_| limiter.schedule(|| async {}));
        futures::future::join_all(calls).await;

        let stats = limiter.stats();
        assert_eq!(stats.total_submitted, 3);
        assert_eq!(stats.total_executed, 3);
        assert_eq!(stats.queued(), 0);
        // Second waits ~500ms, third ~1000ms
        assert!(stats.total_wait_time_ms >= 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_handles_share_queue() {
        let a = limiter(1000);
        let b = a.clone();
        let base = Instant::now();
        let (x, y) = tokio::join!(a.schedule(|| async { Instant::now() }), b.schedule(|| async { Instant::now() }));
        let gap = y.unwrap().duration_since(base).abs_diff(x.unwrap().duration_since(base));
        assert!(gap >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_calls_are_skipped() {
        let limiter = limiter(1100);
        let ran = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let limiter = limiter.clone();
                let ran = ran.clone();
                tokio::spawn(async move {
                    limiter
                        .schedule(move || async move {
                            ran.fetch_add(1, Ordering::SeqCst);
                        })
                        .await
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(50)).await;
        for handle in &handles {
            handle.abort();
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        let stats = limiter.stats();
        assert_eq!(stats.total_executed, 1);
        assert_eq!(stats.total_skipped, 9);
        assert_eq!(stats.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_call_does_not_use_a_slot() {
        let limiter = limiter(1000);
        limiter.schedule(|| async {}).await.unwrap();

        let abandoned = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.schedule(|| async {}).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        abandoned.abort();

        let before = Instant::now();
        let started = limiter.schedule(|| async { Instant::now() }).await.unwrap();
        // Waits out the first call's interval only
        assert!(started.duration_since(before) <= Duration::from_millis(1000));
        assert_eq!(limiter.stats().total_skipped, 1);
    }
}

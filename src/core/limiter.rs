//! Rate-limiting admission scheduler with a dedicated worker thread.
//!
//! The limiter owns one deferred [`RingQueue`] and one [`TokenBucket`] and
//! serializes every mutation onto a single dedicated OS thread consuming a
//! channel. Submissions are channel sends and never block the caller; the
//! drain timer is the worker's deadline wait on that same channel, so an
//! admission decision and a drain pass can never interleave.
//!
//! # Design
//!
//! - **Check-then-act is atomic**: queue and bucket are only touched from
//!   the worker thread
//! - **Polling drain**: deferred items are retried after a fixed delay, not
//!   at an exactly computed refill instant; the worst-case added latency per
//!   cycle is bounded by the delay
//! - **Clean shutdown**: dropping the sender unblocks the worker naturally;
//!   items still queued at that point are discarded

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::RateLimiterConfig;
use crate::core::{LimiterError, RingQueue, TokenBucket, WorkItem};
use crate::util::clock::{Clock, SystemClock};

/// Default fixed delay between drain attempts over the deferred queue.
pub const DEFAULT_DRAIN_DELAY: Duration = Duration::from_millis(100);

/// Initial capacity of the deferred queue; it grows on demand and never
/// shrinks back below this floor.
const DEFERRED_QUEUE_CAPACITY: usize = 8;

/// Statistics about limiter throughput and backlog.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimiterStats {
    /// Items handed to the worker.
    pub submitted: u64,
    /// Items that ran without ever being queued.
    pub ran_immediately: u64,
    /// Items that were deferred onto the queue.
    pub deferred: u64,
    /// Items whose work has run, immediate or drained.
    pub completed: u64,
    /// Items dropped at shutdown or after shutdown.
    pub discarded: u64,
    /// Current deferred-queue depth.
    pub queue_depth: u64,
}

/// Internal counters for limiter statistics (thread-safe).
#[derive(Debug, Default)]
struct LimiterCounters {
    submitted: AtomicU64,
    ran_immediately: AtomicU64,
    deferred: AtomicU64,
    completed: AtomicU64,
    discarded: AtomicU64,
    queue_depth: AtomicU64,
}

impl LimiterCounters {
    /// Get a snapshot of current statistics.
    fn snapshot(&self) -> RateLimiterStats {
        RateLimiterStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            ran_immediately: self.ran_immediately.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }
}

/// Token-bucket admission-control scheduler.
///
/// Work submitted through [`execute`](Self::execute) runs immediately when
/// the backlog is empty and the bucket affords its cost, and is otherwise
/// queued in strict FIFO order and drained on a fixed cadence as tokens
/// replenish. Submission is fire-and-forget: completion observation, if
/// desired, is the caller's responsibility inside the work closure.
///
/// A slow or blocking work closure stalls every later admission decision;
/// there is no timeout or preemption. Keep closures short or hand heavy
/// work to another thread from inside them.
pub struct RateLimiter {
    /// Work sender (to the worker). `None` after shutdown so the worker's
    /// recv unblocks and exits.
    work_tx: Mutex<Option<Sender<WorkItem>>>,
    /// Worker thread handle, taken by `shutdown`.
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<LimiterCounters>,
    shutdown: Arc<AtomicBool>,
}

impl RateLimiter {
    /// Create a limiter using the monotonic system clock.
    ///
    /// # Errors
    ///
    /// Returns `LimiterError::InvalidConfig` when the configuration fails
    /// validation (zero interval, zero rate, zero drain delay) and
    /// `LimiterError::Worker` when the worker thread cannot be spawned.
    pub fn new(config: RateLimiterConfig) -> Result<Self, LimiterError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a limiter with an injected clock for the token bucket.
    ///
    /// The drain cadence still follows real time (it is a wait on the worker
    /// channel); the clock only drives refill arithmetic.
    ///
    /// # Errors
    ///
    /// Same conditions as [`new`](Self::new).
    pub fn with_clock(
        config: RateLimiterConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LimiterError> {
        config.validate().map_err(LimiterError::InvalidConfig)?;
        let bucket = TokenBucket::new(
            config.rate_per_interval,
            config.interval,
            config.capacity,
            config.initial_tokens,
            clock,
        )?;

        let (work_tx, work_rx) = unbounded::<WorkItem>();
        let counters = Arc::new(LimiterCounters::default());
        let worker_counters = Arc::clone(&counters);
        let drain_delay = config.drain_delay;

        let worker = thread::Builder::new()
            .name("rategate-worker".into())
            .spawn(move || {
                Worker {
                    queue: RingQueue::with_capacity(DEFERRED_QUEUE_CAPACITY),
                    bucket,
                    next_drain_at: None,
                    drain_delay,
                    counters: worker_counters,
                }
                .run(&work_rx);
            })
            .map_err(|e| LimiterError::Worker(e.to_string()))?;

        info!(
            rate = config.rate_per_interval,
            interval = ?config.interval,
            capacity = config.capacity,
            initial_tokens = config.initial_tokens,
            "rate limiter started"
        );

        Ok(Self {
            work_tx: Mutex::new(Some(work_tx)),
            worker: Mutex::new(Some(worker)),
            counters,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Submit work with an explicit token cost. Fire-and-forget.
    ///
    /// The closure returns whether its cost should actually be charged; a
    /// caller that discovers its action was a no-op returns `false` and
    /// stays free. Cost 0 is always admitted immediately once it reaches the
    /// head of the line, regardless of the bucket balance.
    pub fn execute<F>(&self, cost: u64, work: F)
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        self.execute_item(WorkItem::new(cost, work));
    }

    /// Submit work with the default cost of 1.
    pub fn execute_simple<F>(&self, work: F)
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        self.execute_item(WorkItem::new(1, work));
    }

    /// Submit a pre-built work item. Fire-and-forget.
    ///
    /// Items submitted after shutdown are dropped without execution; use
    /// [`try_execute_item`](Self::try_execute_item) to observe the drop.
    pub fn execute_item(&self, item: WorkItem) {
        let cost = item.cost;
        if self.try_execute_item(item).is_err() {
            warn!(cost, "limiter is shut down; dropping work item");
        }
    }

    /// Submit a pre-built work item, reporting whether it was accepted.
    ///
    /// # Errors
    ///
    /// Returns `LimiterError::Shutdown` when the limiter no longer accepts
    /// work; the item is dropped and counted as discarded.
    pub fn try_execute_item(&self, item: WorkItem) -> Result<(), LimiterError> {
        if self.shutdown.load(Ordering::Acquire) {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            return Err(LimiterError::Shutdown);
        }

        let work_tx_guard = self.work_tx.lock();
        let Some(work_tx) = work_tx_guard.as_ref() else {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            return Err(LimiterError::Shutdown);
        };

        let cost = item.cost;
        if work_tx.send(item).is_err() {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            return Err(LimiterError::Shutdown);
        }
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(cost, "work item submitted");
        Ok(())
    }

    /// Get current limiter statistics.
    #[must_use]
    pub fn stats(&self) -> RateLimiterStats {
        self.counters.snapshot()
    }

    /// Shut down the limiter and join the worker thread.
    ///
    /// Idempotent. Stops accepting submissions, unblocks the worker by
    /// dropping the sender, and waits for it to exit. Items still queued are
    /// discarded without execution; callers that cannot lose work must let
    /// the backlog drain before calling this.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return; // Already shut down
        }

        info!("shutting down rate limiter");

        // Drop the sender to unblock the worker's recv
        {
            let mut work_tx = self.work_tx.lock();
            *work_tx = None;
        }

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!("limiter worker panicked");
            }
        }

        info!("rate limiter shut down");
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        // Signal shutdown but do not join in Drop; explicit shutdown() is
        // required for graceful cleanup.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            let mut work_tx = self.work_tx.lock();
            *work_tx = None;
            debug!("RateLimiter dropped without explicit shutdown - worker will be detached");
        }
    }
}

/// State owned exclusively by the worker thread.
struct Worker {
    queue: RingQueue<WorkItem>,
    bucket: TokenBucket,
    /// `Some` means exactly one pending drain wake-up exists.
    next_drain_at: Option<Instant>,
    drain_delay: Duration,
    counters: Arc<LimiterCounters>,
}

impl Worker {
    /// Worker loop: wait for submissions, or for the drain deadline when one
    /// is armed. Exits when the sender is dropped.
    fn run(mut self, work_rx: &Receiver<WorkItem>) {
        debug!("limiter worker started");

        loop {
            let item = if let Some(deadline) = self.next_drain_at {
                match work_rx.recv_deadline(deadline) {
                    Ok(item) => item,
                    Err(RecvTimeoutError::Timeout) => {
                        self.drain();
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match work_rx.recv() {
                    Ok(item) => item,
                    Err(_) => break,
                }
            };

            self.admit(item);
        }

        let leftover = self.queue.len() as u64;
        if leftover > 0 {
            self.counters.discarded.fetch_add(leftover, Ordering::Relaxed);
            self.counters.queue_depth.store(0, Ordering::Relaxed);
            warn!(leftover, "limiter stopped with items still queued; discarding them");
        }
        debug!("limiter worker exiting");
    }

    /// Decide between running an item now and deferring it.
    ///
    /// The backlog check comes before the affordability check: a newly
    /// arriving cheap item must not jump ahead of older queued items even if
    /// tokens are currently available for it.
    fn admit(&mut self, item: WorkItem) {
        if !self.queue.is_empty() || !self.bucket.can_consume(item.cost) {
            debug!(cost = item.cost, backlog = self.queue.len(), "deferring work item");
            self.queue.enqueue(item);
            self.counters.deferred.fetch_add(1, Ordering::Relaxed);
            self.counters
                .queue_depth
                .store(self.queue.len() as u64, Ordering::Relaxed);
            self.schedule_drain();
        } else {
            self.counters.ran_immediately.fetch_add(1, Ordering::Relaxed);
            self.run_item(item);
        }
    }

    /// Run an item's work and charge the bucket only when the work reports
    /// that its cost applies.
    fn run_item(&mut self, item: WorkItem) {
        let cost = item.cost;
        if item.run() {
            // Affordability was checked just before; tokens only grow while
            // the work runs, so the charge cannot fail.
            if !self.bucket.consume(cost) {
                warn!(cost, "bucket could not charge an admitted item");
            }
        }
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Arm the drain timer unless one is already pending.
    fn schedule_drain(&mut self) {
        if self.next_drain_at.is_none() {
            self.next_drain_at = Some(Instant::now() + self.drain_delay);
            debug!(delay = ?self.drain_delay, "drain scheduled");
        }
    }

    /// Run queued items while the head is affordable, then re-arm the timer
    /// if a backlog remains.
    fn drain(&mut self) {
        self.next_drain_at = None;

        loop {
            let Some(head_cost) = self.queue.head().map(|item| item.cost) else {
                break;
            };
            if !self.bucket.can_consume(head_cost) {
                debug!(head_cost, backlog = self.queue.len(), "drain paused: head unaffordable");
                break;
            }
            let Some(item) = self.queue.dequeue() else {
                break;
            };
            self.run_item(item);
        }

        self.counters
            .queue_depth
            .store(self.queue.len() as u64, Ordering::Relaxed);

        if !self.queue.is_empty() {
            self.schedule_drain();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fast_config() -> RateLimiterConfig {
        RateLimiterConfig::new(2, Duration::from_millis(20), 20)
            .with_initial_tokens(5)
            .with_drain_delay(Duration::from_millis(5))
    }

    fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = RateLimiterConfig::new(3, Duration::ZERO, 20);
        assert!(matches!(
            RateLimiter::new(config),
            Err(LimiterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_immediate_execution_within_initial_tokens() {
        let limiter = RateLimiter::new(fast_config()).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let ran = Arc::clone(&ran);
            limiter.execute_simple(move || {
                ran.fetch_add(1, Ordering::Relaxed);
                true
            });
        }

        assert!(wait_until(Duration::from_secs(2), || {
            ran.load(Ordering::Relaxed) == 5
        }));
        let stats = limiter.stats();
        assert_eq!(stats.submitted, 5);
        assert_eq!(stats.ran_immediately, 5);
        assert_eq!(stats.deferred, 0);
        limiter.shutdown();
    }

    #[test]
    fn test_overload_defers_and_drains() {
        let limiter = RateLimiter::new(fast_config()).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..12 {
            let ran = Arc::clone(&ran);
            limiter.execute_simple(move || {
                ran.fetch_add(1, Ordering::Relaxed);
                true
            });
        }

        // 5 immediate, 7 deferred; at 2 tokens per 20ms the backlog clears
        // well within the deadline.
        assert!(wait_until(Duration::from_secs(5), || {
            ran.load(Ordering::Relaxed) == 12
        }));
        let stats = limiter.stats();
        assert_eq!(stats.completed, 12);
        assert!(stats.deferred > 0);
        assert_eq!(stats.queue_depth, 0);
        limiter.shutdown();
    }

    #[test]
    fn test_execute_after_shutdown_is_discarded() {
        let limiter = RateLimiter::new(fast_config()).unwrap();
        limiter.shutdown();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);
        limiter.execute_simple(move || {
            ran_clone.fetch_add(1, Ordering::Relaxed);
            true
        });
        thread::sleep(Duration::from_millis(50));
        assert_eq!(ran.load(Ordering::Relaxed), 0);
        assert_eq!(limiter.stats().discarded, 1);
    }

    #[test]
    fn test_try_execute_after_shutdown_reports_shutdown() {
        let limiter = RateLimiter::new(fast_config()).unwrap();
        let result = limiter.try_execute_item(WorkItem::new(1, || true));
        assert!(result.is_ok());
        limiter.shutdown();
        let result = limiter.try_execute_item(WorkItem::new(1, || true));
        assert!(matches!(result, Err(LimiterError::Shutdown)));
        assert_eq!(limiter.stats().discarded, 1);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let limiter = RateLimiter::new(fast_config()).unwrap();
        limiter.shutdown();
        limiter.shutdown();
    }
}

//! Replan loop primitives.
//!
//! This library provides helpers for queue consumers that reconcile
//! disrupted missions back into the schedule. Key concepts:
//!
//! - **Disposition**: what happens to a delivered task after one attempt
//!   (ack, requeue, dead-letter).
//! - **Retry budget**: how many transient failures a key may accumulate
//!   inside a window before it stops being requeued.
//!
//! # Invariants
//!
//! - Decisions are deterministic given the same inputs
//! - A key that succeeds has its failure history cleared
//! - A key never loops forever: transient failures beyond the budget dead-letter

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// The task is done and removed from the queue.
    Ack,

    /// The task failed transiently and goes back on the queue.
    Requeue,

    /// The task failed for good (or ran out of retries) and is dropped.
    DeadLetter,
}

impl Disposition {
    /// The `requeue` flag for a negative acknowledgement, or `None` for an ack.
    pub fn requeue_flag(&self) -> Option<bool> {
        match self {
            Self::Ack => None,
            Self::Requeue => Some(true),
            Self::DeadLetter => Some(false),
        }
    }

    /// Returns true if the task will not be delivered again.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Requeue)
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ack => "ack",
            Self::Requeue => "requeue",
            Self::DeadLetter => "dead_letter",
        };
        write!(f, "{}", s)
    }
}

/// Running totals for a consumer, reported on shutdown and by the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub acked: u64,
    pub requeued: u64,
    pub dead_lettered: u64,
}

impl PassStats {
    /// Count one delivery outcome.
    pub fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Ack => self.acked += 1,
            Disposition::Requeue => self.requeued += 1,
            Disposition::DeadLetter => self.dead_lettered += 1,
        }
    }

    /// Total deliveries handled.
    pub fn total(&self) -> u64 {
        self.acked + self.requeued + self.dead_lettered
    }
}

/// Retry tracker for failed operations.
///
/// Keys are whatever identifies the unit of work (a mission id for the
/// replan worker).
#[derive(Debug, Clone)]
pub struct RetryTracker<K> {
    /// Maximum retries per key.
    max_retries: u32,

    /// Retry window duration.
    window: Duration,

    /// Tracked failures: key -> (count, first_failure_time).
    failures: BTreeMap<K, (u32, Instant)>,
}

impl<K: Ord + Clone> RetryTracker<K> {
    /// Create a new retry tracker.
    pub fn new(max_retries: u32, window: Duration) -> Self {
        Self {
            max_retries,
            window,
            failures: BTreeMap::new(),
        }
    }

    /// Counts one more failure for `key`, restarting the count when the
    /// previous one fell outside the window. Returns true once the budget is spent.
    pub fn record_failure(&mut self, key: &K) -> bool {
        let now = Instant::now();
        let window = self.window;
        let entry = self.failures.entry(key.clone()).or_insert((0, now));

        if now.duration_since(entry.1) > window {
            *entry = (0, now);
        }
        entry.0 += 1;
        entry.0 > self.max_retries
    }

    /// Whether one more failure would spend the budget. Does not record it.
    pub fn next_failure_exhausts(&self, key: &K) -> bool {
        let live = match self.failures.get(key) {
            Some((count, first)) if Instant::now().duration_since(*first) <= self.window => *count,
            _ => 0,
        };
        live + 1 > self.max_retries
    }

    pub fn failures(&self, key: &K) -> u32 {
        self.failures.get(key).map_or(0, |(count, _)| *count)
    }

    pub fn clear(&mut self, key: &K) {
        self.failures.remove(key);
    }

    /// Drops keys whose window has closed.
    pub fn prune(&mut self) {
        let now = Instant::now();
        let window = self.window;
        self.failures
            .retain(|_, (_, first)| now.duration_since(*first) <= window);
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Disposition a transient failure of `key` should get: requeue while the
    /// budget lasts, dead-letter once it is spent. Nothing is recorded until
    /// [`settle`](Self::settle) is called.
    pub fn transient_disposition(&self, key: &K) -> Disposition {
        if self.next_failure_exhausts(key) {
            Disposition::DeadLetter
        } else {
            Disposition::Requeue
        }
    }

    /// Applies a disposition that reached the queue. A requeue spends one
    /// retry; an ack or dead-letter forgets the key.
    pub fn settle(&mut self, key: &K, disposition: Disposition) {
        match disposition {
            Disposition::Requeue => {
                self.record_failure(key);
            }
            Disposition::Ack | Disposition::DeadLetter => self.clear(key),
        }
    }
}

impl<K: Ord + Clone> Default for RetryTracker<K> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WINDOW)
    }
}

/// Default sleep between idle polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default transient retry limit per mission.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default retry window.
pub const DEFAULT_RETRY_WINDOW: Duration = Duration::from_secs(10 * 60); // 10 minutes

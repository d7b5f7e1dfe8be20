//! Per-execution attempt state shared with hooks and the operation.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Mutable state for one retry execution.
///
/// A fresh context is created per [`RetryPolicy::execute`](crate::RetryPolicy::execute)
/// call and handed to every hook and to the operation itself; nothing is
/// shared across separate executions. Cloning is cheap and yields a handle to
/// the same state, which lets the operation's future own a context without
/// borrowing across an await point. Within one execution only the sequential
/// attempt loop advances the counters, so the atomics never contend.
#[derive(Debug, Clone)]
pub struct AttemptContext {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    attempt_num: AtomicUsize,
    // -1 encodes an unlimited budget (max_attempts == 0).
    attempts_remaining: AtomicI64,
    aborted: AtomicBool,
}

impl AttemptContext {
    pub(crate) fn new(max_attempts: usize) -> Self {
        let remaining = if max_attempts == 0 {
            -1
        } else {
            i64::try_from(max_attempts).unwrap_or(i64::MAX)
        };
        Self {
            shared: Arc::new(Shared {
                attempt_num: AtomicUsize::new(0),
                attempts_remaining: AtomicI64::new(remaining),
                aborted: AtomicBool::new(false),
            }),
        }
    }

    /// 0-based number of the attempt in flight or just completed. It counts
    /// prior failures: 0 on the first attempt, incremented only after a
    /// failure, before the next delay is calculated.
    pub fn attempt_num(&self) -> usize {
        self.shared.attempt_num.load(Ordering::SeqCst)
    }

    /// Attempts left in a finite budget, or `None` when `max_attempts == 0`
    /// (unlimited). Reaches `Some(0)` on the final attempt.
    pub fn attempts_remaining(&self) -> Option<usize> {
        let remaining = self.shared.attempts_remaining.load(Ordering::SeqCst);
        usize::try_from(remaining).ok()
    }

    /// Whether [`abort`](Self::abort) has been called.
    pub fn is_aborted(&self) -> bool {
        self.shared.aborted.load(Ordering::SeqCst)
    }

    /// Permanently stop further attempts. Idempotent; the flag is sticky.
    ///
    /// Aborting never preempts an attempt already in flight. It prevents the
    /// next one from starting and makes the loop reject once the current
    /// attempt's error handling observes the flag.
    pub fn abort(&self) {
        self.shared.aborted.store(true, Ordering::SeqCst);
    }

    /// Consume one attempt from a finite budget, clamped at zero. No-op for
    /// unlimited budgets.
    pub(crate) fn consume_attempt(&self) {
        let _ = self.shared.attempts_remaining.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |remaining| if remaining > 0 { Some(remaining - 1) } else { None },
        );
    }

    /// Advance to the next attempt after a failure.
    pub(crate) fn next_attempt(&self) {
        self.shared.attempt_num.fetch_add(1, Ordering::SeqCst);
    }
}

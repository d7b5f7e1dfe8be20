//! How delays are applied.
//!
//! The attempt loop never calls `tokio::time::sleep` directly; it goes
//! through a [`Sleeper`] so tests can observe or skip delays without real
//! time passing. Production uses [`TokioSleeper`]; tests inject
//! [`InstantSleeper`] or [`RecordingSleeper`].

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Abstraction over waiting out a delay.
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test sleeper that returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Test sleeper that records every requested delay and returns immediately,
/// so delay schedules can be asserted exactly.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded delays, in order.
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    /// Drop all recorded delays.
    pub fn clear(&self) {
        self.slept.lock().unwrap().clear();
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

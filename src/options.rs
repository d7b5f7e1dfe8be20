//! Retry policy configuration and validation.
//!
//! [`AttemptOptions`] is the plain, copyable policy record. Callers set any
//! subset of fields over [`Default`] (struct update syntax or the
//! [`RetryPolicyBuilder`](crate::RetryPolicyBuilder) setters); validation runs
//! once, before any attempt, so a bad policy can never partially execute.
//!
//! Time is modeled with [`Duration`]; delay math happens at millisecond
//! resolution. Hooks are not part of this record — they live on
//! [`RetryPolicy`](crate::RetryPolicy), which keeps the options `Copy` and
//! (with the `serde` feature) serializable.

use crate::error::ConfigError;
use std::time::Duration;

/// Resolved retry policy options.
///
/// | Field | Default | Zero means |
/// |---|---|---|
/// | `delay` | 200 ms | no throttling between attempts |
/// | `initial_delay` | 0 | no wait before the first attempt |
/// | `min_delay` | 0 | no jitter floor |
/// | `max_delay` | 0 | no cap on calculated delay |
/// | `factor` | 0.0 | no growth |
/// | `max_attempts` | 3 | unlimited attempts |
/// | `timeout` | 0 | no per-attempt deadline |
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AttemptOptions {
    /// Base delay between attempts.
    pub delay: Duration,
    /// Delay before the very first attempt.
    pub initial_delay: Duration,
    /// Lower bound enforced when jitter is active.
    pub min_delay: Duration,
    /// Upper bound on the calculated delay; zero disables the cap.
    pub max_delay: Duration,
    /// Multiplicative growth per attempt; zero disables growth.
    pub factor: f64,
    /// Hard cap on total attempts; zero means unlimited.
    pub max_attempts: usize,
    /// Per-attempt deadline; zero disables the timeout race.
    pub timeout: Duration,
    /// Replace each calculated delay with a uniform draw from
    /// `[min_delay, calculated]` (full jitter).
    pub jitter: bool,
}

impl Default for AttemptOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(200),
            initial_delay: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 0.0,
            max_attempts: 3,
            timeout: Duration::ZERO,
            jitter: false,
        }
    }
}

impl AttemptOptions {
    /// Check the policy invariants.
    ///
    /// Runs in [`RetryPolicyBuilder::build`](crate::RetryPolicyBuilder::build)
    /// and in [`retry`](crate::retry()) before a context is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(ConfigError::InvalidFactor { factor: self.factor });
        }
        if self.delay < self.min_delay {
            return Err(ConfigError::InvalidDelayBounds {
                delay: self.delay,
                min_delay: self.min_delay,
            });
        }
        // A nonzero cap below the jitter floor would invert the jitter range.
        if !self.max_delay.is_zero() && self.max_delay < self.min_delay {
            return Err(ConfigError::InvalidOption {
                field: "max_delay",
                reason: "must be zero or >= min_delay",
            });
        }
        Ok(())
    }
}

//! Error types for the retry engine.
//!
//! Configuration problems are rejected before any attempt runs and surface as
//! [`ConfigError`]. Everything that can end an execution is an
//! [`AttemptError`], with the operation's own error carried verbatim in
//! [`AttemptError::Inner`].

use std::time::Duration;
use thiserror::Error;

/// A policy rejected during validation. No attempt is ever made with an
/// invalid policy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A field holds a value that contradicts the rest of the policy.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidOption {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// `factor` must be a finite number greater than or equal to zero.
    #[error("factor must be a finite number >= 0 (got {factor})")]
    InvalidFactor {
        /// The rejected factor.
        factor: f64,
    },

    /// `delay` must be at least `min_delay`.
    #[error("delay ({delay:?}) cannot be less than min_delay ({min_delay:?})")]
    InvalidDelayBounds {
        /// Configured base delay.
        delay: Duration,
        /// Configured lower bound.
        min_delay: Duration,
    },
}

/// Final error of a retry execution.
///
/// `E` is the operation's error type; it is never inspected by the engine
/// itself. Classifying errors as retryable or fatal is entirely the job of a
/// `handle_error` hook calling [`AttemptContext::abort`](crate::AttemptContext::abort).
#[derive(Debug, Clone, Error)]
pub enum AttemptError<E> {
    /// The policy failed validation; zero attempts were made.
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    /// `abort()` was called before another attempt could start.
    #[error("attempt aborted (attempt_num: {attempt})")]
    Aborted {
        /// 0-based attempt number at which the abort was observed.
        attempt: usize,
    },

    /// A per-attempt deadline elapsed and no `handle_timeout` hook was
    /// supplied.
    #[error("attempt timed out (attempt_num: {attempt}, timeout: {timeout:?})")]
    TimeoutExceeded {
        /// 0-based attempt number that timed out.
        attempt: usize,
        /// The configured per-attempt deadline.
        timeout: Duration,
    },

    /// The operation's own error (or a `handle_error` replacement),
    /// propagated verbatim.
    #[error(transparent)]
    Inner(E),
}

impl<E> AttemptError<E> {
    /// Check if this error is a rejected configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if the execution was aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Check if this error is an unhandled per-attempt timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimeoutExceeded { .. })
    }

    /// Check if this error wraps an operation error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Get the operation error if this is an `Inner` variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow the operation error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Attempt number carried by `Aborted`/`TimeoutExceeded`, if any.
    pub fn attempt(&self) -> Option<usize> {
        match self {
            Self::Aborted { attempt } | Self::TimeoutExceeded { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct DummyError(&'static str);

    impl fmt::Display for DummyError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for DummyError {}

    #[test]
    fn config_error_display_names_the_field() {
        let err =
            ConfigError::InvalidOption { field: "max_delay", reason: "must be zero or >= min_delay" };
        assert!(err.to_string().contains("max_delay"));

        let err = ConfigError::InvalidDelayBounds {
            delay: Duration::from_millis(100),
            min_delay: Duration::from_millis(200),
        };
        assert!(err.to_string().contains("min_delay"));

        let err = ConfigError::InvalidFactor { factor: -1.0 };
        assert!(err.to_string().contains("-1"));
    }

    #[test]
    fn config_error_converts_into_attempt_error() {
        let err: AttemptError<DummyError> = ConfigError::InvalidFactor { factor: f64::NAN }.into();
        assert!(err.is_config());
        assert!(!err.is_inner());
    }

    #[test]
    fn aborted_and_timeout_carry_attempt_numbers() {
        let aborted: AttemptError<DummyError> = AttemptError::Aborted { attempt: 2 };
        assert!(aborted.is_aborted());
        assert_eq!(aborted.attempt(), Some(2));

        let timed_out: AttemptError<DummyError> =
            AttemptError::TimeoutExceeded { attempt: 1, timeout: Duration::from_millis(50) };
        assert!(timed_out.is_timeout());
        assert_eq!(timed_out.attempt(), Some(1));
        let msg = timed_out.to_string();
        assert!(msg.contains("attempt_num: 1"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn inner_is_propagated_verbatim() {
        let err = AttemptError::Inner(DummyError("boom"));
        assert!(err.is_inner());
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.as_inner(), Some(&DummyError("boom")));
        assert_eq!(err.into_inner(), Some(DummyError("boom")));
    }

    #[test]
    fn non_inner_variants_have_no_inner() {
        let err: AttemptError<DummyError> = AttemptError::Aborted { attempt: 0 };
        assert!(err.as_inner().is_none());
        assert!(err.into_inner().is_none());
    }
}

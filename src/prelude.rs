//! Convenient re-exports for common attempt types.
pub use crate::{
    context::AttemptContext,
    delay::{default_calculate_delay, MAX_CALCULATED_DELAY},
    error::{AttemptError, ConfigError},
    layer::{RetryLayer, RetryService},
    options::AttemptOptions,
    retry::{retry, RetryPolicy, RetryPolicyBuilder},
    sleeper::{InstantSleeper, RecordingSleeper, Sleeper, TokioSleeper},
};

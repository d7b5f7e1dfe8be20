//! The attempt loop: policy, builder, hooks, and the `retry` entry point.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries); zero means
//!   unlimited.
//! - `attempt_num` counts prior failures: 0 on the first attempt,
//!   incremented only after a failure and before the next delay is
//!   calculated.
//! - Hooks customize every decision point: `before_attempt` may abort before
//!   an attempt starts, `handle_error` may replace the error or abort,
//!   `handle_timeout` supplies a fallback when a per-attempt deadline fires,
//!   and `calculate_delay` replaces the default backoff (including the
//!   pre-loop initial delay).
//! - The engine draws no line between retryable and fatal errors; that
//!   classification belongs to `handle_error` via [`AttemptContext::abort`].
//! - The `Sleeper` controls how delays are applied (production uses
//!   [`TokioSleeper`]; tests inject [`InstantSleeper`](crate::InstantSleeper)
//!   or [`RecordingSleeper`](crate::RecordingSleeper)).
//!
//! Example
//! ```rust
//! use attempt::{AttemptOptions, RetryPolicy};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct MyErr;
//! impl std::fmt::Display for MyErr {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "oops") }
//! }
//! impl std::error::Error for MyErr {}
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let policy = RetryPolicy::<(), MyErr>::builder()
//!     .max_attempts(3)
//!     .delay(Duration::from_millis(100))
//!     .factor(2.0)
//!     .jitter(true)
//!     .build()
//!     .unwrap();
//! let result = policy.execute(|_context, _options| async { Err::<(), _>(MyErr) }).await;
//! assert!(result.is_err());
//! # });
//! ```

use crate::delay::default_calculate_delay;
use crate::error::ConfigError;
use crate::{AttemptContext, AttemptError, AttemptOptions, Sleeper, TokioSleeper};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Observe or abort before each attempt. Runs before the attempt budget is
/// consumed and before the operation is invoked.
pub type BeforeAttempt = Arc<dyn Fn(&AttemptContext, &AttemptOptions) + Send + Sync>;

/// Inspect a failed attempt's error. The returned error supersedes the
/// original for every subsequent decision; return the argument unchanged to
/// only observe, or call [`AttemptContext::abort`] to stop retrying.
pub type HandleError<E> =
    Arc<dyn Fn(AttemptError<E>, &AttemptContext, &AttemptOptions) -> AttemptError<E> + Send + Sync>;

/// Supply a fallback outcome when a per-attempt deadline fires.
pub type HandleTimeout<T, E> = Arc<
    dyn Fn(&AttemptContext, &AttemptOptions) -> BoxFuture<'static, Result<T, E>> + Send + Sync,
>;

/// Replace the default delay shaping. Also called once with `attempt_num == 0`
/// for the pre-loop initial delay.
pub type CalculateDelay = Arc<dyn Fn(&AttemptContext, &AttemptOptions) -> Duration + Send + Sync>;

/// A validated retry policy: options, optional hooks, and a sleeper.
///
/// `T` is the operation's success type (it appears in the `handle_timeout`
/// fallback), `E` its error type. Policies are cheap to clone and reusable;
/// every [`execute`](Self::execute) owns a fresh [`AttemptContext`].
pub struct RetryPolicy<T, E> {
    options: AttemptOptions,
    before_attempt: Option<BeforeAttempt>,
    handle_error: Option<HandleError<E>>,
    handle_timeout: Option<HandleTimeout<T, E>>,
    calculate_delay: Option<CalculateDelay>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T, E> Clone for RetryPolicy<T, E> {
    fn clone(&self) -> Self {
        Self {
            options: self.options,
            before_attempt: self.before_attempt.clone(),
            handle_error: self.handle_error.clone(),
            handle_timeout: self.handle_timeout.clone(),
            calculate_delay: self.calculate_delay.clone(),
            sleeper: self.sleeper.clone(),
        }
    }
}

impl<T, E> fmt::Debug for RetryPolicy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("options", &self.options)
            .field("before_attempt", &self.before_attempt.is_some())
            .field("handle_error", &self.handle_error.is_some())
            .field("handle_timeout", &self.handle_timeout.is_some())
            .field("calculate_delay", &self.calculate_delay.is_some())
            .field("sleeper", &self.sleeper)
            .finish()
    }
}

impl<T, E> RetryPolicy<T, E>
where
    T: Send,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Construct a new builder with default options and no hooks.
    pub fn builder() -> RetryPolicyBuilder<T, E> {
        RetryPolicyBuilder::new()
    }

    /// The resolved options this policy runs with.
    pub fn options(&self) -> &AttemptOptions {
        &self.options
    }

    /// Run `operation` under this policy until it succeeds, the attempt
    /// budget is exhausted, or an abort is observed.
    ///
    /// The operation receives an owned handle to the execution's
    /// [`AttemptContext`] and a copy of the resolved options on every
    /// attempt.
    pub async fn execute<Op, Fut>(&self, mut operation: Op) -> Result<T, AttemptError<E>>
    where
        Op: FnMut(AttemptContext, AttemptOptions) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        let options = self.options;
        let context = AttemptContext::new(options.max_attempts);

        // A custom calculator owns the pre-loop wait as well; otherwise the
        // initial delay is used verbatim.
        let initial = match &self.calculate_delay {
            Some(calculate) => calculate(&context, &options),
            None => options.initial_delay,
        };
        if !initial.is_zero() {
            self.sleeper.sleep(initial).await;
        }

        loop {
            if let Some(hook) = &self.before_attempt {
                hook(&context, &options);
            }
            if context.is_aborted() {
                tracing::debug!(attempt = context.attempt_num(), "aborted before attempt");
                return Err(AttemptError::Aborted { attempt: context.attempt_num() });
            }
            context.consume_attempt();

            tracing::debug!(
                attempt = context.attempt_num(),
                max_attempts = options.max_attempts,
                "starting attempt"
            );

            let error = match self.run_attempt(&mut operation, &context, options).await {
                Ok(value) => return Ok(value),
                Err(error) => match &self.handle_error {
                    // The hook's return value supersedes the original error
                    // for every decision below.
                    Some(hook) => hook(error, &context, &options),
                    None => error,
                },
            };

            if context.is_aborted() {
                tracing::debug!(attempt = context.attempt_num(), "giving up: aborted");
                return Err(error);
            }
            if context.attempts_remaining() == Some(0) {
                tracing::debug!(attempt = context.attempt_num(), "giving up: attempts exhausted");
                return Err(error);
            }

            context.next_attempt();
            let delay = match &self.calculate_delay {
                Some(calculate) => calculate(&context, &options),
                None => default_calculate_delay(&context, &options),
            };
            tracing::debug!(
                attempt = context.attempt_num(),
                delay_ms = delay.as_millis() as u64,
                "retrying after delay"
            );
            if !delay.is_zero() {
                self.sleeper.sleep(delay).await;
            }
        }
    }

    /// One attempt: invoke the operation, racing it against the per-attempt
    /// deadline when one is configured. The losing operation future is
    /// dropped, so a late result can never resolve the call.
    async fn run_attempt<Op, Fut>(
        &self,
        operation: &mut Op,
        context: &AttemptContext,
        options: AttemptOptions,
    ) -> Result<T, AttemptError<E>>
    where
        Op: FnMut(AttemptContext, AttemptOptions) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if options.timeout.is_zero() {
            return operation(context.clone(), options).await.map_err(AttemptError::Inner);
        }

        match tokio::time::timeout(options.timeout, operation(context.clone(), options)).await {
            Ok(outcome) => outcome.map_err(AttemptError::Inner),
            Err(_elapsed) => {
                tracing::warn!(
                    attempt = context.attempt_num(),
                    timeout_ms = options.timeout.as_millis() as u64,
                    "attempt timed out"
                );
                match &self.handle_timeout {
                    Some(hook) => hook(context, &options).await.map_err(AttemptError::Inner),
                    None => Err(AttemptError::TimeoutExceeded {
                        attempt: context.attempt_num(),
                        timeout: options.timeout,
                    }),
                }
            }
        }
    }
}

/// Retry an asynchronous operation with the given options and no hooks.
///
/// This is the function-style entry point; reach for
/// [`RetryPolicy::builder`] when hooks or a custom sleeper are needed.
/// Configuration errors reject before any attempt is made.
///
/// ```rust
/// use attempt::{retry, AttemptOptions};
/// use std::time::Duration;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let greeting = retry(
///     |_context, _options| async { Ok::<_, std::io::Error>("hello") },
///     AttemptOptions { delay: Duration::from_millis(50), ..Default::default() },
/// )
/// .await
/// .unwrap();
/// assert_eq!(greeting, "hello");
/// # });
/// ```
pub async fn retry<T, E, Op, Fut>(
    operation: Op,
    options: AttemptOptions,
) -> Result<T, AttemptError<E>>
where
    T: Send,
    E: std::error::Error + Send + Sync + 'static,
    Op: FnMut(AttemptContext, AttemptOptions) -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
{
    let policy = RetryPolicy::<T, E>::builder().options(options).build()?;
    policy.execute(operation).await
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder<T, E> {
    options: AttemptOptions,
    before_attempt: Option<BeforeAttempt>,
    handle_error: Option<HandleError<E>>,
    handle_timeout: Option<HandleTimeout<T, E>>,
    calculate_delay: Option<CalculateDelay>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T, E> RetryPolicyBuilder<T, E> {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self {
            options: AttemptOptions::default(),
            before_attempt: None,
            handle_error: None,
            handle_timeout: None,
            calculate_delay: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace all numeric options at once.
    pub fn options(mut self, options: AttemptOptions) -> Self {
        self.options = options;
        self
    }

    /// Base delay between attempts.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.options.delay = delay;
        self
    }

    /// Delay before the very first attempt.
    pub fn initial_delay(mut self, initial_delay: Duration) -> Self {
        self.options.initial_delay = initial_delay;
        self
    }

    /// Lower bound enforced when jitter is active.
    pub fn min_delay(mut self, min_delay: Duration) -> Self {
        self.options.min_delay = min_delay;
        self
    }

    /// Upper bound on the calculated delay; zero disables the cap.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.options.max_delay = max_delay;
        self
    }

    /// Multiplicative growth per attempt; zero disables growth.
    pub fn factor(mut self, factor: f64) -> Self {
        self.options.factor = factor;
        self
    }

    /// Total attempts (initial try + retries); zero means unlimited.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.options.max_attempts = max_attempts;
        self
    }

    /// Per-attempt deadline; zero disables the timeout race.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Enable full-jitter randomization of calculated delays.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.options.jitter = jitter;
        self
    }

    /// Hook run before each attempt; may call [`AttemptContext::abort`].
    pub fn before_attempt<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AttemptContext, &AttemptOptions) + Send + Sync + 'static,
    {
        self.before_attempt = Some(Arc::new(hook));
        self
    }

    /// Hook run on every failed attempt; its return value supersedes the
    /// error it was given.
    pub fn handle_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(AttemptError<E>, &AttemptContext, &AttemptOptions) -> AttemptError<E>
            + Send
            + Sync
            + 'static,
    {
        self.handle_error = Some(Arc::new(hook));
        self
    }

    /// Async hook supplying a fallback outcome when a per-attempt deadline
    /// fires.
    pub fn handle_timeout<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(&AttemptContext, &AttemptOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.handle_timeout = Some(Arc::new(move |context, options| Box::pin(hook(context, options))));
        self
    }

    /// Replace the default delay calculation, including the pre-loop initial
    /// delay (called once with `attempt_num == 0`).
    pub fn calculate_delay<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AttemptContext, &AttemptOptions) -> Duration + Send + Sync + 'static,
    {
        self.calculate_delay = Some(Arc::new(hook));
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Validate the options and freeze the policy.
    pub fn build(self) -> Result<RetryPolicy<T, E>, ConfigError> {
        self.options.validate()?;
        Ok(RetryPolicy {
            options: self.options,
            before_attempt: self.before_attempt,
            handle_error: self.handle_error,
            handle_timeout: self.handle_timeout,
            calculate_delay: self.calculate_delay,
            sleeper: self.sleeper,
        })
    }
}

impl<T, E> Default for RetryPolicyBuilder<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # attempt
//!
//! A retry engine for async operations: exponential backoff with full
//! jitter, per-attempt timeouts, and hooks at every decision point.
//!
//! ## Features
//!
//! - **Attempt budgets** counting total tries, with unlimited mode
//! - **Backoff shaping** via delay, growth factor, min/max bounds, and
//!   full jitter
//! - **Per-attempt timeouts** that cancel the losing operation future
//! - **Hooks** to observe attempts, rewrite errors, supply timeout
//!   fallbacks, or replace the delay calculation entirely
//! - **Abort** from any hook or from the operation itself
//! - **Tower middleware** for wrapping services
//!
//! ## Quick Start
//!
//! ```rust
//! use attempt::{retry, AttemptOptions};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = AttemptOptions {
//!         max_attempts: 3,
//!         delay: Duration::from_millis(200),
//!         factor: 2.0,
//!         jitter: true,
//!         ..Default::default()
//!     };
//!
//!     let result = retry(
//!         |_context, _options| async {
//!             // Your async operation here
//!             Ok::<_, std::io::Error>(())
//!         },
//!         options,
//!     )
//!     .await;
//!     assert!(result.is_ok());
//! }
//! ```

pub mod context;
pub mod delay;
pub mod error;
pub mod layer;
pub mod options;
pub mod prelude;
pub mod retry;
pub mod sleeper;

// Re-exports
pub use context::AttemptContext;
pub use delay::{default_calculate_delay, MAX_CALCULATED_DELAY};
pub use error::{AttemptError, ConfigError};
pub use layer::{RetryLayer, RetryService};
pub use options::AttemptOptions;
pub use retry::{retry, BeforeAttempt, CalculateDelay, HandleError, HandleTimeout};
pub use retry::{RetryPolicy, RetryPolicyBuilder};
pub use sleeper::{InstantSleeper, RecordingSleeper, Sleeper, TokioSleeper};

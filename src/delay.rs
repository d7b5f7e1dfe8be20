//! Default delay calculation: exponential growth, capping, full jitter.
//!
//! The calculator is a pure function of `(attempt_num, options)` once an RNG
//! is fixed; [`default_calculate_delay_with_rng`] exposes RNG injection for
//! deterministic tests. Attempt semantics: the loop calls the calculator with
//! `attempt_num >= 1` (the 1-based count of failures so far), so the first
//! retry uses `factor^0` and gets the base delay.
//!
//! Jitter uses the "full jitter" strategy: the deterministic value is
//! replaced, not offset, by a uniform draw from `[min_delay, calculated]`.
//! See <https://aws.amazon.com/blogs/architecture/exponential-backoff-and-jitter/>.
//!
//! Overflow behavior: growth that would overflow saturates at
//! [`MAX_CALCULATED_DELAY`] (1 day). Custom calculators installed via
//! [`RetryPolicyBuilder::calculate_delay`](crate::RetryPolicyBuilder::calculate_delay)
//! replace this function entirely and are not bounded by the engine.

use crate::{AttemptContext, AttemptOptions};
use rand::{rng, Rng};
use std::time::Duration;

/// Ceiling on delays produced by the default calculator (1 day).
pub const MAX_CALCULATED_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Calculate the delay before the next attempt using the default algorithm.
pub fn default_calculate_delay(context: &AttemptContext, options: &AttemptOptions) -> Duration {
    default_calculate_delay_with_rng(context, options, &mut rng())
}

/// [`default_calculate_delay`] with a caller-supplied RNG, for deterministic
/// jitter in tests.
pub fn default_calculate_delay_with_rng<R: Rng + ?Sized>(
    context: &AttemptContext,
    options: &AttemptOptions,
    rng: &mut R,
) -> Duration {
    let base = millis_saturated(options.delay);
    if base == 0 {
        // No throttling, regardless of factor or jitter.
        return Duration::ZERO;
    }

    let mut delay = base as f64;
    if options.factor != 0.0 {
        let exponent = context.attempt_num().saturating_sub(1).min(i32::MAX as usize) as i32;
        delay *= options.factor.powi(exponent);
    }
    if !options.max_delay.is_zero() {
        delay = delay.min(millis_saturated(options.max_delay) as f64);
    }
    delay = delay.min(MAX_CALCULATED_DELAY.as_millis() as f64);

    if options.jitter {
        let min = millis_saturated(options.min_delay);
        // When factor < 1 decays the delay under the floor, the floor wins.
        let max = (delay.floor() as u64).max(min);
        delay = rng.random_range(min..=max) as f64;
    }

    Duration::from_millis(delay.round() as u64)
}

fn millis_saturated(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn context_at(attempt_num: usize) -> AttemptContext {
        let context = AttemptContext::new(0);
        for _ in 0..attempt_num {
            context.next_attempt();
        }
        context
    }

    fn millis(options: &AttemptOptions, attempt_num: usize) -> u128 {
        default_calculate_delay(&context_at(attempt_num), options).as_millis()
    }

    #[test]
    fn known_delay_progressions() {
        // (attempt_num, delay, factor, max_delay, expected)
        let table: &[(usize, u64, f64, u64, u128)] = &[
            (1, 200, 0.0, 0, 200),
            (2, 200, 0.0, 0, 200),
            (3, 200, 0.0, 0, 200),
            //
            (1, 200, 2.0, 0, 200),
            (2, 200, 2.0, 0, 400),
            (3, 200, 2.0, 0, 800),
            //
            (1, 200, 1.5, 0, 200),
            (2, 200, 1.5, 0, 300),
            (3, 200, 1.5, 0, 450),
            //
            // delay 0 short-circuits, factor ignored
            (1, 0, 15.0, 0, 0),
            (2, 0, 15.0, 0, 0),
            (3, 0, 15.0, 0, 0),
            //
            (1, 200, 2.0, 300, 200),
            (2, 200, 2.0, 300, 300),
            (3, 200, 2.0, 300, 300),
        ];

        for &(attempt_num, delay, factor, max_delay, expected) in table {
            let options = AttemptOptions {
                delay: Duration::from_millis(delay),
                factor,
                max_delay: Duration::from_millis(max_delay),
                ..Default::default()
            };
            assert_eq!(
                millis(&options, attempt_num),
                expected,
                "attempt {attempt_num}, delay {delay}, factor {factor}, max {max_delay}"
            );
        }
    }

    #[test]
    fn deterministic_without_jitter() {
        let options =
            AttemptOptions { delay: Duration::from_millis(250), factor: 3.0, ..Default::default() };
        let first = millis(&options, 2);
        for _ in 0..10 {
            assert_eq!(millis(&options, 2), first);
        }
    }

    #[test]
    fn max_delay_clamps_even_without_factor() {
        let options = AttemptOptions {
            delay: Duration::from_millis(500),
            factor: 0.0,
            max_delay: Duration::from_millis(300),
            ..Default::default()
        };
        assert_eq!(millis(&options, 1), 300);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let options = AttemptOptions {
            delay: Duration::from_millis(200),
            min_delay: Duration::from_millis(100),
            factor: 2.0,
            jitter: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(42);

        // attempt 3 => 800 ms unjittered
        let context = context_at(3);
        for _ in 0..200 {
            let jittered = default_calculate_delay_with_rng(&context, &options, &mut rng);
            assert!(jittered >= Duration::from_millis(100));
            assert!(jittered <= Duration::from_millis(800));
        }
    }

    #[test]
    fn jitter_floor_wins_over_decay() {
        // factor 0.5 pulls attempt 3 down to 50 ms, below the 100 ms floor.
        let options = AttemptOptions {
            delay: Duration::from_millis(200),
            min_delay: Duration::from_millis(100),
            factor: 0.5,
            jitter: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let jittered = default_calculate_delay_with_rng(&context_at(3), &options, &mut rng);
        assert_eq!(jittered, Duration::from_millis(100));
    }

    #[test]
    fn jitter_on_zero_delay_is_zero() {
        let options = AttemptOptions {
            delay: Duration::ZERO,
            jitter: true,
            min_delay: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(millis(&options, 4), 0);
    }

    #[test]
    fn runaway_growth_saturates_at_cap() {
        let options =
            AttemptOptions { delay: Duration::from_secs(1), factor: 10.0, ..Default::default() };
        let saturated = default_calculate_delay(&context_at(50), &options);
        assert_eq!(saturated, MAX_CALCULATED_DELAY);
    }

    #[test]
    fn attempt_zero_uses_base_delay() {
        // A custom-calculator replacement gets attempt 0 for the initial
        // delay; the default formula degrades to the base there.
        let options =
            AttemptOptions { delay: Duration::from_millis(200), factor: 2.0, ..Default::default() };
        assert_eq!(millis(&options, 0), 200);
    }
}

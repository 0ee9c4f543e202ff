// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Rate-limit retry for API calls.
//!
//! Rate-limited requests are not errors: the caller sleeps until the quota
//! resets and repeats the request. Every other failure is fatal.
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Error;

/// Outcome of a single attempt that did not succeed.
#[derive(Debug,)]
pub enum FetchError
{
    /// Quota exhausted; `reset_at` is when it refills, if known.
    RateLimited {
        reset_at: Option<DateTime<Utc,>,>,
    },
    /// Any other failure, propagated as is.
    Fatal(Error,),
}

impl From<Error,> for FetchError
{
    fn from(error: Error,) -> Self
    {
        Self::Fatal(error,)
    }
}

/// Configuration for waiting out rate limits.
#[derive(Debug, Clone,)]
pub struct RetryPolicy
{
    /// Maximum number of attempts; `None` retries until the request passes.
    pub max_attempts:  Option<u32,>,
    /// Added to the reset deadline to absorb clock skew.
    pub margin:        Duration,
    /// Wait used when the reset deadline is unknown.
    pub fallback_wait: Duration,
}

impl Default for RetryPolicy
{
    fn default() -> Self
    {
        Self {
            max_attempts: None, margin: Duration::from_millis(100,), fallback_wait: Duration::from_secs(60,),
        }
    }
}

impl RetryPolicy
{
    /// Time to sleep before the next attempt.
    ///
    /// A deadline already in the past yields just the margin.
    pub fn wait_for(&self, reset_at: Option<DateTime<Utc,>,>, now: DateTime<Utc,>,) -> Duration
    {
        match reset_at {
            Some(reset_at,) => {
                let remaining = (reset_at - now).to_std().unwrap_or(Duration::ZERO,);
                remaining + self.margin
            }
            None => self.fallback_wait,
        }
    }
}

/// Repeats `f` while it reports [`FetchError::RateLimited`].
///
/// # Arguments
///
/// * `policy` - Wait configuration
/// * `operation_name` - Name of the operation for logging
/// * `f` - Async function performing one attempt
///
/// # Errors
///
/// Returns the fatal error of an attempt, or [`Error::Source`] once
/// `max_attempts` rate-limited attempts have been made.
pub async fn retry_until_reset<F, Fut, T,>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut f: F,
) -> Result<T, Error,>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError,>,>,
{
    let mut attempt: u32 = 1;

    loop {
        match f().await {
            Ok(result,) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result,);
            }
            Err(FetchError::Fatal(error,),) => return Err(error,),
            Err(FetchError::RateLimited {
                reset_at,
            },) => {
                if policy.max_attempts.is_some_and(|max| attempt >= max,) {
                    return Err(Error::api(format!(
                        "{operation_name} still rate limited after {attempt} attempts"
                    ),),);
                }

                let wait = policy.wait_for(reset_at, Utc::now(),);
                warn!(
                    "{} hit the rate limit on attempt {}. Sleeping {}ms until reset...",
                    operation_name,
                    attempt,
                    wait.as_millis()
                );

                sleep(wait,).await;
                attempt = attempt.saturating_add(1,);
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::sync::{Arc, Mutex};

    use chrono::TimeDelta;

    use super::*;

    fn fast_policy(max_attempts: Option<u32,>,) -> RetryPolicy
    {
        RetryPolicy {
            max_attempts,
            margin: Duration::from_millis(1,),
            fallback_wait: Duration::from_millis(5,),
        }
    }

    #[test]
    fn retry_policy_default_values()
    {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.margin, Duration::from_millis(100));
        assert_eq!(policy.fallback_wait, Duration::from_secs(60));
    }

    #[test]
    fn wait_covers_remaining_time_plus_margin()
    {
        let policy = RetryPolicy::default();
        let now = Utc::now();
        let wait = policy.wait_for(Some(now + TimeDelta::seconds(3,),), now,);
        assert_eq!(wait, Duration::from_millis(3100));
    }

    #[test]
    fn past_or_unknown_reset_waits_margin_or_fallback()
    {
        let policy = RetryPolicy::default();
        let now = Utc::now();
        assert_eq!(policy.wait_for(Some(now - TimeDelta::seconds(5,),), now,), Duration::from_millis(100));
        assert_eq!(policy.wait_for(None, now,), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn retry_succeeds_on_first_attempt()
    {
        let result = retry_until_reset(&fast_policy(None,), "test", || async { Ok::<_, FetchError,>(42,) },)
            .await
            .expect("should succeed",);
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn retry_waits_out_rate_limits()
    {
        let counter = Arc::new(Mutex::new(0,),);
        let counter_clone = counter.clone();

        let result = retry_until_reset(&fast_policy(None,), "test", move || {
            let counter = counter_clone.clone();
            async move {
                let mut count = counter.lock().unwrap();
                *count += 1;
                if *count < 4 {
                    Err(FetchError::RateLimited {
                        reset_at: None,
                    },)
                } else {
                    Ok(42,)
                }
            }
        },)
        .await
        .expect("should succeed after the limit resets",);

        assert_eq!(result, 42);
        assert_eq!(*counter.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried()
    {
        let counter = Arc::new(Mutex::new(0,),);
        let counter_clone = counter.clone();

        let result = retry_until_reset(&fast_policy(None,), "test", move || {
            let counter = counter_clone.clone();
            async move {
                *counter.lock().unwrap() += 1;
                Err::<i32, _,>(FetchError::Fatal(Error::api("HTTP 404",),),)
            }
        },)
        .await;

        assert!(matches!(result, Err(Error::Source { .. })));
        assert_eq!(*counter.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn bounded_policy_gives_up()
    {
        let counter = Arc::new(Mutex::new(0,),);
        let counter_clone = counter.clone();

        let result = retry_until_reset(&fast_policy(Some(2,),), "test", move || {
            let counter = counter_clone.clone();
            async move {
                *counter.lock().unwrap() += 1;
                Err::<i32, _,>(FetchError::RateLimited {
                    reset_at: None,
                },)
            }
        },)
        .await;

        assert!(result.is_err(), "should give up after max attempts",);
        assert_eq!(*counter.lock().unwrap(), 2);
    }
}

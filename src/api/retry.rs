//! Bounded retry around a single HTTP call.
//!
//! Each attempt reports an [`AttemptOutcome`]; a [`RetryTracker`] turns the
//! sequence of outcomes into [`RequestState`] transitions. Rate-limit waits
//! (HTTP 429) and generic failures draw from separate budgets, so a burst
//! of 429s never uses up the attempts reserved for real errors.

use std::future::Future;
use std::time::Duration;

use super::error::ApiError;
use crate::models::RateLimitSettings;

/// Upper bound on a single backoff or default 429 wait
pub const MAX_BACKOFF: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts for generic failures (at least 1)
    pub max_attempts: u32,
    /// Attempt N sleeps `base_delay * N` before the next try
    pub base_delay: Duration,
    /// 429 wait when the server gives no Retry-After
    pub default_retry_after: Duration,
    /// Cap on 429 waits for one request
    pub max_rate_limit_waits: u32,
}

impl RetryPolicy {
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self {
            max_attempts: settings.retry_attempts.max(1),
            base_delay: Duration::from_secs(settings.retry_delay_seconds),
            default_retry_after: Duration::from_secs(settings.default_retry_after_seconds).min(MAX_BACKOFF),
            max_rate_limit_waits: settings.max_rate_limit_waits,
        }
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

/// What one attempt produced
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// HTTP 429, with the server's Retry-After hint if it sent one
    RateLimited { retry_after: Option<Duration> },
    /// Network error or non-2xx status worth retrying after a delay
    Retryable(ApiError),
    /// The cause was corrected locally (e.g. clock offset applied); retry at once
    RetryNow(ApiError),
    /// Not worth retrying (auth failure, malformed body, exchange rejection)
    Fatal(ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    /// Ready to send (initially, or for an immediate retry)
    Pending,
    RateLimited { wait: Duration },
    Retryable { attempt: u32, delay: Duration },
    Succeeded,
    Exhausted,
}

/// Pure state machine for one request's retry budget
#[derive(Debug)]
pub struct RetryTracker<'a> {
    policy: &'a RetryPolicy,
    failures: u32,
    rate_limit_waits: u32,
    immediate_retry_used: bool,
    state: RequestState,
}

impl<'a> RetryTracker<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
            rate_limit_waits: 0,
            immediate_retry_used: false,
            state: RequestState::Pending,
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_success(&mut self) -> RequestState {
        self.transition(RequestState::Succeeded)
    }

    pub fn record_rate_limited(&mut self, retry_after: Option<Duration>) -> RequestState {
        self.rate_limit_waits += 1;
        if self.rate_limit_waits > self.policy.max_rate_limit_waits {
            return self.transition(RequestState::Exhausted);
        }
        let wait = retry_after.unwrap_or(self.policy.default_retry_after);
        self.transition(RequestState::RateLimited { wait })
    }

    pub fn record_failure(&mut self) -> RequestState {
        self.failures += 1;
        if self.failures >= self.policy.max_attempts.max(1) {
            return self.transition(RequestState::Exhausted);
        }
        let attempt = self.failures;
        self.transition(RequestState::Retryable {
            attempt,
            delay: self.policy.backoff_for(attempt),
        })
    }

    /// One free immediate retry per request; a repeat counts as a normal failure.
    pub fn record_retry_now(&mut self) -> RequestState {
        if self.immediate_retry_used {
            return self.record_failure();
        }
        self.immediate_retry_used = true;
        self.transition(RequestState::Pending)
    }

    pub fn record_fatal(&mut self) -> RequestState {
        self.transition(RequestState::Exhausted)
    }

    fn transition(&mut self, next: RequestState) -> RequestState {
        self.state = next.clone();
        next
    }
}

/// Drives attempts through a [`RetryTracker`], sleeping between them
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `attempt` until it succeeds or the budget is exhausted.
    ///
    /// `label` names the request in log output (usually the endpoint path).
    pub async fn execute<T, F, Fut>(&self, label: &str, mut attempt: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AttemptOutcome<T>>,
    {
        let mut tracker = RetryTracker::new(&self.policy);

        loop {
            let error = match attempt().await {
                AttemptOutcome::Success(value) => {
                    tracker.record_success();
                    return Ok(value);
                }
                AttemptOutcome::RateLimited { retry_after } => {
                    match tracker.record_rate_limited(retry_after) {
                        RequestState::RateLimited { wait } => {
                            log::warn!("{}: rate limited, waiting {:?} before retrying", label, wait);
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                        _ => ApiError::RateLimitError(format!(
                            "{} still rate limited after {} waits",
                            label, self.policy.max_rate_limit_waits
                        )),
                    }
                }
                AttemptOutcome::Retryable(e) => match tracker.record_failure() {
                    RequestState::Retryable { attempt, delay } => {
                        log::warn!(
                            "{}: attempt {}/{} failed: {}; retrying in {:?}",
                            label,
                            attempt,
                            self.policy.max_attempts,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    _ => e,
                },
                AttemptOutcome::RetryNow(e) => match tracker.record_retry_now() {
                    RequestState::Pending => {
                        log::info!("{}: {}; retrying immediately", label, e);
                        continue;
                    }
                    RequestState::Retryable { attempt, delay } => {
                        log::warn!(
                            "{}: attempt {}/{} failed again: {}; retrying in {:?}",
                            label,
                            attempt,
                            self.policy.max_attempts,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    _ => e,
                },
                AttemptOutcome::Fatal(e) => {
                    tracker.record_fatal();
                    e
                }
            };

            log::error!(
                "{}: giving up after {} failed attempt(s): {}",
                label,
                tracker.failures().max(1),
                error
            );
            return Err(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            default_retry_after: Duration::from_millis(1),
            max_rate_limit_waits: 3,
        }
    }

    fn transient() -> ApiError {
        ApiError::HttpStatus {
            status: 502,
            body: "bad gateway".to_string(),
        }
    }

    #[test]
    fn test_tracker_linear_backoff_then_exhausted() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            default_retry_after: Duration::from_secs(5),
            max_rate_limit_waits: 2,
        };
        let mut tracker = RetryTracker::new(&policy);
        assert_eq!(tracker.state(), &RequestState::Pending);

        assert_eq!(
            tracker.record_failure(),
            RequestState::Retryable {
                attempt: 1,
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(
            tracker.record_failure(),
            RequestState::Retryable {
                attempt: 2,
                delay: Duration::from_secs(4)
            }
        );
        assert_eq!(tracker.record_failure(), RequestState::Exhausted);
    }

    #[test]
    fn test_huge_delay_settings_are_capped() {
        let settings = RateLimitSettings {
            retry_delay_seconds: u64::MAX,
            default_retry_after_seconds: u64::MAX,
            ..RateLimitSettings::default()
        };
        let policy = RetryPolicy::from_settings(&settings);
        assert_eq!(policy.backoff_for(1), MAX_BACKOFF);
        assert_eq!(policy.backoff_for(u32::MAX), MAX_BACKOFF);
        assert_eq!(policy.default_retry_after, MAX_BACKOFF);
    }

    #[test]
    fn test_tracker_rate_limit_has_own_budget() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
            default_retry_after: Duration::from_secs(5),
            max_rate_limit_waits: 2,
        };
        let mut tracker = RetryTracker::new(&policy);

        assert_eq!(
            tracker.record_rate_limited(Some(Duration::from_secs(7))),
            RequestState::RateLimited {
                wait: Duration::from_secs(7)
            }
        );
        assert_eq!(
            tracker.record_rate_limited(None),
            RequestState::RateLimited {
                wait: Duration::from_secs(5)
            }
        );
        // 429s did not consume the generic budget
        assert_eq!(tracker.failures(), 0);
        assert!(matches!(tracker.record_failure(), RequestState::Retryable { attempt: 1, .. }));

        assert_eq!(tracker.record_rate_limited(None), RequestState::Exhausted);
    }

    #[test]
    fn test_tracker_single_immediate_retry() {
        let policy = fast_policy(3);
        let mut tracker = RetryTracker::new(&policy);

        assert_eq!(tracker.record_retry_now(), RequestState::Pending);
        assert_eq!(tracker.failures(), 0);
        assert!(matches!(tracker.record_retry_now(), RequestState::Retryable { attempt: 1, .. }));
        assert_eq!(tracker.failures(), 1);
    }

    #[test]
    fn test_tracker_success_and_fatal() {
        let policy = fast_policy(3);
        let mut tracker = RetryTracker::new(&policy);
        assert_eq!(tracker.record_success(), RequestState::Succeeded);

        let mut tracker = RetryTracker::new(&policy);
        assert_eq!(tracker.record_fatal(), RequestState::Exhausted);
    }

    #[test]
    fn test_zero_attempts_treated_as_one() {
        let policy = fast_policy(0);
        let mut tracker = RetryTracker::new(&policy);
        assert_eq!(tracker.record_failure(), RequestState::Exhausted);
    }

    #[tokio::test]
    async fn test_execute_recovers_after_transient_failures() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        AttemptOutcome::Retryable(transient())
                    } else {
                        AttemptOutcome::Success(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_exhausts_budget() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = executor
            .execute("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { AttemptOutcome::Retryable(transient()) }
            })
            .await;

        assert!(matches!(result, Err(ApiError::HttpStatus { status: 502, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_rate_limits_do_not_consume_attempts() {
        let executor = RetryExecutor::new(fast_policy(1));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        AttemptOutcome::RateLimited {
                            retry_after: Some(Duration::from_millis(1)),
                        }
                    } else {
                        AttemptOutcome::Success("ok")
                    }
                }
            })
            .await;

        // Only one generic attempt allowed, yet three 429s were absorbed
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_execute_rate_limit_cap() {
        let executor = RetryExecutor::new(fast_policy(3));
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = executor
            .execute("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { AttemptOutcome::RateLimited { retry_after: None } }
            })
            .await;

        assert!(matches!(result, Err(ApiError::RateLimitError(_))));
        // max_rate_limit_waits = 3 waits, then the 4th 429 gives up
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_execute_fatal_stops_immediately() {
        let executor = RetryExecutor::new(fast_policy(5));
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = executor
            .execute("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { AttemptOutcome::Fatal(ApiError::AuthenticationError("bad key".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(ApiError::AuthenticationError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_retry_now_is_free_once() {
        let executor = RetryExecutor::new(fast_policy(1));
        let seen = Mutex::new(Vec::new());

        let result = executor
            .execute("test", || {
                let n = {
                    let mut seen = seen.lock().unwrap();
                    seen.push(());
                    seen.len()
                };
                async move {
                    if n == 1 {
                        AttemptOutcome::RetryNow(ApiError::ClockSkew { skew_ms: 500 })
                    } else {
                        AttemptOutcome::Success(n)
                    }
                }
            })
            .await;

        // With max_attempts = 1 a normal failure would have been final
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_execute_repeated_retry_now_falls_back_to_budget() {
        let executor = RetryExecutor::new(fast_policy(2));
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = executor
            .execute("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { AttemptOutcome::RetryNow(ApiError::ClockSkew { skew_ms: 500 }) }
            })
            .await;

        assert!(matches!(result, Err(ApiError::ClockSkew { .. })));
        // free retry + two budgeted attempts
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

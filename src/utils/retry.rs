// Retry utilities: bounded retry with exponential backoff, jitter and cancellation

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::types::{ConfigError, RetryError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_JITTER: Duration = Duration::from_millis(50);

/// Immutable retry configuration.
///
/// Without jitter the delays it produces never decrease, and stop growing
/// once they reach `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Option<Duration>,
    jitter: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: Some(DEFAULT_MAX_DELAY),
            jitter: Some(DEFAULT_JITTER),
        }
    }
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that invokes the operation exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_delay: None,
            jitter: None,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    pub fn jitter(&self) -> Option<Duration> {
        self.jitter
    }

    /// Delay to wait after the given failed attempt (1-based), before jitter.
    ///
    /// `base_delay * backoff_multiplier^(attempt - 1)`, clamped to `max_delay`.
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.powi(exponent);
        let delay = Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX);

        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Backoff delay for `attempt` plus a random extra in `[0, jitter]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        match self.jitter {
            Some(jitter) if !jitter.is_zero() => {
                let extra = rand::thread_rng().gen_range(Duration::ZERO..=jitter);
                delay.saturating_add(extra)
            }
            _ => delay,
        }
    }
}

/// Validating builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
        }
    }
}

impl RetryPolicyBuilder {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.policy.base_delay = delay;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.policy.backoff_multiplier = multiplier;
        self
    }

    pub fn max_delay(mut self, cap: Option<Duration>) -> Self {
        self.policy.max_delay = cap;
        self
    }

    pub fn jitter(mut self, jitter: Option<Duration>) -> Self {
        self.policy.jitter = jitter;
        self
    }

    pub fn build(self) -> Result<RetryPolicy, ConfigError> {
        let policy = self.policy;

        if policy.max_attempts == 0 {
            return Err(ConfigError::InvalidPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if !policy.backoff_multiplier.is_finite() || policy.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidPolicy(format!(
                "backoff_multiplier must be a finite number >= 1.0, got {}",
                policy.backoff_multiplier
            )));
        }

        if let Some(cap) = policy.max_delay {
            if cap < policy.base_delay {
                return Err(ConfigError::InvalidPolicy(format!(
                    "max_delay ({:?}) cannot be less than base_delay ({:?})",
                    cap, policy.base_delay
                )));
            }
        }

        Ok(policy)
    }
}

type ErrorPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Decides whether a failed attempt may be retried.
pub enum RetryCondition<E> {
    /// Every failure is retryable until the attempt budget runs out.
    Always,
    /// Only failures the predicate accepts are retried.
    Custom(ErrorPredicate<E>),
}

impl<E> RetryCondition<E> {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    fn allows(&self, error: &E) -> bool {
        match self {
            Self::Always => true,
            Self::Custom(predicate) => predicate(error),
        }
    }
}

impl<E> Clone for RetryCondition<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Always => Self::Always,
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<E> Default for RetryCondition<E> {
    fn default() -> Self {
        Self::Always
    }
}

impl<E> fmt::Debug for RetryCondition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Custom(_) => write!(f, "Custom(<function>)"),
        }
    }
}

/// Executes idempotent async operations under a [`RetryPolicy`].
///
/// Holds no per-call state, so one engine can serve any number of concurrent
/// calls.
#[derive(Debug)]
pub struct RetryEngine<E> {
    policy: RetryPolicy,
    condition: RetryCondition<E>,
}

impl<E> Clone for RetryEngine<E> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            condition: self.condition.clone(),
        }
    }
}

impl<E> RetryEngine<E>
where
    E: fmt::Display,
{
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            condition: RetryCondition::Always,
        }
    }

    pub fn with_condition(mut self, condition: RetryCondition<E>) -> Self {
        self.condition = condition;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, the budget is spent, the retry
    /// condition rejects a failure, or `cancel` fires.
    ///
    /// Both the operation itself and the delay between attempts are raced
    /// against `cancel`; an operation still in flight when it fires is dropped.
    pub async fn execute<T, F, Fut>(
        &self,
        mut operation: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error: Option<E> = None;
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                debug!(attempt, "Cancelled before attempt");
                return Err(RetryError::Cancelled {
                    attempts: attempt - 1,
                    last_error,
                });
            }

            debug!(attempt, max_attempts, "Invoking operation");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(attempt, "Operation cancelled while in flight");
                    return Err(RetryError::Cancelled {
                        attempts: attempt,
                        last_error,
                    });
                }
                outcome = operation() => outcome,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !self.condition.allows(&err) {
                warn!(attempt, error = %err, "Failure is not retryable");
                return Err(RetryError::Aborted {
                    attempts: attempt,
                    source: err,
                });
            }

            if attempt >= max_attempts {
                error!(attempts = attempt, error = %err, "Retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = self.policy.delay_for_attempt(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Attempt failed, retrying"
            );
            last_error = Some(err);

            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        warn!(attempt, "Cancelled during backoff");
                        return Err(RetryError::Cancelled {
                            attempts: attempt,
                            last_error,
                        });
                    }
                    _ = sleep(delay) => {}
                }
            }

            attempt += 1;
        }
    }
}

/// One-off convenience wrapper around [`RetryEngine::execute`].
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryEngine::new(policy).execute(operation, cancel).await
}

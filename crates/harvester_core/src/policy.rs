use std::time::Duration;

/// Default steady-state pause between two pagination cycles.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    Failure,
}

/// Maps the outcome of a pagination cycle to the pause before the next request.
///
/// Successful cycles wait `delay`; failed cycles wait twice that. There is no
/// accumulation across consecutive failures, no cap and no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    delay: Duration,
}

impl BackoffPolicy {
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    pub fn pause_after(&self, outcome: CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Success => self.delay,
            CycleOutcome::Failure => self.delay.saturating_mul(2),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

/// How many times a single pagination cycle may be attempted before the
/// harvest gives up and returns what it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Retry a failing cycle forever.
    #[default]
    Unbounded,
    /// Give up once the same cycle has failed this many times in a row.
    MaxConsecutiveFailures(u32),
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `failed_attempts` consecutive failures.
    pub fn allows_retry(&self, failed_attempts: u32) -> bool {
        match self {
            RetryPolicy::Unbounded => true,
            RetryPolicy::MaxConsecutiveFailures(max) => failed_attempts < *max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarvestSettings {
    pub backoff: BackoffPolicy,
    pub retry: RetryPolicy,
}

impl HarvestSettings {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            backoff: BackoffPolicy::new(delay),
            ..Self::default()
        }
    }
}

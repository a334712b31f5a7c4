//! Lifecycle configuration.
//!
//! Every knob is caller-supplied. There are no `Default` impls here: the
//! binary (or any other caller) decides poll cadence and retry budgets, and
//! `validate` rejects nonsensical values before a remote call is made.

use std::time::Duration;

use crate::error::ConfigError;

/// Retry budget for one remote call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Operation name for logging and metrics.
    pub operation: String,
    /// Maximum number of calls, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub initial_delay: Duration,
    /// Optional cap on the doubled delay.
    pub max_delay: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(operation: impl Into<String>, max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            operation: operation.into(),
            max_attempts,
            initial_delay,
            max_delay: None,
        }
    }

    /// Cap the doubled delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Backoff delay after the `retry`-th failed attempt (1-based):
    /// `initial_delay * 2^(retry - 1)`, capped by `max_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let delay = self.initial_delay.saturating_mul(factor);
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts(self.operation.clone()));
        }
        if self.initial_delay.is_zero() {
            return Err(ConfigError::ZeroBackoff(self.operation.clone()));
        }
        if let Some(max) = self.max_delay {
            if max < self.initial_delay {
                return Err(ConfigError::MaxDelayBelowInitial {
                    policy: self.operation.clone(),
                    initial: self.initial_delay,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Status polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between status queries.
    pub interval: Duration,
    /// Give up once the asset has been processing this long.
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroPollTimeout);
        }
        Ok(())
    }
}

/// Configuration for one asset's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub upload: RetryPolicy,
    /// Applied to each individual status query.
    pub status: RetryPolicy,
    pub inference: RetryPolicy,
    pub cleanup: RetryPolicy,
    pub poll: PollPolicy,
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.upload.validate()?;
        self.status.validate()?;
        self.inference.validate()?;
        self.cleanup.validate()?;
        self.poll.validate()
    }
}

/// Configuration for a campaign batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub lifecycle: LifecycleConfig,
    /// Pause between the end of one asset and the start of the next.
    pub inter_asset_delay: Duration,
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lifecycle.validate()
    }
}

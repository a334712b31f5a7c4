//! Application configuration.
//!
//! Lifecycle policies carry no defaults of their own; this is the one place
//! poll cadence and retry budgets get concrete values.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reelscope_lifecycle::{BatchConfig, LifecycleConfig, PollPolicy, RetryPolicy};

/// Retry budget for one call site as read from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryBudget {
    const fn new(max_attempts: u32, base_delay_secs: u64) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(base_delay_secs),
        }
    }

    fn policy(&self, operation: &str, max_backoff: Duration) -> RetryPolicy {
        RetryPolicy::new(operation, self.max_attempts, self.base_delay).with_max_delay(max_backoff)
    }
}

/// Binary configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Sleep between file status queries
    pub poll_interval: Duration,
    /// Give up on a file that is still processing after this long
    pub poll_timeout: Duration,
    pub upload: RetryBudget,
    pub status: RetryBudget,
    pub inference: RetryBudget,
    pub cleanup: RetryBudget,
    /// Cap on any single backoff delay
    pub max_backoff: Duration,
    /// Pause between campaign assets
    pub inter_asset_delay: Duration,
    /// Parent directory for reel downloads
    pub work_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(600), // 10 minutes
            upload: RetryBudget::new(3, 2),
            status: RetryBudget::new(3, 1),
            inference: RetryBudget::new(5, 10), // Free-tier quota windows are long
            cleanup: RetryBudget::new(3, 1),
            max_backoff: Duration::from_secs(120),
            inter_asset_delay: Duration::from_secs(10),
            work_dir: std::env::temp_dir().join("reelscope"),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env_parse(key).map(Duration::from_secs).unwrap_or(default)
}

fn env_budget(prefix: &str, default: RetryBudget) -> RetryBudget {
    RetryBudget {
        max_attempts: env_parse(&format!("REELSCOPE_{prefix}_MAX_ATTEMPTS"))
            .unwrap_or(default.max_attempts),
        base_delay: env_secs(&format!("REELSCOPE_{prefix}_BASE_DELAY_SECS"), default.base_delay),
    }
}

impl AppConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable values fall back to the defaults; out-of-range
    /// values are caught later by [`BatchConfig::validate`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: env_secs("REELSCOPE_POLL_INTERVAL_SECS", defaults.poll_interval),
            poll_timeout: env_secs("REELSCOPE_POLL_TIMEOUT_SECS", defaults.poll_timeout),
            upload: env_budget("UPLOAD", defaults.upload),
            status: env_budget("STATUS", defaults.status),
            inference: env_budget("INFERENCE", defaults.inference),
            cleanup: env_budget("CLEANUP", defaults.cleanup),
            max_backoff: env_secs("REELSCOPE_MAX_BACKOFF_SECS", defaults.max_backoff),
            inter_asset_delay: env_secs(
                "REELSCOPE_INTER_ASSET_DELAY_SECS",
                defaults.inter_asset_delay,
            ),
            work_dir: std::env::var("REELSCOPE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
        }
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            upload: self.upload.policy("upload", self.max_backoff),
            status: self.status.policy("status_query", self.max_backoff),
            inference: self.inference.policy("inference", self.max_backoff),
            cleanup: self.cleanup.policy("cleanup", self.max_backoff),
            poll: PollPolicy::new(self.poll_interval, self.poll_timeout),
        }
    }

    pub fn batch(&self) -> BatchConfig {
        BatchConfig {
            lifecycle: self.lifecycle(),
            inter_asset_delay: self.inter_asset_delay,
        }
    }
}

//! Lifecycle error types.

use std::fmt;
use std::time::Duration;

use reelscope_models::{ModelError, RemoteId};
use thiserror::Error;

/// Result type for calls into the remote service.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type for one asset's lifecycle.
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors reported by a [`RemoteAssetService`](crate::RemoteAssetService).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Server-provided hint for how long to wait
        retry_after: Option<Duration>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited {
            message: msg.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited_for(msg: impl Into<String>, retry_after: Duration) -> Self {
        Self::RateLimited {
            message: msg.into(),
            retry_after: Some(retry_after),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Transient rate-limit/quota failure. Only these are retried.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ServiceError::RateLimited { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }

    /// Retry-after hint carried by a rate-limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ServiceError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Remote call site, used to label retries and exhausted budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Upload,
    StatusQuery,
    Inference,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::StatusQuery => "status_query",
            Stage::Inference => "inference",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure of a retried call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    /// Non-retryable failure, returned on the attempt that produced it
    #[error("{0}")]
    Permanent(ServiceError),

    /// Every attempt was rate limited
    #[error("gave up after {attempts} rate-limited attempts: {last}")]
    Exhausted { attempts: u32, last: ServiceError },
}

impl RetryError {
    /// Map into an [`AssetError`] for `stage`. Permanent failures go through
    /// `permanent`; exhausted budgets become [`AssetError::RetryExhausted`].
    pub fn into_asset_error(
        self,
        stage: Stage,
        permanent: impl FnOnce(ServiceError) -> AssetError,
    ) -> AssetError {
        match self {
            RetryError::Permanent(e) => permanent(e),
            RetryError::Exhausted { attempts, last } => AssetError::RetryExhausted {
                stage,
                attempts,
                last,
            },
        }
    }

    pub fn last_error(&self) -> &ServiceError {
        match self {
            RetryError::Permanent(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

/// Per-asset lifecycle failures. None of these cross the batch boundary.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Failed to read local asset {path}: {source}")]
    LocalIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload failed: {0}")]
    Upload(#[source] ServiceError),

    #[error("Status query failed for {remote_id}: {source}")]
    StatusQuery {
        remote_id: RemoteId,
        #[source]
        source: ServiceError,
    },

    #[error("Asset {remote_id} still processing after {}s", .waited.as_secs())]
    PollTimeout { remote_id: RemoteId, waited: Duration },

    #[error("Remote processing failed for {remote_id}: {reason}")]
    ProcessingFailed { remote_id: RemoteId, reason: String },

    #[error("Inference failed: {0}")]
    InferenceFailed(#[source] ServiceError),

    #[error("{stage} gave up after {attempts} rate-limited attempts: {last}")]
    RetryExhausted {
        stage: Stage,
        attempts: u32,
        #[source]
        last: ServiceError,
    },

    #[error("Cleanup failed for {remote_id}: {source}")]
    Cleanup {
        remote_id: RemoteId,
        #[source]
        source: ServiceError,
    },

    #[error("Asset {0} has no remote id")]
    NotAcknowledged(String),

    #[error("Asset state error: {0}")]
    State(#[from] ModelError),
}

impl AssetError {
    pub fn local_io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AssetError::LocalIo { .. } => "local_io",
            AssetError::Upload(_) => "upload",
            AssetError::StatusQuery { .. } => "status_query",
            AssetError::PollTimeout { .. } => "poll_timeout",
            AssetError::ProcessingFailed { .. } => "processing_failed",
            AssetError::InferenceFailed(_) => "inference_failed",
            AssetError::RetryExhausted { .. } => "retry_exhausted",
            AssetError::Cleanup { .. } => "cleanup",
            AssetError::NotAcknowledged(_) => "not_acknowledged",
            AssetError::State(_) => "state",
        }
    }
}

/// Invalid lifecycle configuration. Raised before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0}: max_attempts must be at least 1")]
    ZeroAttempts(String),

    #[error("{0}: initial backoff delay must be positive")]
    ZeroBackoff(String),

    #[error("{policy}: max delay {max:?} is below initial delay {initial:?}")]
    MaxDelayBelowInitial {
        policy: String,
        initial: Duration,
        max: Duration,
    },

    #[error("Poll interval must be positive")]
    ZeroPollInterval,

    #[error("Poll timeout must be positive")]
    ZeroPollTimeout,
}

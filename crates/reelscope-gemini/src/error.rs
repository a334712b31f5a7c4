//! Gemini error types.

use std::time::Duration;

use reelscope_lifecycle::ServiceError;
use thiserror::Error;

use crate::types::{ErrorEnvelope, RETRY_INFO_TYPE};

/// Result type for Gemini operations.
pub type GeminiResult<T> = Result<T, GeminiError>;

/// Errors that can occur when talking to the Gemini API.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {message}")]
    Api {
        status: u16,
        /// Canonical status, e.g. `RESOURCE_EXHAUSTED`
        code: Option<String>,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeminiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build an API error from a non-success status and its body.
    ///
    /// Understands the `{"error": {...}}` envelope, including a
    /// `google.rpc.RetryInfo` detail; falls back to the raw body.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let retry_after = envelope
                    .error
                    .details
                    .iter()
                    .filter(|d| d.type_url.as_deref() == Some(RETRY_INFO_TYPE))
                    .find_map(|d| d.retry_delay.as_deref().and_then(parse_duration));

                Self::Api {
                    status,
                    code: envelope.error.status,
                    message: envelope.error.message,
                    retry_after,
                }
            }
            Err(_) => Self::Api {
                status,
                code: None,
                message: body.trim().to_string(),
                retry_after: None,
            },
        }
    }

    /// Quota or request-rate ceiling hit.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            GeminiError::Api { status, code, .. } => {
                *status == 429 || code.as_deref() == Some("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }
}

/// Parse a protobuf JSON duration such as `"7s"` or `"1.5s"`.
pub(crate) fn parse_duration(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().strip_suffix('s')?.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

impl From<GeminiError> for ServiceError {
    fn from(err: GeminiError) -> Self {
        if err.is_rate_limited() {
            let retry_after = match &err {
                GeminiError::Api { retry_after, .. } => *retry_after,
                _ => None,
            };
            let message = err.to_string();
            return match retry_after {
                Some(delay) => ServiceError::rate_limited_for(message, delay),
                None => ServiceError::rate_limited(message),
            };
        }

        match err {
            GeminiError::Api { status, message, .. } => match status {
                400 => ServiceError::InvalidRequest(message),
                401 | 403 => ServiceError::PermissionDenied(message),
                404 => ServiceError::NotFound(message),
                s => ServiceError::Server(s, message),
            },
            GeminiError::Network(e) => ServiceError::Network(e.to_string()),
            GeminiError::Config(msg) => ServiceError::InvalidRequest(msg),
            GeminiError::InvalidResponse(msg) => ServiceError::InvalidResponse(msg),
            GeminiError::Json(e) => ServiceError::InvalidResponse(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTA_BODY: &str = r#"{
      "error": {
        "code": 429,
        "message": "Resource has been exhausted (e.g. check quota).",
        "status": "RESOURCE_EXHAUSTED",
        "details": [
          {"@type": "type.googleapis.com/google.rpc.QuotaFailure", "violations": []},
          {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "17s"}
        ]
      }
    }"#;

    #[test]
    fn test_quota_error_maps_to_rate_limited() {
        let err = GeminiError::from_http_status(429, QUOTA_BODY);
        assert!(err.is_rate_limited());

        let service: ServiceError = err.into();
        assert!(service.is_rate_limited());
        assert_eq!(service.retry_after(), Some(Duration::from_secs(17)));
    }

    #[test]
    fn test_resource_exhausted_without_429() {
        let body = r#"{"error": {"code": 400, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(GeminiError::from_http_status(400, body).is_rate_limited());
    }

    #[test]
    fn test_status_classification() {
        let map = |status, body: &str| ServiceError::from(GeminiError::from_http_status(status, body));

        assert!(matches!(map(400, "bad mime"), ServiceError::InvalidRequest(_)));
        assert!(matches!(map(403, "denied"), ServiceError::PermissionDenied(_)));
        assert!(matches!(map(404, "gone"), ServiceError::NotFound(_)));
        assert!(matches!(map(503, "overloaded"), ServiceError::Server(503, _)));
        assert!(!map(503, "overloaded").is_rate_limited());
    }

    #[test]
    fn test_plain_body_kept_as_message() {
        match GeminiError::from_http_status(500, "  upstream exploded \n") {
            GeminiError::Api { message, code, .. } => {
                assert_eq!(message, "upstream exploded");
                assert!(code.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("7s"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("7"), None);
        assert_eq!(parse_duration("-1s"), None);
        assert_eq!(parse_duration("NaNs"), None);
        assert_eq!(parse_duration("1e20s"), None);
    }

    #[test]
    fn test_oversized_retry_delay_is_dropped() {
        let body = QUOTA_BODY.replace("\"17s\"", "\"1e20s\"");
        let err = GeminiError::from_http_status(429, &body);
        assert!(err.is_rate_limited());

        let service: ServiceError = err.into();
        assert!(service.is_rate_limited());
        assert_eq!(service.retry_after(), None);
    }
}

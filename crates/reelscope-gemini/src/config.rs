//! Gemini client configuration.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{GeminiError, GeminiResult};

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Public Generative Language API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

/// Per-request timeout. Uploads of large reels dominate.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for [`GeminiClient`](crate::GeminiClient).
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`
    pub api_key: String,
    /// Model id, e.g. `gemini-2.5-flash`
    pub model: String,
    /// API root, always ending in `/`
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiConfig {
    /// Config with the default model, endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> GeminiResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GeminiError::config_error("API key is empty"));
        }
        Ok(Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Create config from environment variables.
    ///
    /// - `GEMINI_API_KEY` (required)
    /// - `GEMINI_MODEL`
    /// - `GEMINI_BASE_URL`
    /// - `GEMINI_TIMEOUT_SECS`
    pub fn from_env() -> GeminiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GeminiError::config_error("GEMINI_API_KEY not set"))?;

        let mut config = Self::new(api_key)?;

        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config = config.with_model(model);
        }
        if let Ok(base) = std::env::var("GEMINI_BASE_URL") {
            config = config.with_base_url(&base)?;
        }
        if let Some(secs) = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> GeminiResult<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Parse an API root and make sure relative joins append to it.
fn parse_base_url(raw: &str) -> GeminiResult<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| GeminiError::config_error(format!("invalid base URL {raw:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(GeminiError::config_error(format!(
            "base URL must be http(s): {raw}"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

//! Gemini REST client.

use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info};
use url::Url;

use crate::config::GeminiConfig;
use crate::error::{GeminiError, GeminiResult};
use crate::metrics::record_request;
use crate::types::{
    Content, GeminiFile, GenerateContentRequest, GenerateContentResponse, NewFile, Part,
    StartUploadRequest, UploadResponse,
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Generated analysis text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub model_version: Option<String>,
}

/// Gemini API client covering the Files API and `generateContent`.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new client from configuration.
    pub fn new(config: GeminiConfig) -> GeminiResult<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| GeminiError::config_error("API key is not a valid header value"))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("reelscope/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GeminiResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> GeminiResult<Url> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| GeminiError::config_error(format!("invalid endpoint {path}: {e}")))
    }

    /// Send a request, record metrics and turn non-2xx responses into errors.
    async fn execute(&self, operation: &str, request: RequestBuilder) -> GeminiResult<Response> {
        let start = Instant::now();
        let result = request.send().await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                record_request(operation, 0, latency_ms);
                return Err(e.into());
            }
        };

        let status = response.status();
        record_request(operation, status.as_u16(), latency_ms);

        if status.is_success() {
            debug!(operation, status = status.as_u16(), latency_ms, "Gemini request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = GeminiError::from_http_status(status.as_u16(), &body);
        debug!(operation, status = status.as_u16(), "Gemini request failed: {}", err);
        Err(err)
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> GeminiResult<T> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // =========================================================================
    // Files API
    // =========================================================================

    /// Upload bytes with the resumable protocol (start, then upload+finalize).
    pub async fn upload_file(
        &self,
        bytes: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> GeminiResult<GeminiFile> {
        let start_url = self.endpoint("upload/v1beta/files")?;
        let start = self
            .http
            .post(start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&StartUploadRequest {
                file: NewFile { display_name },
            });

        let response = self.execute("upload_start", start).await?;
        let session_url = response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| GeminiError::invalid_response("upload start returned no upload URL"))?
            .to_string();

        let upload = self
            .http
            .post(&session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(CONTENT_TYPE, mime_type)
            .body(bytes.to_vec());

        let response = self.execute("upload_finalize", upload).await?;
        let uploaded: UploadResponse = Self::json(response).await?;

        info!(
            name = %uploaded.file.name,
            bytes = bytes.len(),
            mime_type,
            "Uploaded file to Gemini"
        );
        Ok(uploaded.file)
    }

    /// Fetch file metadata, including its processing state.
    pub async fn get_file(&self, name: &str) -> GeminiResult<GeminiFile> {
        let url = self.endpoint(&format!("v1beta/{name}"))?;
        let response = self.execute("get_file", self.http.get(url)).await?;
        Self::json(response).await
    }

    pub async fn delete_file(&self, name: &str) -> GeminiResult<()> {
        let url = self.endpoint(&format!("v1beta/{name}"))?;
        self.execute("delete_file", self.http.delete(url)).await?;
        debug!(name, "Deleted Gemini file");
        Ok(())
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Run the configured model over a prompt and an uploaded file.
    pub async fn generate_with_file(
        &self,
        prompt: &str,
        mime_type: &str,
        file_uri: &str,
    ) -> GeminiResult<Generation> {
        let url = self.endpoint(&format!(
            "v1beta/models/{}:generateContent",
            self.config.model
        ))?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part::text(prompt), Part::file(mime_type, file_uri)],
            }],
        };

        let response = self
            .execute("generate_content", self.http.post(url).json(&request))
            .await?;
        let generated: GenerateContentResponse = Self::json(response).await?;

        match generated.text() {
            Some(text) => Ok(Generation {
                text,
                model_version: generated
                    .model_version
                    .or_else(|| Some(self.config.model.clone())),
            }),
            None => {
                let reason = generated
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .map(|r| format!("prompt blocked: {r}"))
                    .or_else(|| {
                        generated
                            .candidates
                            .first()
                            .and_then(|c| c.finish_reason.clone())
                            .map(|r| format!("no text, finish reason {r}"))
                    })
                    .unwrap_or_else(|| "no candidates returned".to_string());
                Err(GeminiError::invalid_response(reason))
            }
        }
    }
}

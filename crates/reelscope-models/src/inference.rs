//! Inference request/response types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::asset::{RemoteAssetHandle, RemoteId};

/// A request to run the model over a ready remote asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InferenceRequest {
    pub remote_id: RemoteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub content_type: String,
    pub prompt: String,
}

impl InferenceRequest {
    /// Build a request for `handle`. Returns `None` if the handle was never
    /// acknowledged by the service.
    pub fn for_handle(handle: &RemoteAssetHandle, prompt: impl Into<String>) -> Option<Self> {
        Some(Self {
            remote_id: handle.remote_id()?.clone(),
            uri: handle.uri().map(str::to_string),
            content_type: handle.content_type().to_string(),
            prompt: prompt.into(),
        })
    }
}

/// Model response text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InferenceOutput {
    pub text: String,
    /// Model that produced the text, when the service reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl InferenceOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }
}

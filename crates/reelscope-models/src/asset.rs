//! Remote asset handle and its lifecycle state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::metadata::AssetMetadata;

/// Opaque identifier assigned by the remote service on upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RemoteId(pub String);

impl RemoteId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CampaignId(pub String);

impl CampaignId {
    /// Generate a new random campaign ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a remote asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    /// Bytes are being submitted
    #[default]
    Uploading,
    /// Service acknowledged receipt and is working on the asset
    Processing,
    /// Asset is usable for inference
    Ready,
    /// Service reported an error, or processing timed out
    Failed,
}

impl AssetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetState::Uploading => "uploading",
            AssetState::Processing => "processing",
            AssetState::Ready => "ready",
            AssetState::Failed => "failed",
        }
    }

    /// Check if this is a settled state (no more polling expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssetState::Ready | AssetState::Failed)
    }

    /// Position in the lifecycle order. `Ready` and `Failed` share a rank.
    fn rank(&self) -> u8 {
        match self {
            AssetState::Uploading => 0,
            AssetState::Processing => 1,
            AssetState::Ready | AssetState::Failed => 2,
        }
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// `Processing -> Processing` is the poll self-loop; every other legal
    /// move advances exactly one rank.
    pub fn can_transition_to(&self, next: AssetState) -> bool {
        match (self, next) {
            (AssetState::Processing, AssetState::Processing) => true,
            (from, to) => !from.is_terminal() && to.rank() == from.rank() + 1,
        }
    }

    /// Whether a remote report of `reported` means "still working" from the
    /// point of view of a handle in `self`.
    pub fn is_behind_or_equal(&self, reported: AssetState) -> bool {
        reported.rank() <= self.rank() && !reported.is_terminal()
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status snapshot reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssetStatus {
    pub state: AssetState,
    /// Error message reported alongside a failed state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssetStatus {
    pub fn new(state: AssetState) -> Self {
        Self { state, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: AssetState::Failed,
            error: Some(error.into()),
        }
    }
}

/// Service acknowledgement of a submitted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubmittedAsset {
    pub remote_id: RemoteId,
    /// URI used to reference the asset in inference requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// State the service reported at submission time
    pub state: AssetState,
}

impl SubmittedAsset {
    pub fn new(remote_id: impl Into<RemoteId>) -> Self {
        Self {
            remote_id: remote_id.into(),
            uri: None,
            state: AssetState::Processing,
        }
    }
}

/// One uploaded binary asset and its lifecycle state.
///
/// Fields are private so that state changes go through [`advance`], which
/// enforces `Uploading -> Processing -> {Ready, Failed}`.
///
/// [`advance`]: RemoteAssetHandle::advance
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RemoteAssetHandle {
    local_identifier: String,
    remote_id: Option<RemoteId>,
    uri: Option<String>,
    content_type: String,
    state: AssetState,
    metadata: AssetMetadata,
    failure_reason: Option<String>,
    history: Vec<AssetState>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RemoteAssetHandle {
    /// Create a handle in the `Uploading` state.
    pub fn new(
        local_identifier: impl Into<String>,
        content_type: impl Into<String>,
        metadata: AssetMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            local_identifier: local_identifier.into(),
            remote_id: None,
            uri: None,
            content_type: content_type.into(),
            state: AssetState::Uploading,
            metadata,
            failure_reason: None,
            history: vec![AssetState::Uploading],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn local_identifier(&self) -> &str {
        &self.local_identifier
    }

    /// Remote id, present once the service acknowledged the upload.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn state(&self) -> AssetState {
        self.state
    }

    pub fn metadata(&self) -> &AssetMetadata {
        &self.metadata
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Every state the handle has been in, oldest first.
    pub fn history(&self) -> &[AssetState] {
        &self.history
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_terminal()
    }

    /// Record the service acknowledgement: assigns the remote id (once) and
    /// moves the handle to `Processing`.
    ///
    /// If the service already reported a settled state at submission, the
    /// handle continues on to it through `Processing`.
    pub fn acknowledge(&mut self, submitted: SubmittedAsset) -> ModelResult<()> {
        if let Some(existing) = &self.remote_id {
            return Err(ModelError::RemoteIdAlreadyAssigned(existing.to_string()));
        }
        self.advance(AssetState::Processing)?;
        self.remote_id = Some(submitted.remote_id);
        self.uri = submitted.uri;

        match submitted.state {
            AssetState::Ready => {
                self.advance(AssetState::Ready)?;
            }
            AssetState::Failed => self.fail("remote processing failed")?,
            AssetState::Uploading | AssetState::Processing => {}
        }
        Ok(())
    }

    /// Move to `next`. Returns `true` if the state changed.
    pub fn advance(&mut self, next: AssetState) -> ModelResult<bool> {
        if !self.state.can_transition_to(next) {
            return Err(ModelError::illegal_transition(self.state, next));
        }
        if self.state == next {
            return Ok(false);
        }
        self.state = next;
        self.history.push(next);
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Move to `Failed` and remember why.
    pub fn fail(&mut self, reason: impl Into<String>) -> ModelResult<()> {
        self.advance(AssetState::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }
}

//! Progress event types.
//!
//! Events are emitted at every lifecycle phase boundary so that a UI can
//! stay responsive while an asset is uploaded, polled, analysed and cleaned
//! up.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::asset::AssetState;

/// Position of an asset within its batch (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchPosition {
    pub index: usize,
    pub total: usize,
}

impl BatchPosition {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }
}

/// Lifecycle phase boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Local bytes are being submitted
    UploadStarted { bytes: u64 },

    /// Service acknowledged the upload
    UploadDone { remote_id: String },

    /// One status query completed while the asset was still processing
    PollTick { state: AssetState, elapsed_ms: u64 },

    /// Polling reached a terminal state
    Settled { state: AssetState },

    /// Inference call is about to be issued
    InferenceStarted,

    /// A rate-limited call will be retried after a delay
    RetryScheduled {
        operation: String,
        attempt: u32,
        delay_ms: u64,
    },

    /// Remote asset deleted
    CleanupDone,

    /// Remote asset could not be deleted (non-fatal)
    CleanupFailed { error: String },

    /// Asset finished successfully
    Done,

    /// Asset finished with an error
    Failed { error: String },
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::UploadStarted { .. } => "upload_started",
            LifecyclePhase::UploadDone { .. } => "upload_done",
            LifecyclePhase::PollTick { .. } => "poll_tick",
            LifecyclePhase::Settled { .. } => "settled",
            LifecyclePhase::InferenceStarted => "inference_started",
            LifecyclePhase::RetryScheduled { .. } => "retry_scheduled",
            LifecyclePhase::CleanupDone => "cleanup_done",
            LifecyclePhase::CleanupFailed { .. } => "cleanup_failed",
            LifecyclePhase::Done => "done",
            LifecyclePhase::Failed { .. } => "failed",
        }
    }

    /// Rough completion percentage for progress bars.
    pub fn percent(&self) -> u8 {
        match self {
            LifecyclePhase::UploadStarted { .. } => 10,
            LifecyclePhase::UploadDone { .. } => 30,
            LifecyclePhase::PollTick { .. } => 40,
            LifecyclePhase::Settled { .. } => 60,
            LifecyclePhase::InferenceStarted => 70,
            LifecyclePhase::RetryScheduled { .. } => 0,
            LifecyclePhase::CleanupDone | LifecyclePhase::CleanupFailed { .. } => 90,
            LifecyclePhase::Done | LifecyclePhase::Failed { .. } => 100,
        }
    }
}

/// Progress event for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    /// Local identifier of the asset
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<BatchPosition>,
    #[serde(flatten)]
    pub phase: LifecyclePhase,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(asset: impl Into<String>, position: Option<BatchPosition>, phase: LifecyclePhase) -> Self {
        Self {
            asset: asset.into(),
            position,
            phase,
            timestamp: Utc::now(),
        }
    }
}

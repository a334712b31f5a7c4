//! Per-asset batch outcomes.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetState, RemoteId};
use crate::metadata::AssetMetadata;

/// Result text or failure reason for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeResult {
    Success {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    Failure {
        reason: String,
    },
}

/// Outcome of one asset within a campaign, handed to the synthesis step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchOutcome {
    pub local_identifier: String,
    pub metadata: AssetMetadata,
    /// Remote id, if the upload was acknowledged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    /// Last lifecycle state the asset reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_state: Option<AssetState>,
    #[serde(flatten)]
    pub result: OutcomeResult,
    pub finished_at: DateTime<Utc>,
}

impl BatchOutcome {
    pub fn success(
        local_identifier: impl Into<String>,
        metadata: AssetMetadata,
        text: impl Into<String>,
    ) -> Self {
        Self {
            local_identifier: local_identifier.into(),
            metadata,
            remote_id: None,
            final_state: None,
            result: OutcomeResult::Success {
                text: text.into(),
                model: None,
            },
            finished_at: Utc::now(),
        }
    }

    pub fn failure(
        local_identifier: impl Into<String>,
        metadata: AssetMetadata,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            local_identifier: local_identifier.into(),
            metadata,
            remote_id: None,
            final_state: None,
            result: OutcomeResult::Failure {
                reason: reason.into(),
            },
            finished_at: Utc::now(),
        }
    }

    pub fn with_remote(mut self, remote_id: Option<RemoteId>, final_state: Option<AssetState>) -> Self {
        self.remote_id = remote_id;
        self.final_state = final_state;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let OutcomeResult::Success { model: m, .. } = &mut self.result {
            *m = model;
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, OutcomeResult::Success { .. })
    }

    pub fn result_text(&self) -> Option<&str> {
        match &self.result {
            OutcomeResult::Success { text, .. } => Some(text),
            OutcomeResult::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.result {
            OutcomeResult::Success { .. } => None,
            OutcomeResult::Failure { reason } => Some(reason),
        }
    }
}

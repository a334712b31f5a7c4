//! Shared data models for the Reelscope backend.
//!
//! This crate provides Serde-serializable types for:
//! - Remote asset handles and their lifecycle state machine
//! - Caller-supplied asset metadata (metric name → value)
//! - Inference requests and responses
//! - Per-asset batch outcomes
//! - Progress events emitted at lifecycle phase boundaries

pub mod asset;
pub mod error;
pub mod inference;
pub mod metadata;
pub mod outcome;
pub mod progress;

// Re-export common types
pub use asset::{AssetState, AssetStatus, CampaignId, RemoteAssetHandle, RemoteId, SubmittedAsset};
pub use error::{ModelError, ModelResult};
pub use inference::{InferenceOutput, InferenceRequest};
pub use metadata::{AssetMetadata, MetricValue};
pub use outcome::{BatchOutcome, OutcomeResult};
pub use progress::{BatchPosition, LifecyclePhase, ProgressEvent};

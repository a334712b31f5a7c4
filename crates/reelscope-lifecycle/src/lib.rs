//! Remote asset lifecycle orchestration.
//!
//! This crate provides:
//! - Upload of local assets to a remote inference service
//! - Status polling with a bounded wait
//! - Exponential backoff on rate-limited calls
//! - Guaranteed best-effort cleanup of remote assets
//! - A sequential campaign runner with inter-asset pacing
//! - Progress events at every phase boundary

pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod progress;
pub mod retry;
pub mod service;
pub mod uploader;

pub use batch::CampaignBatchRunner;
pub use config::{BatchConfig, LifecycleConfig, PollPolicy, RetryPolicy};
pub use error::{AssetError, AssetResult, ConfigError, RetryError, ServiceError, ServiceResult, Stage};
pub use logging::AssetLogger;
pub use orchestrator::{AssetLifecycleOrchestrator, AssetRun};
pub use poller::ProcessingPoller;
pub use progress::{ProgressCallback, ProgressReceiver, ProgressSender};
pub use retry::RetryingInvoker;
pub use service::{PromptTemplate, RemoteAssetService};
pub use uploader::{content_type_for_path, AssetUploader, LocalAsset};

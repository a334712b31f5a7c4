//! End-to-end lifecycle of one asset.
//!
//! upload → poll until settled → inference (when `Ready`) → delete.
//!
//! The remote delete is attempted on every path that produced a remote id,
//! including cancellation of the lifecycle future (see [`CleanupGuard`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn, Instrument};

use reelscope_models::{
    AssetMetadata, AssetState, BatchPosition, InferenceOutput, InferenceRequest,
    RemoteAssetHandle, RemoteId,
};

use crate::config::LifecycleConfig;
use crate::error::{AssetError, AssetResult, ConfigError, Stage};
use crate::logging::AssetLogger;
use crate::metrics::{record_asset, record_cleanup_failure};
use crate::poller::ProcessingPoller;
use crate::progress::ProgressSender;
use crate::retry::RetryingInvoker;
use crate::service::{PromptTemplate, RemoteAssetService};
use crate::uploader::{AssetUploader, LocalAsset};

/// Result of one lifecycle run together with the final handle.
///
/// `handle` is `None` when the asset never reached the remote service.
#[derive(Debug)]
pub struct AssetRun {
    pub handle: Option<RemoteAssetHandle>,
    pub result: AssetResult<InferenceOutput>,
}

impl AssetRun {
    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.handle.as_ref().and_then(|h| h.remote_id())
    }

    pub fn final_state(&self) -> Option<AssetState> {
        self.handle.as_ref().map(|h| h.state())
    }
}

/// Composes upload, polling, inference and cleanup for single assets.
pub struct AssetLifecycleOrchestrator {
    service: Arc<dyn RemoteAssetService>,
    prompt: Arc<dyn PromptTemplate>,
    uploader: AssetUploader,
    poller: ProcessingPoller,
    inference: RetryingInvoker,
    cleanup: RetryingInvoker,
    progress: ProgressSender,
}

impl AssetLifecycleOrchestrator {
    /// Build an orchestrator. Fails before any remote call if `config` is
    /// invalid.
    pub fn new(
        service: Arc<dyn RemoteAssetService>,
        prompt: Arc<dyn PromptTemplate>,
        config: LifecycleConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let LifecycleConfig {
            upload,
            status,
            inference,
            cleanup,
            poll,
        } = config;

        Ok(Self {
            uploader: AssetUploader::new(service.clone(), upload),
            poller: ProcessingPoller::new(service.clone(), status, poll),
            inference: RetryingInvoker::new(inference),
            cleanup: RetryingInvoker::new(cleanup),
            service,
            prompt,
            progress: ProgressSender::noop(),
        })
    }

    /// Report phase boundaries to `progress`.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Run the lifecycle for one asset and return the inference output.
    pub async fn process(
        &self,
        asset: LocalAsset,
        metadata: AssetMetadata,
    ) -> AssetResult<InferenceOutput> {
        self.run(asset, metadata, None).await.result
    }

    /// Run the lifecycle for one asset, keeping the final handle.
    pub async fn run(
        &self,
        asset: LocalAsset,
        metadata: AssetMetadata,
        position: Option<BatchPosition>,
    ) -> AssetRun {
        let logger = AssetLogger::new(asset.label(), position);
        let progress = self.progress.for_asset(asset.label(), position);
        let span = logger.create_span();

        async move {
            logger.log_start(asset.content_type());

            let label = asset.label().to_string();
            let content_type = asset.content_type().to_string();

            let bytes = match asset.into_bytes().await {
                Ok(bytes) => bytes,
                Err(e) => return self.finish(&logger, &progress, None, Err(e)),
            };

            let uploaded = self
                .uploader
                .upload(&bytes, &label, &content_type, metadata, &progress)
                .await;
            drop(bytes);

            let mut handle = match uploaded {
                Ok(handle) => handle,
                Err(e) => return self.finish(&logger, &progress, None, Err(e)),
            };

            let guard = CleanupGuard::arm(self.service.clone(), handle.remote_id().cloned());
            let result = self.consume(&mut handle, &progress).await;
            self.delete_remote(&handle, &progress, &logger, &guard).await;
            guard.disarm();

            self.finish(&logger, &progress, Some(handle), result)
        }
        .instrument(span)
        .await
    }

    async fn consume(
        &self,
        handle: &mut RemoteAssetHandle,
        progress: &ProgressSender,
    ) -> AssetResult<InferenceOutput> {
        let state = self.poller.poll_until_settled(handle, progress).await?;

        let not_acknowledged = || AssetError::NotAcknowledged(handle.local_identifier().to_string());

        if state == AssetState::Failed {
            return Err(AssetError::ProcessingFailed {
                remote_id: handle.remote_id().cloned().ok_or_else(not_acknowledged)?,
                reason: handle
                    .failure_reason()
                    .unwrap_or("remote processing failed")
                    .to_string(),
            });
        }

        let request = InferenceRequest::for_handle(handle, self.prompt.render(handle))
            .ok_or_else(not_acknowledged)?;

        progress.inference_started();
        let service = self.service.as_ref();
        let req = &request;
        self.inference
            .invoke(progress, move || service.run_inference(req))
            .await
            .map_err(|e| e.into_asset_error(Stage::Inference, AssetError::InferenceFailed))
    }

    /// Best-effort delete. Failures are logged and reported, never returned.
    ///
    /// `guard` is disarmed as soon as the first attempt returns.
    async fn delete_remote(
        &self,
        handle: &RemoteAssetHandle,
        progress: &ProgressSender,
        logger: &AssetLogger,
        guard: &CleanupGuard,
    ) {
        let Some(remote_id) = handle.remote_id() else {
            return;
        };
        let service = self.service.as_ref();

        match self
            .cleanup
            .invoke(progress, move || async move {
                let outcome = service.delete_asset(remote_id).await;
                guard.disarm();
                outcome
            })
            .await
        {
            Ok(()) => {
                debug!(remote_id = %remote_id, "Remote asset deleted");
                progress.cleanup_done();
            }
            Err(e) if e.last_error().is_not_found() => {
                debug!(remote_id = %remote_id, "Remote asset already gone");
                progress.cleanup_done();
            }
            Err(e) => {
                let err = AssetError::Cleanup {
                    remote_id: remote_id.clone(),
                    source: e.last_error().clone(),
                };
                logger.log_warning(&err.to_string());
                record_cleanup_failure();
                progress.cleanup_failed(err.to_string());
            }
        }
    }

    fn finish(
        &self,
        logger: &AssetLogger,
        progress: &ProgressSender,
        handle: Option<RemoteAssetHandle>,
        result: AssetResult<InferenceOutput>,
    ) -> AssetRun {
        match &result {
            Ok(output) => {
                logger.log_completion(&format!("{} chars of analysis", output.text.len()));
                record_asset("success");
                progress.done();
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                record_asset(e.kind());
                progress.failed(e.to_string());
            }
        }
        AssetRun { handle, result }
    }
}

/// Deletes the remote asset if the lifecycle future is dropped before its
/// own cleanup got a response.
///
/// Once the first delete attempt has returned the guard stays quiet, so a
/// cancellation during cleanup backoff issues no second delete and leaves
/// the asset to service expiry.
struct CleanupGuard {
    service: Arc<dyn RemoteAssetService>,
    remote_id: Option<RemoteId>,
    armed: AtomicBool,
}

impl CleanupGuard {
    fn arm(service: Arc<dyn RemoteAssetService>, remote_id: Option<RemoteId>) -> Self {
        Self {
            service,
            remote_id,
            armed: AtomicBool::new(true),
        }
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.armed.load(Ordering::Acquire) {
            return;
        }
        let Some(remote_id) = self.remote_id.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(remote_id = %remote_id, "Lifecycle cancelled, deleting remote asset in background");
                let service = self.service.clone();
                runtime.spawn(async move {
                    match service.delete_asset(&remote_id).await {
                        Ok(()) => debug!(remote_id = %remote_id, "Remote asset deleted"),
                        Err(e) if e.is_not_found() => {}
                        Err(e) => {
                            warn!(remote_id = %remote_id, "Background delete failed: {}", e);
                            record_cleanup_failure();
                        }
                    }
                });
            }
            Err(_) => {
                warn!(remote_id = %remote_id, "No runtime to delete remote asset; left to service expiry");
                record_cleanup_failure();
            }
        }
    }
}

//! Status polling until an asset settles.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use reelscope_models::{AssetState, RemoteAssetHandle};

use crate::config::{PollPolicy, RetryPolicy};
use crate::error::{AssetError, AssetResult, Stage};
use crate::metrics::record_poll_tick;
use crate::progress::ProgressSender;
use crate::retry::RetryingInvoker;
use crate::service::RemoteAssetService;

/// Queries an asset's status at a fixed interval until it is `Ready` or
/// `Failed`, or the poll timeout elapses.
pub struct ProcessingPoller {
    service: Arc<dyn RemoteAssetService>,
    invoker: RetryingInvoker,
    policy: PollPolicy,
}

impl ProcessingPoller {
    pub fn new(
        service: Arc<dyn RemoteAssetService>,
        status_policy: RetryPolicy,
        policy: PollPolicy,
    ) -> Self {
        Self {
            service,
            invoker: RetryingInvoker::new(status_policy),
            policy,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll until the handle settles.
    ///
    /// Returns the settled state; `Failed` is a normal return. On timeout the
    /// handle is moved to `Failed` and [`AssetError::PollTimeout`] is
    /// returned, so the caller still owns a settled handle to clean up.
    pub async fn poll_until_settled(
        &self,
        handle: &mut RemoteAssetHandle,
        progress: &ProgressSender,
    ) -> AssetResult<AssetState> {
        let remote_id = handle
            .remote_id()
            .cloned()
            .ok_or_else(|| AssetError::NotAcknowledged(handle.local_identifier().to_string()))?;

        let started = Instant::now();
        let service = self.service.as_ref();
        let id = &remote_id;

        if handle.is_settled() {
            debug!(remote_id = %remote_id, state = %handle.state(), "Asset settled at upload");
            progress.settled(handle.state());
            return Ok(handle.state());
        }

        loop {
            let status = match self
                .invoker
                .invoke(progress, move || service.get_asset_status(id))
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    let err = e.into_asset_error(Stage::StatusQuery, |source| {
                        AssetError::StatusQuery {
                            remote_id: remote_id.clone(),
                            source,
                        }
                    });
                    handle.fail(err.to_string())?;
                    return Err(err);
                }
            };

            match status.state {
                AssetState::Ready => {
                    handle.advance(AssetState::Ready)?;
                    info!(remote_id = %remote_id, elapsed_ms = started.elapsed().as_millis() as u64, "Asset ready");
                    progress.settled(AssetState::Ready);
                    return Ok(AssetState::Ready);
                }
                AssetState::Failed => {
                    let reason = status
                        .error
                        .unwrap_or_else(|| "remote processing failed".to_string());
                    warn!(remote_id = %remote_id, reason = %reason, "Asset processing failed");
                    handle.fail(reason)?;
                    progress.settled(AssetState::Failed);
                    return Ok(AssetState::Failed);
                }
                reported => {
                    // An earlier state than ours still means "working"
                    if !handle.state().is_behind_or_equal(reported) {
                        debug!(remote_id = %remote_id, reported = %reported, "Unexpected status report");
                    }
                }
            }

            let elapsed = started.elapsed();
            record_poll_tick();
            progress.poll_tick(handle.state(), elapsed);

            if elapsed >= self.policy.timeout {
                let err = AssetError::PollTimeout {
                    remote_id: remote_id.clone(),
                    waited: elapsed,
                };
                warn!(remote_id = %remote_id, waited_ms = elapsed.as_millis() as u64, "Poll timeout");
                handle.fail(err.to_string())?;
                progress.settled(AssetState::Failed);
                return Err(err);
            }

            let remaining = self.policy.timeout - elapsed;
            tokio::time::sleep(self.policy.interval.min(remaining)).await;
        }
    }
}

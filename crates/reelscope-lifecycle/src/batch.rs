//! Sequential campaign runner.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, info_span, Instrument};

use reelscope_models::{AssetMetadata, BatchOutcome, BatchPosition, CampaignId};

use crate::config::BatchConfig;
use crate::error::ConfigError;
use crate::orchestrator::{AssetLifecycleOrchestrator, AssetRun};
use crate::progress::ProgressSender;
use crate::service::{PromptTemplate, RemoteAssetService};
use crate::uploader::LocalAsset;

/// Runs the asset lifecycle over a campaign, one asset at a time.
///
/// Output order equals input order. A failed asset is recorded and the
/// runner moves on.
pub struct CampaignBatchRunner {
    orchestrator: AssetLifecycleOrchestrator,
    inter_asset_delay: Duration,
}

impl CampaignBatchRunner {
    pub fn new(orchestrator: AssetLifecycleOrchestrator, inter_asset_delay: Duration) -> Self {
        Self {
            orchestrator,
            inter_asset_delay,
        }
    }

    /// Validate `config` and build the runner with its orchestrator.
    pub fn from_config(
        service: Arc<dyn RemoteAssetService>,
        prompt: Arc<dyn PromptTemplate>,
        config: BatchConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let orchestrator = AssetLifecycleOrchestrator::new(service, prompt, config.lifecycle)?;
        Ok(Self::new(orchestrator, config.inter_asset_delay))
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.orchestrator = self.orchestrator.with_progress(progress);
        self
    }

    /// Process every asset and return one outcome per input, in order.
    pub async fn run_batch(&self, assets: Vec<(LocalAsset, AssetMetadata)>) -> Vec<BatchOutcome> {
        let campaign = CampaignId::new();
        let total = assets.len();
        let span = info_span!("campaign", campaign_id = %campaign, assets = total);

        async move {
            info!("Campaign started");
            let mut outcomes = Vec::with_capacity(total);

            for (i, (asset, metadata)) in assets.into_iter().enumerate() {
                if i > 0 && !self.inter_asset_delay.is_zero() {
                    tokio::time::sleep(self.inter_asset_delay).await;
                }

                let label = asset.label().to_string();
                let position = BatchPosition::new(i + 1, total);
                let run = self
                    .orchestrator
                    .run(asset, metadata.clone(), Some(position))
                    .await;

                outcomes.push(to_outcome(label, metadata, run));
            }

            let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
            info!(
                succeeded,
                failed = total - succeeded,
                "Campaign finished"
            );
            outcomes
        }
        .instrument(span)
        .await
    }
}

fn to_outcome(label: String, metadata: AssetMetadata, run: AssetRun) -> BatchOutcome {
    let remote_id = run.remote_id().cloned();
    let final_state = run.final_state();

    let outcome = match run.result {
        Ok(output) => BatchOutcome::success(label, metadata, output.text).with_model(output.model),
        Err(e) => BatchOutcome::failure(label, metadata, e.to_string()),
    };
    outcome.with_remote(remote_id, final_state)
}

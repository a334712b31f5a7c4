//! Structured asset logging utilities.

use tracing::{error, info, warn, Span};

use reelscope_models::BatchPosition;

/// Logger that tags every lifecycle event with the asset and its batch slot.
#[derive(Debug, Clone)]
pub struct AssetLogger {
    asset: String,
    position: Option<BatchPosition>,
}

impl AssetLogger {
    pub fn new(asset: &str, position: Option<BatchPosition>) -> Self {
        Self {
            asset: asset.to_string(),
            position,
        }
    }

    fn slot(&self) -> String {
        match self.position {
            Some(p) => format!("{}/{}", p.index, p.total),
            None => "-".to_string(),
        }
    }

    /// Log the start of an asset lifecycle.
    pub fn log_start(&self, message: &str) {
        info!(asset = %self.asset, slot = %self.slot(), "Asset started: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(asset = %self.asset, slot = %self.slot(), "Asset warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(asset = %self.asset, slot = %self.slot(), "Asset error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(asset = %self.asset, slot = %self.slot(), "Asset completed: {}", message);
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Create a tracing span covering the whole lifecycle of this asset.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("asset", asset = %self.asset, slot = %self.slot())
    }
}

//! Campaign manifest files.
//!
//! ```json
//! {
//!   "stage": "traffic",
//!   "assets": [
//!     { "path": "videos/launch.mp4", "metrics": { "CTR": "2.5%", "CPC": "$0.40" } },
//!     { "url": "https://www.instagram.com/reel/Abc1/", "label": "creator-cut", "metrics": { "CTR": "1.1%" } }
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the manifest's directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::prompt::FunnelStage;
use crate::source::{InputSource, ReelUrl, SourceError};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Asset {index}: {message}")]
    InvalidAsset { index: usize, message: String },

    #[error("Manifest lists no assets")]
    Empty,
}

/// One asset entry: exactly one of `path` or `url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestAsset {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignManifest {
    pub stage: FunnelStage,
    pub assets: Vec<ManifestAsset>,
}

/// A manifest entry with its input resolved.
#[derive(Debug, Clone)]
pub struct CampaignEntry {
    pub source: InputSource,
    pub label: Option<String>,
    pub metrics: BTreeMap<String, String>,
}

impl CampaignManifest {
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> Result<(Self, Vec<CampaignEntry>), ManifestError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let manifest = Self::from_json(&json)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let entries = manifest.entries(base)?;
        Ok((manifest, entries))
    }

    /// Validate every asset entry and resolve it against `base`.
    pub fn entries(&self, base: &Path) -> Result<Vec<CampaignEntry>, ManifestError> {
        if self.assets.is_empty() {
            return Err(ManifestError::Empty);
        }

        self.assets
            .iter()
            .enumerate()
            .map(|(i, asset)| {
                let index = i + 1;
                let invalid = |message: String| ManifestError::InvalidAsset { index, message };

                let source = match (&asset.path, &asset.url) {
                    (Some(path), None) => InputSource::File(base.join(path)),
                    (None, Some(url)) => {
                        InputSource::Reel(ReelUrl::parse(url).map_err(|e: SourceError| invalid(e.to_string()))?)
                    }
                    (Some(_), Some(_)) => return Err(invalid("set either path or url, not both".into())),
                    (None, None) => return Err(invalid("missing path or url".into())),
                };

                Ok(CampaignEntry {
                    source,
                    label: asset.label.clone(),
                    metrics: asset.metrics.clone(),
                })
            })
            .collect()
    }
}

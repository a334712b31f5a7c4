//! Local asset sources and the upload step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use reelscope_models::{AssetMetadata, RemoteAssetHandle};

use crate::config::RetryPolicy;
use crate::error::{AssetError, AssetResult, Stage};
use crate::progress::ProgressSender;
use crate::retry::RetryingInvoker;
use crate::service::RemoteAssetService;

/// Content type used when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// Guess a video content type from a file extension.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("m4v") => "video/x-m4v",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Where the local bytes come from.
#[derive(Debug, Clone)]
enum AssetSource {
    File(PathBuf),
    Memory(Vec<u8>),
}

/// A local asset waiting to be uploaded.
///
/// File-backed assets are read lazily, so a missing file fails only that
/// asset's lifecycle.
#[derive(Debug, Clone)]
pub struct LocalAsset {
    label: String,
    source: AssetSource,
    content_type: String,
}

impl LocalAsset {
    /// File-backed asset labelled by its file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = content_type_for_path(&path).to_string();
        Self {
            label,
            source: AssetSource::File(path),
            content_type,
        }
    }

    pub fn from_bytes(
        label: impl Into<String>,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            source: AssetSource::Memory(bytes),
            content_type: content_type.into(),
        }
    }

    /// Override the label used for correlation.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Load the bytes, consuming the asset.
    pub async fn into_bytes(self) -> AssetResult<Vec<u8>> {
        match self.source {
            AssetSource::Memory(bytes) => Ok(bytes),
            AssetSource::File(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| AssetError::local_io(path.display().to_string(), e)),
        }
    }
}

/// Submits local bytes to the remote service.
///
/// Retries only rate-limited submissions; the byte buffer is borrowed for
/// the duration of the call and never retained.
pub struct AssetUploader {
    service: Arc<dyn RemoteAssetService>,
    invoker: RetryingInvoker,
}

impl AssetUploader {
    pub fn new(service: Arc<dyn RemoteAssetService>, policy: RetryPolicy) -> Self {
        Self {
            service,
            invoker: RetryingInvoker::new(policy),
        }
    }

    /// Upload `bytes` and return a handle in the `Processing` state.
    pub async fn upload(
        &self,
        bytes: &[u8],
        label: &str,
        content_type: &str,
        metadata: AssetMetadata,
        progress: &ProgressSender,
    ) -> AssetResult<RemoteAssetHandle> {
        let mut handle = RemoteAssetHandle::new(label, content_type, metadata);

        debug!(asset = label, bytes = bytes.len(), content_type, "Uploading asset");
        progress.upload_started(bytes.len());

        let service = self.service.as_ref();
        let submitted = self
            .invoker
            .invoke(progress, move || {
                service.submit_asset(bytes, content_type, label)
            })
            .await
            .map_err(|e| e.into_asset_error(Stage::Upload, AssetError::Upload))?;

        handle.acknowledge(submitted)?;

        if let Some(remote_id) = handle.remote_id() {
            info!(asset = label, remote_id = %remote_id, "Upload acknowledged");
            progress.upload_done(remote_id);
        }

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("a/reel.MP4")), "video/mp4");
        assert_eq!(content_type_for_path(Path::new("clip.mov")), "video/quicktime");
        assert_eq!(content_type_for_path(Path::new("clip.webm")), "video/webm");
        assert_eq!(content_type_for_path(Path::new("clip")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for_path(Path::new("notes.txt")), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_local_asset_label_from_file_name() {
        let asset = LocalAsset::from_path("/tmp/campaign/ad_one.mov");
        assert_eq!(asset.label(), "ad_one.mov");
        assert_eq!(asset.content_type(), "video/quicktime");

        let renamed = asset.with_label("hero ad");
        assert_eq!(renamed.label(), "hero ad");
    }

    #[tokio::test]
    async fn test_missing_file_is_local_io_error() {
        let asset = LocalAsset::from_path("/definitely/not/here.mp4");
        let err = asset.into_bytes().await.unwrap_err();
        assert_eq!(err.kind(), "local_io");
        assert!(err.to_string().contains("here.mp4"));
    }

    #[tokio::test]
    async fn test_memory_asset_bytes() {
        let asset = LocalAsset::from_bytes("a", vec![1, 2, 3], "video/mp4");
        assert_eq!(asset.into_bytes().await.unwrap(), vec![1, 2, 3]);
    }
}

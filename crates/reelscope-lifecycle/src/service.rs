//! Seams to the remote inference service and the prompt renderer.

use async_trait::async_trait;

use reelscope_models::{
    AssetStatus, InferenceOutput, InferenceRequest, RemoteAssetHandle, RemoteId, SubmittedAsset,
};

use crate::error::ServiceResult;

/// Remote service that stores assets and runs inference over them.
///
/// Implementations classify their failures into [`ServiceError`]; only
/// [`ServiceError::RateLimited`] is retried by the lifecycle.
///
/// [`ServiceError`]: crate::ServiceError
/// [`ServiceError::RateLimited`]: crate::ServiceError::RateLimited
#[async_trait]
pub trait RemoteAssetService: Send + Sync {
    /// Store `bytes` remotely. Creates one remote resource.
    async fn submit_asset(
        &self,
        bytes: &[u8],
        content_type: &str,
        display_name: &str,
    ) -> ServiceResult<SubmittedAsset>;

    /// Current processing state of an asset.
    async fn get_asset_status(&self, remote_id: &RemoteId) -> ServiceResult<AssetStatus>;

    /// Run the model over a ready asset.
    async fn run_inference(&self, request: &InferenceRequest) -> ServiceResult<InferenceOutput>;

    /// Delete an asset. Deleting an unknown id yields `NotFound`.
    async fn delete_asset(&self, remote_id: &RemoteId) -> ServiceResult<()>;
}

/// Renders the inference prompt for a ready asset.
pub trait PromptTemplate: Send + Sync {
    fn render(&self, handle: &RemoteAssetHandle) -> String;
}

impl<F> PromptTemplate for F
where
    F: Fn(&RemoteAssetHandle) -> String + Send + Sync,
{
    fn render(&self, handle: &RemoteAssetHandle) -> String {
        self(handle)
    }
}

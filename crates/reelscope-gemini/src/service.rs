//! [`RemoteAssetService`] backed by the Gemini Files API.

use async_trait::async_trait;

use reelscope_lifecycle::{RemoteAssetService, ServiceError, ServiceResult};
use reelscope_models::{
    AssetStatus, InferenceOutput, InferenceRequest, RemoteId, SubmittedAsset,
};

use crate::client::GeminiClient;
use crate::types::GeminiFile;

fn status_of(file: &GeminiFile) -> AssetStatus {
    AssetStatus {
        state: file.state.to_asset_state(),
        error: file.error.as_ref().map(|e| e.message.clone()),
    }
}

#[async_trait]
impl RemoteAssetService for GeminiClient {
    async fn submit_asset(
        &self,
        bytes: &[u8],
        content_type: &str,
        display_name: &str,
    ) -> ServiceResult<SubmittedAsset> {
        let file = self.upload_file(bytes, content_type, display_name).await?;
        Ok(SubmittedAsset {
            remote_id: RemoteId::from(file.name.as_str()),
            uri: file.uri.clone(),
            state: file.state.to_asset_state(),
        })
    }

    async fn get_asset_status(&self, remote_id: &RemoteId) -> ServiceResult<AssetStatus> {
        let file = self.get_file(remote_id.as_str()).await?;
        Ok(status_of(&file))
    }

    async fn run_inference(&self, request: &InferenceRequest) -> ServiceResult<InferenceOutput> {
        let uri = request.uri.as_deref().ok_or_else(|| {
            ServiceError::invalid_request(format!("{} has no file URI", request.remote_id))
        })?;

        let generation = self
            .generate_with_file(&request.prompt, &request.content_type, uri)
            .await?;

        Ok(InferenceOutput {
            text: generation.text,
            model: generation.model_version,
        })
    }

    async fn delete_asset(&self, remote_id: &RemoteId) -> ServiceResult<()> {
        self.delete_file(remote_id.as_str()).await?;
        Ok(())
    }
}

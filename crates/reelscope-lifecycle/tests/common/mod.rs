//! Scripted in-memory remote service shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use reelscope_lifecycle::{
    BatchConfig, LifecycleConfig, LocalAsset, PollPolicy, PromptTemplate, RemoteAssetService,
    RetryPolicy, ServiceError, ServiceResult,
};
use reelscope_models::{
    AssetState, AssetStatus, InferenceOutput, InferenceRequest, RemoteAssetHandle, RemoteId,
    SubmittedAsset,
};

#[derive(Default)]
struct State {
    next_id: u32,
    statuses: HashMap<String, VecDeque<AssetStatus>>,
    submit_states: HashMap<String, AssetState>,
    status_failures: HashMap<String, VecDeque<ServiceError>>,
    upload_failures: HashMap<String, VecDeque<ServiceError>>,
    inference_text: HashMap<String, String>,
    inference_failures: HashMap<String, VecDeque<ServiceError>>,
    delete_failures: HashMap<String, VecDeque<ServiceError>>,
    expire_on_inference: HashSet<String>,
    labels: HashMap<RemoteId, String>,
    live: HashSet<RemoteId>,
    deletes: Vec<RemoteId>,
    status_queries: HashMap<RemoteId, u32>,
    prompts: Vec<String>,
    calls: Vec<String>,
}

/// Fake service keyed by the display name passed at upload.
///
/// Status scripts are consumed front to back; the last entry repeats.
/// Assets without a script report `Ready`.
#[derive(Clone, Default)]
pub struct FakeService {
    state: Arc<Mutex<State>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(self, label: &str, states: &[AssetState]) -> Self {
        let script = states.iter().map(|s| AssetStatus::new(*s)).collect();
        self.state.lock().unwrap().statuses.insert(label.into(), script);
        self
    }

    pub fn with_status_script(self, label: &str, script: Vec<AssetStatus>) -> Self {
        self.state.lock().unwrap().statuses.insert(label.into(), script.into());
        self
    }

    /// Report `state` in the upload acknowledgement instead of `Processing`.
    pub fn settled_on_upload(self, label: &str, state: AssetState) -> Self {
        self.state.lock().unwrap().submit_states.insert(label.into(), state);
        self
    }

    pub fn processing_forever(self, label: &str) -> Self {
        self.with_statuses(label, &[AssetState::Processing])
    }

    pub fn fail_status(self, label: &str, errors: Vec<ServiceError>) -> Self {
        self.state.lock().unwrap().status_failures.insert(label.into(), errors.into());
        self
    }

    pub fn fail_upload(self, label: &str, errors: Vec<ServiceError>) -> Self {
        self.state.lock().unwrap().upload_failures.insert(label.into(), errors.into());
        self
    }

    pub fn with_inference(self, label: &str, text: &str) -> Self {
        self.state.lock().unwrap().inference_text.insert(label.into(), text.into());
        self
    }

    pub fn fail_inference(self, label: &str, errors: Vec<ServiceError>) -> Self {
        self.state.lock().unwrap().inference_failures.insert(label.into(), errors.into());
        self
    }

    pub fn fail_delete(self, label: &str, errors: Vec<ServiceError>) -> Self {
        self.state.lock().unwrap().delete_failures.insert(label.into(), errors.into());
        self
    }

    /// Drop the remote asset as soon as inference runs, so cleanup finds
    /// nothing to delete.
    pub fn expires_after_inference(self, label: &str) -> Self {
        self.state.lock().unwrap().expire_on_inference.insert(label.into());
        self
    }

    /// Remove a remote asset behind the orchestrator's back.
    pub fn forget(&self, remote_id: &RemoteId) {
        self.state.lock().unwrap().live.remove(remote_id);
    }

    pub fn remote_id_for(&self, label: &str) -> Option<RemoteId> {
        self.state
            .lock()
            .unwrap()
            .labels
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(id, _)| id.clone())
    }

    pub fn deletes(&self) -> Vec<RemoteId> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn delete_count(&self, remote_id: &RemoteId) -> usize {
        self.state
            .lock()
            .unwrap()
            .deletes
            .iter()
            .filter(|id| *id == remote_id)
            .count()
    }

    pub fn status_queries(&self, label: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state
            .labels
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .and_then(|(id, _)| state.status_queries.get(id).copied())
            .unwrap_or(0)
    }

    pub fn live_assets(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state.lock().unwrap().prompts.clone()
    }

    /// Ordered call log, e.g. `submit:a.mp4`, `status:a.mp4`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_of(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

fn pop(queue: Option<&mut VecDeque<ServiceError>>) -> Option<ServiceError> {
    queue.and_then(|q| q.pop_front())
}

#[async_trait]
impl RemoteAssetService for FakeService {
    async fn submit_asset(
        &self,
        _bytes: &[u8],
        _content_type: &str,
        display_name: &str,
    ) -> ServiceResult<SubmittedAsset> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("submit:{display_name}"));

        if let Some(err) = pop(state.upload_failures.get_mut(display_name)) {
            return Err(err);
        }

        state.next_id += 1;
        let remote_id = RemoteId::from(format!("files/{}", state.next_id));
        state.labels.insert(remote_id.clone(), display_name.to_string());
        state.live.insert(remote_id.clone());

        let mut submitted = SubmittedAsset::new(remote_id);
        if let Some(state) = state.submit_states.get(display_name) {
            submitted.state = *state;
        }
        Ok(submitted)
    }

    async fn get_asset_status(&self, remote_id: &RemoteId) -> ServiceResult<AssetStatus> {
        let mut state = self.state.lock().unwrap();
        let label = state
            .labels
            .get(remote_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(remote_id.to_string()))?;
        state.calls.push(format!("status:{label}"));
        *state.status_queries.entry(remote_id.clone()).or_default() += 1;

        if let Some(err) = pop(state.status_failures.get_mut(&label)) {
            return Err(err);
        }

        let status = match state.statuses.get_mut(&label) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().cloned(),
            None => None,
        };
        Ok(status.unwrap_or_else(|| AssetStatus::new(AssetState::Ready)))
    }

    async fn run_inference(&self, request: &InferenceRequest) -> ServiceResult<InferenceOutput> {
        let mut state = self.state.lock().unwrap();
        let label = state
            .labels
            .get(&request.remote_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(request.remote_id.to_string()))?;
        state.calls.push(format!("inference:{label}"));
        state.prompts.push(request.prompt.clone());

        if state.expire_on_inference.contains(&label) {
            state.live.remove(&request.remote_id);
        }

        if let Some(err) = pop(state.inference_failures.get_mut(&label)) {
            return Err(err);
        }

        let text = state
            .inference_text
            .get(&label)
            .cloned()
            .unwrap_or_else(|| format!("analysis of {label}"));
        Ok(InferenceOutput::new(text))
    }

    async fn delete_asset(&self, remote_id: &RemoteId) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        let label = state.labels.get(remote_id).cloned().unwrap_or_default();
        state.calls.push(format!("delete:{label}"));
        state.deletes.push(remote_id.clone());

        if let Some(err) = pop(state.delete_failures.get_mut(&label)) {
            return Err(err);
        }

        if state.live.remove(remote_id) {
            Ok(())
        } else {
            Err(ServiceError::not_found(remote_id.to_string()))
        }
    }
}

/// One-second base delays and a ten-second poll timeout.
pub fn lifecycle_config() -> LifecycleConfig {
    LifecycleConfig {
        upload: RetryPolicy::new("upload", 3, Duration::from_secs(1)),
        status: RetryPolicy::new("status_query", 3, Duration::from_secs(1)),
        inference: RetryPolicy::new("inference", 4, Duration::from_secs(2)),
        cleanup: RetryPolicy::new("cleanup", 2, Duration::from_secs(1)),
        poll: PollPolicy::new(Duration::from_secs(1), Duration::from_secs(10)),
    }
}

pub fn batch_config(inter_asset_delay: Duration) -> BatchConfig {
    BatchConfig {
        lifecycle: lifecycle_config(),
        inter_asset_delay,
    }
}

/// Prompt that lists the asset's metadata.
pub fn prompt() -> Arc<dyn PromptTemplate> {
    Arc::new(|handle: &RemoteAssetHandle| {
        let metrics: Vec<String> = handle
            .metadata()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("analyse {} [{}]", handle.local_identifier(), metrics.join(", "))
    })
}

pub fn asset(label: &str) -> LocalAsset {
    LocalAsset::from_bytes(label, vec![0u8; 64], "video/mp4")
}

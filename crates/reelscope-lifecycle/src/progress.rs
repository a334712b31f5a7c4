//! Progress reporting for asset lifecycles.
//!
//! This module provides a callback-based progress reporting system so the
//! lifecycle can emit phase events without being coupled to the transport
//! (terminal progress bar, WebSocket, logging, etc.).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use reelscope_models::{AssetState, BatchPosition, LifecyclePhase, ProgressEvent, RemoteId};

/// Progress callback type.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress sender scoped to one asset.
///
/// Sending never blocks; callbacks must return quickly.
#[derive(Clone)]
pub struct ProgressSender {
    sink: Option<ProgressCallback>,
    asset: String,
    position: Option<BatchPosition>,
}

impl fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSender")
            .field("asset", &self.asset)
            .field("position", &self.position)
            .field("connected", &self.sink.is_some())
            .finish()
    }
}

impl ProgressSender {
    /// Create a sender that forwards events to `callback`.
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            sink: Some(callback),
            asset: String::new(),
            position: None,
        }
    }

    pub fn from_fn(f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        Self::new(Arc::new(f))
    }

    /// A sender that drops every event.
    pub fn noop() -> Self {
        Self {
            sink: None,
            asset: String::new(),
            position: None,
        }
    }

    /// Derive a sender for one asset, sharing the same sink.
    pub fn for_asset(&self, asset: impl Into<String>, position: Option<BatchPosition>) -> Self {
        Self {
            sink: self.sink.clone(),
            asset: asset.into(),
            position,
        }
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn position(&self) -> Option<BatchPosition> {
        self.position
    }

    pub fn send(&self, phase: LifecyclePhase) {
        if let Some(sink) = &self.sink {
            sink(ProgressEvent::new(self.asset.clone(), self.position, phase));
        }
    }

    pub fn upload_started(&self, bytes: usize) {
        self.send(LifecyclePhase::UploadStarted { bytes: bytes as u64 });
    }

    pub fn upload_done(&self, remote_id: &RemoteId) {
        self.send(LifecyclePhase::UploadDone {
            remote_id: remote_id.to_string(),
        });
    }

    pub fn poll_tick(&self, state: AssetState, elapsed: Duration) {
        self.send(LifecyclePhase::PollTick {
            state,
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    pub fn settled(&self, state: AssetState) {
        self.send(LifecyclePhase::Settled { state });
    }

    pub fn inference_started(&self) {
        self.send(LifecyclePhase::InferenceStarted);
    }

    pub fn retry_scheduled(&self, operation: &str, attempt: u32, delay: Duration) {
        self.send(LifecyclePhase::RetryScheduled {
            operation: operation.to_string(),
            attempt,
            delay_ms: delay.as_millis() as u64,
        });
    }

    pub fn cleanup_done(&self) {
        self.send(LifecyclePhase::CleanupDone);
    }

    pub fn cleanup_failed(&self, error: impl Into<String>) {
        self.send(LifecyclePhase::CleanupFailed {
            error: error.into(),
        });
    }

    pub fn done(&self) {
        self.send(LifecyclePhase::Done);
    }

    pub fn failed(&self, error: impl Into<String>) {
        self.send(LifecyclePhase::Failed {
            error: error.into(),
        });
    }
}

/// Progress receiver for collecting events.
pub struct ProgressReceiver {
    rx: mpsc::Receiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Receive the next progress event.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Try to receive a progress event without blocking.
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create a bounded progress channel pair.
///
/// Events are dropped when the channel is full; the lifecycle never waits
/// on a slow consumer.
pub fn channel(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let sender = ProgressSender::from_fn(move |event| {
        let _ = tx.try_send(event);
    });
    (sender, ProgressReceiver { rx })
}

//! Campaign batch runner tests.

mod common;

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use common::{asset, batch_config, prompt, FakeService};
use reelscope_lifecycle::{CampaignBatchRunner, ConfigError, LocalAsset, ProgressSender, ServiceError};
use reelscope_models::{AssetMetadata, AssetState, BatchPosition};

fn runner(service: &FakeService, delay: Duration) -> CampaignBatchRunner {
    CampaignBatchRunner::from_config(Arc::new(service.clone()), prompt(), batch_config(delay))
        .expect("valid config")
}

fn ctr(value: &str) -> AssetMetadata {
    AssetMetadata::new().with("CTR", value)
}

#[tokio::test(start_paused = true)]
async fn test_failed_upload_does_not_stop_batch() {
    let service = FakeService::new()
        .fail_upload("b.mp4", vec![ServiceError::invalid_request("invalid content type")]);

    let outcomes = runner(&service, Duration::from_secs(1))
        .run_batch(vec![
            (asset("a.mp4"), AssetMetadata::new()),
            (asset("b.mp4"), AssetMetadata::new()),
            (asset("c.mp4"), AssetMetadata::new()),
        ])
        .await;

    let labels: Vec<_> = outcomes.iter().map(|o| o.local_identifier.as_str()).collect();
    assert_eq!(labels, vec!["a.mp4", "b.mp4", "c.mp4"]);

    assert!(outcomes[0].is_success());
    assert!(!outcomes[1].is_success());
    assert!(outcomes[1]
        .failure_reason()
        .unwrap()
        .contains("invalid content type"));
    assert!(outcomes[1].remote_id.is_none());
    assert!(outcomes[2].is_success());

    assert_eq!(service.calls_of("inference:"), 2);
    assert_eq!(service.deletes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_campaign_end_to_end() {
    let service = FakeService::new()
        .with_statuses("one.mp4", &[AssetState::Processing, AssetState::Ready])
        .with_statuses("two.mp4", &[AssetState::Processing, AssetState::Ready])
        .with_statuses("three.mp4", &[AssetState::Processing, AssetState::Ready])
        .with_inference("one.mp4", "strong hook, weak CTA")
        .with_inference("two.mp4", "slow opening")
        .with_inference("three.mp4", "scale this creative");

    let outcomes = runner(&service, Duration::from_secs(2))
        .run_batch(vec![
            (asset("one.mp4"), ctr("2.5%")),
            (asset("two.mp4"), ctr("1.0%")),
            (asset("three.mp4"), ctr("9.9%")),
        ])
        .await;

    assert_eq!(outcomes.len(), 3);
    let expected = [
        ("one.mp4", "2.5%", "strong hook, weak CTA"),
        ("two.mp4", "1.0%", "slow opening"),
        ("three.mp4", "9.9%", "scale this creative"),
    ];
    for (outcome, (label, ctr, text)) in outcomes.iter().zip(expected) {
        assert_eq!(outcome.local_identifier, label);
        assert_eq!(outcome.metadata.get("CTR"), Some(ctr));
        assert_eq!(outcome.result_text(), Some(text));
        assert_eq!(outcome.failure_reason(), None);
        assert_eq!(outcome.final_state, Some(AssetState::Ready));
        assert!(outcome.remote_id.is_some());
    }

    // Metadata reaches the prompt
    let prompts = service.prompts();
    assert!(prompts[0].contains("CTR=2.5%"));
    assert!(prompts[2].contains("CTR=9.9%"));
    assert_eq!(service.live_assets(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_assets_are_sequential_with_delay() {
    let service = FakeService::new();
    let starts = Arc::new(Mutex::new(Vec::new()));
    let sink = starts.clone();
    let origin = Instant::now();
    let progress = ProgressSender::from_fn(move |e| {
        if e.phase.as_str() == "upload_started" {
            sink.lock().unwrap().push((e.position, origin.elapsed()));
        }
    });

    let outcomes = runner(&service, Duration::from_secs(5))
        .with_progress(progress)
        .run_batch(vec![
            (asset("a.mp4"), AssetMetadata::new()),
            (asset("b.mp4"), AssetMetadata::new()),
            (asset("c.mp4"), AssetMetadata::new()),
        ])
        .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        *starts.lock().unwrap(),
        vec![
            (Some(BatchPosition::new(1, 3)), Duration::ZERO),
            (Some(BatchPosition::new(2, 3)), Duration::from_secs(5)),
            (Some(BatchPosition::new(3, 3)), Duration::from_secs(10)),
        ]
    );

    // Each asset finishes (including its delete) before the next upload
    let calls = service.calls();
    let first_delete = calls.iter().position(|c| c == "delete:a.mp4").unwrap();
    let second_submit = calls.iter().position(|c| c == "submit:b.mp4").unwrap();
    assert!(first_delete < second_submit);
}

#[tokio::test(start_paused = true)]
async fn test_missing_local_file_does_not_abort_batch() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("present.mp4");
    std::fs::File::create(&present)
        .unwrap()
        .write_all(b"not really a video")
        .unwrap();
    let missing = dir.path().join("missing.mp4");

    let service = FakeService::new();
    let outcomes = runner(&service, Duration::ZERO)
        .run_batch(vec![
            (LocalAsset::from_path(&missing), AssetMetadata::new()),
            (LocalAsset::from_path(&present), AssetMetadata::new()),
        ])
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].local_identifier, "missing.mp4");
    assert!(outcomes[0].failure_reason().unwrap().contains("missing.mp4"));
    assert!(outcomes[0].final_state.is_none());
    assert!(outcomes[1].is_success());
    assert_eq!(service.calls_of("submit:"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch() {
    let service = FakeService::new();
    let outcomes = runner(&service, Duration::from_secs(1)).run_batch(Vec::new()).await;
    assert!(outcomes.is_empty());
    assert!(service.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_processing_failure_recorded_with_final_state() {
    let service = FakeService::new().with_statuses("bad.mp4", &[AssetState::Failed]);

    let outcomes = runner(&service, Duration::ZERO)
        .run_batch(vec![
            (asset("bad.mp4"), ctr("0.1%")),
            (asset("good.mp4"), ctr("3.0%")),
        ])
        .await;

    assert_eq!(outcomes[0].final_state, Some(AssetState::Failed));
    assert_eq!(outcomes[0].metadata.get("CTR"), Some("0.1%"));
    assert!(outcomes[1].is_success());
    assert_eq!(service.deletes().len(), 2);
}

#[test]
fn test_invalid_batch_config_rejected() {
    let service = FakeService::new();
    let mut config = batch_config(Duration::from_secs(1));
    config.lifecycle.upload.initial_delay = Duration::ZERO;

    let result = CampaignBatchRunner::from_config(Arc::new(service), prompt(), config);
    assert!(matches!(result, Err(ConfigError::ZeroBackoff(_))));
}

//! Terminal progress for lifecycle events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

use reelscope_lifecycle::ProgressReceiver;
use reelscope_models::{LifecyclePhase, ProgressEvent};

/// Human-readable line for one phase.
pub fn describe(phase: &LifecyclePhase) -> String {
    match phase {
        LifecyclePhase::UploadStarted { bytes } => {
            format!("uploading {:.1} MB", *bytes as f64 / (1024.0 * 1024.0))
        }
        LifecyclePhase::UploadDone { remote_id } => format!("uploaded as {remote_id}"),
        LifecyclePhase::PollTick { state, elapsed_ms } => {
            format!("waiting for processing ({state}, {}s)", elapsed_ms / 1000)
        }
        LifecyclePhase::Settled { state } => format!("processing settled: {state}"),
        LifecyclePhase::InferenceStarted => "analysing".to_string(),
        LifecyclePhase::RetryScheduled {
            operation,
            attempt,
            delay_ms,
        } => format!(
            "{operation} rate limited, retry {attempt} in {:.1}s",
            *delay_ms as f64 / 1000.0
        ),
        LifecyclePhase::CleanupDone => "remote file deleted".to_string(),
        LifecyclePhase::CleanupFailed { error } => format!("remote file not deleted: {error}"),
        LifecyclePhase::Done => "done".to_string(),
        LifecyclePhase::Failed { error } => format!("failed: {error}"),
    }
}

/// Overall bar position for an event, in hundredths of an asset.
fn position_of(event: &ProgressEvent) -> u64 {
    let done_before = event
        .position
        .map(|p| p.index.saturating_sub(1) as u64)
        .unwrap_or(0);
    done_before * 100 + u64::from(event.phase.percent())
}

fn bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total.max(1) as u64 * 100);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {prefix} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    .progress_chars("#>-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Drain `events` into a progress bar on stderr until every sender is gone.
///
/// Retries, cleanup failures and terminal results are also printed as
/// permanent lines above the bar.
pub fn spawn(mut events: ProgressReceiver, total: usize, enabled: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let pb = if enabled { bar(total) } else { ProgressBar::hidden() };

        while let Some(event) = events.recv().await {
            let slot = event
                .position
                .map(|p| format!("[{}/{}]", p.index, p.total))
                .unwrap_or_default();
            let line = describe(&event.phase);

            // Retry events carry no meaningful percentage
            if !matches!(event.phase, LifecyclePhase::RetryScheduled { .. }) {
                pb.set_position(position_of(&event));
            }
            pb.set_prefix(format!("{slot} {}", event.asset).trim().to_string());

            match event.phase {
                LifecyclePhase::RetryScheduled { .. }
                | LifecyclePhase::CleanupFailed { .. }
                | LifecyclePhase::Done
                | LifecyclePhase::Failed { .. } => {
                    pb.println(format!("{slot} {}: {line}", event.asset).trim());
                }
                _ => {}
            }
            pb.set_message(line);
        }

        pb.finish_and_clear();
    })
}

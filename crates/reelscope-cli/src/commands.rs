//! Subcommand implementations.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use reelscope_gemini::GeminiClient;
use reelscope_lifecycle::{progress, CampaignBatchRunner, LocalAsset};
use reelscope_models::{AssetMetadata, BatchOutcome};

use crate::cli::{AnalyzeArgs, CampaignArgs, Cli, Commands, OutputArgs};
use crate::config::AppConfig;
use crate::display;
use crate::manifest::CampaignManifest;
use crate::prompt::{FunnelPrompt, FunnelStage};
use crate::report::{render_json, render_markdown};
use crate::source::{Downloader, InputSource, PreparedInput};

/// Time given to background deletes after Ctrl-C before the process exits.
const INTERRUPT_CLEANUP_GRACE: Duration = Duration::from_secs(5);

const PROGRESS_CAPACITY: usize = 256;

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => analyze(args).await,
        Commands::Campaign(args) => campaign(args).await,
        Commands::Stages => {
            print!("{}", stages_text());
            Ok(())
        }
    }
}

pub fn stages_text() -> String {
    let mut out = String::new();
    for stage in FunnelStage::ALL {
        out.push_str(&format!("{} ({})\n", stage, stage.as_str().to_lowercase()));
        for kpi in stage.kpis() {
            out.push_str(&format!("  - {} (e.g., {})\n", kpi.name, kpi.example));
        }
    }
    out
}

/// Resolve KPI pairs for `stage`, warning about names the stage does not know.
fn stage_metadata<I, K, V>(stage: FunnelStage, pairs: I, asset: &str) -> Result<AssetMetadata>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let (metadata, unknown) = stage.metadata_from(pairs);
    for name in unknown {
        warn!(asset, kpi = %name, stage = %stage, "KPI is not defined for this stage; passing it through");
    }
    FunnelPrompt::new(stage)
        .check_metrics(&metadata)
        .with_context(|| format!("{asset}: no KPI values given"))?;
    Ok(metadata)
}

async fn analyze(args: AnalyzeArgs) -> Result<()> {
    let source = InputSource::parse(&args.input)?;
    let label = args.label.clone().unwrap_or_else(|| source.label());
    let pairs = args.kpis.iter().map(|(name, value)| (name, value));
    let metadata = stage_metadata(args.stage, pairs, &label)?;

    let config = AppConfig::from_env();
    let downloader = Downloader::new(&config.work_dir).with_cookies(args.output.cookies.clone());
    let prepared = downloader.prepare(&source, Some(&label)).await?;

    let outcomes = execute(&config, args.stage, vec![(prepared, metadata)], &args.output).await?;
    write_report(args.stage, &outcomes, &args.output).await?;

    match outcomes.first().and_then(|o| o.failure_reason()) {
        Some(reason) => bail!("analysis failed: {reason}"),
        None => Ok(()),
    }
}

async fn campaign(args: CampaignArgs) -> Result<()> {
    let (manifest, entries) = CampaignManifest::load(&args.manifest).await?;
    let stage = manifest.stage;
    info!(
        manifest = %args.manifest.display(),
        stage = %stage,
        assets = entries.len(),
        "Loaded campaign manifest"
    );

    // Validate every entry before anything is downloaded or uploaded
    let mut planned = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let label = entry
            .label
            .clone()
            .unwrap_or_else(|| format!("{}-{}", i + 1, entry.source.label()));
        let metadata = stage_metadata(stage, &entry.metrics, &label)?;
        planned.push((entry.source, label, metadata));
    }

    let config = AppConfig::from_env();
    let downloader = Downloader::new(&config.work_dir).with_cookies(args.output.cookies.clone());

    let mut ready = Vec::new();
    let mut slots: Vec<Result<(), BatchOutcome>> = Vec::with_capacity(planned.len());
    for (source, label, metadata) in planned {
        match downloader.prepare(&source, Some(&label)).await {
            Ok(prepared) => {
                ready.push((prepared, metadata));
                slots.push(Ok(()));
            }
            Err(e) => {
                warn!(asset = %label, "Skipping asset: {}", e);
                slots.push(Err(BatchOutcome::failure(label, metadata, e.to_string())));
            }
        }
    }

    let mut ran = execute(&config, stage, ready, &args.output).await?.into_iter();
    let outcomes: Vec<BatchOutcome> = slots
        .into_iter()
        .filter_map(|slot| match slot {
            Ok(()) => ran.next(),
            Err(failed) => Some(failed),
        })
        .collect();

    write_report(stage, &outcomes, &args.output).await?;

    if !outcomes.is_empty() && outcomes.iter().all(|o| !o.is_success()) {
        bail!("every asset in the campaign failed");
    }
    Ok(())
}

/// Run prepared inputs through the batch runner with a progress display.
///
/// Downloaded reels stay on disk until this returns.
async fn execute(
    config: &AppConfig,
    stage: FunnelStage,
    inputs: Vec<(PreparedInput, AssetMetadata)>,
    output: &OutputArgs,
) -> Result<Vec<BatchOutcome>> {
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let client = GeminiClient::from_env().context("failed to create Gemini client")?;
    info!(model = client.model(), stage = %stage, assets = inputs.len(), "Starting analysis");

    let (sender, receiver) = progress::channel(PROGRESS_CAPACITY);
    let show_bar = !output.quiet && std::io::stderr().is_terminal();
    let display = display::spawn(receiver, inputs.len(), show_bar);

    let runner = CampaignBatchRunner::from_config(
        Arc::new(client),
        Arc::new(FunnelPrompt::new(stage)),
        config.batch(),
    )
    .context("invalid lifecycle configuration")?
    .with_progress(sender);

    let (assets, downloads): (Vec<(LocalAsset, AssetMetadata)>, Vec<_>) = inputs
        .into_iter()
        .map(|(prepared, metadata)| ((prepared.asset.clone(), metadata), prepared))
        .unzip();

    let outcomes = tokio::select! {
        outcomes = runner.run_batch(assets) => Some(outcomes),
        _ = tokio::signal::ctrl_c() => None,
    };

    drop(runner);
    let _ = display.await;
    drop(downloads);

    match outcomes {
        Some(outcomes) => Ok(outcomes),
        None => {
            warn!("Interrupted; waiting for remote cleanup");
            tokio::time::sleep(INTERRUPT_CLEANUP_GRACE).await;
            bail!("interrupted")
        }
    }
}

async fn write_report(stage: FunnelStage, outcomes: &[BatchOutcome], output: &OutputArgs) -> Result<()> {
    let report = if output.json {
        render_json(outcomes)?
    } else {
        render_markdown(stage, outcomes)
    };

    match &output.output {
        Some(path) => write_file(path, &report).await,
        None => {
            println!("{report}");
            Ok(())
        }
    }
}

async fn write_file(path: &Path, report: &str) -> Result<()> {
    tokio::fs::write(path, report)
        .await
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    info!(path = %path.display(), "Report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_text_lists_every_kpi() {
        let text = stages_text();
        assert!(text.starts_with("Awareness (awareness)\n  - Impressions (e.g., 5,000,000)\n"));
        assert!(text.contains("Traffic (traffic)"));
        assert!(text.contains("  - Cost Per Acquisition (CPA) (e.g., $50.00)"));
    }

    #[test]
    fn test_stage_metadata_requires_a_value() {
        let err = stage_metadata(FunnelStage::Traffic, [("CTR", " ")], "a.mp4").unwrap_err();
        assert!(err.to_string().contains("a.mp4"));

        let metadata = stage_metadata(FunnelStage::Traffic, [("ctr", "2.5%")], "a.mp4").unwrap();
        assert_eq!(metadata.get("Click-Through Rate (CTR)"), Some("2.5%"));
    }
}

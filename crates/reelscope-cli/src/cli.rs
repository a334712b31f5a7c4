//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::prompt::FunnelStage;

#[derive(Parser, Debug)]
#[command(name = "reelscope")]
#[command(version, about = "Analyse short-form video ads against their funnel KPIs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse one video file or reel URL
    Analyze(AnalyzeArgs),

    /// Analyse every asset in a campaign manifest, one after another
    Campaign(CampaignArgs),

    /// List funnel stages and the KPIs each one takes
    Stages,
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Print outcomes as JSON instead of markdown
    #[arg(long)]
    pub json: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Netscape cookies file passed to yt-dlp for reel downloads
    #[arg(long, env = "REELSCOPE_COOKIES_FILE")]
    pub cookies: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Video file path or Instagram reel URL
    pub input: String,

    /// Funnel stage the reel was run for
    #[arg(short, long, value_enum)]
    pub stage: FunnelStage,

    /// KPI value as NAME=VALUE (repeatable), e.g. --kpi CTR=2.5%
    #[arg(short, long = "kpi", value_name = "NAME=VALUE", value_parser = parse_kpi)]
    pub kpis: Vec<(String, String)>,

    /// Label used in logs and the report
    #[arg(long)]
    pub label: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CampaignArgs {
    /// Campaign manifest (JSON)
    pub manifest: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Parse a `NAME=VALUE` KPI argument.
pub fn parse_kpi(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing KPI name in '{s}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

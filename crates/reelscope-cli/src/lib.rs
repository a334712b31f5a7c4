//! Reelscope command-line front end.
//!
//! Wires the Gemini client into the lifecycle crate and adds what a
//! marketing analyst needs around it: funnel-stage prompts and KPIs, reel
//! downloads, campaign manifests and markdown reports.

pub mod cli;
pub mod commands;
pub mod config;
pub mod display;
pub mod manifest;
pub mod prompt;
pub mod report;
pub mod source;

pub use cli::Cli;
pub use config::AppConfig;
pub use prompt::{FunnelPrompt, FunnelStage};

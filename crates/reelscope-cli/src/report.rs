//! Markdown and JSON rendering of campaign outcomes.

use std::fmt::Write;

use reelscope_models::BatchOutcome;

use crate::prompt::FunnelStage;

/// Render outcomes as a markdown report, one section per asset.
pub fn render_markdown(stage: FunnelStage, outcomes: &[BatchOutcome]) -> String {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let mut out = String::new();

    let _ = writeln!(out, "# Reel analysis: {stage}");
    let _ = writeln!(out);
    let _ = writeln!(out, "{succeeded} of {} assets analysed.", outcomes.len());

    for (i, outcome) in outcomes.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {}. {}", i + 1, outcome.local_identifier);
        let _ = writeln!(out);

        if !outcome.metadata.is_empty() {
            let _ = writeln!(out, "**KPIs**");
            let _ = writeln!(out);
            for (name, value) in outcome.metadata.iter() {
                let _ = writeln!(out, "- {name}: {value}");
            }
            let _ = writeln!(out);
        }

        match (outcome.result_text(), outcome.failure_reason()) {
            (Some(text), _) => {
                let _ = writeln!(out, "{}", text.trim_end());
            }
            (None, Some(reason)) => {
                let _ = writeln!(out, "> **Failed:** {reason}");
                if let Some(state) = outcome.final_state {
                    let _ = writeln!(out, ">");
                    let _ = writeln!(out, "> Last remote state: `{}`", state.as_str());
                }
            }
            (None, None) => {}
        }
    }

    out
}

pub fn render_json(outcomes: &[BatchOutcome]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelscope_models::{AssetMetadata, AssetState, RemoteId};

    fn outcomes() -> Vec<BatchOutcome> {
        vec![
            BatchOutcome::success(
                "a.mp4",
                AssetMetadata::new().with("Click-Through Rate (CTR)", "2.5%"),
                "## Hook\nStrong.\n",
            ),
            BatchOutcome::failure("b.mp4", AssetMetadata::new(), "processing failed: bad codec")
                .with_remote(Some(RemoteId::from("files/2")), Some(AssetState::Failed)),
        ]
    }

    #[test]
    fn test_markdown_report() {
        let md = render_markdown(FunnelStage::Traffic, &outcomes());

        assert!(md.starts_with("# Reel analysis: Traffic\n"));
        assert!(md.contains("1 of 2 assets analysed."));
        assert!(md.contains("## 1. a.mp4\n\n**KPIs**\n\n- Click-Through Rate (CTR): 2.5%\n"));
        assert!(md.contains("## Hook\nStrong.\n"));
        assert!(md.contains("## 2. b.mp4\n\n> **Failed:** processing failed: bad codec"));
        assert!(md.contains("> Last remote state: `failed`"));
    }

    #[test]
    fn test_json_report_keeps_order() {
        let json = render_json(&outcomes()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["local_identifier"], "a.mp4");
        assert_eq!(value[1]["status"], "failure");
    }
}

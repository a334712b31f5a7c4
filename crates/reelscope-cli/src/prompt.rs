//! Funnel-stage analysis prompts and their KPIs.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use reelscope_lifecycle::PromptTemplate;
use reelscope_models::{AssetMetadata, RemoteAssetHandle};

/// A KPI tracked for a funnel stage, with an example value for help text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kpi {
    pub name: &'static str,
    pub example: &'static str,
}

const fn kpi(name: &'static str, example: &'static str) -> Kpi {
    Kpi { name, example }
}

const AWARENESS_KPIS: &[Kpi] = &[
    kpi("Impressions", "5,000,000"),
    kpi("Cost Per Thousand (CPM)", "$2.50"),
];

const TRAFFIC_KPIS: &[Kpi] = &[
    kpi("Click-Through Rate (CTR)", "2.5%"),
    kpi("Cost Per Click (CPC)", "$0.50"),
    kpi("Landing Page Views", "25,000"),
    kpi("Cost Per Landing Page View", "$0.80"),
];

const CONVERSION_KPIS: &[Kpi] = &[
    kpi("Purchases / Leads", "500"),
    kpi("Purchase Volume ($)", "$25,000"),
    kpi("Return On Ad Spend (ROAS)", "4.5x"),
    kpi("Cost Per Acquisition (CPA)", "$50.00"),
];

/// Marketing objective a reel is judged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FunnelStage {
    Awareness,
    Traffic,
    Conversion,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 3] = [
        FunnelStage::Awareness,
        FunnelStage::Traffic,
        FunnelStage::Conversion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FunnelStage::Awareness => "Awareness",
            FunnelStage::Traffic => "Traffic",
            FunnelStage::Conversion => "Conversion",
        }
    }

    pub fn kpis(&self) -> &'static [Kpi] {
        match self {
            FunnelStage::Awareness => AWARENESS_KPIS,
            FunnelStage::Traffic => TRAFFIC_KPIS,
            FunnelStage::Conversion => CONVERSION_KPIS,
        }
    }

    /// Match a user-supplied KPI name against this stage's KPIs.
    ///
    /// Accepts the full name or the abbreviation in parentheses, ignoring
    /// case: `ctr` and `Click-Through Rate (CTR)` both resolve.
    pub fn resolve_kpi(&self, name: &str) -> Option<&'static Kpi> {
        let wanted = name.trim();
        self.kpis().iter().find(|k| {
            k.name.eq_ignore_ascii_case(wanted)
                || abbreviation(k.name).is_some_and(|a| a.eq_ignore_ascii_case(wanted))
        })
    }

    /// Build metadata from `NAME=VALUE` pairs.
    ///
    /// Known KPIs are renamed to their canonical name and ordered as the
    /// stage lists them; unknown names are appended as given. Empty values
    /// are dropped.
    pub fn metadata_from<I, K, V>(&self, pairs: I) -> (AssetMetadata, Vec<String>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut known: Vec<(usize, &'static str, String)> = Vec::new();
        let mut unknown: Vec<(String, String)> = Vec::new();

        for (name, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match self.resolve_kpi(name.as_ref()) {
                Some(k) => {
                    let pos = self.kpis().iter().position(|x| x == k).unwrap_or(usize::MAX);
                    known.retain(|(p, _, _)| *p != pos);
                    known.push((pos, k.name, value.to_string()));
                }
                None => unknown.push((name.as_ref().trim().to_string(), value.to_string())),
            }
        }
        known.sort_by_key(|(pos, _, _)| *pos);

        let unknown_names = unknown.iter().map(|(n, _)| n.clone()).collect();
        let mut metadata = AssetMetadata::new();
        for (_, name, value) in known {
            metadata.insert(name, value);
        }
        for (name, value) in unknown {
            metadata.insert(name, value);
        }
        (metadata, unknown_names)
    }
}

impl fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn abbreviation(name: &str) -> Option<&str> {
    let open = name.rfind('(')?;
    let close = name.rfind(')')?;
    (close > open + 1).then(|| &name[open + 1..close])
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("At least one KPI value is required for {0}")]
    NoMetrics(FunnelStage),
}

/// KPI block for the prompt: one `- {kpi}: {value}` line per non-empty value.
pub fn metrics_text(metadata: &AssetMetadata) -> String {
    metadata
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(kpi, value)| format!("- {kpi}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Analysis prompt keyed by funnel stage.
#[derive(Debug, Clone, Copy)]
pub struct FunnelPrompt {
    stage: FunnelStage,
}

impl FunnelPrompt {
    pub fn new(stage: FunnelStage) -> Self {
        Self { stage }
    }

    pub fn stage(&self) -> FunnelStage {
        self.stage
    }

    /// Reject metadata that would render an empty KPI block.
    pub fn check_metrics(&self, metadata: &AssetMetadata) -> Result<(), PromptError> {
        if metrics_text(metadata).is_empty() {
            Err(PromptError::NoMetrics(self.stage))
        } else {
            Ok(())
        }
    }

    pub fn render_metrics(&self, metrics: &str) -> String {
        let stage = self.stage.as_str();
        format!(
            r#"You are an expert digital marketing and short-form video analyst. Analyse the attached reel together with its performance metrics and explain how its creative choices drive results for one marketing objective.

**Marketing Objective / Funnel Stage:** {stage}

**Key Performance Indicators (KPIs):**
{metrics}

**Analysis Task:**
Using the video and the KPIs above, produce the breakdown below. Be critical and specific, and tie every creative choice to a business outcome.

**1. Hook Analysis (First 3 Seconds):**
- **Description:** What is seen and heard in the first three seconds?
- **Hook Type:** Pain point, surprising statement, question, or visually captivating shot?
- **Effectiveness for {stage} (1-10):** Rate the hook for the {stage} goal specifically and explain the score.

**2. Video Structure and Pacing:**
- **Sections:** Name the main sections (intro, problem, solution, CTA, ...).
- **Pacing:** Fast cuts or slower shots? How does the pacing serve the {stage} goal?
- **Branding/Product Placement:** Where and how does the brand or product appear, and is it effective without being intrusive?

**3. Content & Creative Analysis:**
- **Core Message:** What is the core message and how does it support the {stage} objective?
- **Value Proposition:** Is the value (educational, entertaining, problem-solving) clear?
- **Creative Strategy:** Which storytelling, visual and audio choices explain the KPIs provided?

**4. Engagement & Conversion Triggers:**
- **Call to Action (CTA):** Is there a clear CTA (verbal, on-screen text, visual) and does it fit the {stage} goal?
- **Audience Prompts:** Does the video ask the audience anything?
- **Emotional Response:** Which emotions does it evoke and how do they drive the desired action?

**5. Overall Performance Score & Recommendations:**
- **Score for Objective (1-10):** How well is this creative optimised for {stage}?
- **Top 3 Reasons for Score:** The three creative elements that most affected the KPIs.
- **Actionable Recommendation:** One change for the next video with the same objective.
"#
        )
    }
}

impl PromptTemplate for FunnelPrompt {
    fn render(&self, handle: &RemoteAssetHandle) -> String {
        self.render_metrics(&metrics_text(handle.metadata()))
    }
}

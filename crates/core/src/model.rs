//! The data model shared by every pipeline stage.
//!
//! Artifacts form a content graph rooted at the [`Fingerprint`]: each stage
//! reads the prior stage's artifact and writes its own. Nothing here is
//! mutated after construction except through an explicit `with_*` builder —
//! the pipeline's idempotence properties depend on that.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Round a score/confidence to two decimal places so that `0.4 + 0.2`
/// serializes as exactly `0.6`, never `0.6000000000000001`.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn clamp01(x: f64) -> f64 {
    x.max(0.0).min(1.0)
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub root: PathBuf,
    pub commit: Option<String>,
    pub timestamp: String,
    /// language label -> file count. Keys unique by construction.
    pub languages: BTreeMap<String, u64>,
    /// Discovered marker names, insertion order preserved, each recorded once.
    pub markers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Component Target
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    McpServer,
    Cli,
    Skill,
    Hook,
    Plugin,
    Library,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::McpServer,
        ComponentKind::Cli,
        ComponentKind::Skill,
        ComponentKind::Hook,
        ComponentKind::Plugin,
        ComponentKind::Library,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::McpServer => "mcp-server",
            ComponentKind::Cli => "cli",
            ComponentKind::Skill => "skill",
            ComponentKind::Hook => "hook",
            ComponentKind::Plugin => "plugin",
            ComponentKind::Library => "library",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcp-server" => Ok(ComponentKind::McpServer),
            "cli" => Ok(ComponentKind::Cli),
            "skill" => Ok(ComponentKind::Skill),
            "hook" => Ok(ComponentKind::Hook),
            "plugin" => Ok(ComponentKind::Plugin),
            "library" => Ok(ComponentKind::Library),
            other => Err(format!("unknown component kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHints {
    pub keywords: Vec<String>,
    pub topics: Vec<String>,
    pub language_bias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTarget {
    pub kind: ComponentKind,
    /// In [0,1], rounded to two decimal places.
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub search_hints: SearchHints,
}

impl ComponentTarget {
    pub fn new(kind: ComponentKind, confidence: f64, evidence: Vec<String>, search_hints: SearchHints) -> Self {
        Self {
            kind,
            confidence: round2(clamp01(confidence)),
            evidence,
            search_hints,
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate (Tier-1)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// "owner/name" — the uniqueness key.
    pub id: String,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub pushed_at: String,
    pub license: Option<String>,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub lanes: Vec<String>,
    pub tier1_score: f64,
}

// ---------------------------------------------------------------------------
// Clone Entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneEntry {
    pub id: String,
    pub url: String,
    pub local_path: PathBuf,
    pub commit: String,
    pub tier1_score: f64,
}

// ---------------------------------------------------------------------------
// Matched Target / Modernity Signal / Validation Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedTarget {
    pub kind: ComponentKind,
    pub evidence: Vec<String>,
    pub focus_roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModernitySignal {
    pub name: String,
    pub passed: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub id: String,
    pub local_path: PathBuf,
    pub matched: Vec<MatchedTarget>,
    pub modernity: Vec<ModernitySignal>,
    pub structural_match_count: usize,
    pub modernity_score: f64,
    pub tier1_score: f64,
    pub tier2_score: f64,
}

// ---------------------------------------------------------------------------
// Focus Bundle / Provenance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entrypoint {
    pub kind: ComponentKind,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundledFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusBundle {
    pub id: String,
    pub entrypoints: Vec<Entrypoint>,
    pub scope_roots: Vec<PathBuf>,
    pub files: Vec<BundledFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub id: String,
    pub url: String,
    pub commit: String,
    pub license: Option<String>,
    pub tier1_score: f64,
    pub tier2_score: f64,
    pub tool_version: String,
    pub run_id: String,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Compare Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProjectSummary {
    pub root: PathBuf,
    pub commit: Option<String>,
    pub targets: Vec<ComponentTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidateSummary {
    pub id: String,
    pub tier2_score: f64,
    pub structural_match_count: usize,
    pub modernity_score: f64,
    pub license: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub discovered: usize,
    pub cloned: usize,
    pub validated: usize,
    /// Open question (a): absent vs empty when zero candidates remain after
    /// filtering — kept as an explicit optional field rather than guessed.
    pub top_recommendation: Option<RankedCandidateSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    pub run_id: String,
    pub timestamp: String,
    pub source: SourceProjectSummary,
    pub ranked: Vec<RankedCandidateSummary>,
    pub pipeline: PipelineSummary,
}

/// A compressed rendering of [`CompareReport`], at most ~2000 characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_avoids_float_drift() {
        assert_eq!(round2(0.4 + 0.2), 0.6);
        assert_eq!(round2(0.1 + 0.2), 0.3);
    }

    #[test]
    fn component_target_confidence_is_clamped_and_rounded() {
        let t = ComponentTarget::new(ComponentKind::Cli, 1.2345, vec![], SearchHints::default());
        assert_eq!(t.confidence, 1.0);
        let t = ComponentTarget::new(ComponentKind::Cli, -0.5, vec![], SearchHints::default());
        assert_eq!(t.confidence, 0.0);
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in ComponentKind::ALL {
            let s = kind.to_string();
            let parsed: ComponentKind = s.parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    proptest::proptest! {
        /// `round2` never produces a value outside two decimal places of
        /// precision and never pushes a finite input out of its own
        /// immediate neighborhood — the rounding rule from spec.md §2/§8
        /// must hold for arbitrary confidence/score sums, not just 0.4+0.2.
        #[test]
        fn round2_is_idempotent_and_two_decimal(x in -10.0f64..10.0f64) {
            let once = round2(x);
            let twice = round2(once);
            prop_assert_eq!(once, twice);
            let cents = (once * 100.0).round();
            prop_assert_eq!(once, cents / 100.0);
        }

        /// Confidence is always clamped into [0,1] and rounded, for any
        /// weight sum a detector might accumulate.
        #[test]
        fn component_target_confidence_always_in_unit_range(weight_sum in -5.0f64..5.0f64) {
            let t = ComponentTarget::new(ComponentKind::Cli, weight_sum, vec![], SearchHints::default());
            prop_assert!((0.0..=1.0).contains(&t.confidence));
        }
    }
}

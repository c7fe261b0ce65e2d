//! Target Inferer: apply weighted detectors over a fingerprint
//! and a manifest to produce ranked [`ComponentTarget`]s.
//!
//! Detectors are independent pure functions, composed the way a convention
//! miner composes small, single-purpose scanners that each return a typed
//! sub-report. Detector *order* is irrelevant to the final ordering, which
//! is confidence descending with a 0.2 minimum threshold.

use crate::model::{ComponentKind, ComponentTarget, Fingerprint, SearchHints};
use std::collections::HashMap;
use std::path::Path;

pub const MIN_CONFIDENCE: f64 = 0.2;

/// Filesystem facts a detector may consult, beyond the fingerprint itself —
/// kept separate from `Fingerprint` because these are read lazily (manifest
/// parses) rather than collected during the single tree walk.
#[derive(Debug, Default)]
pub struct ManifestFacts {
    pub has_mcp_json: bool,
    pub has_skill_md: bool,
    pub has_claude_hooks_dir: bool,
    pub has_claude_plugin_manifest: bool,
    pub has_bin_section: bool,
    pub cargo_has_lib_target: bool,
    pub package_json_has_bin: bool,
}

pub fn collect_manifest_facts(root: &Path) -> ManifestFacts {
    let mut facts = ManifestFacts::default();
    facts.has_mcp_json = root.join(".mcp.json").exists() || root.join("mcp.json").exists();
    facts.has_skill_md = root.join("SKILL.md").exists();
    facts.has_claude_hooks_dir = root.join(".claude").join("hooks").is_dir();
    facts.has_claude_plugin_manifest =
        root.join(".claude-plugin").join("plugin.json").exists() || root.join("plugin.json").exists();

    if let Ok(content) = std::fs::read_to_string(root.join("Cargo.toml")) {
        facts.has_bin_section = content.contains("[[bin]]") || content.contains("[bin]");
        facts.cargo_has_lib_target = content.contains("[lib]") || root.join("src/lib.rs").exists();
    }
    if let Ok(content) = std::fs::read_to_string(root.join("package.json")) {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(&content) {
            facts.package_json_has_bin = v.get("bin").is_some();
        }
    }
    facts
}

struct Signal {
    weight: f64,
    evidence: String,
}

fn most_common_language(fp: &Fingerprint) -> Option<String> {
    fp.languages
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(lang, _)| lang.clone())
}

fn hints_for(kind: ComponentKind, fp: &Fingerprint, extra_keywords: &[&str]) -> SearchHints {
    SearchHints {
        keywords: extra_keywords.iter().map(|s| s.to_string()).collect(),
        topics: vec![kind.as_str().to_string()],
        language_bias: most_common_language(fp),
    }
}

fn detect_mcp_server(fp: &Fingerprint, facts: &ManifestFacts) -> Vec<Signal> {
    let mut signals = Vec::new();
    if facts.has_mcp_json {
        signals.push(Signal {
            weight: 0.6,
            evidence: "found .mcp.json".into(),
        });
    }
    if fp.markers.iter().any(|m| m == ".mcp.json" || m == "mcp.json") {
        signals.push(Signal {
            weight: 0.2,
            evidence: "mcp manifest marker present".into(),
        });
    }
    signals
}

fn detect_cli(fp: &Fingerprint, facts: &ManifestFacts) -> Vec<Signal> {
    let mut signals = Vec::new();
    if facts.has_bin_section {
        signals.push(Signal {
            weight: 0.5,
            evidence: "Cargo.toml declares a [[bin]] target".into(),
        });
    }
    if facts.package_json_has_bin {
        signals.push(Signal {
            weight: 0.5,
            evidence: "package.json declares a bin entry".into(),
        });
    }
    if fp.markers.iter().any(|m| m == "Cargo.toml") && fp.languages.contains_key("Rust") {
        signals.push(Signal {
            weight: 0.1,
            evidence: "Rust manifest present".into(),
        });
    }
    signals
}

fn detect_skill(facts: &ManifestFacts) -> Vec<Signal> {
    let mut signals = Vec::new();
    if facts.has_skill_md {
        signals.push(Signal {
            weight: 0.8,
            evidence: "found SKILL.md".into(),
        });
    }
    signals
}

fn detect_hook(facts: &ManifestFacts) -> Vec<Signal> {
    let mut signals = Vec::new();
    if facts.has_claude_hooks_dir {
        signals.push(Signal {
            weight: 0.7,
            evidence: "found .claude/hooks/".into(),
        });
    }
    signals
}

fn detect_plugin(facts: &ManifestFacts) -> Vec<Signal> {
    let mut signals = Vec::new();
    if facts.has_claude_plugin_manifest {
        signals.push(Signal {
            weight: 0.7,
            evidence: "found .claude-plugin/plugin.json".into(),
        });
    }
    signals
}

fn detect_library(fp: &Fingerprint, facts: &ManifestFacts) -> Vec<Signal> {
    let mut signals = Vec::new();
    if facts.cargo_has_lib_target {
        signals.push(Signal {
            weight: 0.4,
            evidence: "Cargo.toml declares a [lib] target".into(),
        });
    }
    if fp.markers.iter().any(|m| m == "Cargo.toml" || m == "package.json" || m == "pyproject.toml") {
        signals.push(Signal {
            weight: 0.25,
            evidence: "package manifest present".into(),
        });
    }
    signals
}

/// Produce ranked component targets for `root`. Detector order above is
/// irrelevant to the output: everything is collected then sorted once.
pub fn infer_targets(root: &Path, fp: &Fingerprint) -> Vec<ComponentTarget> {
    let facts = collect_manifest_facts(root);

    let detections: HashMap<ComponentKind, Vec<Signal>> = HashMap::from([
        (ComponentKind::McpServer, detect_mcp_server(fp, &facts)),
        (ComponentKind::Cli, detect_cli(fp, &facts)),
        (ComponentKind::Skill, detect_skill(&facts)),
        (ComponentKind::Hook, detect_hook(&facts)),
        (ComponentKind::Plugin, detect_plugin(&facts)),
        (ComponentKind::Library, detect_library(fp, &facts)),
    ]);

    let mut targets: Vec<ComponentTarget> = detections
        .into_iter()
        .filter_map(|(kind, signals)| {
            if signals.is_empty() {
                return None;
            }
            let weight_sum: f64 = signals.iter().map(|s| s.weight).sum();
            let evidence = signals.into_iter().map(|s| s.evidence).collect();
            let extra_keywords: Vec<&str> = Vec::new();
            Some(ComponentTarget::new(
                kind,
                weight_sum,
                evidence,
                hints_for(kind, fp, &extra_keywords),
            ))
        })
        .filter(|t| t.confidence >= MIN_CONFIDENCE)
        .collect();

    targets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.kind.cmp(&b.kind))
    });
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn fp_with_markers(markers: &[&str]) -> Fingerprint {
        Fingerprint {
            root: std::path::PathBuf::from("."),
            commit: None,
            timestamp: "2026-01-01T00:00:00Z".into(),
            languages: BTreeMap::new(),
            markers: markers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn skill_and_hook_detected_from_markers_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("SKILL.md"), "# skill").unwrap();
        std::fs::create_dir_all(dir.path().join(".claude/hooks")).unwrap();

        let fp = fp_with_markers(&["SKILL.md"]);
        let targets = infer_targets(dir.path(), &fp);
        let kinds: Vec<ComponentKind> = targets.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&ComponentKind::Skill));
        assert!(kinds.contains(&ComponentKind::Hook));
        for t in &targets {
            assert!(t.confidence <= 1.0);
            let cents = (t.confidence * 100.0).round();
            assert_eq!(t.confidence, cents / 100.0);
        }
    }

    #[test]
    fn confidence_descending_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("SKILL.md"), "# skill").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[lib]\nname=\"x\"").unwrap();
        let fp = fp_with_markers(&["SKILL.md", "Cargo.toml"]);
        let targets = infer_targets(dir.path(), &fp);
        for w in targets.windows(2) {
            assert!(w[0].confidence >= w[1].confidence);
        }
    }

    #[test]
    fn below_threshold_targets_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let fp = fp_with_markers(&[]);
        let targets = infer_targets(dir.path(), &fp);
        assert!(targets.iter().all(|t| t.confidence >= MIN_CONFIDENCE));
    }
}

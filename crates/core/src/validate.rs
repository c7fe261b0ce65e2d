//! Structural Validator: detect which component kinds are present in a
//! cloned repo via filesystem/manifest evidence only, never
//! content-executable analysis. Each detector generalizes "recognize a
//! workspace layout" to "detect component kind" for an arbitrary cloned
//! repo.

use crate::model::{ComponentKind, MatchedTarget};
use std::path::{Path, PathBuf};

fn default_focus_roots(kind: ComponentKind) -> Vec<PathBuf> {
    match kind {
        ComponentKind::McpServer => vec!["src".into(), "server".into()],
        ComponentKind::Cli => vec!["src".into(), "cmd".into()],
        ComponentKind::Skill => vec![".claude/skills".into()],
        ComponentKind::Hook => vec![".claude/hooks".into()],
        ComponentKind::Plugin => vec![".claude-plugin".into()],
        ComponentKind::Library => vec!["src".into(), "lib".into()],
    }
}

fn detect_mcp_server(root: &Path) -> Vec<String> {
    let mut evidence = Vec::new();
    for name in [".mcp.json", "mcp.json"] {
        if root.join(name).exists() {
            evidence.push(format!("found {name}"));
        }
    }
    if let Ok(content) = std::fs::read_to_string(root.join("package.json")) {
        if content.contains("@modelcontextprotocol/sdk") {
            evidence.push("package.json depends on @modelcontextprotocol/sdk".into());
        }
    }
    if let Ok(content) = std::fs::read_to_string(root.join("Cargo.toml")) {
        if content.contains("rmcp") || content.contains("mcp-sdk") {
            evidence.push("Cargo.toml depends on an MCP SDK crate".into());
        }
    }
    evidence
}

fn detect_cli(root: &Path) -> Vec<String> {
    let mut evidence = Vec::new();
    if let Ok(content) = std::fs::read_to_string(root.join("Cargo.toml")) {
        if content.contains("[[bin]]") {
            evidence.push("Cargo.toml declares [[bin]]".into());
        }
    }
    if let Ok(content) = std::fs::read_to_string(root.join("package.json")) {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(&content) {
            if v.get("bin").is_some() {
                evidence.push("package.json declares bin".into());
            }
        }
    }
    if root.join("cmd").is_dir() {
        evidence.push("found cmd/ (Go CLI convention)".into());
    }
    evidence
}

fn detect_skill(root: &Path) -> Vec<String> {
    let mut evidence = Vec::new();
    if root.join("SKILL.md").exists() {
        evidence.push("found SKILL.md".into());
    }
    if root.join(".claude/skills").is_dir() {
        evidence.push("found .claude/skills/".into());
    }
    evidence
}

fn detect_hook(root: &Path) -> Vec<String> {
    let mut evidence = Vec::new();
    if root.join(".claude/hooks").is_dir() {
        evidence.push("found .claude/hooks/".into());
    }
    if let Ok(content) = std::fs::read_to_string(root.join(".claude/settings.json")) {
        if content.contains("\"hooks\"") {
            evidence.push(".claude/settings.json declares hooks".into());
        }
    }
    evidence
}

fn detect_plugin(root: &Path) -> Vec<String> {
    let mut evidence = Vec::new();
    if root.join(".claude-plugin/plugin.json").exists() || root.join("plugin.json").exists() {
        evidence.push("found plugin.json".into());
    }
    evidence
}

/// Fallback detector: every repo with a recognizable package manifest
/// matches `library` so that validation always has at least one matched
/// kind.
fn detect_library(root: &Path) -> Vec<String> {
    let mut evidence = Vec::new();
    for manifest in ["Cargo.toml", "package.json", "pyproject.toml", "go.mod", "Gemfile"] {
        if root.join(manifest).exists() {
            evidence.push(format!("found {manifest}"));
        }
    }
    evidence
}

/// Run the fixed detector set over `root`, returning every kind with >= 1
/// piece of evidence. Focus roots default per-kind when the detector found
/// no more specific location.
pub fn validate_structure(root: &Path) -> Vec<MatchedTarget> {
    let detections: Vec<(ComponentKind, Vec<String>)> = vec![
        (ComponentKind::McpServer, detect_mcp_server(root)),
        (ComponentKind::Cli, detect_cli(root)),
        (ComponentKind::Skill, detect_skill(root)),
        (ComponentKind::Hook, detect_hook(root)),
        (ComponentKind::Plugin, detect_plugin(root)),
        (ComponentKind::Library, detect_library(root)),
    ];

    detections
        .into_iter()
        .filter(|(_, evidence)| !evidence.is_empty())
        .map(|(kind, evidence)| {
            let focus_roots = default_focus_roots(kind)
                .into_iter()
                .filter(|r| root.join(r).exists())
                .collect::<Vec<_>>();
            let focus_roots = if focus_roots.is_empty() {
                default_focus_roots(kind)
            } else {
                focus_roots
            };
            MatchedTarget {
                kind,
                evidence,
                focus_roots,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_fallback_fires_when_manifest_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"").unwrap();
        let matched = validate_structure(dir.path());
        assert!(matched.iter().any(|m| m.kind == ComponentKind::Library));
    }

    #[test]
    fn no_manifest_yields_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let matched = validate_structure(dir.path());
        assert!(matched.is_empty());
    }

    #[test]
    fn cli_detected_from_cargo_bin_section() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[[bin]]\nname=\"x\"").unwrap();
        let matched = validate_structure(dir.path());
        assert!(matched.iter().any(|m| m.kind == ComponentKind::Cli));
    }
}

//! Focus Bundler: select entrypoints and a depth-budgeted file
//! list per matched kind, emit a bundle plus provenance.
//!
//! The scope walk reuses the `ignore`-backed walker style from
//! [`crate::fingerprint`], tightened to a per-target depth/size budget.

use crate::fingerprint;
use crate::model::{BundledFile, ComponentKind, Entrypoint, FocusBundle, MatchedTarget, Provenance, ValidationResult};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Files considered for scope bundling, regardless of kind.
const INCLUDED_EXTENSIONS: &[&str] = &[
    "rs", "toml", "go", "py", "ts", "tsx", "js", "jsx", "json", "md", "yaml", "yml",
];

pub const MAX_DEPTH: usize = 5;

fn per_kind_priority_entrypoints(kind: ComponentKind) -> Vec<&'static str> {
    match kind {
        ComponentKind::McpServer => vec!["src/index.ts", "src/main.rs", "src/server.ts", "mcp.json"],
        ComponentKind::Cli => vec!["src/main.rs", "src/cli.rs", "cmd/main.go", "bin/cli.js"],
        ComponentKind::Skill => vec!["SKILL.md"],
        ComponentKind::Hook => vec![".claude/hooks/hooks.json"],
        ComponentKind::Plugin => vec![".claude-plugin/plugin.json", "plugin.json"],
        ComponentKind::Library => vec!["src/lib.rs", "index.ts", "__init__.py"],
    }
}

fn resolve_entrypoints_for(
    root: &Path,
    matched: &MatchedTarget,
    max_per_kind: usize,
) -> Vec<Entrypoint> {
    let mut entrypoints = Vec::new();
    let mut seen = std::collections::HashSet::new();

    // (a) candidate paths carried from validation, if they exist on disk.
    for candidate in &matched.focus_roots {
        let full = root.join(candidate);
        if full.is_file() && seen.insert(candidate.clone()) {
            entrypoints.push(Entrypoint {
                kind: matched.kind,
                path: candidate.clone(),
                reason: "candidate path from validation".into(),
            });
        }
        if entrypoints.len() >= max_per_kind {
            return entrypoints;
        }
    }

    // (b) fixed per-kind priority list.
    for rel in per_kind_priority_entrypoints(matched.kind) {
        let rel_path = PathBuf::from(rel);
        if root.join(&rel_path).is_file() && seen.insert(rel_path.clone()) {
            entrypoints.push(Entrypoint {
                kind: matched.kind,
                path: rel_path,
                reason: "fixed per-kind priority entrypoint".into(),
            });
        }
        if entrypoints.len() >= max_per_kind {
            return entrypoints;
        }
    }

    // (c) README as a library-kind entrypoint, if not already included.
    if matched.kind == ComponentKind::Library {
        for name in ["README.md", "Readme.md", "readme.md"] {
            let rel_path = PathBuf::from(name);
            if root.join(&rel_path).is_file() && seen.insert(rel_path.clone()) {
                entrypoints.push(Entrypoint {
                    kind: matched.kind,
                    path: rel_path,
                    reason: "README fallback entrypoint".into(),
                });
                break;
            }
        }
    }

    entrypoints.truncate(max_per_kind);
    entrypoints
}

/// Deduplicate scope roots: drop any root that is a prefix of another.
fn dedupe_scope_roots(mut roots: Vec<PathBuf>) -> Vec<PathBuf> {
    roots.sort();
    roots.dedup();
    let mut result: Vec<PathBuf> = Vec::new();
    'outer: for candidate in roots {
        for existing in &result {
            if candidate.starts_with(existing) {
                continue 'outer;
            }
        }
        result.retain(|existing: &PathBuf| !existing.starts_with(&candidate));
        result.push(candidate);
    }
    result
}

fn walk_scope_root(
    root: &Path,
    scope_root: &Path,
    max_dirs: u32,
    max_files_per_dir: u32,
) -> Vec<BundledFile> {
    let full_root = root.join(scope_root);
    if !full_root.exists() {
        return Vec::new();
    }

    let mut files = Vec::new();
    let mut dirs_visited: std::collections::HashSet<PathBuf> = std::collections::HashSet::new();
    let mut per_dir_counts: std::collections::HashMap<PathBuf, u32> = std::collections::HashMap::new();

    let walker = WalkBuilder::new(&full_root)
        .hidden(false)
        .git_ignore(true)
        .max_depth(Some(MAX_DEPTH))
        .filter_entry(|entry| {
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                let name = entry.file_name().to_string_lossy();
                return !fingerprint::is_denied_dir(&name);
            }
            true
        })
        .build();

    for entry in walker.flatten() {
        if entry.file_type().is_some_and(|ft| ft.is_dir()) {
            if dirs_visited.len() as u32 >= max_dirs {
                continue;
            }
            dirs_visited.insert(entry.path().to_path_buf());
            continue;
        }
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let ext = entry.path().extension().and_then(|e| e.to_str()).unwrap_or("");
        if !INCLUDED_EXTENSIONS.contains(&ext) {
            continue;
        }
        let parent = entry.path().parent().unwrap_or(&full_root).to_path_buf();
        let count = per_dir_counts.entry(parent).or_insert(0);
        if *count >= max_files_per_dir {
            continue;
        }
        *count += 1;

        let Ok(meta) = entry.metadata() else { continue };
        let Ok(rel) = entry.path().strip_prefix(root) else { continue };
        files.push(BundledFile {
            path: rel.to_path_buf(),
            size_bytes: meta.len(),
        });
    }

    files.sort_by_key(|f| f.size_bytes);
    files
}

pub fn build_bundle(
    root: &Path,
    validation: &ValidationResult,
    max_per_kind: usize,
    max_dirs_per_target: u32,
    max_files_per_dir: u32,
) -> FocusBundle {
    let mut entrypoints = Vec::new();
    let mut scope_roots: Vec<PathBuf> = Vec::new();

    for matched in &validation.matched {
        entrypoints.extend(resolve_entrypoints_for(root, matched, max_per_kind));
        scope_roots.extend(matched.focus_roots.clone());
    }

    let scope_roots = dedupe_scope_roots(scope_roots);

    let mut files = Vec::new();
    for scope_root in &scope_roots {
        files.extend(walk_scope_root(root, scope_root, max_dirs_per_target, max_files_per_dir));
    }
    files.sort_by_key(|f| f.size_bytes);

    FocusBundle {
        id: validation.id.clone(),
        entrypoints,
        scope_roots,
        files,
    }
}

pub fn build_provenance(
    validation: &ValidationResult,
    url: &str,
    commit: &str,
    license: Option<String>,
    tool_version: &str,
    run_id: &str,
    timestamp: &str,
) -> Provenance {
    Provenance {
        id: validation.id.clone(),
        url: url.to_string(),
        commit: commit.to_string(),
        license,
        tier1_score: validation.tier1_score,
        tier2_score: validation.tier2_score,
        tool_version: tool_version.to_string(),
        run_id: run_id.to_string(),
        timestamp: timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_roots_are_dropped() {
        let roots = vec![PathBuf::from("src"), PathBuf::from("src/sub"), PathBuf::from("docs")];
        let deduped = dedupe_scope_roots(roots);
        assert!(deduped.contains(&PathBuf::from("src")));
        assert!(deduped.contains(&PathBuf::from("docs")));
        assert!(!deduped.contains(&PathBuf::from("src/sub")));
    }

    #[test]
    fn files_sorted_ascending_by_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/big.rs"), "x".repeat(500)).unwrap();
        std::fs::write(dir.path().join("src/small.rs"), "x").unwrap();
        let files = walk_scope_root(dir.path(), Path::new("src"), 20, 50);
        assert!(files.windows(2).all(|w| w[0].size_bytes <= w[1].size_bytes));
    }
}

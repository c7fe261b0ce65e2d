//! Session Builder: materialize a working tree at a new
//! commit, compute a scoped hygienic diff, detect drift, chunk by token
//! budget, and write the session artifact set.

use crate::cachedir;
use crate::error::{Result, ScoutError};
use crate::vcs::{self, ProcessRunner};
use crate::watch::store::{DiffStats, SessionRow, WatchStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths never included in a hygienic diff, regardless of tracked scope.
const EXCLUSION_GLOBS: &[&str] = &[
    ":(exclude)*.lock",
    ":(exclude)*-lock.json",
    ":(exclude)*.min.js",
    ":(exclude)Cargo.lock",
    ":(exclude)package-lock.json",
    ":(exclude)pnpm-lock.yaml",
    ":(exclude)yarn.lock",
    ":(exclude)*.png",
    ":(exclude)*.jpg",
    ":(exclude)*.jpeg",
    ":(exclude)*.gif",
    ":(exclude)*.zip",
    ":(exclude)*.tar.gz",
    ":(exclude)dist/**",
    ":(exclude)build/**",
    ":(exclude)target/**",
    ":(exclude)node_modules/**",
];

const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewContext {
    pub repo: String,
    pub url: String,
    pub from_commit: String,
    pub to_commit: String,
    pub target_kind: String,
    pub tracked_paths: Vec<String>,
    pub drift: bool,
    pub chunk_count: usize,
    pub estimated_tokens: usize,
    pub reviewer_skill: String,
    pub created_at: String,
}

fn safe_repo_name(full_name: &str) -> String {
    full_name.replace('/', "__")
}

fn short7(commit: &str) -> String {
    commit.chars().take(7).collect()
}

/// `ceil(chars/4)` token estimate.
fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}

/// Split unified diff text into per-file hunks, in file order.
fn split_into_file_hunks(diff_text: &str) -> Vec<String> {
    let mut hunks = Vec::new();
    let mut current = String::new();
    for line in diff_text.lines() {
        if line.starts_with("diff --git") && !current.is_empty() {
            hunks.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.is_empty() {
        hunks.push(current);
    }
    hunks
}

/// Pack file hunks into chunks bounded by a token budget and a max-files
/// count. A single oversize file becomes its own chunk.
fn chunk_hunks(hunks: &[String], token_budget: usize, max_files: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_files = 0usize;
    let mut current_tokens = 0usize;

    for hunk in hunks {
        let hunk_tokens = estimate_tokens(hunk);
        let would_overflow = !current.is_empty()
            && (current_tokens + hunk_tokens > token_budget || current_files + 1 > max_files);
        if would_overflow {
            chunks.push(std::mem::take(&mut current));
            current_files = 0;
            current_tokens = 0;
        }
        current.push_str(hunk);
        current_files += 1;
        current_tokens += hunk_tokens;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Sum `git diff --numstat` lines (`<ins>\t<del>\t<path>`, `-` for binary
/// files) into aggregate insertion/deletion counts.
fn diff_stats_from_numstat(numstat: &str, files_changed: u32) -> DiffStats {
    let mut insertions = 0u32;
    let mut deletions = 0u32;
    for line in numstat.lines() {
        let mut fields = line.splitn(3, '\t');
        let ins = fields.next().unwrap_or("0");
        let del = fields.next().unwrap_or("0");
        insertions += ins.parse::<u32>().unwrap_or(0);
        deletions += del.parse::<u32>().unwrap_or(0);
    }
    DiffStats {
        files_changed,
        insertions,
        deletions,
    }
}

/// Inspect a `git diff --name-status -M` stream for renames that cross a
/// tracked path boundary (old path inside scope, new path outside, or vice
/// versa). Such a rename means the tracked paths no longer name the same
/// logical unit they did at `from_commit` — drift, even though the scoped
/// diff itself was non-empty.
fn renames_crossing_scope(name_status: &str, tracked_paths: &[String]) -> Vec<(String, String)> {
    if tracked_paths.is_empty() {
        return Vec::new();
    }
    let in_scope = |path: &str| tracked_paths.iter().any(|p| path == p || path.starts_with(&format!("{p}/")));
    name_status
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let status = fields.next()?;
            if !status.starts_with('R') {
                return None;
            }
            let from = fields.next()?;
            let to = fields.next()?;
            if in_scope(from) != in_scope(to) {
                Some((from.to_string(), to.to_string()))
            } else {
                None
            }
        })
        .collect()
}

/// Remove a partially built session directory and detach the worktree.
/// Used on every error path after worktree creation.
fn cleanup_failed(runner: &dyn ProcessRunner, repo_dir: &Path, worktree_dir: &Path, session_dir: &Path) {
    let _ = vcs::worktree_remove(runner, repo_dir, worktree_dir);
    let _ = std::fs::remove_dir_all(session_dir);
}

#[allow(clippy::too_many_arguments)]
pub fn build_session(
    store: &WatchStore,
    runner: &dyn ProcessRunner,
    cache_root: &Path,
    repo_id: i64,
    full_name: &str,
    url: &str,
    from_commit: &str,
    to_commit: &str,
    target_kind: &str,
    tracked_paths: &[String],
    token_budget: usize,
    max_files_per_chunk: usize,
    now_iso8601: &str,
) -> Result<SessionRow> {
    if let Some(existing) = store.find_session_for_change(repo_id, from_commit, to_commit, target_kind)? {
        return Ok(existing);
    }

    let safe_repo = safe_repo_name(full_name);
    let date = &now_iso8601[..10.min(now_iso8601.len())];
    let session_dir = cachedir::get_reviews_session_path(
        cache_root,
        &safe_repo,
        date,
        target_kind,
        &short7(from_commit),
        &short7(to_commit),
    );

    let owner_name: Vec<&str> = full_name.splitn(2, '/').collect();
    let repo_dir = cachedir::get_repo_cache_path(
        cache_root,
        owner_name.first().copied().unwrap_or(full_name),
        owner_name.get(1).copied().unwrap_or(""),
    );

    vcs::fetch_and_reset(runner, &repo_dir, to_commit).map_err(|e| ScoutError::VcsFailed {
        repo: full_name.to_string(),
        reason: e.to_string(),
    })?;

    std::fs::create_dir_all(&session_dir).map_err(|e| ScoutError::Io {
        path: session_dir.clone(),
        source: e,
    })?;

    let worktree_dir = session_dir.join("repo");
    let worktree_out = vcs::worktree_add(runner, &repo_dir, &worktree_dir, to_commit).map_err(|e| ScoutError::VcsFailed {
        repo: full_name.to_string(),
        reason: e.to_string(),
    })?;
    if !worktree_out.success() {
        let _ = std::fs::remove_dir_all(&session_dir);
        return Err(ScoutError::VcsFailed {
            repo: full_name.to_string(),
            reason: worktree_out.stderr_str(),
        });
    }

    let scoped_pathspecs: Vec<String> = tracked_paths
        .iter()
        .cloned()
        .chain(EXCLUSION_GLOBS.iter().map(|s| s.to_string()))
        .collect();

    let scoped_diff = match vcs::diff(runner, &repo_dir, from_commit, to_commit, &scoped_pathspecs) {
        Ok(out) => out.stdout_str(),
        Err(e) => {
            cleanup_failed(runner, &repo_dir, &worktree_dir, &session_dir);
            return Err(ScoutError::VcsFailed {
                repo: full_name.to_string(),
                reason: e.to_string(),
            });
        }
    };

    let exclusion_only: Vec<String> = EXCLUSION_GLOBS.iter().map(|s| s.to_string()).collect();
    let unscoped_diff = match vcs::diff(runner, &repo_dir, from_commit, to_commit, &exclusion_only) {
        Ok(out) => out.stdout_str(),
        Err(e) => {
            cleanup_failed(runner, &repo_dir, &worktree_dir, &session_dir);
            return Err(ScoutError::VcsFailed {
                repo: full_name.to_string(),
                reason: e.to_string(),
            });
        }
    };

    // Scoped-drift rule: adopt the unscoped diff when the scoped one is empty.
    let adopted_unscoped = scoped_diff.trim().is_empty() && !unscoped_diff.trim().is_empty();
    let (final_diff, mut drift, mut crossing_renames) = if adopted_unscoped {
        (unscoped_diff, true, Vec::new())
    } else {
        (scoped_diff, false, Vec::new())
    };

    if final_diff.trim().is_empty() {
        cleanup_failed(runner, &repo_dir, &worktree_dir, &session_dir);
        return Err(ScoutError::NoChangesInScope {
            repo: full_name.to_string(),
            from: from_commit.to_string(),
            to: to_commit.to_string(),
        });
    }

    // Otherwise: the scoped diff was non-empty, but the rename-status stream
    // may still show tracked paths crossing scope (the drift detector proper).
    let name_status_out = vcs::name_status(runner, &repo_dir, from_commit, to_commit, &[])
        .map(|o| o.stdout_str())
        .unwrap_or_default();
    if !drift {
        crossing_renames = renames_crossing_scope(&name_status_out, tracked_paths);
        if !crossing_renames.is_empty() {
            drift = true;
        }
    }
    let numstat_pathspecs = if adopted_unscoped { &exclusion_only } else { &scoped_pathspecs };
    let numstat_out = vcs::numstat(runner, &repo_dir, from_commit, to_commit, numstat_pathspecs)
        .map(|o| o.stdout_str())
        .unwrap_or_default();
    let files_changed = numstat_out.lines().filter(|l| !l.trim().is_empty()).count() as u32;
    let diff_stats = diff_stats_from_numstat(&numstat_out, files_changed);

    let hunks = split_into_file_hunks(&final_diff);
    let chunks = chunk_hunks(&hunks, token_budget, max_files_per_chunk);
    let estimated_tokens = estimate_tokens(&final_diff);

    if chunks.len() <= 1 {
        std::fs::write(session_dir.join("diff.patch"), &final_diff).map_err(|e| ScoutError::Io {
            path: session_dir.join("diff.patch"),
            source: e,
        })?;
    } else {
        let chunks_dir = session_dir.join("chunks");
        std::fs::create_dir_all(&chunks_dir).map_err(|e| ScoutError::Io {
            path: chunks_dir.clone(),
            source: e,
        })?;
        let mut index = String::from("# Chunk index\n\n");
        for (i, chunk) in chunks.iter().enumerate() {
            let name = format!("diff.{:03}.patch", i + 1);
            std::fs::write(chunks_dir.join(&name), chunk).map_err(|e| ScoutError::Io {
                path: chunks_dir.join(&name),
                source: e,
            })?;
            index.push_str(&format!("{}. {} (~{} tokens)\n", i + 1, name, estimate_tokens(chunk)));
        }
        index.push_str(&format!("\ntotal={}\n", chunks.len()));
        std::fs::write(session_dir.join("CHUNK_INDEX.md"), index).map_err(|e| ScoutError::Io {
            path: session_dir.join("CHUNK_INDEX.md"),
            source: e,
        })?;
    }

    let context = ReviewContext {
        repo: full_name.to_string(),
        url: url.to_string(),
        from_commit: from_commit.to_string(),
        to_commit: to_commit.to_string(),
        target_kind: target_kind.to_string(),
        tracked_paths: tracked_paths.to_vec(),
        drift,
        chunk_count: chunks.len().max(1),
        estimated_tokens,
        reviewer_skill: "repo-change-review".to_string(),
        created_at: now_iso8601.to_string(),
    };
    let context_json = serde_json::to_string_pretty(&context).map_err(|e| ScoutError::Store(e.to_string()))?;
    std::fs::write(session_dir.join("review_context.json"), context_json).map_err(|e| ScoutError::Io {
        path: session_dir.join("review_context.json"),
        source: e,
    })?;

    let instructions = format!(
        "# Review instructions\n\n\
         Repo: {full_name}\n\
         Commits: {from7}..{to7}\n\
         Target kind: {target_kind}\n\
         Chunks: {chunk_count}\n\n\
         Read the diff(s) in this directory, write findings to OUTPUT/.\n",
        from7 = short7(from_commit),
        to7 = short7(to_commit),
        chunk_count = chunks.len().max(1),
    );
    std::fs::write(session_dir.join("REVIEW_INSTRUCTIONS.md"), instructions).map_err(|e| ScoutError::Io {
        path: session_dir.join("REVIEW_INSTRUCTIONS.md"),
        source: e,
    })?;

    if drift {
        let drift_md = if crossing_renames.is_empty() {
            format!(
                "# Drift detected\n\nThe diff scoped to tracked paths ({paths}) was empty over {from7}..{to7}, \
                 so the full unscoped diff was adopted instead.\n",
                paths = tracked_paths.join(", "),
                from7 = short7(from_commit),
                to7 = short7(to_commit),
            )
        } else {
            let mut body = format!(
                "# Drift detected\n\nRenames crossing tracked paths ({paths}) were observed over {from7}..{to7}:\n\n",
                paths = tracked_paths.join(", "),
                from7 = short7(from_commit),
                to7 = short7(to_commit),
            );
            for (from, to) in &crossing_renames {
                body.push_str(&format!("- {from} -> {to}\n"));
            }
            body
        };
        std::fs::write(session_dir.join("DRIFT.md"), drift_md).map_err(|e| ScoutError::Io {
            path: session_dir.join("DRIFT.md"),
            source: e,
        })?;
    }

    std::fs::create_dir_all(session_dir.join("OUTPUT")).map_err(|e| ScoutError::Io {
        path: session_dir.join("OUTPUT"),
        source: e,
    })?;

    let change = store.append_change(
        repo_id,
        from_commit,
        to_commit,
        target_kind,
        Some(&diff_stats),
        drift,
        now_iso8601,
    )?;
    store.append_session_pending(change.id, &session_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn chunking_respects_token_budget() {
        let hunks = vec!["diff --git a b\n".to_string().repeat(1), "x".repeat(40), "y".repeat(40)];
        let chunks = chunk_hunks(&hunks, 5, 10);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn oversize_single_file_becomes_its_own_chunk() {
        let hunks = vec!["z".repeat(1000)];
        let chunks = chunk_hunks(&hunks, 5, 10);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn hunk_split_preserves_file_count() {
        let diff = "diff --git a/x b/x\n+1\ndiff --git a/y b/y\n+2\n";
        let hunks = split_into_file_hunks(diff);
        assert_eq!(hunks.len(), 2);
    }

    #[test]
    fn rename_crossing_scope_is_detected() {
        let name_status = "R100\tsrc/cli/main.rs\tsrc/legacy/main.rs\n";
        let crossing = renames_crossing_scope(name_status, &["src/cli".to_string()]);
        assert_eq!(crossing, vec![("src/cli/main.rs".to_string(), "src/legacy/main.rs".to_string())]);
    }

    #[test]
    fn rename_within_scope_is_not_drift() {
        let name_status = "R100\tsrc/cli/old.rs\tsrc/cli/new.rs\n";
        let crossing = renames_crossing_scope(name_status, &["src/cli".to_string()]);
        assert!(crossing.is_empty());
    }

    #[test]
    fn no_tracked_paths_means_no_scope_to_cross() {
        let name_status = "R100\ta.rs\tb.rs\n";
        assert!(renames_crossing_scope(name_status, &[]).is_empty());
    }

    #[test]
    fn numstat_sums_insertions_and_deletions() {
        let numstat = "3\t1\tsrc/a.rs\n0\t5\tsrc/b.rs\n";
        let stats = diff_stats_from_numstat(numstat, 2);
        assert_eq!(stats.files_changed, 2);
        assert_eq!(stats.insertions, 3);
        assert_eq!(stats.deletions, 6);
    }

    #[test]
    fn numstat_treats_binary_markers_as_zero() {
        let numstat = "-\t-\tassets/logo.png\n";
        let stats = diff_stats_from_numstat(numstat, 1);
        assert_eq!(stats.insertions, 0);
        assert_eq!(stats.deletions, 0);
    }
}

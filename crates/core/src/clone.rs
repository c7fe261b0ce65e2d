//! Clone Engine: shallow-fetch the top-K candidates into the
//! content-addressed cache using hardened subprocess invocation.

use crate::cachedir;
use crate::model::{Candidate, CloneEntry};
use crate::vcs::{self, ProcessRunner};
use std::path::Path;

/// Split "owner/name" into its two path segments. Candidates are keyed by
/// this identifier throughout the pipeline.
fn split_id(id: &str) -> Option<(&str, &str)> {
    id.split_once('/')
}

/// Fetch the top-`budget` candidates by `tier1_score` into
/// `<cache_root>/repos/<owner>/<name>`. Per-repo failures are logged and
/// excluded from the returned manifest; the batch never aborts.
pub fn clone_top_k(
    candidates: &[Candidate],
    budget: u32,
    cache_root: &Path,
    runner: &dyn ProcessRunner,
) -> Vec<CloneEntry> {
    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        b.tier1_score
            .partial_cmp(&a.tier1_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut entries = Vec::new();
    for candidate in ranked.into_iter().take(budget as usize) {
        match clone_one(candidate, cache_root, runner) {
            Ok(entry) => entries.push(entry),
            Err(reason) => {
                tracing::warn!(repo = %candidate.id, reason = %reason, "clone failed, excluding from manifest");
            }
        }
    }
    entries
}

fn clone_one(candidate: &Candidate, cache_root: &Path, runner: &dyn ProcessRunner) -> Result<CloneEntry, String> {
    let (owner, name) = split_id(&candidate.id).ok_or_else(|| format!("malformed id {}", candidate.id))?;
    let dest = cachedir::get_repo_cache_path(cache_root, owner, name);

    let commit = if dest.join(".git").is_dir() {
        // Already a valid working copy: resolve HEAD locally, no network traffic.
        vcs::resolve_commit(runner, &dest).ok_or_else(|| "existing clone has no resolvable HEAD".to_string())?
    } else {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let out = vcs::shallow_clone(runner, &candidate.url, &dest).map_err(|e| e.to_string())?;
        if !out.success() {
            return Err(out.stderr_str());
        }
        vcs::resolve_commit(runner, &dest).ok_or_else(|| "clone produced no resolvable HEAD".to_string())?
    };

    Ok(CloneEntry {
        id: candidate.id.clone(),
        url: candidate.url.clone(),
        local_path: dest,
        commit,
        tier1_score: candidate.tier1_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_id_rejects_malformed() {
        assert_eq!(split_id("owner/name"), Some(("owner", "name")));
        assert_eq!(split_id("no-slash"), None);
    }
}

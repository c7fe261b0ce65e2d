//! Hardened subprocess invocation of the distributed VCS command line.
//!
//! This module owns the non-negotiable security invariant: every `git`
//! invocation neutralizes hook execution. The actual process spawn is
//! behind the [`ProcessRunner`] trait (an external collaborator), so the
//! hardening logic itself, which flags get passed and in what order, can
//! be unit-tested without touching the filesystem or network.

use std::path::Path;

/// The outcome of running an argv to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// External collaborator: runs an argv with an environment and working
/// directory, returning stdout/stderr/exit code. Never interprets the
/// command; the caller decides what "success" means.
pub trait ProcessRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        env: &[(&str, &str)],
    ) -> std::io::Result<ProcessOutput>;

    /// Run with a wall-clock timeout. Implementations that cannot honor
    /// `timeout` should fall back to running it unbounded; the only
    /// consumer that depends on this (Review Launcher) treats a missing
    /// timeout capability as a bug, not a silent success.
    fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        env: &[(&str, &str)],
        timeout: std::time::Duration,
    ) -> std::io::Result<TimedOutcome>;
}

#[derive(Debug, Clone)]
pub enum TimedOutcome {
    Completed(ProcessOutput),
    TimedOut,
}

/// Flags that disable hook execution and interactive prompts for every
/// `git` subcommand scout invokes. This is a non-negotiable security
/// invariant: downloaded repositories must never be able to run
/// code via hooks during clone, fetch, diff, or worktree operations.
fn hardened_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("GIT_TERMINAL_PROMPT", "0"),
        ("GIT_ASKPASS", "true"),
        ("GIT_CONFIG_NOSYSTEM", "1"),
    ]
}

const HOOK_NEUTRALIZE: &[&str] = &["-c", "core.hooksPath=/dev/null"];

fn git_argv<'a>(subcommand_args: &[&'a str]) -> Vec<&'a str> {
    let mut argv: Vec<&str> = Vec::with_capacity(HOOK_NEUTRALIZE.len() + subcommand_args.len());
    argv.extend_from_slice(HOOK_NEUTRALIZE);
    argv.extend_from_slice(subcommand_args);
    argv
}

/// Shallow clone `url` into `dest` at depth 1, hooks neutralized.
pub fn shallow_clone(
    runner: &dyn ProcessRunner,
    url: &str,
    dest: &Path,
) -> std::io::Result<ProcessOutput> {
    let dest_str = dest.to_string_lossy().into_owned();
    let args = git_argv(&["clone", "--depth", "1", "--no-hardlinks", url, &dest_str]);
    runner.run("git", &args, None, &hardened_env())
}

/// Fetch the remote head and hard-reset the working copy to it, hooks
/// neutralized. Used by the Clone Engine when a destination already
/// contains a working copy and by the Session Builder before materializing
/// a detached worktree.
pub fn fetch_and_reset(
    runner: &dyn ProcessRunner,
    repo_dir: &Path,
    remote_ref: &str,
) -> std::io::Result<ProcessOutput> {
    let fetch_args = git_argv(&["fetch", "--depth", "1", "origin", remote_ref]);
    let out = runner.run("git", &fetch_args, Some(repo_dir), &hardened_env())?;
    if !out.success() {
        return Ok(out);
    }
    let reset_args = git_argv(&["reset", "--hard", "FETCH_HEAD"]);
    runner.run("git", &reset_args, Some(repo_dir), &hardened_env())
}

/// Resolve the current commit id of a local working copy. Absent on
/// failure, never an error.
pub fn resolve_commit(runner: &dyn ProcessRunner, repo_dir: &Path) -> Option<String> {
    let args = git_argv(&["rev-parse", "HEAD"]);
    let out = runner.run("git", &args, Some(repo_dir), &hardened_env()).ok()?;
    if !out.success() {
        return None;
    }
    let s = out.stdout_str().trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Resolve the remote's default-branch head commit without mutating the
/// local working copy, using `git ls-remote`.
pub fn resolve_remote_head(
    runner: &dyn ProcessRunner,
    url: &str,
    branch: Option<&str>,
) -> std::io::Result<Option<String>> {
    let branch_ref = branch.unwrap_or("HEAD");
    let args = git_argv(&["ls-remote", url, branch_ref]);
    let out = runner.run("git", &args, None, &hardened_env())?;
    if !out.success() {
        return Ok(None);
    }
    let first_line = out.stdout_str().lines().next().map(|l| l.to_string());
    Ok(first_line.and_then(|l| l.split_whitespace().next().map(|s| s.to_string())))
}

/// Create a detached worktree at `commit` under `worktree_dir`.
pub fn worktree_add(
    runner: &dyn ProcessRunner,
    repo_dir: &Path,
    worktree_dir: &Path,
    commit: &str,
) -> std::io::Result<ProcessOutput> {
    let dir_str = worktree_dir.to_string_lossy().into_owned();
    let args = git_argv(&["worktree", "add", "--detach", &dir_str, commit]);
    runner.run("git", &args, Some(repo_dir), &hardened_env())
}

/// Remove a worktree, forcing removal of any uncommitted state inside it.
pub fn worktree_remove(
    runner: &dyn ProcessRunner,
    repo_dir: &Path,
    worktree_dir: &Path,
) -> std::io::Result<ProcessOutput> {
    let dir_str = worktree_dir.to_string_lossy().into_owned();
    let args = git_argv(&["worktree", "remove", "--force", &dir_str]);
    runner.run("git", &args, Some(repo_dir), &hardened_env())
}

/// Diff between two commits with rename/copy detection, optionally scoped
/// to a pathspec.
pub fn diff(
    runner: &dyn ProcessRunner,
    repo_dir: &Path,
    from: &str,
    to: &str,
    pathspecs: &[String],
) -> std::io::Result<ProcessOutput> {
    let mut args = git_argv(&["diff", "--no-color", "-M", "-C", from, to]);
    if !pathspecs.is_empty() {
        args.push("--");
        for p in pathspecs {
            args.push(p.as_str());
        }
    }
    runner.run("git", &args, Some(repo_dir), &hardened_env())
}

/// Rename-status stream (`git diff --name-status -M`) between two commits,
/// used by the drift detector to tell moves/renames apart from pure
/// add/delete pairs.
pub fn name_status(
    runner: &dyn ProcessRunner,
    repo_dir: &Path,
    from: &str,
    to: &str,
    pathspecs: &[String],
) -> std::io::Result<ProcessOutput> {
    let mut args = git_argv(&["diff", "--name-status", "-M", from, to]);
    if !pathspecs.is_empty() {
        args.push("--");
        for p in pathspecs {
            args.push(p.as_str());
        }
    }
    runner.run("git", &args, Some(repo_dir), &hardened_env())
}

/// Per-file insertion/deletion counts (`git diff --numstat -M`) between two
/// commits, used to populate `DiffStats.insertions`/`deletions`. Binary
/// files report `-` for both counts and are treated as zero.
pub fn numstat(
    runner: &dyn ProcessRunner,
    repo_dir: &Path,
    from: &str,
    to: &str,
    pathspecs: &[String],
) -> std::io::Result<ProcessOutput> {
    let mut args = git_argv(&["diff", "--numstat", "-M", from, to]);
    if !pathspecs.is_empty() {
        args.push("--");
        for p in pathspecs {
            args.push(p.as_str());
        }
    }
    runner.run("git", &args, Some(repo_dir), &hardened_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_neutralize_prefixes_every_subcommand() {
        let argv = git_argv(&["clone", "--depth", "1", "x", "y"]);
        assert_eq!(&argv[..2], &["-c", "core.hooksPath=/dev/null"]);
    }

    #[test]
    fn hardened_env_disables_prompts() {
        let env = hardened_env();
        assert!(env.contains(&("GIT_TERMINAL_PROMPT", "0")));
    }
}

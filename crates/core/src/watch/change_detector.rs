//! Change Detector: the one-shot watch driver. For each
//! enabled tracked entry, resolve the remote head, compare it against the
//! latest snapshot, and — if different — hand off to the Session Builder
//! and optionally the Review Launcher, all within the Watch Lock.
//!
//! A failure for one tracked entry (remote resolve, worktree creation,
//! session write) never aborts the batch; it is surfaced only in that
//! entry's [`TrackedOutcome`].

use crate::config::Config;
use crate::error::Result;
use crate::vcs::{self, ProcessRunner};
use crate::watch::lock::WatchLock;
use crate::watch::review;
use crate::watch::session;
use crate::watch::store::WatchStore;
use std::path::Path;
use std::time::Duration;

/// What happened to a single tracked entry during one `run_once` pass.
#[derive(Debug, Clone)]
pub enum TrackedOutcome {
    /// No prior snapshot existed; one was inserted without issuing a
    /// Change or Session.
    Seeded { head: String },
    /// Remote head matched the latest snapshot; nothing to do.
    NoOp { head: String },
    /// A new head was observed and a session was built for it.
    ChangeDetected {
        from: String,
        to: String,
        session_dir: std::path::PathBuf,
        drift: bool,
        review: Option<review::LaunchOutcome>,
    },
    /// This entry failed; the batch continued regardless.
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct TrackedResult {
    pub repo_full_name: String,
    pub target_kind: String,
    pub outcome: TrackedOutcome,
}

#[allow(clippy::too_many_arguments)]
fn process_one(
    store: &WatchStore,
    runner: &dyn ProcessRunner,
    cache_root: &Path,
    repo: &crate::watch::store::RepoRow,
    tracked: &crate::watch::store::TrackedRow,
    since_last: bool,
    auto_review: bool,
    config: &Config,
    reviewer_program: &str,
    reviewer_args: &[&str],
    now_iso8601: &str,
) -> TrackedOutcome {
    let latest = match store.latest_snapshot(repo.id) {
        Ok(s) => s,
        Err(e) => return TrackedOutcome::Failed { reason: e.to_string() },
    };

    let resolve_head = || -> std::result::Result<Option<String>, String> {
        vcs::resolve_remote_head(runner, &repo.url, repo.default_branch.as_deref()).map_err(|e| e.to_string())
    };

    match latest {
        None if !since_last => {
            let head = match resolve_head() {
                Ok(Some(h)) => h,
                Ok(None) => return TrackedOutcome::Failed { reason: "could not resolve remote head".into() },
                Err(reason) => return TrackedOutcome::Failed { reason },
            };
            if let Err(e) = store.append_snapshot(repo.id, &head, now_iso8601) {
                return TrackedOutcome::Failed { reason: e.to_string() };
            }
            TrackedOutcome::Seeded { head }
        }
        maybe_latest => {
            let new_head = match resolve_head() {
                Ok(Some(h)) => h,
                Ok(None) => return TrackedOutcome::Failed { reason: "could not resolve remote head".into() },
                Err(reason) => return TrackedOutcome::Failed { reason },
            };

            let from_commit = match maybe_latest {
                Some(ref s) => s.head_commit.clone(),
                None => {
                    // since_last was set but no snapshot exists yet: treat
                    // this pass as a seed too, there is nothing to diff
                    // against.
                    if let Err(e) = store.append_snapshot(repo.id, &new_head, now_iso8601) {
                        return TrackedOutcome::Failed { reason: e.to_string() };
                    }
                    return TrackedOutcome::Seeded { head: new_head };
                }
            };

            if from_commit == new_head {
                return TrackedOutcome::NoOp { head: new_head };
            }

            let built = session::build_session(
                store,
                runner,
                cache_root,
                repo.id,
                &repo.full_name,
                &repo.url,
                &from_commit,
                &new_head,
                &tracked.target_kind,
                &tracked.paths,
                config.chunk_token_budget,
                config.chunk_max_files,
                now_iso8601,
            );

            let session_row = match built {
                Ok(row) => row,
                Err(e) => return TrackedOutcome::Failed { reason: e.to_string() },
            };

            if let Err(e) = store.append_snapshot(repo.id, &new_head, now_iso8601) {
                return TrackedOutcome::Failed { reason: e.to_string() };
            }

            let drift = session_row.session_dir.join("DRIFT.md").exists();

            let review_outcome = if auto_review {
                match review::launch_review(
                    store,
                    runner,
                    &session_row,
                    reviewer_program,
                    reviewer_args,
                    Duration::from_secs(config.review_timeout_secs),
                    now_iso8601,
                ) {
                    Ok(outcome) => Some(outcome),
                    Err(e) => Some(review::LaunchOutcome {
                        success: false,
                        exit_code: None,
                        error: Some(e.to_string()),
                    }),
                }
            } else {
                None
            };

            TrackedOutcome::ChangeDetected {
                from: from_commit,
                to: new_head,
                session_dir: session_row.session_dir,
                drift,
                review: review_outcome,
            }
        }
    }
}

/// Run one watch pass over every enabled tracked entry, under the Watch
/// Lock for the whole batch.
#[allow(clippy::too_many_arguments)]
pub fn run_once(
    store: &WatchStore,
    lock: &WatchLock,
    runner: &dyn ProcessRunner,
    cache_root: &Path,
    config: &Config,
    since_last: bool,
    auto_review: bool,
    reviewer_program: &str,
    reviewer_args: &[&str],
    now_iso8601: &str,
) -> Result<Vec<TrackedResult>> {
    lock.with_lock(|| {
        let joined = store.all_enabled_tracked_with_repo()?;
        let results = joined
            .into_iter()
            .map(|(repo, tracked)| {
                let outcome = process_one(
                    store,
                    runner,
                    cache_root,
                    &repo,
                    &tracked,
                    since_last,
                    auto_review,
                    config,
                    reviewer_program,
                    reviewer_args,
                    now_iso8601,
                );
                TrackedResult {
                    repo_full_name: repo.full_name.clone(),
                    target_kind: tracked.target_kind.clone(),
                    outcome,
                }
            })
            .collect();
        Ok(results)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::{ProcessOutput, TimedOutcome};

    struct FakeRunner {
        head: String,
    }

    impl ProcessRunner for FakeRunner {
        fn run(
            &self,
            _program: &str,
            args: &[&str],
            _cwd: Option<&Path>,
            _env: &[(&str, &str)],
        ) -> std::io::Result<ProcessOutput> {
            if args.contains(&"ls-remote") {
                return Ok(ProcessOutput {
                    status: 0,
                    stdout: format!("{}\tHEAD\n", self.head).into_bytes(),
                    stderr: vec![],
                });
            }
            Ok(ProcessOutput { status: 1, stdout: vec![], stderr: b"unsupported in fake runner".to_vec() })
        }

        fn run_with_timeout(
            &self,
            _program: &str,
            _args: &[&str],
            _cwd: Option<&Path>,
            _env: &[(&str, &str)],
            _timeout: Duration,
        ) -> std::io::Result<TimedOutcome> {
            unimplemented!()
        }
    }

    fn store_and_cache() -> (WatchStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = WatchStore::open(dir.path().join("scout.db"));
        (store, dir)
    }

    #[test]
    fn seeding_inserts_snapshot_without_change_or_session() {
        let (store, _dir) = store_and_cache();
        let cache_dir = tempfile::tempdir().unwrap();
        let repo = store.upsert_repo("owner/repo", "https://example.com/owner/repo", None, None, "t0").unwrap();
        store.upsert_tracked(repo.id, "cli", &["src/cli".into()], true, 6).unwrap();

        let runner = FakeRunner { head: "new".into() };
        let lock = WatchLock::new(cache_dir.path(), Duration::from_secs(30), 5);
        let config = Config::default();

        let results = run_once(&store, &lock, &runner, cache_dir.path(), &config, false, false, "true", &[], "2026-01-01T00:00:00Z").unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].outcome, TrackedOutcome::Seeded { .. }));
        let latest = store.latest_snapshot(repo.id).unwrap().unwrap();
        assert_eq!(latest.head_commit, "new");
    }

    #[test]
    fn unchanged_head_is_a_noop() {
        let (store, _dir) = store_and_cache();
        let cache_dir = tempfile::tempdir().unwrap();
        let repo = store.upsert_repo("owner/repo", "https://example.com/owner/repo", None, None, "t0").unwrap();
        store.upsert_tracked(repo.id, "cli", &[], true, 6).unwrap();
        store.append_snapshot(repo.id, "same", "t0").unwrap();

        let runner = FakeRunner { head: "same".into() };
        let lock = WatchLock::new(cache_dir.path(), Duration::from_secs(30), 5);
        let config = Config::default();

        let results = run_once(&store, &lock, &runner, cache_dir.path(), &config, false, false, "true", &[], "t1").unwrap();
        assert!(matches!(results[0].outcome, TrackedOutcome::NoOp { .. }));
    }
}

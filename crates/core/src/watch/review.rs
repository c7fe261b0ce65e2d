//! Review Launcher: validate a session directory, invoke the
//! external reviewer subprocess with a timeout, and transition the
//! session's store row. Never mutates session files itself.

use crate::error::{Result, ScoutError};
use crate::vcs::{ProcessRunner, TimedOutcome};
use crate::watch::store::{SessionRow, SessionStatus, WatchStore};
use std::path::Path;
use std::time::Duration;

const EXIT_TIMEOUT: i32 = 124;

/// Files/directories every session must contain before a reviewer can run.
fn validate_session_dir(session_dir: &Path) -> std::result::Result<(), String> {
    for required in ["REVIEW_INSTRUCTIONS.md", "review_context.json", "repo", "OUTPUT"] {
        if !session_dir.join(required).exists() {
            return Err(format!("missing {required}"));
        }
    }
    let has_single = session_dir.join("diff.patch").exists();
    let has_chunks = session_dir.join("chunks").is_dir();
    if !has_single && !has_chunks {
        return Err("missing diff.patch or chunks/".to_string());
    }
    Ok(())
}

pub struct LaunchOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

/// Launch the reviewer subprocess for `session` (already a Pending row).
/// `reviewer_program`/`reviewer_args` name the external reviewer tool;
/// `interactive` controls whether it may prompt (always false for the
/// Change Detector's auto-review path).
pub fn launch_review(
    store: &WatchStore,
    runner: &dyn ProcessRunner,
    session: &SessionRow,
    reviewer_program: &str,
    reviewer_args: &[&str],
    timeout: Duration,
    now_iso8601: &str,
) -> Result<LaunchOutcome> {
    if let Err(reason) = validate_session_dir(&session.session_dir) {
        return Ok(LaunchOutcome {
            success: false,
            exit_code: None,
            error: Some(reason),
        });
    }

    if which_program(reviewer_program).is_none() {
        return Err(ScoutError::ReviewerUnavailable(reviewer_program.to_string()));
    }

    store.transition_session(session.id, SessionStatus::Running, None, now_iso8601)?;

    let outcome = runner
        .run_with_timeout(reviewer_program, reviewer_args, Some(&session.session_dir), &[], timeout)
        .map_err(|e| ScoutError::ReviewerFailed(-1).tap_log(&e));

    match outcome {
        Ok(TimedOutcome::Completed(out)) if out.success() => {
            store.transition_session(session.id, SessionStatus::Success, Some(0), now_iso8601)?;
            Ok(LaunchOutcome {
                success: true,
                exit_code: Some(0),
                error: None,
            })
        }
        Ok(TimedOutcome::Completed(out)) => {
            // `128 + signal` (see scout-collab::process::exit_status_code) is
            // the shell convention for a signal-terminated child; spec.md's
            // exit-137 example is SIGKILL (128 + 9) under that same mapping.
            let label = if out.status >= 128 { "signal" } else { "non-zero exit" };
            store.transition_session(session.id, SessionStatus::Failure, Some(out.status), now_iso8601)?;
            Ok(LaunchOutcome {
                success: false,
                exit_code: Some(out.status),
                error: Some(format!("reviewer exited with {label} ({}): {}", out.status, out.stderr_str())),
            })
        }
        Ok(TimedOutcome::TimedOut) => {
            store.transition_session(session.id, SessionStatus::Failure, Some(EXIT_TIMEOUT), now_iso8601)?;
            Err(ScoutError::ReviewerTimedOut(timeout))
        }
        Err(_) => {
            store.transition_session(session.id, SessionStatus::Failure, Some(-1), now_iso8601)?;
            Err(ScoutError::ReviewerFailed(-1))
        }
    }
}

fn which_program(program: &str) -> Option<std::path::PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

trait TapLog<E> {
    fn tap_log(self, err: &E) -> Self;
}

impl TapLog<std::io::Error> for ScoutError {
    fn tap_log(self, err: &std::io::Error) -> Self {
        tracing::warn!(error = %err, "reviewer subprocess spawn failed");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_instructions_file_fails_without_invoking_subprocess() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("repo")).unwrap();
        std::fs::create_dir_all(dir.path().join("OUTPUT")).unwrap();
        std::fs::write(dir.path().join("review_context.json"), "{}").unwrap();
        std::fs::write(dir.path().join("diff.patch"), "").unwrap();

        let result = validate_session_dir(dir.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("REVIEW_INSTRUCTIONS.md"));
    }

    #[test]
    fn complete_session_dir_validates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("repo")).unwrap();
        std::fs::create_dir_all(dir.path().join("OUTPUT")).unwrap();
        std::fs::write(dir.path().join("review_context.json"), "{}").unwrap();
        std::fs::write(dir.path().join("REVIEW_INSTRUCTIONS.md"), "").unwrap();
        std::fs::write(dir.path().join("diff.patch"), "").unwrap();
        assert!(validate_session_dir(dir.path()).is_ok());
    }
}

//! Error taxonomy for the discovery pipeline and watch subsystem.
//!
//! Each stage surfaces only final errors to its caller; transient issues
//! (rate limiting, a single repo failing to clone) are absorbed locally and
//! reported as telemetry, not propagated as `ScoutError`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("artifact invalid at {path}: {reason}")]
    ArtifactInvalid { path: PathBuf, reason: String },

    #[error("remote rate limited after {retries} retries")]
    RemoteRateLimited { retries: u32 },

    #[error("remote error on lane {lane}: {reason}")]
    RemoteError { lane: String, reason: String },

    #[error("vcs operation failed for {repo}: {reason}")]
    VcsFailed { repo: String, reason: String },

    #[error("cache miss for {0}")]
    CacheMiss(String),

    #[error("lock busy: could not acquire watch lock within retry budget")]
    LockBusy,

    #[error("no changes in scope for {repo} ({from}..{to})")]
    NoChangesInScope {
        repo: String,
        from: String,
        to: String,
    },

    #[error("session invalid at {path}: {reason}")]
    SessionInvalid { path: PathBuf, reason: String },

    #[error("reviewer unavailable: {0}")]
    ReviewerUnavailable(String),

    #[error("reviewer failed with exit code {0}")]
    ReviewerFailed(i32),

    #[error("reviewer timed out after {0:?}")]
    ReviewerTimedOut(std::time::Duration),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, ScoutError>;

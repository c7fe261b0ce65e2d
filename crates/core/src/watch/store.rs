//! Watch Store: the durable relational store backing five
//! tables (Repo, Tracked, Snapshot, Change, Session). A lazily opened
//! connection over rusqlite with WAL and foreign-key enforcement, following
//! the same bundled-sqlite-layer shape seen elsewhere in the ecosystem.
//!
//! All helpers return mapped domain structs; no caller ever sees a raw
//! `rusqlite::Row`.

use crate::error::{Result, ScoutError};
use once_cell::sync::OnceCell;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS repo (
    id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    default_branch TEXT,
    license TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tracked (
    id INTEGER PRIMARY KEY,
    repo_id INTEGER NOT NULL REFERENCES repo(id) ON DELETE CASCADE,
    target_kind TEXT NOT NULL,
    paths TEXT NOT NULL,
    enabled INTEGER NOT NULL,
    poll_interval_hours INTEGER NOT NULL,
    UNIQUE (repo_id, target_kind)
);
CREATE TABLE IF NOT EXISTS snapshot (
    id INTEGER PRIMARY KEY,
    repo_id INTEGER NOT NULL REFERENCES repo(id) ON DELETE CASCADE,
    head_commit TEXT NOT NULL,
    observed_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS change (
    id INTEGER PRIMARY KEY,
    repo_id INTEGER NOT NULL REFERENCES repo(id) ON DELETE CASCADE,
    from_commit TEXT NOT NULL,
    to_commit TEXT NOT NULL,
    target_kind TEXT NOT NULL,
    diff_stats TEXT,
    drift INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS session (
    id INTEGER PRIMARY KEY,
    change_id INTEGER NOT NULL REFERENCES change(id) ON DELETE CASCADE,
    session_dir TEXT NOT NULL,
    status TEXT NOT NULL,
    exit_code INTEGER,
    started_at TEXT,
    finished_at TEXT
);
";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRow {
    pub id: i64,
    pub full_name: String,
    pub url: String,
    pub default_branch: Option<String>,
    pub license: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedRow {
    pub id: i64,
    pub repo_id: i64,
    pub target_kind: String,
    pub paths: Vec<String>,
    pub enabled: bool,
    pub poll_interval_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub id: i64,
    pub repo_id: i64,
    pub head_commit: String,
    pub observed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffStats {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRow {
    pub id: i64,
    pub repo_id: i64,
    pub from_commit: String,
    pub to_commit: String,
    pub target_kind: String,
    pub diff_stats: Option<DiffStats>,
    pub drift: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Running,
    Success,
    Failure,
    Skipped,
}

impl SessionStatus {
    fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
            SessionStatus::Success => "success",
            SessionStatus::Failure => "failure",
            SessionStatus::Skipped => "skipped",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SessionStatus::Pending),
            "running" => Some(SessionStatus::Running),
            "success" => Some(SessionStatus::Success),
            "failure" => Some(SessionStatus::Failure),
            "skipped" => Some(SessionStatus::Skipped),
            _ => None,
        }
    }

    /// Legal next states: pending -> running -> {success, failure, skipped}.
    /// Non-monotonic transitions are rejected.
    fn can_transition_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Pending, SessionStatus::Running)
                | (SessionStatus::Running, SessionStatus::Success)
                | (SessionStatus::Running, SessionStatus::Failure)
                | (SessionStatus::Running, SessionStatus::Skipped)
                | (SessionStatus::Pending, SessionStatus::Skipped)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: i64,
    pub change_id: i64,
    pub session_dir: PathBuf,
    pub status: SessionStatus,
    pub exit_code: Option<i32>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

/// Durable store handle. The connection is opened lazily on first use and
/// reused for the lifetime of this handle.
pub struct WatchStore {
    path: PathBuf,
    conn: OnceCell<Mutex<Connection>>,
}

impl WatchStore {
    pub fn open(path: PathBuf) -> Self {
        Self {
            path,
            conn: OnceCell::new(),
        }
    }

    fn connection(&self) -> Result<&Mutex<Connection>> {
        self.conn.get_or_try_init(|| {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ScoutError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            let conn = Connection::open(&self.path).map_err(|e| ScoutError::Store(e.to_string()))?;
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| ScoutError::Store(e.to_string()))?;
            conn.pragma_update(None, "foreign_keys", "ON")
                .map_err(|e| ScoutError::Store(e.to_string()))?;
            conn.execute_batch(SCHEMA).map_err(|e| ScoutError::Store(e.to_string()))?;
            Ok(Mutex::new(conn))
        })
    }

    pub fn upsert_repo(
        &self,
        full_name: &str,
        url: &str,
        default_branch: Option<&str>,
        license: Option<&str>,
        now_iso8601: &str,
    ) -> Result<RepoRow> {
        let conn = self.connection()?.lock().unwrap();
        conn.execute(
            "INSERT INTO repo (full_name, url, default_branch, license, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(full_name) DO UPDATE SET url = excluded.url,
                default_branch = excluded.default_branch, license = excluded.license",
            params![full_name, url, default_branch, license, now_iso8601],
        )
        .map_err(|e| ScoutError::Store(e.to_string()))?;

        conn.query_row(
            "SELECT id, full_name, url, default_branch, license, created_at FROM repo WHERE full_name = ?1",
            params![full_name],
            |row| {
                Ok(RepoRow {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                    url: row.get(2)?,
                    default_branch: row.get(3)?,
                    license: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .map_err(|e| ScoutError::Store(e.to_string()))
    }

    pub fn upsert_tracked(
        &self,
        repo_id: i64,
        target_kind: &str,
        paths: &[String],
        enabled: bool,
        poll_interval_hours: u32,
    ) -> Result<TrackedRow> {
        let conn = self.connection()?.lock().unwrap();
        let paths_json = serde_json::to_string(paths).map_err(|e| ScoutError::Store(e.to_string()))?;
        conn.execute(
            "INSERT INTO tracked (repo_id, target_kind, paths, enabled, poll_interval_hours)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(repo_id, target_kind) DO UPDATE SET paths = excluded.paths,
                enabled = excluded.enabled, poll_interval_hours = excluded.poll_interval_hours",
            params![repo_id, target_kind, paths_json, enabled as i64, poll_interval_hours],
        )
        .map_err(|e| ScoutError::Store(e.to_string()))?;

        conn.query_row(
            "SELECT id, repo_id, target_kind, paths, enabled, poll_interval_hours FROM tracked
             WHERE repo_id = ?1 AND target_kind = ?2",
            params![repo_id, target_kind],
            |row| {
                let paths_json: String = row.get(3)?;
                let enabled_int: i64 = row.get(4)?;
                Ok(TrackedRow {
                    id: row.get(0)?,
                    repo_id: row.get(1)?,
                    target_kind: row.get(2)?,
                    paths: serde_json::from_str(&paths_json).unwrap_or_default(),
                    enabled: enabled_int != 0,
                    poll_interval_hours: row.get(5)?,
                })
            },
        )
        .map_err(|e| ScoutError::Store(e.to_string()))
    }

    pub fn append_snapshot(&self, repo_id: i64, head_commit: &str, observed_at: &str) -> Result<SnapshotRow> {
        let conn = self.connection()?.lock().unwrap();
        conn.execute(
            "INSERT INTO snapshot (repo_id, head_commit, observed_at) VALUES (?1, ?2, ?3)",
            params![repo_id, head_commit, observed_at],
        )
        .map_err(|e| ScoutError::Store(e.to_string()))?;
        let id = conn.last_insert_rowid();
        Ok(SnapshotRow {
            id,
            repo_id,
            head_commit: head_commit.to_string(),
            observed_at: observed_at.to_string(),
        })
    }

    /// Latest snapshot for a repo: the max-id row.
    pub fn latest_snapshot(&self, repo_id: i64) -> Result<Option<SnapshotRow>> {
        let conn = self.connection()?.lock().unwrap();
        conn.query_row(
            "SELECT id, repo_id, head_commit, observed_at FROM snapshot
             WHERE repo_id = ?1 ORDER BY id DESC LIMIT 1",
            params![repo_id],
            |row| {
                Ok(SnapshotRow {
                    id: row.get(0)?,
                    repo_id: row.get(1)?,
                    head_commit: row.get(2)?,
                    observed_at: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| ScoutError::Store(e.to_string()))
    }

    pub fn append_change(
        &self,
        repo_id: i64,
        from_commit: &str,
        to_commit: &str,
        target_kind: &str,
        diff_stats: Option<&DiffStats>,
        drift: bool,
        now_iso8601: &str,
    ) -> Result<ChangeRow> {
        let conn = self.connection()?.lock().unwrap();
        let diff_stats_json = diff_stats.map(|d| serde_json::to_string(d).unwrap_or_default());
        conn.execute(
            "INSERT INTO change (repo_id, from_commit, to_commit, target_kind, diff_stats, drift, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![repo_id, from_commit, to_commit, target_kind, diff_stats_json, drift as i64, now_iso8601],
        )
        .map_err(|e| ScoutError::Store(e.to_string()))?;
        let id = conn.last_insert_rowid();
        Ok(ChangeRow {
            id,
            repo_id,
            from_commit: from_commit.to_string(),
            to_commit: to_commit.to_string(),
            target_kind: target_kind.to_string(),
            diff_stats: diff_stats.cloned(),
            drift,
            created_at: now_iso8601.to_string(),
        })
    }

    pub fn append_session_pending(&self, change_id: i64, session_dir: &Path) -> Result<SessionRow> {
        let conn = self.connection()?.lock().unwrap();
        let dir_str = session_dir.to_string_lossy().into_owned();
        conn.execute(
            "INSERT INTO session (change_id, session_dir, status) VALUES (?1, ?2, ?3)",
            params![change_id, dir_str, SessionStatus::Pending.as_str()],
        )
        .map_err(|e| ScoutError::Store(e.to_string()))?;
        let id = conn.last_insert_rowid();
        Ok(SessionRow {
            id,
            change_id,
            session_dir: session_dir.to_path_buf(),
            status: SessionStatus::Pending,
            exit_code: None,
            started_at: None,
            finished_at: None,
        })
    }

    fn fetch_session(conn: &Connection, id: i64) -> Result<SessionRow> {
        conn.query_row(
            "SELECT id, change_id, session_dir, status, exit_code, started_at, finished_at
             FROM session WHERE id = ?1",
            params![id],
            |row| {
                let dir_str: String = row.get(2)?;
                let status_str: String = row.get(3)?;
                Ok(SessionRow {
                    id: row.get(0)?,
                    change_id: row.get(1)?,
                    session_dir: PathBuf::from(dir_str),
                    status: SessionStatus::from_str(&status_str).unwrap_or(SessionStatus::Pending),
                    exit_code: row.get(4)?,
                    started_at: row.get(5)?,
                    finished_at: row.get(6)?,
                })
            },
        )
        .map_err(|e| ScoutError::Store(e.to_string()))
    }

    /// Transition a session's status. Rejects non-monotonic transitions.
    pub fn transition_session(
        &self,
        session_id: i64,
        next: SessionStatus,
        exit_code: Option<i32>,
        timestamp: &str,
    ) -> Result<SessionRow> {
        let conn = self.connection()?.lock().unwrap();
        let current = Self::fetch_session(&conn, session_id)?;
        if !current.status.can_transition_to(next) {
            return Err(ScoutError::Store(format!(
                "illegal session transition {:?} -> {:?}",
                current.status, next
            )));
        }
        let touches_start = next == SessionStatus::Running;
        let touches_finish = matches!(next, SessionStatus::Success | SessionStatus::Failure | SessionStatus::Skipped);
        conn.execute(
            "UPDATE session SET status = ?1, exit_code = ?2,
                started_at = CASE WHEN ?3 THEN ?5 ELSE started_at END,
                finished_at = CASE WHEN ?4 THEN ?5 ELSE finished_at END
             WHERE id = ?6",
            params![next.as_str(), exit_code, touches_start, touches_finish, timestamp, session_id],
        )
        .map_err(|e| ScoutError::Store(e.to_string()))?;
        Self::fetch_session(&conn, session_id)
    }

    /// Idempotence check: find an existing Session for
    /// (repo, from, to, kind) via its owning Change row.
    pub fn find_session_for_change(
        &self,
        repo_id: i64,
        from_commit: &str,
        to_commit: &str,
        target_kind: &str,
    ) -> Result<Option<SessionRow>> {
        let conn = self.connection()?.lock().unwrap();
        let row: Option<(i64, i64, String, String, Option<i32>, Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT s.id, s.change_id, s.session_dir, s.status, s.exit_code, s.started_at, s.finished_at
                 FROM session s
                 JOIN change c ON c.id = s.change_id
                 WHERE c.repo_id = ?1 AND c.from_commit = ?2 AND c.to_commit = ?3 AND c.target_kind = ?4
                 ORDER BY s.id DESC LIMIT 1",
                params![repo_id, from_commit, to_commit, target_kind],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?)),
            )
            .optional()
            .map_err(|e| ScoutError::Store(e.to_string()))?;

        Ok(row.map(|(id, change_id, dir, status, exit_code, started_at, finished_at)| SessionRow {
            id,
            change_id,
            session_dir: PathBuf::from(dir),
            status: SessionStatus::from_str(&status).unwrap_or(SessionStatus::Pending),
            exit_code,
            started_at,
            finished_at,
        }))
    }

    pub fn pending_sessions(&self) -> Result<Vec<SessionRow>> {
        let conn = self.connection()?.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id FROM session WHERE status = 'pending' ORDER BY id ASC")
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        let ids: Vec<i64> = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| ScoutError::Store(e.to_string()))?
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        drop(stmt);
        ids.into_iter().map(|id| Self::fetch_session(&conn, id)).collect()
    }

    pub fn tracked_for_repo(&self, repo_id: i64) -> Result<Vec<TrackedRow>> {
        let conn = self.connection()?.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, repo_id, target_kind, paths, enabled, poll_interval_hours
                 FROM tracked WHERE repo_id = ?1 AND enabled = 1",
            )
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        let rows = stmt
            .query_map(params![repo_id], |row| {
                let paths_json: String = row.get(3)?;
                let enabled_int: i64 = row.get(4)?;
                Ok(TrackedRow {
                    id: row.get(0)?,
                    repo_id: row.get(1)?,
                    target_kind: row.get(2)?,
                    paths: serde_json::from_str(&paths_json).unwrap_or_default(),
                    enabled: enabled_int != 0,
                    poll_interval_hours: row.get(5)?,
                })
            })
            .map_err(|e| ScoutError::Store(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        Ok(rows)
    }

    fn fetch_repo(conn: &Connection, id: i64) -> Result<RepoRow> {
        conn.query_row(
            "SELECT id, full_name, url, default_branch, license, created_at FROM repo WHERE id = ?1",
            params![id],
            |row| {
                Ok(RepoRow {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                    url: row.get(2)?,
                    default_branch: row.get(3)?,
                    license: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .map_err(|e| ScoutError::Store(e.to_string()))
    }

    pub fn get_repo(&self, repo_id: i64) -> Result<RepoRow> {
        let conn = self.connection()?.lock().unwrap();
        Self::fetch_repo(&conn, repo_id)
    }

    /// Look up a repo by its unique full_name, without inserting one.
    pub fn find_repo_by_full_name(&self, full_name: &str) -> Result<Option<RepoRow>> {
        let conn = self.connection()?.lock().unwrap();
        conn.query_row(
            "SELECT id, full_name, url, default_branch, license, created_at FROM repo WHERE full_name = ?1",
            params![full_name],
            |row| {
                Ok(RepoRow {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                    url: row.get(2)?,
                    default_branch: row.get(3)?,
                    license: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()
        .map_err(|e| ScoutError::Store(e.to_string()))
    }

    /// Every enabled tracked row joined with its owning repo, the input the Change
    /// Detector iterates over.
    pub fn all_enabled_tracked_with_repo(&self) -> Result<Vec<(RepoRow, TrackedRow)>> {
        let conn = self.connection()?.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.repo_id, t.target_kind, t.paths, t.enabled, t.poll_interval_hours
                 FROM tracked t WHERE t.enabled = 1 ORDER BY t.id ASC",
            )
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        let tracked_rows = stmt
            .query_map([], |row| {
                let paths_json: String = row.get(3)?;
                let enabled_int: i64 = row.get(4)?;
                Ok(TrackedRow {
                    id: row.get(0)?,
                    repo_id: row.get(1)?,
                    target_kind: row.get(2)?,
                    paths: serde_json::from_str(&paths_json).unwrap_or_default(),
                    enabled: enabled_int != 0,
                    poll_interval_hours: row.get(5)?,
                })
            })
            .map_err(|e| ScoutError::Store(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        drop(stmt);

        tracked_rows
            .into_iter()
            .map(|tracked| {
                let repo = Self::fetch_repo(&conn, tracked.repo_id)?;
                Ok((repo, tracked))
            })
            .collect()
    }

    /// All sessions for a repo, newest first, joined through Change.
    pub fn sessions_for_repo(&self, repo_id: i64) -> Result<Vec<SessionRow>> {
        let conn = self.connection()?.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT s.id FROM session s JOIN change c ON c.id = s.change_id
                 WHERE c.repo_id = ?1 ORDER BY s.id DESC",
            )
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        let ids: Vec<i64> = stmt
            .query_map(params![repo_id], |row| row.get(0))
            .map_err(|e| ScoutError::Store(e.to_string()))?
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        drop(stmt);
        ids.into_iter().map(|id| Self::fetch_session(&conn, id)).collect()
    }

    /// Disable a tracked entry so future watch passes skip it. Historical
    /// Change/Session rows are left in place.
    pub fn disable_tracked(&self, repo_id: i64, target_kind: &str) -> Result<()> {
        let conn = self.connection()?.lock().unwrap();
        conn.execute(
            "UPDATE tracked SET enabled = 0 WHERE repo_id = ?1 AND target_kind = ?2",
            params![repo_id, target_kind],
        )
        .map_err(|e| ScoutError::Store(e.to_string()))?;
        Ok(())
    }

    /// Look up a session by its directory path.
    pub fn session_by_path(&self, session_dir: &Path) -> Result<Option<SessionRow>> {
        let conn = self.connection()?.lock().unwrap();
        let dir_str = session_dir.to_string_lossy().into_owned();
        let id: Option<i64> = conn
            .query_row("SELECT id FROM session WHERE session_dir = ?1", params![dir_str], |row| row.get(0))
            .optional()
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        id.map(|id| Self::fetch_session(&conn, id)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> WatchStore {
        let dir = tempfile::tempdir().unwrap();
        WatchStore::open(dir.path().join("scout.db"))
    }

    #[test]
    fn repo_full_name_is_unique_on_upsert() {
        let store = store();
        let a = store.upsert_repo("owner/repo", "https://x/owner/repo", None, None, "t0").unwrap();
        let b = store.upsert_repo("owner/repo", "https://x/owner/repo", Some("main"), None, "t1").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.default_branch.as_deref(), Some("main"));
    }

    #[test]
    fn tracked_is_unique_per_repo_and_kind() {
        let store = store();
        let repo = store.upsert_repo("owner/repo", "https://x", None, None, "t0").unwrap();
        let a = store.upsert_tracked(repo.id, "cli", &["src/cli".into()], true, 6).unwrap();
        let b = store.upsert_tracked(repo.id, "cli", &["src/cli".into(), "src/bin".into()], true, 6).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.paths.len(), 2);
    }

    #[test]
    fn latest_snapshot_is_max_id() {
        let store = store();
        let repo = store.upsert_repo("owner/repo", "https://x", None, None, "t0").unwrap();
        store.append_snapshot(repo.id, "aaa", "t0").unwrap();
        store.append_snapshot(repo.id, "bbb", "t1").unwrap();
        let latest = store.latest_snapshot(repo.id).unwrap().unwrap();
        assert_eq!(latest.head_commit, "bbb");
    }

    #[test]
    fn session_transitions_reject_non_monotonic() {
        let store = store();
        let repo = store.upsert_repo("owner/repo", "https://x", None, None, "t0").unwrap();
        let change = store.append_change(repo.id, "a", "b", "cli", None, false, "t0").unwrap();
        let session = store.append_session_pending(change.id, Path::new("/tmp/s")).unwrap();
        assert!(store.transition_session(session.id, SessionStatus::Success, None, "t1").is_err());
        let running = store.transition_session(session.id, SessionStatus::Running, None, "t1").unwrap();
        assert_eq!(running.status, SessionStatus::Running);
        let done = store.transition_session(running.id, SessionStatus::Success, Some(0), "t2").unwrap();
        assert_eq!(done.status, SessionStatus::Success);
    }

    #[test]
    fn cascade_delete_removes_downstream_rows() {
        let store = store();
        let repo = store.upsert_repo("owner/repo", "https://x", None, None, "t0").unwrap();
        store.upsert_tracked(repo.id, "cli", &[], true, 6).unwrap();
        {
            let conn = store.connection().unwrap().lock().unwrap();
            conn.execute("DELETE FROM repo WHERE id = ?1", params![repo.id]).unwrap();
        }
        assert!(store.tracked_for_repo(repo.id).unwrap().is_empty());
    }

    #[test]
    fn all_enabled_tracked_with_repo_skips_disabled() {
        let store = store();
        let repo = store.upsert_repo("owner/repo", "https://x", None, None, "t0").unwrap();
        store.upsert_tracked(repo.id, "cli", &[], true, 6).unwrap();
        store.upsert_tracked(repo.id, "library", &[], false, 6).unwrap();
        let joined = store.all_enabled_tracked_with_repo().unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].0.full_name, "owner/repo");
        assert_eq!(joined[0].1.target_kind, "cli");
    }

    #[test]
    fn disable_tracked_removes_it_from_enabled_set() {
        let store = store();
        let repo = store.upsert_repo("owner/repo", "https://x", None, None, "t0").unwrap();
        store.upsert_tracked(repo.id, "cli", &[], true, 6).unwrap();
        store.disable_tracked(repo.id, "cli").unwrap();
        assert!(store.tracked_for_repo(repo.id).unwrap().is_empty());
    }

    #[test]
    fn session_by_path_finds_inserted_row() {
        let store = store();
        let repo = store.upsert_repo("owner/repo", "https://x", None, None, "t0").unwrap();
        let change = store.append_change(repo.id, "a", "b", "cli", None, false, "t0").unwrap();
        let dir = PathBuf::from("/tmp/session-dir");
        store.append_session_pending(change.id, &dir).unwrap();
        let found = store.session_by_path(&dir).unwrap().unwrap();
        assert_eq!(found.change_id, change.id);
    }
}

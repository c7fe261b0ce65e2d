//! Artifact Schemas: every persisted artifact is validated at
//! write and at read. Ranges on scores, non-negative integers, URL and
//! timestamp formats, and enum tags are enforced here; invalid JSON on read
//! is an [`crate::error::ScoutError::ArtifactInvalid`] for pipeline
//! artifacts (config has its own, more forgiving loader in
//! [`crate::config`]).

use crate::error::{Result, ScoutError};
use crate::model::*;
use crate::timefmt::parse_iso8601;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

fn in_unit_range(x: f64) -> bool {
    (0.0..=1.0).contains(&x)
}

fn is_iso8601(s: &str) -> bool {
    parse_iso8601(s).is_some()
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("git@")
}

/// Implemented by every type that is persisted as a stage artifact.
/// `validate` checks the ranges/formats names; it is called
/// both by the writer (before serialize) and by the reader (after
/// deserialize).
pub trait Validatable {
    fn validate(&self) -> std::result::Result<(), String>;
}

impl Validatable for Fingerprint {
    fn validate(&self) -> std::result::Result<(), String> {
        if !is_iso8601(&self.timestamp) {
            return Err(format!("fingerprint timestamp not ISO-8601: {}", self.timestamp));
        }
        if !self.root.is_absolute() {
            return Err(format!("fingerprint root must be absolute: {}", self.root.display()));
        }
        Ok(())
    }
}

impl Validatable for ComponentTarget {
    fn validate(&self) -> std::result::Result<(), String> {
        if !in_unit_range(self.confidence) {
            return Err(format!("confidence out of [0,1]: {}", self.confidence));
        }
        if round2(self.confidence) != self.confidence {
            return Err(format!("confidence not rounded to 2dp: {}", self.confidence));
        }
        Ok(())
    }
}

impl Validatable for Candidate {
    fn validate(&self) -> std::result::Result<(), String> {
        if !self.id.contains('/') {
            return Err(format!("candidate id must be owner/name: {}", self.id));
        }
        if !looks_like_url(&self.url) {
            return Err(format!("candidate url malformed: {}", self.url));
        }
        if !is_iso8601(&self.pushed_at) {
            return Err(format!("candidate pushed_at not ISO-8601: {}", self.pushed_at));
        }
        if !in_unit_range(self.tier1_score) {
            return Err(format!("tier1_score out of [0,1]: {}", self.tier1_score));
        }
        Ok(())
    }
}

impl Validatable for CloneEntry {
    fn validate(&self) -> std::result::Result<(), String> {
        if !self.id.contains('/') {
            return Err(format!("clone entry id must be owner/name: {}", self.id));
        }
        if self.commit.is_empty() {
            return Err("clone entry commit must not be empty".to_string());
        }
        if !in_unit_range(self.tier1_score) {
            return Err(format!("tier1_score out of [0,1]: {}", self.tier1_score));
        }
        Ok(())
    }
}

impl Validatable for ValidationResult {
    fn validate(&self) -> std::result::Result<(), String> {
        if !in_unit_range(self.modernity_score) {
            return Err(format!("modernity_score out of [0,1]: {}", self.modernity_score));
        }
        if !in_unit_range(self.tier1_score) {
            return Err(format!("tier1_score out of [0,1]: {}", self.tier1_score));
        }
        if !in_unit_range(self.tier2_score) {
            return Err(format!("tier2_score out of [0,1]: {}", self.tier2_score));
        }
        Ok(())
    }
}

impl Validatable for FocusBundle {
    fn validate(&self) -> std::result::Result<(), String> {
        if !self.id.contains('/') {
            return Err(format!("focus bundle id must be owner/name: {}", self.id));
        }
        Ok(())
    }
}

impl Validatable for Provenance {
    fn validate(&self) -> std::result::Result<(), String> {
        if !looks_like_url(&self.url) {
            return Err(format!("provenance url malformed: {}", self.url));
        }
        if !is_iso8601(&self.timestamp) {
            return Err(format!("provenance timestamp not ISO-8601: {}", self.timestamp));
        }
        if !in_unit_range(self.tier1_score) || !in_unit_range(self.tier2_score) {
            return Err("provenance scores out of [0,1]".to_string());
        }
        Ok(())
    }
}

impl Validatable for CompareReport {
    fn validate(&self) -> std::result::Result<(), String> {
        if !is_iso8601(&self.timestamp) {
            return Err(format!("report timestamp not ISO-8601: {}", self.timestamp));
        }
        for candidate in &self.ranked {
            if !in_unit_range(candidate.tier2_score) || !in_unit_range(candidate.modernity_score) {
                return Err(format!("ranked candidate score out of [0,1]: {}", candidate.id));
            }
        }
        Ok(())
    }
}

/// Write `artifact` as pretty JSON to `path`, validating first. Invalid
/// artifacts never touch disk.
pub fn write_artifact<T: Serialize + Validatable>(path: &Path, artifact: &T) -> Result<()> {
    artifact.validate().map_err(|reason| ScoutError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason,
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ScoutError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let body = serde_json::to_vec_pretty(artifact).map_err(|e| ScoutError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, body).map_err(|e| ScoutError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read and validate an artifact from `path`. Malformed JSON or a failed
/// validation both surface as `ArtifactInvalid`; unlike
/// [`crate::config`], pipeline artifacts never silently fall back to a
/// default on read failure.
pub fn read_artifact<T: DeserializeOwned + Validatable>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| ScoutError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let artifact: T = serde_json::from_str(&content).map_err(|e| ScoutError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    artifact.validate().map_err(|reason| ScoutError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn fingerprint_rejects_relative_root() {
        let fp = Fingerprint {
            root: "relative/path".into(),
            commit: None,
            timestamp: "2026-01-01T00:00:00Z".into(),
            languages: BTreeMap::new(),
            markers: vec![],
        };
        assert!(fp.validate().is_err());
    }

    #[test]
    fn candidate_rejects_non_iso_timestamp() {
        let candidate = Candidate {
            id: "owner/name".into(),
            url: "https://example.com/owner/name".into(),
            stars: 1,
            forks: 0,
            pushed_at: "not-a-date".into(),
            license: None,
            description: None,
            topics: vec![],
            lanes: vec![],
            tier1_score: 0.5,
        };
        assert!(candidate.validate().is_err());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidate.json");
        let candidate = Candidate {
            id: "owner/name".into(),
            url: "https://example.com/owner/name".into(),
            stars: 10,
            forks: 1,
            pushed_at: "2026-01-01T00:00:00Z".into(),
            license: Some("MIT".into()),
            description: None,
            topics: vec![],
            lanes: vec!["lane-a".into()],
            tier1_score: 0.42,
        };
        write_artifact(&path, &candidate).unwrap();
        let read_back: Candidate = read_artifact(&path).unwrap();
        assert_eq!(read_back.id, candidate.id);
    }

    #[test]
    fn malformed_json_is_artifact_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let result: Result<Candidate> = read_artifact(&path);
        assert!(matches!(result, Err(ScoutError::ArtifactInvalid { .. })));
    }
}

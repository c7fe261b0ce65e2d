//! Layered configuration merge: defaults < global config file < project
//! config file < environment variables.
//!
//! Each layer is optional; a missing or unparsable file falls back to the
//! previous layer rather than panicking.

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Env var prefix for the fourth (highest-precedence) layer.
pub const ENV_PREFIX: &str = "SCOUT_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryWeights {
    pub w_recency: f64,
    pub w_activity: f64,
    pub w_lanes: f64,
    pub window_days: u32,
    pub activity_divisor: f64,
    pub lane_cap: u32,
}

impl Default for DiscoveryWeights {
    fn default() -> Self {
        Self {
            w_recency: 0.4,
            w_activity: 0.3,
            w_lanes: 0.3,
            window_days: 365,
            activity_divisor: 10.0,
            lane_cap: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier2Weights {
    pub w_structural: f64,
    pub w_modernity: f64,
}

impl Default for Tier2Weights {
    fn default() -> Self {
        Self {
            w_structural: 0.5,
            w_modernity: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tier1_cap: u32,
    pub clone_budget: u32,
    pub cache_ttl_hours: u32,
    pub max_backoff_secs: u32,
    pub license_allow_list: Vec<String>,
    pub exclusion_keywords: Vec<String>,
    pub min_stars: u64,
    pub discovery: DiscoveryWeights,
    pub tier2: Tier2Weights,
    pub focus_max_per_kind: u32,
    pub focus_max_dirs_per_target: u32,
    pub focus_max_files_per_dir: u32,
    pub watch_poll_interval_hours: u32,
    pub lock_stale_threshold_secs: u64,
    pub lock_retry_max_attempts: u32,
    pub review_timeout_secs: u64,
    pub chunk_token_budget: usize,
    pub chunk_max_files: usize,
    pub host_api_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tier1_cap: 50,
            clone_budget: 10,
            cache_ttl_hours: 24,
            max_backoff_secs: 60,
            license_allow_list: vec![
                "MIT".into(),
                "Apache-2.0".into(),
                "BSD-3-Clause".into(),
                "BSD-2-Clause".into(),
                "ISC".into(),
                "MPL-2.0".into(),
            ],
            exclusion_keywords: vec!["template".into(), "boilerplate".into(), "example".into()],
            min_stars: 0,
            discovery: DiscoveryWeights::default(),
            tier2: Tier2Weights::default(),
            focus_max_per_kind: 5,
            focus_max_dirs_per_target: 20,
            focus_max_files_per_dir: 50,
            watch_poll_interval_hours: 6,
            lock_stale_threshold_secs: 30,
            lock_retry_max_attempts: 10,
            review_timeout_secs: 30 * 60,
            chunk_token_budget: 8_000,
            chunk_max_files: 20,
            host_api_token: None,
        }
    }
}

impl Config {
    /// Validate ranges and reject unknown keys were already rejected at
    /// parse time by `#[serde(deny_unknown_fields)]` on the file layers;
    /// this checks numeric/semantic invariants that serde can't express.
    pub fn validate(&self) -> Result<()> {
        let weight_sum = self.discovery.w_recency + self.discovery.w_activity + self.discovery.w_lanes;
        if weight_sum > 1.0 + 1e-9 {
            return Err(ScoutError::ConfigInvalid(format!(
                "discovery weights must sum to <= 1.0, got {weight_sum}"
            )));
        }
        if self.tier1_cap == 0 {
            return Err(ScoutError::ConfigInvalid("tier1_cap must be > 0".into()));
        }
        if self.clone_budget == 0 {
            return Err(ScoutError::ConfigInvalid("clone_budget must be > 0".into()));
        }
        if self.chunk_token_budget == 0 {
            return Err(ScoutError::ConfigInvalid("chunk_token_budget must be > 0".into()));
        }
        Ok(())
    }
}

/// A single layer of file-based config, every field optional: only keys
/// actually present in the TOML override the layer below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigLayer {
    tier1_cap: Option<u32>,
    clone_budget: Option<u32>,
    cache_ttl_hours: Option<u32>,
    max_backoff_secs: Option<u32>,
    license_allow_list: Option<Vec<String>>,
    exclusion_keywords: Option<Vec<String>>,
    min_stars: Option<u64>,
    focus_max_per_kind: Option<u32>,
    focus_max_dirs_per_target: Option<u32>,
    focus_max_files_per_dir: Option<u32>,
    watch_poll_interval_hours: Option<u32>,
    lock_stale_threshold_secs: Option<u64>,
    lock_retry_max_attempts: Option<u32>,
    review_timeout_secs: Option<u64>,
    chunk_token_budget: Option<usize>,
    chunk_max_files: Option<usize>,
    host_api_token: Option<String>,
}

fn merge_layer(cfg: &mut Config, layer: ConfigLayer) {
    macro_rules! set {
        ($field:ident) => {
            if let Some(v) = layer.$field {
                cfg.$field = v;
            }
        };
    }
    set!(tier1_cap);
    set!(clone_budget);
    set!(cache_ttl_hours);
    set!(max_backoff_secs);
    set!(license_allow_list);
    set!(exclusion_keywords);
    set!(min_stars);
    set!(focus_max_per_kind);
    set!(focus_max_dirs_per_target);
    set!(focus_max_files_per_dir);
    set!(watch_poll_interval_hours);
    set!(lock_stale_threshold_secs);
    set!(lock_retry_max_attempts);
    set!(review_timeout_secs);
    set!(chunk_token_budget);
    set!(chunk_max_files);
    if layer.host_api_token.is_some() {
        cfg.host_api_token = layer.host_api_token;
    }
}

fn load_file_layer(path: &Path) -> Option<ConfigLayer> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<ConfigLayer>(&content) {
        Ok(layer) => Some(layer),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config layer");
            None
        }
    }
}

/// Parse a single env var into the field it overrides. Invalid numeric
/// values fall back to the previous layer's value rather than
/// erroring — only the variable name is logged, the unparsed value is not
/// (it may itself be a secret, e.g. `SCOUT_HOST_API_TOKEN`).
fn apply_env_layer(cfg: &mut Config) {
    fn env_u32(cfg_val: &mut u32, key: &str) {
        if let Ok(raw) = std::env::var(key) {
            match raw.parse() {
                Ok(v) => *cfg_val = v,
                Err(_) => tracing::warn!(key, "invalid numeric env override, keeping previous layer"),
            }
        }
    }
    fn env_u64(cfg_val: &mut u64, key: &str) {
        if let Ok(raw) = std::env::var(key) {
            match raw.parse() {
                Ok(v) => *cfg_val = v,
                Err(_) => tracing::warn!(key, "invalid numeric env override, keeping previous layer"),
            }
        }
    }
    fn env_usize(cfg_val: &mut usize, key: &str) {
        if let Ok(raw) = std::env::var(key) {
            match raw.parse() {
                Ok(v) => *cfg_val = v,
                Err(_) => tracing::warn!(key, "invalid numeric env override, keeping previous layer"),
            }
        }
    }

    env_u32(&mut cfg.tier1_cap, "SCOUT_TIER1_CAP");
    env_u32(&mut cfg.clone_budget, "SCOUT_CLONE_BUDGET");
    env_u32(&mut cfg.cache_ttl_hours, "SCOUT_CACHE_TTL_HOURS");
    env_u32(&mut cfg.max_backoff_secs, "SCOUT_MAX_BACKOFF_SECS");
    env_u64(&mut cfg.min_stars, "SCOUT_MIN_STARS");
    env_u32(&mut cfg.watch_poll_interval_hours, "SCOUT_WATCH_POLL_INTERVAL_HOURS");
    env_u64(&mut cfg.review_timeout_secs, "SCOUT_REVIEW_TIMEOUT_SECS");
    env_usize(&mut cfg.chunk_token_budget, "SCOUT_CHUNK_TOKEN_BUDGET");
    env_usize(&mut cfg.chunk_max_files, "SCOUT_CHUNK_MAX_FILES");

    if let Ok(token) = std::env::var("SCOUT_HOST_API_TOKEN") {
        if !token.is_empty() {
            cfg.host_api_token = Some(token);
        }
    }
}

/// A secondary source for the remote-API token: the host CLI tool's own
/// config, consulted only if no environment token is set.
pub trait HostCliTokenSource {
    fn token(&self) -> Option<String>;
}

pub fn load(
    global_path: Option<&Path>,
    project_path: Option<&Path>,
    host_cli_token: Option<&dyn HostCliTokenSource>,
) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(p) = global_path {
        if let Some(layer) = load_file_layer(p) {
            merge_layer(&mut cfg, layer);
        }
    }
    if let Some(p) = project_path {
        let is_json = p.extension().and_then(|e| e.to_str()) == Some("json");
        let layer = if is_json { load_project_json_layer(p) } else { load_file_layer(p) };
        if let Some(layer) = layer {
            merge_layer(&mut cfg, layer);
        }
    }
    apply_env_layer(&mut cfg);

    if cfg.host_api_token.is_none() {
        if let Some(src) = host_cli_token {
            cfg.host_api_token = src.token();
        }
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Default on-disk locations, consulted by the CLI binary.
pub fn default_global_config_path(config_root: &Path) -> PathBuf {
    config_root.join("config.toml")
}

pub fn default_project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".scoutrc.json")
}

/// `.scoutrc.json` is JSON, not TOML; this reuses the same `ConfigLayer`
/// shape, parsed through `serde_json` instead of `toml`.
pub fn load_project_json_layer(path: &Path) -> Option<ConfigLayerJson> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(layer) => Some(layer),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed project config");
            None
        }
    }
}

pub type ConfigLayerJson = ConfigLayer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn oversum_discovery_weights_rejected() {
        let mut cfg = Config::default();
        cfg.discovery.w_recency = 0.9;
        cfg.discovery.w_activity = 0.9;
        cfg.discovery.w_lanes = 0.9;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_toml_layer_is_ignored_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("global.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        let cfg = load(Some(&path), None, None).unwrap();
        assert_eq!(cfg.tier1_cap, Config::default().tier1_cap);
    }

    #[test]
    fn project_layer_overrides_global_layer() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("project.toml");
        std::fs::write(&global, "tier1_cap = 5\n").unwrap();
        std::fs::write(&project, "tier1_cap = 9\n").unwrap();
        let cfg = load(Some(&global), Some(&project), None).unwrap();
        assert_eq!(cfg.tier1_cap, 9);
    }

    #[test]
    fn json_project_layer_is_parsed_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join(".scoutrc.json");
        std::fs::write(&project, r#"{"tier1_cap": 7}"#).unwrap();
        let cfg = load(None, Some(&project), None).unwrap();
        assert_eq!(cfg.tier1_cap, 7);
    }
}

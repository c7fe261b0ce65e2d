//! Cross-platform cache-directory resolution, an external collaborator.
//! `scout-core` depends only on this trait; `scout-collab` resolves the
//! platform-native path.

use std::path::PathBuf;

pub trait CacheDirResolver: Send + Sync {
    /// The platform-native cache root for scout (e.g. `~/.cache/scout` on
    /// Linux, `~/Library/Caches/scout` on macOS).
    fn cache_root(&self) -> PathBuf;

    /// The platform-native config root for scout's global config file.
    fn config_root(&self) -> PathBuf;
}

/// Layout helpers, pure functions over a cache root.
pub fn get_cache_path(root: &std::path::Path, segment: &str) -> PathBuf {
    root.join(segment)
}

pub fn get_api_cache_path(root: &std::path::Path, query_sha256_hex: &str) -> PathBuf {
    get_cache_path(root, "api").join(format!("{query_sha256_hex}.json"))
}

pub fn get_repo_cache_path(root: &std::path::Path, owner: &str, name: &str) -> PathBuf {
    get_cache_path(root, "repos").join(owner).join(name)
}

pub fn get_reviews_session_path(
    root: &std::path::Path,
    safe_repo: &str,
    date: &str,
    kind: &str,
    from7: &str,
    to7: &str,
) -> PathBuf {
    get_cache_path(root, "runs")
        .join("reviews")
        .join(safe_repo)
        .join(date)
        .join(kind)
        .join(format!("{from7}_{to7}"))
}

pub fn get_watch_store_dir(root: &std::path::Path) -> PathBuf {
    get_cache_path(root, "runs").join("watch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn api_cache_path_is_descendant_with_json_suffix() {
        let root = Path::new("/tmp/scout-cache");
        let p = get_api_cache_path(root, "deadbeef");
        assert!(p.starts_with(get_cache_path(root, "api")));
        assert!(p.to_string_lossy().ends_with(".json"));
    }

    #[test]
    fn repo_cache_path_contains_owner_and_name_literally() {
        let root = Path::new("/tmp/scout-cache");
        let p = get_repo_cache_path(root, "owner", "repo");
        assert!(p.starts_with(get_cache_path(root, "repos")));
        let s = p.to_string_lossy().into_owned();
        assert!(s.contains("owner"));
        assert!(s.contains("repo"));
    }
}

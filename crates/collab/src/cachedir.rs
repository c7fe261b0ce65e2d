//! Platform-native cache/config directory resolution via the `dirs` crate.

use scout_core::cachedir::CacheDirResolver;
use std::path::PathBuf;

pub struct PlatformCacheDirs;

impl PlatformCacheDirs {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlatformCacheDirs {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheDirResolver for PlatformCacheDirs {
    fn cache_root(&self) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("scout")
    }

    fn config_root(&self) -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("scout")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_root_ends_with_scout() {
        let resolver = PlatformCacheDirs::new();
        assert!(resolver.cache_root().ends_with("scout"));
        assert!(resolver.config_root().ends_with("scout"));
    }
}

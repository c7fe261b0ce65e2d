//! The remote code-hosting search/metadata API, an external collaborator.
//! `scout-core` only depends on the typed item shape and a narrow trait;
//! `scout-collab` supplies the concrete HTTPS client.

use serde::{Deserialize, Serialize};

/// The typed item shape the wire protocol is reduced to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    /// "owner/name".
    pub id: String,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub pushed_at: String,
    pub license: Option<String>,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub archived: bool,
    pub fork: bool,
}

#[derive(Debug, Clone)]
pub struct SearchPage {
    pub items: Vec<RawItem>,
    pub has_more: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum HostApiError {
    #[error("rate limited")]
    RateLimited,
    #[error("request failed: {0}")]
    Request(String),
}

/// Executes a single search query against the remote API, one page at a
/// time. Implementations are responsible for their own auth/token lookup;
/// the pipeline only calls `search_page`.
pub trait HostApiClient: Send + Sync {
    fn search_page(&self, query: &str, page: u32) -> Result<SearchPage, HostApiError>;
}

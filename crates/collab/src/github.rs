//! `reqwest`-backed [`HostApiClient`] against the GitHub REST
//! `search/repositories` endpoint.

use scout_core::hostapi::{HostApiClient, HostApiError, RawItem, SearchPage};
use serde::Deserialize;

const PER_PAGE: u32 = 100;
const USER_AGENT: &str = concat!("scout/", env!("CARGO_PKG_VERSION"));

pub struct GitHubSearchClient {
    http: reqwest::blocking::Client,
    token: Option<String>,
}

impl GitHubSearchClient {
    pub fn new(token: Option<String>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client construction should not fail from static config");
        Self { http, token }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    items: Vec<GitHubRepo>,
    total_count: u64,
}

#[derive(Deserialize)]
struct GitHubRepo {
    full_name: String,
    html_url: String,
    stargazers_count: u64,
    forks_count: u64,
    pushed_at: String,
    license: Option<GitHubLicense>,
    description: Option<String>,
    topics: Vec<String>,
    archived: bool,
    fork: bool,
}

#[derive(Deserialize)]
struct GitHubLicense {
    spdx_id: Option<String>,
}

impl From<GitHubRepo> for RawItem {
    fn from(repo: GitHubRepo) -> Self {
        RawItem {
            id: repo.full_name,
            url: repo.html_url,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            pushed_at: repo.pushed_at,
            license: repo.license.and_then(|l| l.spdx_id).filter(|s| s != "NOASSERTION"),
            description: repo.description,
            topics: repo.topics,
            archived: repo.archived,
            fork: repo.fork,
        }
    }
}

impl HostApiClient for GitHubSearchClient {
    fn search_page(&self, query: &str, page: u32) -> Result<SearchPage, HostApiError> {
        let mut request = self
            .http
            .get("https://api.github.com/search/repositories")
            .query(&[
                ("q", query.to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ])
            .header("Accept", "application/vnd.github+json");

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| HostApiError::Request(e.to_string()))?;

        if response.status().as_u16() == 403 {
            return Err(HostApiError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(HostApiError::Request(format!("unexpected status {}", response.status())));
        }

        let body: SearchResponse = response.json().map_err(|e| HostApiError::Request(e.to_string()))?;
        let fetched_so_far = (page as u64) * PER_PAGE as u64;
        let has_more = fetched_so_far < body.total_count && !body.items.is_empty();
        Ok(SearchPage {
            items: body.items.into_iter().map(RawItem::from).collect(),
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn license_noassertion_maps_to_none() {
        let repo = GitHubRepo {
            full_name: "owner/name".into(),
            html_url: "https://github.com/owner/name".into(),
            stargazers_count: 1,
            forks_count: 0,
            pushed_at: "2026-01-01T00:00:00Z".into(),
            license: Some(GitHubLicense { spdx_id: Some("NOASSERTION".into()) }),
            description: None,
            topics: vec![],
            archived: false,
            fork: false,
        };
        let item: RawItem = repo.into();
        assert_eq!(item.license, None);
    }
}

//! Discovery Engine: execute lanes against the remote API with
//! caching/backoff, dedupe, filter, Tier-1-score, sort, truncate.

use crate::cachedir;
use crate::config::Config;
use crate::error::{Result, ScoutError};
use crate::hostapi::{HostApiClient, HostApiError, RawItem};
use crate::lanes::Lane;
use crate::model::{round2, clamp01, Candidate};
use crate::timefmt;
use sha2::{Digest as _, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Tier-1 score components. Pure function of its documented
/// inputs — a repeated call with the same arguments yields the same float.
pub fn tier1_score(
    days_since_push: f64,
    stars: u64,
    forks: u64,
    lane_hits: u32,
    weights: &crate::config::DiscoveryWeights,
) -> f64 {
    let recency_norm = clamp01(1.0 - days_since_push / weights.window_days as f64);
    let activity_norm = clamp01(((stars + forks + 1) as f64).log10() / weights.activity_divisor);
    let lane_norm = lane_hits.min(weights.lane_cap) as f64 / weights.lane_cap as f64;
    let score = weights.w_recency * recency_norm + weights.w_activity * activity_norm + weights.w_lanes * lane_norm;
    round2(clamp01(score))
}

/// Each `(lane-query, page)` response is its own cache entry (spec.md §6):
/// folding `page` into the hash keeps page 2 of a lane from colliding with
/// page 1 under the same file.
fn query_cache_key(query: &str, page: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(b"\0page=");
    hasher.update(page.to_le_bytes());
    hex::encode(hasher.finalize())
}

struct CachedPage {
    items: Vec<RawItem>,
    has_more: bool,
}

fn read_cache(cache_root: &Path, key: &str, ttl_hours: u32, now_epoch: i64) -> Option<CachedPage> {
    let path = cachedir::get_api_cache_path(cache_root, key);
    let content = std::fs::read_to_string(&path).ok()?;
    let cached: serde_json::Value = serde_json::from_str(&content).ok()?;
    let fetched_at = cached.get("fetched_at_epoch")?.as_i64()?;
    if now_epoch - fetched_at > ttl_hours as i64 * 3600 {
        return None;
    }
    let items: Vec<RawItem> = serde_json::from_value(cached.get("items")?.clone()).ok()?;
    let has_more = cached.get("has_more")?.as_bool()?;
    Some(CachedPage { items, has_more })
}

fn write_cache(cache_root: &Path, key: &str, items: &[RawItem], has_more: bool, now_epoch: i64) -> std::io::Result<()> {
    let path = cachedir::get_api_cache_path(cache_root, key);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::json!({
        "fetched_at_epoch": now_epoch,
        "items": items,
        "has_more": has_more,
    });
    std::fs::write(path, serde_json::to_vec_pretty(&body)?)
}

fn license_allowed(license: &Option<String>, allow_list: &[String]) -> bool {
    match license {
        None => true,
        Some(spdx) => allow_list.iter().any(|a| a.eq_ignore_ascii_case(spdx)),
    }
}

fn excluded_by_keywords(id: &str, description: &Option<String>, exclusion_keywords: &[String]) -> bool {
    let haystack = format!("{} {}", id, description.clone().unwrap_or_default()).to_ascii_lowercase();
    exclusion_keywords
        .iter()
        .any(|kw| haystack.contains(&kw.to_ascii_lowercase()))
}

struct Merged {
    item: RawItem,
    lanes: Vec<String>,
}

/// Run every lane against `client`, merging, filtering, scoring, and
/// truncating to `config.tier1_cap`. Per-lane remote errors are logged and
/// skipped; they do not abort the run.
pub fn discover(
    lanes: &[Lane],
    client: &dyn HostApiClient,
    cache_root: &Path,
    config: &Config,
    now_epoch: i64,
) -> Result<Vec<Candidate>> {
    let mut merged: HashMap<String, Merged> = HashMap::new();
    let mut consecutive_calls = 0u32;

    for lane in lanes {
        let items = match fetch_lane_with_backoff(client, &lane.query, cache_root, config, now_epoch, &mut consecutive_calls) {
            Ok(items) => items,
            Err(ScoutError::RemoteError { lane: lane_name, reason }) => {
                tracing::warn!(lane = %lane_name, reason = %reason, "lane aborted, continuing run");
                continue;
            }
            Err(e) => return Err(e),
        };

        for item in items {
            merged
                .entry(item.id.clone())
                .and_modify(|m| {
                    if !m.lanes.contains(&lane.name) {
                        m.lanes.push(lane.name.clone());
                    }
                })
                .or_insert_with(|| Merged {
                    item,
                    lanes: vec![lane.name.clone()],
                });
        }
    }

    let mut candidates: Vec<Candidate> = merged
        .into_values()
        .filter(|m| !m.item.archived && !m.item.fork)
        .filter(|m| license_allowed(&m.item.license, &config.license_allow_list))
        .filter(|m| !excluded_by_keywords(&m.item.id, &m.item.description, &config.exclusion_keywords))
        .filter(|m| timefmt::days_since(&m.item.pushed_at, now_epoch) <= config.discovery.window_days as f64)
        .map(|m| {
            let days = timefmt::days_since(&m.item.pushed_at, now_epoch);
            let score = tier1_score(days, m.item.stars, m.item.forks, m.lanes.len() as u32, &config.discovery);
            Candidate {
                id: m.item.id,
                url: m.item.url,
                stars: m.item.stars,
                forks: m.item.forks,
                pushed_at: m.item.pushed_at,
                license: m.item.license,
                description: m.item.description,
                topics: m.item.topics,
                lanes: m.lanes,
                tier1_score: score,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.tier1_score
            .partial_cmp(&a.tier1_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(config.tier1_cap as usize);
    Ok(candidates)
}

const RATE_LIMIT_THRESHOLD: u32 = 5;

/// Page through `query`, one `(query, page)` cache entry per page. A cache
/// hit skips the remote call (and the rate-limit counter) for that page
/// entirely; a miss fetches with backoff and writes the page back.
fn fetch_lane_with_backoff(
    client: &dyn HostApiClient,
    query: &str,
    cache_root: &Path,
    config: &Config,
    now_epoch: i64,
    consecutive_calls: &mut u32,
) -> Result<Vec<RawItem>> {
    let mut items = Vec::new();
    let mut page = 1;
    let mut retries = 0u32;
    let mut backoff = 1u64;

    loop {
        let key = query_cache_key(query, page);
        if let Some(cached) = read_cache(cache_root, &key, config.cache_ttl_hours, now_epoch) {
            items.extend(cached.items);
            if !cached.has_more {
                break;
            }
            page += 1;
            continue;
        }

        *consecutive_calls += 1;
        if *consecutive_calls > RATE_LIMIT_THRESHOLD {
            let sleep_for = Duration::from_secs((*consecutive_calls as u64).min(config.max_backoff_secs as u64));
            std::thread::sleep(sleep_for);
        }

        match client.search_page(query, page) {
            Ok(result) => {
                let _ = write_cache(cache_root, &key, &result.items, result.has_more, now_epoch);
                items.extend(result.items);
                if !result.has_more {
                    break;
                }
                page += 1;
            }
            Err(HostApiError::RateLimited) => {
                if backoff > config.max_backoff_secs as u64 {
                    return Err(ScoutError::RemoteRateLimited { retries });
                }
                std::thread::sleep(Duration::from_secs(backoff));
                backoff *= 2;
                retries += 1;
            }
            Err(HostApiError::Request(reason)) => {
                return Err(ScoutError::RemoteError {
                    lane: query.to_string(),
                    reason,
                });
            }
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryWeights;

    #[test]
    fn tier1_high_signal_exceeds_0_7() {
        let weights = DiscoveryWeights::default();
        let score = tier1_score(0.0, 1000, 100, 3, &weights);
        assert!(score > 0.7, "score was {score}");
    }

    #[test]
    fn tier1_low_signal_below_0_6() {
        let weights = DiscoveryWeights::default();
        let score = tier1_score(60.0, 100, 10, 1, &weights);
        assert!(score < 0.6, "score was {score}");
    }

    #[test]
    fn tier1_is_bounded() {
        let weights = DiscoveryWeights::default();
        for stars in [0, 10, 1_000_000] {
            for days in [0.0, 10.0, 10_000.0] {
                let score = tier1_score(days, stars, stars, 10, &weights);
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }

    #[test]
    fn tier1_deterministic() {
        let weights = DiscoveryWeights::default();
        let a = tier1_score(30.0, 500, 50, 2, &weights);
        let b = tier1_score(30.0, 500, 50, 2, &weights);
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_distinguishes_pages_of_same_query() {
        let page1 = query_cache_key("language:rust", 1);
        let page2 = query_cache_key("language:rust", 2);
        assert_ne!(page1, page2);
    }

    #[test]
    fn cache_round_trips_items_and_has_more() {
        let dir = tempfile::tempdir().unwrap();
        let key = query_cache_key("language:rust", 1);
        let items = vec![RawItem {
            id: "owner/name".into(),
            url: "https://example.com/owner/name".into(),
            stars: 1,
            forks: 0,
            pushed_at: "2026-01-01T00:00:00Z".into(),
            license: None,
            description: None,
            topics: vec![],
            archived: false,
            fork: false,
        }];
        write_cache(dir.path(), &key, &items, true, 1_000).unwrap();
        let cached = read_cache(dir.path(), &key, 24, 1_000).unwrap();
        assert_eq!(cached.items.len(), 1);
        assert!(cached.has_more);
    }

    proptest::proptest! {
        /// `tier1_score` stays in [0,1] and is a pure function of its
        /// documented inputs across the full plausible star/fork/recency
        /// range, not just the fixed cases above.
        #[test]
        fn bounded_and_deterministic(
            days in 0.0f64..10_000.0f64,
            stars in 0u64..5_000_000u64,
            forks in 0u64..500_000u64,
            lane_hits in 0u32..10u32,
        ) {
            let weights = DiscoveryWeights::default();
            let a = tier1_score(days, stars, forks, lane_hits, &weights);
            let b = tier1_score(days, stars, forks, lane_hits, &weights);
            prop_assert!((0.0..=1.0).contains(&a));
            prop_assert_eq!(a, b);
        }
    }
}

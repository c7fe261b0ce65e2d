//! Search-Lane Builder: translate ranked component targets into
//! a deduplicated set of remote search queries ("lanes").

use crate::model::ComponentTarget;

pub const MAX_TOPIC_LANES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub name: String,
    pub query: String,
}

fn quality_filters(min_stars: u64) -> String {
    format!("stars:>={min_stars} pushed:>2020-01-01 fork:false archived:false")
}

/// Build lanes for `targets`, deduplicated by query expression. `primary_language`
/// comes from the most common language across all targets' search hints.
pub fn build_lanes(targets: &[ComponentTarget], primary_language: Option<&str>, min_stars: u64) -> Vec<Lane> {
    let mut lanes: Vec<Lane> = Vec::new();
    let mut seen_queries = std::collections::HashSet::new();
    let filters = quality_filters(min_stars);

    let mut push = |name: String, query: String, lanes: &mut Vec<Lane>, seen: &mut std::collections::HashSet<String>| {
        if seen.insert(query.clone()) {
            lanes.push(Lane { name, query });
        }
    };

    // One language+keywords union lane.
    let keywords: Vec<String> = targets
        .iter()
        .flat_map(|t| t.search_hints.keywords.iter().cloned())
        .collect();
    if !keywords.is_empty() || primary_language.is_some() {
        let mut parts = Vec::new();
        if let Some(lang) = primary_language {
            parts.push(format!("language:{lang}"));
        }
        if !keywords.is_empty() {
            let kw = keywords.join(" OR ");
            parts.push(format!("({kw})"));
        }
        parts.push(filters.clone());
        push("language-keywords".into(), parts.join(" "), &mut lanes, &mut seen_queries);
    }

    // One lane per distinct topic, capped.
    let mut topics: Vec<String> = targets
        .iter()
        .flat_map(|t| t.search_hints.topics.iter().cloned())
        .collect();
    topics.sort();
    topics.dedup();
    for topic in topics.into_iter().take(MAX_TOPIC_LANES) {
        let query = format!("topic:{topic} {filters}");
        push(format!("topic-{topic}"), query, &mut lanes, &mut seen_queries);
    }

    // Kind-specific lanes.
    for target in targets {
        let kind = target.kind.as_str();
        let query = format!("{kind} in:name,description {filters}");
        push(format!("kind-{kind}"), query, &mut lanes, &mut seen_queries);
    }

    lanes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComponentKind, SearchHints};

    fn target(kind: ComponentKind, keywords: &[&str], topics: &[&str]) -> ComponentTarget {
        ComponentTarget::new(
            kind,
            0.5,
            vec![],
            SearchHints {
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
                topics: topics.iter().map(|s| s.to_string()).collect(),
                language_bias: None,
            },
        )
    }

    #[test]
    fn lanes_deduplicated_by_query() {
        let targets = vec![
            target(ComponentKind::Cli, &["tool"], &["cli"]),
            target(ComponentKind::Cli, &["tool"], &["cli"]),
        ];
        let lanes = build_lanes(&targets, Some("Rust"), 0);
        let queries: std::collections::HashSet<&str> = lanes.iter().map(|l| l.query.as_str()).collect();
        assert_eq!(queries.len(), lanes.len());
    }

    #[test]
    fn topic_lanes_capped() {
        let targets = vec![target(
            ComponentKind::Cli,
            &[],
            &["a", "b", "c", "d", "e", "f", "g"],
        )];
        let lanes = build_lanes(&targets, None, 0);
        let topic_lanes = lanes.iter().filter(|l| l.name.starts_with("topic-")).count();
        assert!(topic_lanes <= MAX_TOPIC_LANES);
    }
}

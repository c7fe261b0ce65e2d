//! Report Generator: render a [`CompareReport`] as a compact
//! digest suitable for pasting into a PR description or chat message. No
//! methodology prose: names, scores, a rank table, nothing else.

use crate::model::{CompareReport, Digest, RankedCandidateSummary};

const DIGEST_BUDGET_CHARS: usize = 2000;
const MAX_RANK_ROWS: usize = 10;

fn format_candidate_line(rank: usize, candidate: &RankedCandidateSummary) -> String {
    let license = candidate.license.as_deref().unwrap_or("unlicensed");
    format!(
        "{rank}. {id} — tier2={tier2:.2} structural={structural} modernity={modernity:.2} license={license}",
        rank = rank,
        id = candidate.id,
        tier2 = candidate.tier2_score,
        structural = candidate.structural_match_count,
        modernity = candidate.modernity_score,
    )
}

/// Build the full, unbounded report body (for files, not terminals).
pub fn render_full(report: &CompareReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("run {run_id} at {timestamp}\n", run_id = report.run_id, timestamp = report.timestamp));
    out.push_str(&format!("source: {}\n", report.source.root.display()));
    if let Some(commit) = &report.source.commit {
        out.push_str(&format!("source commit: {commit}\n"));
    }
    out.push('\n');
    out.push_str(&format!(
        "discovered={} cloned={} validated={}\n",
        report.pipeline.discovered, report.pipeline.cloned, report.pipeline.validated
    ));
    match &report.pipeline.top_recommendation {
        Some(top) => out.push_str(&format!("top recommendation: {}\n", format_candidate_line(1, top))),
        None => out.push_str("top recommendation: none (no candidate cleared the pipeline)\n"),
    }
    out.push_str("\nranked candidates:\n");
    for (i, candidate) in report.ranked.iter().enumerate() {
        out.push_str(&format_candidate_line(i + 1, candidate));
        out.push('\n');
    }
    out
}

/// Build a compressed digest, truncated to [`DIGEST_BUDGET_CHARS`]. Always
/// names the top recommendation (or its absence) and a bounded rank table.
pub fn render_digest(report: &CompareReport) -> Digest {
    let mut out = String::new();
    match &report.pipeline.top_recommendation {
        Some(top) => out.push_str(&format!("top: {}\n", format_candidate_line(1, top))),
        None => out.push_str("top: none\n"),
    }
    for (i, candidate) in report.ranked.iter().take(MAX_RANK_ROWS).enumerate() {
        out.push_str(&format_candidate_line(i + 1, candidate));
        out.push('\n');
    }
    if report.ranked.len() > MAX_RANK_ROWS {
        out.push_str(&format!("...and {} more\n", report.ranked.len() - MAX_RANK_ROWS));
    }
    if out.len() > DIGEST_BUDGET_CHARS {
        out.truncate(DIGEST_BUDGET_CHARS - 3);
        out.push_str("...");
    }
    Digest { text: out }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PipelineSummary;

    fn sample_report(ranked: Vec<RankedCandidateSummary>, top: Option<RankedCandidateSummary>) -> CompareReport {
        CompareReport {
            run_id: "run-1".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            source: crate::model::SourceProjectSummary {
                root: "/tmp/src".into(),
                commit: Some("abc123".into()),
                targets: vec![],
            },
            ranked,
            pipeline: PipelineSummary {
                discovered: 10,
                cloned: 5,
                validated: 5,
                top_recommendation: top,
            },
        }
    }

    #[test]
    fn digest_names_absent_top_recommendation() {
        let report = sample_report(vec![], None);
        let digest = render_digest(&report);
        assert!(digest.text.contains("top: none"));
    }

    #[test]
    fn digest_stays_within_budget() {
        let many: Vec<RankedCandidateSummary> = (0..50)
            .map(|i| RankedCandidateSummary {
                id: format!("owner/repo-{i}"),
                tier2_score: 0.5,
                structural_match_count: 2,
                modernity_score: 0.5,
                license: Some("MIT".into()),
            })
            .collect();
        let report = sample_report(many.clone(), many.into_iter().next());
        let digest = render_digest(&report);
        assert!(digest.text.len() <= DIGEST_BUDGET_CHARS);
        assert!(digest.text.contains("...and"));
    }

    #[test]
    fn full_report_includes_source_commit() {
        let report = sample_report(vec![], None);
        let full = render_full(&report);
        assert!(full.contains("abc123"));
    }
}

//! Scout CLI — command-line interface to the repository-intelligence
//! discovery pipeline and the longitudinal watch/review subsystem.
//!
//! Wires `clap`-parsed flags to `scout-core`'s pure pipeline stages using
//! `scout-collab`'s concrete external collaborators. Holds no pipeline
//! logic of its own.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

use scout_collab::cachedir::PlatformCacheDirs;
use scout_collab::github::GitHubSearchClient;
use scout_collab::process::SubprocessRunner;
use scout_collab::token::GhCliTokenSource;

use scout_core::cachedir::CacheDirResolver;
use scout_core::config::{self, Config};
use scout_core::model::*;
use scout_core::schema::{self, Validatable};
use scout_core::watch::change_detector;
use scout_core::watch::lock::WatchLock;
use scout_core::watch::review;
use scout_core::watch::store::{SessionStatus, WatchStore};
use scout_core::{clone, discovery, fingerprint, focus, lanes, modernity, report, target, tier2, timefmt, validate};

/// Discover, clone, validate, rank, and review comparable open-source repositories.
#[derive(Parser)]
#[command(name = "scout", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit structured JSON on stdout instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint the source project and infer candidate component targets
    Scan {
        /// Source project root (default: current directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Search the host API for repositories matching the inferred targets
    Discover {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Shallow-clone the top-ranked candidates into the local cache
    Clone {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Structurally validate and score every cloned candidate
    Validate {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Bundle entrypoints and provenance for each validated candidate
    Focus {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Render the final ranked comparison report
    Compare {
        #[arg(long)]
        root: Option<PathBuf>,
        /// Also write a budget-bounded DIGEST.md/digest.json
        #[arg(long)]
        digest: bool,
    },
    /// Manage longitudinal tracking of an external repository (experimental)
    #[command(subcommand)]
    Track(TrackCommand),
    /// Run one watch pass over every enabled tracked entry (experimental)
    Watch {
        #[command(subcommand)]
        command: WatchCommand,
    },
    /// Inspect review sessions recorded by the watch subsystem (experimental)
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Launch, or skip, the reviewer subprocess for a session (experimental)
    Review {
        /// Session directory, as recorded in the watch store
        dir: PathBuf,
        /// Run the reviewer now
        #[arg(long, conflicts_with = "skip")]
        run: bool,
        /// Mark the session skipped without running a reviewer
        #[arg(long, conflicts_with = "run")]
        skip: bool,
        /// Reviewer program to invoke
        #[arg(long, default_value = "true")]
        reviewer: String,
        /// Extra arguments passed to the reviewer program (repeatable)
        #[arg(long = "reviewer-arg")]
        reviewer_arg: Vec<String>,
        /// Reviewer timeout in seconds (default: the config's review_timeout_secs)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[derive(Subcommand)]
enum TrackCommand {
    /// Start tracking a repository/target-kind pair
    Add {
        /// "owner/name"
        repo: String,
        /// Clone URL (default: https://github.com/<repo>)
        #[arg(long)]
        url: Option<String>,
        /// Component kind being tracked
        #[arg(long)]
        kind: String,
        /// Pathspecs scoping the diff (default: whole repo; repeatable)
        #[arg(long = "path")]
        paths: Vec<String>,
        /// Poll interval, in hours
        #[arg(long, default_value = "6")]
        poll_interval_hours: u32,
    },
    /// List tracked entries
    List {
        /// Restrict to one repo's tracked entries ("owner/name")
        #[arg(long)]
        repo: Option<String>,
    },
    /// Stop tracking a repository/target-kind pair
    Remove {
        repo: String,
        #[arg(long)]
        kind: String,
    },
}

#[derive(Subcommand)]
enum WatchCommand {
    /// One-shot pass: diff every enabled tracked entry against its last snapshot
    RunOnce {
        /// Treat a missing snapshot as "seed only", never a change
        #[arg(long)]
        since_last: bool,
        /// Launch the reviewer automatically for every change detected
        #[arg(long)]
        auto_review: bool,
        #[arg(long, default_value = "true")]
        reviewer: String,
        #[arg(long = "reviewer-arg")]
        reviewer_args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// List sessions recorded for a tracked repo, newest first
    List { repo: String },
    /// Show the session recorded at a given session directory
    Show { dir: PathBuf },
}

fn resolve_root(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| std::env::current_dir().expect("could not determine current directory"))
        .canonicalize()
        .expect("path not found")
}

fn scout_dir(root: &Path) -> PathBuf {
    root.join(".scout")
}

fn now_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn now_iso8601() -> String {
    timefmt::epoch_to_iso8601(now_epoch())
}

/// Prints a compact per-step progress line. Silent in JSON mode, per the
/// rule that JSON output is the only thing touching stdout/stderr on success.
fn progress(json: bool, msg: &str) {
    if !json {
        eprintln!("{msg}");
    }
}

fn load_cfg(root: &Path, cache_dirs: &PlatformCacheDirs) -> Result<Config> {
    let global_path = config::default_global_config_path(&cache_dirs.config_root());
    let project_path = config::default_project_config_path(root);
    let token_source = GhCliTokenSource::new();
    Ok(config::load(Some(&global_path), Some(&project_path), Some(&token_source))?)
}

/// Config load for commands with no project root, e.g. the watch subsystem.
fn load_global_cfg(cache_dirs: &PlatformCacheDirs) -> Result<Config> {
    let global_path = config::default_global_config_path(&cache_dirs.config_root());
    let token_source = GhCliTokenSource::new();
    Ok(config::load(Some(&global_path), None, Some(&token_source))?)
}

fn open_watch_store(cache_dirs: &PlatformCacheDirs) -> WatchStore {
    let store_dir = scout_core::cachedir::get_watch_store_dir(&cache_dirs.cache_root());
    WatchStore::open(store_dir.join("scout.db"))
}

/// `schema::write_artifact`/`read_artifact` validate a single `Validatable`
/// item; list-typed stage artifacts (targets, candidates, clone entries)
/// validate each element the same way and then serialize the whole `Vec`.
fn write_json_list<T: Serialize + Validatable>(path: &Path, items: &[T]) -> Result<()> {
    for item in items {
        item.validate().map_err(|reason| anyhow::anyhow!("artifact invalid at {}: {reason}", path.display()))?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let body = serde_json::to_vec_pretty(items)?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn read_json_list<T: DeserializeOwned + Validatable>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let items: Vec<T> = serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    for item in &items {
        item.validate().map_err(|reason| anyhow::anyhow!("artifact invalid at {}: {reason}", path.display()))?;
    }
    Ok(items)
}

/// For derived, non-pipeline artifacts (the focus index, the digest) that
/// carry no `Validatable` impl of their own.
fn write_json_value<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn cmd_scan(root: Option<PathBuf>, json: bool) -> Result<()> {
    let root = resolve_root(root);
    let runner = SubprocessRunner::new();

    progress(json, "scan: fingerprinting project");
    let fp = fingerprint::fingerprint(&root, &runner);
    let targets = target::infer_targets(&root, &fp);
    progress(json, &format!("scan: inferred {} component target(s)", targets.len()));

    let dir = scout_dir(&root);
    schema::write_artifact(&dir.join("fingerprint.json"), &fp)?;
    write_json_list(&dir.join("targets.json"), &targets)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "languages": fp.languages,
                "targets": targets,
            }))?
        );
    } else {
        println!("fingerprint: {} marker(s), {} language(s)", fp.markers.len(), fp.languages.len());
        for t in &targets {
            println!("  {:<12} confidence={:.2}", t.kind, t.confidence);
        }
    }
    Ok(())
}

fn cmd_discover(root: Option<PathBuf>, json: bool) -> Result<()> {
    let root = resolve_root(root);
    let dir = scout_dir(&root);
    let cache_dirs = PlatformCacheDirs::new();
    let cfg = load_cfg(&root, &cache_dirs)?;

    let fp: Fingerprint = schema::read_artifact(&dir.join("fingerprint.json")).context("run `scout scan` first")?;
    let targets: Vec<ComponentTarget> =
        read_json_list(&dir.join("targets.json")).context("run `scout scan` first")?;

    let primary_language = fp.languages.iter().max_by_key(|(_, count)| **count).map(|(lang, _)| lang.clone());
    let lanes = lanes::build_lanes(&targets, primary_language.as_deref(), cfg.min_stars);
    progress(json, &format!("discover: built {} search lane(s)", lanes.len()));

    let client = GitHubSearchClient::new(cfg.host_api_token.clone());
    let cache_root = cache_dirs.cache_root();
    let candidates = discovery::discover(&lanes, &client, &cache_root, &cfg, now_epoch())?;
    progress(json, &format!("discover: {} candidate(s) after filtering", candidates.len()));

    write_json_list(&dir.join("candidates.tier1.json"), &candidates)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else {
        for c in &candidates {
            println!("{:<40} tier1={:.2} stars={}", c.id, c.tier1_score, c.stars);
        }
    }
    Ok(())
}

fn cmd_clone(root: Option<PathBuf>, json: bool) -> Result<()> {
    let root = resolve_root(root);
    let dir = scout_dir(&root);
    let cache_dirs = PlatformCacheDirs::new();
    let cfg = load_cfg(&root, &cache_dirs)?;
    let candidates: Vec<Candidate> =
        read_json_list(&dir.join("candidates.tier1.json")).context("run `scout discover` first")?;

    let runner = SubprocessRunner::new();
    let cache_root = cache_dirs.cache_root();
    progress(json, &format!("clone: fetching up to {} candidate(s)", cfg.clone_budget));
    let entries = clone::clone_top_k(&candidates, cfg.clone_budget, &cache_root, &runner);
    progress(json, &format!("clone: {} repo(s) cloned", entries.len()));

    write_json_list(&dir.join("clone-manifest.json"), &entries)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for e in &entries {
            println!("{:<40} {}", e.id, e.local_path.display());
        }
    }
    Ok(())
}

fn cmd_validate(root: Option<PathBuf>, json: bool) -> Result<()> {
    let root = resolve_root(root);
    let dir = scout_dir(&root);
    let cache_dirs = PlatformCacheDirs::new();
    let cfg = load_cfg(&root, &cache_dirs)?;
    let entries: Vec<CloneEntry> =
        read_json_list(&dir.join("clone-manifest.json")).context("run `scout clone` first")?;

    let results: Vec<ValidationResult> = entries
        .par_iter()
        .map(|entry| {
            let matched = validate::validate_structure(&entry.local_path);
            let signals = modernity::audit(&entry.local_path);
            let modernity_score = modernity::modernity_score(&signals);
            let structural_match_count = matched.len();
            let tier2 = tier2::tier2_score(entry.tier1_score, structural_match_count, modernity_score, &cfg.tier2);
            ValidationResult {
                id: entry.id.clone(),
                local_path: entry.local_path.clone(),
                matched,
                modernity: signals,
                structural_match_count,
                modernity_score,
                tier1_score: entry.tier1_score,
                tier2_score: tier2,
            }
        })
        .collect();
    progress(json, &format!("validate: scored {} repo(s)", results.len()));

    let validate_dir = dir.join("validate");
    for result in &results {
        let safe_id = result.id.replace('/', "__");
        schema::write_artifact(&validate_dir.join(format!("{safe_id}.json")), result)?;
    }
    write_json_list(&dir.join("validate-summary.json"), &results)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for r in &results {
            println!(
                "{:<40} tier2={:.2} structural={} modernity={:.2}",
                r.id, r.tier2_score, r.structural_match_count, r.modernity_score
            );
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
struct FocusIndexEntry {
    id: String,
    tier2_score: f64,
    focus_dir: PathBuf,
}

fn render_focus_markdown(bundle: &FocusBundle) -> String {
    let mut out = format!("# {}\n\n## Entrypoints\n\n", bundle.id);
    for e in &bundle.entrypoints {
        out.push_str(&format!("- `{}` ({}): {}\n", e.path.display(), e.kind, e.reason));
    }
    out.push_str("\n## Scope roots\n\n");
    for r in &bundle.scope_roots {
        out.push_str(&format!("- `{}`\n", r.display()));
    }
    out.push_str(&format!("\n{} bundled file(s)\n", bundle.files.len()));
    out
}

fn render_run_hints(bundle: &FocusBundle) -> String {
    let mut out = String::from("# Run hints\n\n");
    if bundle.entrypoints.is_empty() {
        out.push_str("No entrypoints detected; inspect the scope roots directly.\n");
    }
    for e in &bundle.entrypoints {
        out.push_str(&format!("- start at `{}` — {}\n", e.path.display(), e.reason));
    }
    out
}

fn render_provenance_markdown(p: &Provenance) -> String {
    format!(
        "# Provenance\n\n- url: {}\n- commit: {}\n- license: {}\n- tier1: {:.2}\n- tier2: {:.2}\n- tool: {}\n- run: {}\n- timestamp: {}\n",
        p.url,
        p.commit,
        p.license.as_deref().unwrap_or("unknown"),
        p.tier1_score,
        p.tier2_score,
        p.tool_version,
        p.run_id,
        p.timestamp,
    )
}

fn render_focus_index_markdown(index: &[FocusIndexEntry]) -> String {
    let mut out = String::from("# Focus index\n\n");
    for entry in index {
        out.push_str(&format!("- {} — tier2={:.2} ({})\n", entry.id, entry.tier2_score, entry.focus_dir.display()));
    }
    out
}

fn cmd_focus(root: Option<PathBuf>, json: bool) -> Result<()> {
    let root = resolve_root(root);
    let dir = scout_dir(&root);
    let cache_dirs = PlatformCacheDirs::new();
    let cfg = load_cfg(&root, &cache_dirs)?;
    let results: Vec<ValidationResult> =
        read_json_list(&dir.join("validate-summary.json")).context("run `scout validate` first")?;
    let clone_entries: Vec<CloneEntry> =
        read_json_list(&dir.join("clone-manifest.json")).context("run `scout clone` first")?;
    let candidates: Vec<Candidate> = read_json_list(&dir.join("candidates.tier1.json")).unwrap_or_default();

    let run_id = uuid::Uuid::new_v4().to_string();
    let timestamp = now_iso8601();
    let focus_root = dir.join("focus");

    let mut index = Vec::new();
    for validation in &results {
        let Some(clone_entry) = clone_entries.iter().find(|e| e.id == validation.id) else {
            tracing::warn!(id = %validation.id, "no clone entry for validated repo, skipping focus bundle");
            continue;
        };
        let Some((owner, name)) = validation.id.split_once('/') else {
            tracing::warn!(id = %validation.id, "malformed candidate id, skipping focus bundle");
            continue;
        };
        let license = candidates.iter().find(|c| c.id == validation.id).and_then(|c| c.license.clone());

        let bundle = focus::build_bundle(
            &validation.local_path,
            validation,
            cfg.focus_max_per_kind as usize,
            cfg.focus_max_dirs_per_target,
            cfg.focus_max_files_per_dir,
        );
        let provenance = focus::build_provenance(
            validation,
            &clone_entry.url,
            &clone_entry.commit,
            license,
            scout_core::TOOL_VERSION,
            &run_id,
            &timestamp,
        );

        let bundle_dir = focus_root.join(owner).join(name);
        schema::write_artifact(&bundle_dir.join("FOCUS.json"), &bundle)?;
        schema::write_artifact(&bundle_dir.join("PROVENANCE.json"), &provenance)?;
        std::fs::write(bundle_dir.join("FOCUS.md"), render_focus_markdown(&bundle))?;
        std::fs::write(bundle_dir.join("RUN_HINTS.md"), render_run_hints(&bundle))?;
        std::fs::write(bundle_dir.join("PROVENANCE.md"), render_provenance_markdown(&provenance))?;

        let focus_dir_rel = bundle_dir.strip_prefix(&root).unwrap_or(bundle_dir.as_path()).to_path_buf();
        index.push(FocusIndexEntry {
            id: validation.id.clone(),
            tier2_score: validation.tier2_score,
            focus_dir: focus_dir_rel,
        });
    }
    index.sort_by(|a, b| b.tier2_score.partial_cmp(&a.tier2_score).unwrap_or(std::cmp::Ordering::Equal));
    progress(json, &format!("focus: bundled {} repo(s)", index.len()));

    write_json_value(&dir.join("focus-index.json"), &index)?;
    std::fs::write(dir.join("focus-index.md"), render_focus_index_markdown(&index))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&index)?);
    } else {
        for entry in &index {
            println!("{:<40} tier2={:.2} {}", entry.id, entry.tier2_score, entry.focus_dir.display());
        }
    }
    Ok(())
}

fn cmd_compare(root: Option<PathBuf>, digest: bool, json: bool) -> Result<()> {
    let root = resolve_root(root);
    let dir = scout_dir(&root);

    let fp: Fingerprint = schema::read_artifact(&dir.join("fingerprint.json")).context("run `scout scan` first")?;
    let targets: Vec<ComponentTarget> = read_json_list(&dir.join("targets.json")).unwrap_or_default();
    let candidates: Vec<Candidate> = read_json_list(&dir.join("candidates.tier1.json")).unwrap_or_default();
    let clone_entries: Vec<CloneEntry> = read_json_list(&dir.join("clone-manifest.json")).unwrap_or_default();
    let results: Vec<ValidationResult> =
        read_json_list(&dir.join("validate-summary.json")).context("run `scout validate` first")?;

    let license_for = |id: &str| candidates.iter().find(|c| c.id == id).and_then(|c| c.license.clone());

    let mut ranked: Vec<RankedCandidateSummary> = results
        .iter()
        .map(|r| RankedCandidateSummary {
            id: r.id.clone(),
            tier2_score: r.tier2_score,
            structural_match_count: r.structural_match_count,
            modernity_score: r.modernity_score,
            license: license_for(&r.id),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.tier2_score.partial_cmp(&a.tier2_score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.id.cmp(&b.id))
    });
    let top_recommendation = ranked.first().cloned();

    let report = CompareReport {
        run_id: uuid::Uuid::new_v4().to_string(),
        timestamp: now_iso8601(),
        source: SourceProjectSummary {
            root: root.clone(),
            commit: fp.commit.clone(),
            targets,
        },
        ranked,
        pipeline: PipelineSummary {
            discovered: candidates.len(),
            cloned: clone_entries.len(),
            validated: results.len(),
            top_recommendation,
        },
    };
    progress(json, &format!("compare: ranked {} candidate(s)", report.ranked.len()));

    schema::write_artifact(&dir.join("report.json"), &report)?;
    std::fs::write(dir.join("REPORT.md"), report::render_full(&report))?;
    if digest {
        let d = report::render_digest(&report);
        write_json_value(&dir.join("digest.json"), &d)?;
        std::fs::write(dir.join("DIGEST.md"), &d.text)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::render_full(&report));
    }
    Ok(())
}

fn cmd_track_add(
    repo: String,
    url: Option<String>,
    kind: String,
    paths: Vec<String>,
    poll_interval_hours: u32,
    json: bool,
) -> Result<()> {
    let kind: ComponentKind = kind.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let cache_dirs = PlatformCacheDirs::new();
    let store = open_watch_store(&cache_dirs);
    let url = url.unwrap_or_else(|| format!("https://github.com/{repo}"));
    let repo_row = store.upsert_repo(&repo, &url, None, None, &now_iso8601())?;
    store.upsert_tracked(repo_row.id, kind.as_str(), &paths, true, poll_interval_hours)?;
    progress(json, &format!("track: now tracking {repo} ({kind})"));
    if json {
        println!("{}", serde_json::json!({"repo": repo, "kind": kind.as_str(), "tracking": true}));
    } else {
        println!("tracking {repo} ({kind}), polling every {poll_interval_hours}h");
    }
    Ok(())
}

fn cmd_track_list(repo: Option<String>, json: bool) -> Result<()> {
    let cache_dirs = PlatformCacheDirs::new();
    let store = open_watch_store(&cache_dirs);

    let rows = match repo {
        Some(full_name) => {
            let repo_row = store
                .find_repo_by_full_name(&full_name)?
                .with_context(|| format!("no tracked repo named {full_name}"))?;
            let tracked = store.tracked_for_repo(repo_row.id)?;
            tracked.into_iter().map(|t| (repo_row.clone(), t)).collect::<Vec<_>>()
        }
        None => store.all_enabled_tracked_with_repo()?,
    };

    if json {
        let items: Vec<_> = rows
            .iter()
            .map(|(repo, tracked)| {
                serde_json::json!({
                    "repo": repo.full_name,
                    "kind": tracked.target_kind,
                    "paths": tracked.paths,
                    "poll_interval_hours": tracked.poll_interval_hours,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for (repo, tracked) in &rows {
            println!(
                "{:<30} {:<10} every {}h  {:?}",
                repo.full_name, tracked.target_kind, tracked.poll_interval_hours, tracked.paths
            );
        }
    }
    Ok(())
}

fn cmd_track_remove(repo: String, kind: String, json: bool) -> Result<()> {
    let kind: ComponentKind = kind.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let cache_dirs = PlatformCacheDirs::new();
    let store = open_watch_store(&cache_dirs);
    let repo_row =
        store.find_repo_by_full_name(&repo)?.with_context(|| format!("no tracked repo named {repo}"))?;
    store.disable_tracked(repo_row.id, kind.as_str())?;
    progress(json, &format!("track: stopped tracking {repo} ({kind})"));
    if json {
        println!("{}", serde_json::json!({"repo": repo, "kind": kind.as_str(), "tracking": false}));
    } else {
        println!("stopped tracking {repo} ({kind})");
    }
    Ok(())
}

fn describe_tracked_result(r: &change_detector::TrackedResult) -> serde_json::Value {
    let outcome = match &r.outcome {
        change_detector::TrackedOutcome::Seeded { head } => serde_json::json!({"status": "seeded", "head": head}),
        change_detector::TrackedOutcome::NoOp { head } => serde_json::json!({"status": "no-op", "head": head}),
        change_detector::TrackedOutcome::ChangeDetected { from, to, session_dir, drift, review } => {
            serde_json::json!({
                "status": "change-detected",
                "from": from,
                "to": to,
                "session_dir": session_dir.display().to_string(),
                "drift": drift,
                "review": review.as_ref().map(|o| serde_json::json!({
                    "success": o.success,
                    "exit_code": o.exit_code,
                    "error": o.error,
                })),
            })
        }
        change_detector::TrackedOutcome::Failed { reason } => serde_json::json!({"status": "failed", "reason": reason}),
    };
    serde_json::json!({
        "repo": r.repo_full_name,
        "kind": r.target_kind,
        "outcome": outcome,
    })
}

fn describe_outcome_human(outcome: &change_detector::TrackedOutcome) -> String {
    match outcome {
        change_detector::TrackedOutcome::Seeded { head } => format!("seeded at {head}"),
        change_detector::TrackedOutcome::NoOp { head } => format!("no changes ({head})"),
        change_detector::TrackedOutcome::ChangeDetected { from, to, session_dir, drift, review } => {
            let drift_note = if *drift { " (drift flagged)" } else { "" };
            let review_note = match review {
                Some(o) if o.success => " — review ok".to_string(),
                Some(o) => format!(" — review failed ({})", o.error.as_deref().unwrap_or("unknown")),
                None => String::new(),
            };
            format!("{from}..{to} -> {}{drift_note}{review_note}", session_dir.display())
        }
        change_detector::TrackedOutcome::Failed { reason } => format!("failed: {reason}"),
    }
}

fn cmd_watch_run_once(
    since_last: bool,
    auto_review: bool,
    reviewer: String,
    reviewer_args: Vec<String>,
    json: bool,
) -> Result<()> {
    let cache_dirs = PlatformCacheDirs::new();
    let cfg = load_global_cfg(&cache_dirs)?;
    let cache_root = cache_dirs.cache_root();
    let store_dir = scout_core::cachedir::get_watch_store_dir(&cache_root);
    let store = WatchStore::open(store_dir.join("scout.db"));
    let lock = WatchLock::new(
        &store_dir,
        std::time::Duration::from_secs(cfg.lock_stale_threshold_secs),
        cfg.lock_retry_max_attempts,
    );
    let runner = SubprocessRunner::new();
    let reviewer_args_refs: Vec<&str> = reviewer_args.iter().map(String::as_str).collect();
    let now = now_iso8601();

    let results = change_detector::run_once(
        &store,
        &lock,
        &runner,
        &cache_root,
        &cfg,
        since_last,
        auto_review,
        &reviewer,
        &reviewer_args_refs,
        &now,
    )?;
    progress(json, &format!("watch: processed {} tracked entry(s)", results.len()));

    if json {
        let items: Vec<_> = results.iter().map(describe_tracked_result).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for r in &results {
            println!("{:<30} {:<10} {}", r.repo_full_name, r.target_kind, describe_outcome_human(&r.outcome));
        }
    }
    Ok(())
}

fn cmd_session_list(repo: String, json: bool) -> Result<()> {
    let cache_dirs = PlatformCacheDirs::new();
    let store = open_watch_store(&cache_dirs);
    let repo_row =
        store.find_repo_by_full_name(&repo)?.with_context(|| format!("no tracked repo named {repo}"))?;
    let sessions = store.sessions_for_repo(repo_row.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
    } else {
        for s in &sessions {
            println!("{:<8} {:<10?} {}", s.id, s.status, s.session_dir.display());
        }
    }
    Ok(())
}

fn cmd_session_show(dir: PathBuf, json: bool) -> Result<()> {
    let cache_dirs = PlatformCacheDirs::new();
    let store = open_watch_store(&cache_dirs);
    let session =
        store.session_by_path(&dir)?.with_context(|| format!("no session recorded at {}", dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        println!("id:        {}", session.id);
        println!("status:    {:?}", session.status);
        println!("dir:       {}", session.session_dir.display());
        println!("exit_code: {}", session.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "-".into()));
        println!("started:   {}", session.started_at.as_deref().unwrap_or("-"));
        println!("finished:  {}", session.finished_at.as_deref().unwrap_or("-"));
    }
    Ok(())
}

/// The review command's exit code is the reviewer's own exit code, not a
/// generic success/failure boolean, so it is handled outside the shared
/// `dispatch` result-to-exit-code mapping.
fn cmd_review(
    dir: PathBuf,
    run: bool,
    skip: bool,
    reviewer: String,
    reviewer_args: Vec<String>,
    timeout_secs: Option<u64>,
    json: bool,
) {
    let _ = run;
    if run && skip {
        eprintln!("review failed: --run and --skip are mutually exclusive");
        std::process::exit(1);
    }

    let cache_dirs = PlatformCacheDirs::new();
    let cfg = match load_global_cfg(&cache_dirs) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("review failed: {e}");
            std::process::exit(1);
        }
    };
    let store = open_watch_store(&cache_dirs);
    let now = now_iso8601();

    let session = match store.session_by_path(&dir) {
        Ok(Some(s)) => s,
        Ok(None) => {
            eprintln!("review failed: no session recorded at {}", dir.display());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("review failed: {e}");
            std::process::exit(1);
        }
    };

    if skip {
        match store.transition_session(session.id, SessionStatus::Skipped, None, &now) {
            Ok(_) => {
                if json {
                    println!("{}", serde_json::json!({"status": "skipped"}));
                } else {
                    println!("session marked skipped");
                }
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("review failed: {e}");
                std::process::exit(1);
            }
        }
    }

    let runner = SubprocessRunner::new();
    let reviewer_args_refs: Vec<&str> = reviewer_args.iter().map(String::as_str).collect();
    let timeout = std::time::Duration::from_secs(timeout_secs.unwrap_or(cfg.review_timeout_secs));

    match review::launch_review(&store, &runner, &session, &reviewer, &reviewer_args_refs, timeout, &now) {
        Ok(outcome) if outcome.success => {
            if json {
                println!("{}", serde_json::json!({"status": "success", "exit_code": outcome.exit_code}));
            } else {
                println!("review succeeded");
            }
            std::process::exit(0);
        }
        Ok(outcome) => {
            let code = outcome.exit_code.unwrap_or(1);
            if json {
                println!(
                    "{}",
                    serde_json::json!({"status": "failure", "exit_code": outcome.exit_code, "error": outcome.error})
                );
            } else {
                eprintln!("review failed: {}", outcome.error.as_deref().unwrap_or("reviewer exited non-zero"));
            }
            std::process::exit(code);
        }
        Err(e) => {
            let code = match &e {
                scout_core::error::ScoutError::ReviewerTimedOut(_) => 124,
                scout_core::error::ScoutError::ReviewerFailed(c) => *c,
                _ => 1,
            };
            eprintln!("review failed: {e}");
            std::process::exit(code);
        }
    }
}

/// Printed once per process, the first time any experimental (track/watch/
/// session/review) command runs — spec.md §9's one-time experimental-warning
/// global state.
static EXPERIMENTAL_WARNING_SHOWN: std::sync::Once = std::sync::Once::new();

fn warn_experimental(json: bool) {
    if json {
        return;
    }
    EXPERIMENTAL_WARNING_SHOWN.call_once(|| {
        eprintln!("note: track/watch/session/review are experimental and may change without notice");
    });
}

fn dispatch(command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Scan { root } => cmd_scan(root, json),
        Commands::Discover { root } => cmd_discover(root, json),
        Commands::Clone { root } => cmd_clone(root, json),
        Commands::Validate { root } => cmd_validate(root, json),
        Commands::Focus { root } => cmd_focus(root, json),
        Commands::Compare { root, digest } => cmd_compare(root, digest, json),
        Commands::Track(TrackCommand::Add { repo, url, kind, paths, poll_interval_hours }) => {
            warn_experimental(json);
            cmd_track_add(repo, url, kind, paths, poll_interval_hours, json)
        }
        Commands::Track(TrackCommand::List { repo }) => {
            warn_experimental(json);
            cmd_track_list(repo, json)
        }
        Commands::Track(TrackCommand::Remove { repo, kind }) => {
            warn_experimental(json);
            cmd_track_remove(repo, kind, json)
        }
        Commands::Watch { command: WatchCommand::RunOnce { since_last, auto_review, reviewer, reviewer_args } } => {
            warn_experimental(json);
            cmd_watch_run_once(since_last, auto_review, reviewer, reviewer_args, json)
        }
        Commands::Session { command: SessionCommand::List { repo } } => {
            warn_experimental(json);
            cmd_session_list(repo, json)
        }
        Commands::Session { command: SessionCommand::Show { dir } } => {
            warn_experimental(json);
            cmd_session_show(dir, json)
        }
        Commands::Review { .. } => unreachable!("review is dispatched directly from main for exit-code passthrough"),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("scout=warn".parse().unwrap()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    match cli.command {
        Commands::Review { dir, run, skip, reviewer, reviewer_arg, timeout_secs } => {
            warn_experimental(json);
            cmd_review(dir, run, skip, reviewer, reviewer_arg, timeout_secs, json);
        }
        other => {
            if let Err(e) = dispatch(other, json) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }
}

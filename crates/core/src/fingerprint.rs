//! Fingerprinter: walk a source tree, classify files by
//! language, collect marker files, and record the commit id.
//!
//! Traversal is an `ignore::WalkBuilder` parallel walk respecting the root's
//! own ignore file, with an additional internal deny-list and a depth cap —
//! some cloned repos are enormous monorepos, so unbounded recursion is not
//! an option.

use crate::model::Fingerprint;
use crate::vcs::{self, ProcessRunner};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const MAX_DEPTH: usize = 10;

/// Directories that are never source, regardless of the root's own
/// `.gitignore` — build artifacts, VCS metadata, virtualenvs, caches.
pub const DENY_LIST: &[&str] = &[
    ".git", ".hg", ".svn", "node_modules", "target", "dist", "build",
    "__pycache__", ".venv", "venv", ".tox", ".mypy_cache", ".pytest_cache",
    ".next", ".nuxt", "vendor", ".cache", "coverage",
];

fn extension_language_table() -> &'static [(&'static str, &'static str)] {
    &[
        ("rs", "Rust"),
        ("go", "Go"),
        ("py", "Python"), ("pyi", "Python"),
        ("ts", "TypeScript"), ("tsx", "TypeScript"),
        ("js", "JavaScript"), ("jsx", "JavaScript"), ("mjs", "JavaScript"), ("cjs", "JavaScript"),
        ("java", "Java"),
        ("kt", "Kotlin"), ("kts", "Kotlin"),
        ("rb", "Ruby"),
        ("php", "PHP"),
        ("c", "C"), ("h", "C"),
        ("cpp", "C++"), ("cc", "C++"), ("cxx", "C++"), ("hpp", "C++"), ("hxx", "C++"),
        ("cs", "C#"),
        ("swift", "Swift"),
        ("scala", "Scala"),
        ("sh", "Shell"), ("bash", "Shell"), ("zsh", "Shell"),
        ("lua", "Lua"),
        ("ex", "Elixir"), ("exs", "Elixir"),
        ("erl", "Erlang"),
        ("hs", "Haskell"),
        ("ml", "OCaml"), ("mli", "OCaml"),
        ("zig", "Zig"),
        ("dart", "Dart"),
        ("vue", "Vue"),
        ("svelte", "Svelte"),
    ]
}

fn language_for_extension(ext: &str) -> Option<&'static str> {
    let lower = ext.to_ascii_lowercase();
    extension_language_table()
        .iter()
        .find(|(e, _)| *e == lower)
        .map(|(_, lang)| *lang)
}

/// Marker files/directories recognized by name, regardless of extension.
pub const MARKER_NAMES: &[&str] = &[
    "Cargo.toml", "package.json", "go.mod", "pyproject.toml", "setup.py",
    "Gemfile", "composer.json", "pom.xml", "build.gradle", "build.gradle.kts",
    "SKILL.md", ".mcp.json", "mcp.json",
    ".claude", ".claude-plugin", "plugin.json",
    ".github", "Dockerfile", "docker-compose.yml",
];

fn now_iso8601() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    crate::timefmt::epoch_to_iso8601(now.as_secs() as i64)
}

struct WalkAccumulator {
    languages: BTreeMap<String, u64>,
    markers: Vec<String>,
}

fn walk(root: &Path) -> WalkAccumulator {
    let languages: Mutex<BTreeMap<String, u64>> = Mutex::new(BTreeMap::new());
    let markers: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let seen_markers: Mutex<std::collections::HashSet<String>> = Mutex::new(std::collections::HashSet::new());

    WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .max_depth(Some(MAX_DEPTH))
        .filter_entry(move |entry| {
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                let name = entry.file_name().to_string_lossy();
                return !DENY_LIST.contains(&name.as_ref());
            }
            true
        })
        .build_parallel()
        .run(|| {
            let languages = &languages;
            let markers = &markers;
            let seen_markers = &seen_markers;
            Box::new(move |entry| {
                let entry = match entry {
                    Ok(e) => e,
                    Err(_) => return ignore::WalkState::Continue,
                };
                let name = entry.file_name().to_string_lossy().into_owned();
                if MARKER_NAMES.contains(&name.as_str()) {
                    let mut seen = seen_markers.lock().unwrap();
                    if seen.insert(name.clone()) {
                        markers.lock().unwrap().push(name);
                    }
                }

                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
                        if let Some(lang) = language_for_extension(ext) {
                            *languages.lock().unwrap().entry(lang.to_string()).or_insert(0) += 1;
                        }
                    }
                }
                ignore::WalkState::Continue
            })
        });

    let mut markers = markers.into_inner().unwrap();
    markers.sort();
    WalkAccumulator {
        languages: languages.into_inner().unwrap(),
        markers,
    }
}

/// Produce a [`Fingerprint`] for `root`. Deterministic except `timestamp`:
/// identical trees yield identical `languages` and `markers` across runs.
pub fn fingerprint(root: &Path, runner: &dyn ProcessRunner) -> Fingerprint {
    let acc = walk(root);
    let commit = vcs::resolve_commit(runner, root);
    Fingerprint {
        root: root.to_path_buf(),
        commit,
        timestamp: now_iso8601(),
        languages: acc.languages,
        markers: acc.markers,
    }
}

pub fn is_denied_dir(name: &str) -> bool {
    DENY_LIST.contains(&name)
}

pub fn marker_path_candidates(root: &Path) -> Vec<PathBuf> {
    MARKER_NAMES.iter().map(|m| root.join(m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::ProcessOutput;

    struct NullRunner;
    impl ProcessRunner for NullRunner {
        fn run(
            &self,
            _program: &str,
            _args: &[&str],
            _cwd: Option<&Path>,
            _env: &[(&str, &str)],
        ) -> std::io::Result<ProcessOutput> {
            Ok(ProcessOutput {
                status: 1,
                stdout: vec![],
                stderr: vec![],
            })
        }
        fn run_with_timeout(
            &self,
            _program: &str,
            _args: &[&str],
            _cwd: Option<&Path>,
            _env: &[(&str, &str)],
            _timeout: std::time::Duration,
        ) -> std::io::Result<crate::vcs::TimedOutcome> {
            unimplemented!()
        }
    }

    #[test]
    fn identical_trees_yield_identical_languages_and_markers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"").unwrap();

        let fp1 = fingerprint(dir.path(), &NullRunner);
        let fp2 = fingerprint(dir.path(), &NullRunner);

        assert_eq!(fp1.languages, fp2.languages);
        assert_eq!(fp1.markers, fp2.markers);
        assert_eq!(fp1.commit, None);
        assert_eq!(fp1.languages.get("Rust"), Some(&1));
        assert!(fp1.markers.contains(&"Cargo.toml".to_string()));
    }

    #[test]
    fn deny_listed_dirs_are_never_walked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        std::fs::write(dir.path().join("target/debug/ignored.rs"), "fn x() {}").unwrap();
        std::fs::write(dir.path().join("real.rs"), "fn y() {}").unwrap();

        let fp = fingerprint(dir.path(), &NullRunner);
        assert_eq!(fp.languages.get("Rust"), Some(&1));
    }
}

//! Modernity Auditor: six mandatory, side-effect-free checks
//! over a repo's file tree, producing a normalized modernity score.

use crate::model::ModernitySignal;
use std::path::Path;

fn signal(name: &str, passed: bool, detail: impl Into<Option<String>>) -> ModernitySignal {
    ModernitySignal {
        name: name.to_string(),
        passed,
        detail: detail.into(),
    }
}

/// 1. Module system is ES-style (manifest `"type": "module"` or `.mjs`/ESM
/// import syntax in a sampled source file).
fn check_es_modules(root: &Path) -> ModernitySignal {
    if let Ok(content) = std::fs::read_to_string(root.join("package.json")) {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(&content) {
            if v.get("type").and_then(|t| t.as_str()) == Some("module") {
                return signal("es_modules", true, Some("package.json type=module".to_string()));
            }
        }
    }
    if root.join("tsconfig.json").exists() {
        if let Ok(content) = std::fs::read_to_string(root.join("tsconfig.json")) {
            if content.contains("\"module\"") && (content.contains("ESNext") || content.contains("ES2020") || content.contains("ES2022")) {
                return signal("es_modules", true, Some("tsconfig module target is ESNext-family".to_string()));
            }
        }
    }
    signal("es_modules", false, None)
}

/// 2. Strict type-checking enabled in the type-checker configuration.
fn check_strict_types(root: &Path) -> ModernitySignal {
    if let Ok(content) = std::fs::read_to_string(root.join("tsconfig.json")) {
        if content.contains("\"strict\": true") || content.contains("\"strict\":true") {
            return signal("strict_types", true, Some("tsconfig strict: true".to_string()));
        }
    }
    if let Ok(content) = std::fs::read_to_string(root.join("pyrightconfig.json")) {
        if content.contains("\"strict\"") {
            return signal("strict_types", true, Some("pyrightconfig strict mode".to_string()));
        }
    }
    signal("strict_types", false, None)
}

/// 3. Modern lint configuration present (flat config only — `.eslintrc*`
/// legacy formats do not count).
fn check_modern_lint(root: &Path) -> ModernitySignal {
    for name in ["eslint.config.js", "eslint.config.mjs", "eslint.config.ts"] {
        if root.join(name).exists() {
            return signal("modern_lint", true, Some(format!("found {name}")));
        }
    }
    if root.join("clippy.toml").exists() {
        return signal("modern_lint", true, Some("found clippy.toml".to_string()));
    }
    signal("modern_lint", false, None)
}

/// 4. Package-manager declaration or lock-file present.
fn check_lockfile(root: &Path) -> ModernitySignal {
    for name in [
        "package-lock.json", "pnpm-lock.yaml", "yarn.lock", "bun.lockb",
        "Cargo.lock", "poetry.lock", "go.sum", "Gemfile.lock",
    ] {
        if root.join(name).exists() {
            return signal("lockfile", true, Some(format!("found {name}")));
        }
    }
    if let Ok(content) = std::fs::read_to_string(root.join("package.json")) {
        if content.contains("\"packageManager\"") {
            return signal("lockfile", true, Some("package.json declares packageManager".to_string()));
        }
    }
    signal("lockfile", false, None)
}

/// 5. Minimum runtime/engine target meets threshold.
fn check_engine_target(root: &Path) -> ModernitySignal {
    if let Ok(content) = std::fs::read_to_string(root.join("package.json")) {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(&content) {
            if let Some(node) = v.get("engines").and_then(|e| e.get("node")).and_then(|n| n.as_str()) {
                let meets = node.contains("18") || node.contains("20") || node.contains("22") || node.contains(">=1");
                return signal("engine_target", meets, Some(format!("engines.node = {node}")));
            }
        }
    }
    if let Ok(content) = std::fs::read_to_string(root.join("Cargo.toml")) {
        if content.contains("edition = \"2021\"") || content.contains("edition = \"2024\"") {
            return signal("engine_target", true, Some("Cargo edition 2021+".to_string()));
        }
    }
    signal("engine_target", false, None)
}

/// 6. Modern test runner detected.
fn check_modern_test_runner(root: &Path) -> ModernitySignal {
    if let Ok(content) = std::fs::read_to_string(root.join("package.json")) {
        for marker in ["vitest", "\"jest\"", "@playwright/test", "bun:test"] {
            if content.contains(marker) {
                return signal("modern_test_runner", true, Some(format!("package.json references {marker}")));
            }
        }
    }
    if root.join("Cargo.toml").exists() {
        // `cargo test` is the de facto modern runner for Rust; presence of
        // a Cargo.toml with any [dev-dependencies] is evidence enough
        // without parsing the whole dependency graph.
        if let Ok(content) = std::fs::read_to_string(root.join("Cargo.toml")) {
            if content.contains("[dev-dependencies]") || root.join("tests").is_dir() {
                return signal("modern_test_runner", true, Some("cargo test harness present".to_string()));
            }
        }
    }
    signal("modern_test_runner", false, None)
}

pub fn audit(root: &Path) -> Vec<ModernitySignal> {
    vec![
        check_es_modules(root),
        check_strict_types(root),
        check_modern_lint(root),
        check_lockfile(root),
        check_engine_target(root),
        check_modern_test_runner(root),
    ]
}

/// passed / total, rounded to two decimal places.
pub fn modernity_score(signals: &[ModernitySignal]) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    let passed = signals.iter().filter(|s| s.passed).count() as f64;
    crate::model::round2(passed / signals.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_checks_always_run() {
        let dir = tempfile::tempdir().unwrap();
        let signals = audit(dir.path());
        assert_eq!(signals.len(), 6);
    }

    #[test]
    fn score_is_passed_over_total() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.lock"), "").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "edition = \"2021\"\n[dev-dependencies]\n").unwrap();
        let signals = audit(dir.path());
        let score = modernity_score(&signals);
        assert!((0.0..=1.0).contains(&score));
        let passed = signals.iter().filter(|s| s.passed).count();
        assert_eq!(score, (passed as f64 / 6.0 * 100.0).round() / 100.0);
    }
}

//! Integration Test: Core/Surface Separation
//!
//! **Policy**: `nulo-core` is headless. It talks to surfaces through
//! `RenderDirective`s and `SessionHandle`, never through a terminal crate.

use std::fs;

use architectural_enforcement::{scan, workspace_root};

const UI_CRATES: &[&str] = &["ratatui", "crossterm"];

#[test]
fn test_core_manifest_has_no_ui_crates() {
    let manifest = fs::read_to_string(workspace_root().join("nulo/core/Cargo.toml")).unwrap();

    for line in manifest.lines().filter(|l| !l.trim_start().starts_with('#')) {
        for krate in UI_CRATES {
            assert!(
                !line.trim_start().starts_with(krate),
                "nulo-core must not depend on {krate}: {line}"
            );
        }
    }
}

#[test]
fn test_core_sources_have_no_ui_imports() {
    let core_src = workspace_root().join("nulo/core/src");
    let patterns: Vec<String> = UI_CRATES.iter().map(|k| format!("{k}::")).collect();
    let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();

    let violations = scan(&core_src, &patterns, |_| false);

    assert!(
        violations.is_empty(),
        "UI imports in nulo-core:\n{}",
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[test]
fn test_tui_reaches_core_only_through_public_api() {
    let tui_src = workspace_root().join("tui/src");
    let violations = scan(&tui_src, &["SessionEvent::"], |_| false);

    assert!(
        violations.is_empty(),
        "TUI should send input through SessionHandle:\n{:?}",
        violations
    );
}

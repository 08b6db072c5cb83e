//! Integration Test: Timer Confinement
//!
//! **Policy**: In `nulo/core`, only `scheduler.rs` may touch tokio timers.
//! Engines ask the scheduler for ticks and cues; they never sleep, build
//! intervals or read the clock themselves. That keeps every timing
//! cancellable and every test deterministic under paused time.
//!
//! **Exceptions**: test code (`#[cfg(test)]` modules and `tests/`).

use architectural_enforcement::{scan, workspace_root};

const TIMER_PATTERNS: &[&str] = &[
    "::sleep(",
    "sleep_until(",
    "interval(",
    "interval_at(",
    "Instant::now(",
    "thread::sleep",
];

#[test]
fn test_timers_only_in_scheduler() {
    let core_src = workspace_root().join("nulo/core/src");
    assert!(core_src.exists(), "missing {}", core_src.display());

    let violations = scan(&core_src, TIMER_PATTERNS, |path| path.ends_with("scheduler.rs"));

    if !violations.is_empty() {
        eprintln!("\n❌ Timer primitives found outside the scheduler!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use Scheduler::every / Scheduler::after and handle the event.");

        panic!(
            "\nFound {} timer violation(s) in nulo-core.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_scheduler_is_the_timer_user() {
    let scheduler = workspace_root().join("nulo/core/src/scheduler.rs");
    let content = std::fs::read_to_string(&scheduler).unwrap();

    assert!(content.contains("interval_at("));
    assert!(content.contains("sleep("));
}

//! End-to-end session tests
//!
//! These drive a real `SessionController` through its inbox with paused
//! tokio time, playing the part of a perfect player:
//! - Puzzle won by locking each bar while it sits in the window
//! - Interstitial cues at their configured offsets
//! - Full dialogue walk through the built-in content
//! - Destruction sequence timings and effect counts

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;
use tokio::time::Instant;

use nulo_core::config::{apply_env_config, load_config_from_path};
use nulo_core::{
    DialogueGraph, ExperienceConfig, NodeId, Phase, RecordingRenderer, RenderDirective,
    SessionController, SessionEvent, SessionHandle,
};

// =============================================================================
// Helpers
// =============================================================================

fn session(config: ExperienceConfig) -> (SessionController, SessionHandle, Arc<RecordingRenderer>) {
    let recorder = Arc::new(RecordingRenderer::new());
    let graph = Arc::new(DialogueGraph::builtin().unwrap());
    let (controller, handle) = SessionController::with_seed(config, graph, recorder.clone(), 2024);
    (controller, handle, recorder)
}

/// Step the controller, locking bars as they enter the window
async fn play_puzzle(controller: &mut SessionController, handle: &SessionHandle) {
    let window = controller_window();
    while controller.phase() == Phase::Puzzle {
        let ready: Vec<usize> = controller
            .puzzle()
            .bars()
            .iter()
            .filter(|b| !b.locked && b.in_window(&window))
            .map(|b| b.id)
            .collect();
        for index in ready {
            handle.lock(index).unwrap();
        }
        controller.step().await.unwrap();
    }
}

fn controller_window() -> nulo_core::LockWindow {
    ExperienceConfig::default().puzzle.lock_window
}

/// Step until the dialogue offers choices, then take the first one
async fn play_dialogue(controller: &mut SessionController, handle: &SessionHandle) -> Vec<NodeId> {
    let mut visited = Vec::new();
    while controller.phase() == Phase::Dialogue {
        let visible = controller
            .dialogue()
            .session()
            .map(|s| (s.node, s.choices_visible));
        if let Some((node, true)) = visible {
            if visited.last() != Some(&node) {
                visited.push(node);
                handle.choose(0).unwrap();
            }
        }
        controller.step().await.unwrap();
    }
    visited
}

// =============================================================================
// Full run
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_full_session_reaches_black_screen() {
    let (mut controller, handle, recorder) = session(ExperienceConfig::default());
    controller.start();

    // --- Puzzle ---
    play_puzzle(&mut controller, &handle).await;
    assert_eq!(controller.phase(), Phase::Interstitial);
    let logs = recorder.log_lines();
    for n in 1..=5 {
        assert!(logs.contains(&format!("> NÓ {n} SINCRONIZADO.")));
    }
    assert_eq!(logs.last().map(String::as_str), Some("> INICIANDO IMERSÃO NO VAZIO..."));

    // --- Interstitial ---
    let won_at = Instant::now();
    while controller.phase() == Phase::Interstitial {
        controller.step().await.unwrap();
    }
    assert_eq!(won_at.elapsed(), Duration::from_secs(53));
    assert!(recorder
        .snapshot()
        .contains(&RenderDirective::PlayAmbientAudio { volume: 0.5 }));

    // --- Dialogue ---
    let visited = play_dialogue(&mut controller, &handle).await;
    assert_eq!(
        visited,
        vec![
            NodeId::Entry,
            NodeId::Index(0),
            NodeId::Index(1),
            NodeId::Index(2),
            NodeId::Index(3),
            NodeId::Index(4),
            NodeId::Index(5),
            NodeId::Index(6),
        ]
    );
    assert_eq!(controller.phase(), Phase::Destruction);
    assert_eq!(
        recorder.count(|d| *d == RenderDirective::RaiseCriticalAlert),
        1
    );

    // --- Destruction ---
    let destroy_at = Instant::now();
    let mut cover_at = None;
    while !controller.is_finished() {
        controller.step().await.unwrap();
        if cover_at.is_none() && recorder.last() == Some(RenderDirective::ShowFinalCover) {
            cover_at = Some(destroy_at.elapsed());
        }
    }

    assert_eq!(destroy_at.elapsed(), Duration::from_millis(5500));
    assert_eq!(cover_at, Some(Duration::from_millis(2500)));
    assert_eq!(
        recorder.count(|d| *d == RenderDirective::SpawnDestructionEffect),
        50
    );
    assert_eq!(controller.volume(), 0.0);
    assert!(recorder
        .snapshot()
        .contains(&RenderDirective::FadeAudioVolume { level: 0.0 }));
    assert_eq!(recorder.last(), Some(RenderDirective::ClearToBlack));

    // Everything after the black screen is ignored
    recorder.take();
    handle.lock(0).unwrap();
    handle.choose(0).unwrap();
    controller.step().await.unwrap();
    controller.step().await.unwrap();
    assert!(recorder.snapshot().is_empty());

    handle.quit().unwrap();
    assert!(controller.step().await.unwrap().is_break());
}

// =============================================================================
// Input hygiene
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_input_in_wrong_phase_is_ignored() {
    let (mut controller, handle, _recorder) = session(ExperienceConfig::default());
    controller.start();
    play_puzzle(&mut controller, &handle).await;

    // Interstitial: neither locks nor choices do anything
    handle.lock(0).unwrap();
    handle.choose(0).unwrap();
    handle.send(SessionEvent::Restart).unwrap();
    for _ in 0..3 {
        controller.step().await.unwrap();
    }
    assert_eq!(controller.phase(), Phase::Interstitial);
    assert!(controller.dialogue().session().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_lost_puzzle_is_a_dead_end_until_restart() {
    let (mut controller, handle, recorder) = session(ExperienceConfig::default());
    controller.start();

    // Start the clock with a miss, then let time run out
    let window = controller_window();
    let index = loop {
        if let Some(bar) = controller
            .puzzle()
            .bars()
            .iter()
            .find(|b| !b.in_window(&window))
        {
            break bar.id;
        }
        controller.step().await.unwrap();
    };
    handle.lock(index).unwrap();
    while recorder.count(|d| *d == RenderDirective::ShowFailModal) == 0 {
        controller.step().await.unwrap();
    }
    assert_eq!(controller.phase(), Phase::Puzzle);
    assert_eq!(controller.puzzle().remaining(), 0.0);

    // Nothing moves while the modal is up
    let frozen: Vec<f64> = controller.puzzle().bars().iter().map(|b| b.position).collect();
    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.lock(0).unwrap();
    controller.step().await.unwrap();
    let still: Vec<f64> = controller.puzzle().bars().iter().map(|b| b.position).collect();
    assert_eq!(frozen, still);

    handle.restart().unwrap();
    while !controller.puzzle().is_active() {
        controller.step().await.unwrap();
    }
    assert_eq!(controller.puzzle().locked_count(), 0);
    assert!(!controller.puzzle().is_started());
}

// =============================================================================
// Configuration feeding the engines
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_configured_timings_shorten_the_interstitial() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[puzzle]
columns = 2

[interstitial]
handoff_delay_ms = 100
transition_ms = 200
ambient_wait_secs = 1
"#
    )
    .unwrap();

    let mut config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
    apply_env_config(&mut config, |_| None);
    assert_eq!(config.puzzle.columns, 2);

    let (mut controller, handle, _recorder) = session(config);
    controller.start();
    assert_eq!(controller.puzzle().bars().len(), 2);

    play_puzzle(&mut controller, &handle).await;
    let won_at = Instant::now();
    while controller.phase() != Phase::Dialogue {
        controller.step().await.unwrap();
    }
    assert_eq!(won_at.elapsed(), Duration::from_millis(1300));
}

#[tokio::test(start_paused = true)]
async fn test_custom_content_file_drives_the_walk() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[[node]]
id = "intro"
text = "Ei."
[[node.choices]]
label = "Fim"
action = "destroy"
style = "destroy"
"#
    )
    .unwrap();

    let graph = DialogueGraph::load(Some(file.path())).unwrap();
    assert_eq!(graph.len(), 1);

    let recorder = Arc::new(RecordingRenderer::new());
    let mut config = ExperienceConfig::default();
    config.interstitial.ambient_wait = Duration::from_millis(10);
    let (mut controller, handle) =
        SessionController::with_seed(config, Arc::new(graph), recorder.clone(), 5);
    controller.start();
    play_puzzle(&mut controller, &handle).await;

    while controller.phase() != Phase::Dialogue {
        controller.step().await.unwrap();
    }
    let visited = play_dialogue(&mut controller, &handle).await;
    assert_eq!(visited, vec![NodeId::Entry]);
    assert_eq!(controller.phase(), Phase::Destruction);
    assert_eq!(recorder.revealed_text(), "Ei.");
}

//! Integration Tests for TUI + Session
//!
//! These tests run a real `App` (session controller task included) under
//! paused tokio time and check what reaches the screen:
//!
//! 1. **Startup**: the puzzle screen draws columns, timer and hints
//! 2. **Input**: keys travel through the session and come back as directives
//! 3. **Failure**: the modal appears and `r` brings the puzzle back
//! 4. **Quit**: Esc stops the app

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::Terminal;

use nulo_core::{DialogueGraph, ExperienceConfig, Phase};
use nulo_tui::App;

// ============================================================================
// Helpers
// ============================================================================

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn app_with(config: ExperienceConfig) -> App {
    App::new(config, DialogueGraph::builtin().unwrap())
}

/// Let the session task run for `ms` of paused time, then drain directives
async fn settle(app: &mut App, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    app.process_directives();
    app.update(Instant::now());
}

fn screen_text(buf: &Buffer) -> String {
    let mut text = String::new();
    for y in 0..buf.area.height {
        for x in 0..buf.area.width {
            text.push_str(buf[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

fn draw(app: &mut App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
    terminal.draw(|frame| app.draw(frame)).unwrap();
    screen_text(terminal.backend().buffer())
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_startup_draws_puzzle() {
    let mut app = app_with(ExperienceConfig::default());
    settle(&mut app, 20).await;

    let display = app.display();
    assert_eq!(display.phase, Phase::Puzzle);
    assert_eq!(display.bars.len(), 5);
    assert_eq!(display.timer, "20.00");
    assert_eq!(display.progress, 0.0);

    let screen = draw(&mut app);
    assert!(screen.contains("PROTOCOLO DE SINCRONIZAÇÃO"));
    assert!(screen.contains("20.00"));
    for n in 1..=5 {
        assert!(screen.contains(&n.to_string()));
    }
}

#[tokio::test(start_paused = true)]
async fn test_bars_move_between_frames() {
    let mut app = app_with(ExperienceConfig::default());
    settle(&mut app, 20).await;
    let before: Vec<f64> = app.display().bars.iter().map(|b| b.percent).collect();

    settle(&mut app, 200).await;
    let after: Vec<f64> = app.display().bars.iter().map(|b| b.percent).collect();

    assert_ne!(before, after);
}

// ============================================================================
// Input
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_lock_key_reaches_session() {
    let mut app = app_with(ExperienceConfig::default());
    settle(&mut app, 20).await;

    app.handle_key(press(KeyCode::Char('1')));
    settle(&mut app, 20).await;

    // A lock attempt either syncs the node or costs time; both leave a log line
    let display = app.display();
    assert_eq!(display.log.len(), 1);
    let line = &display.log[0];
    if display.bars[0].locked {
        assert_eq!(line, "> NÓ 1 SINCRONIZADO.");
        assert_eq!(display.progress, 20.0);
    } else {
        assert!(line.contains("ERRO"));
        assert!(display.timer.starts_with("17.") || display.timer.starts_with("18."));
    }
}

#[tokio::test(start_paused = true)]
async fn test_arrow_keys_move_cursor() {
    let mut app = app_with(ExperienceConfig::default());
    settle(&mut app, 20).await;

    app.handle_key(press(KeyCode::Left));
    assert_eq!(app.display().selected_bar, 4);
    app.handle_key(press(KeyCode::Right));
    app.handle_key(press(KeyCode::Right));
    assert_eq!(app.display().selected_bar, 1);
}

// ============================================================================
// Failure
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_failure_modal_and_restart() {
    let mut config = ExperienceConfig::default();
    config.puzzle.time_limit = 1.0;
    let mut app = app_with(config);
    settle(&mut app, 20).await;

    // Start the clock, then outlast it
    app.handle_key(press(KeyCode::Char('1')));
    app.handle_key(press(KeyCode::Char('2')));
    settle(&mut app, 3000).await;

    assert!(app.display().fail_modal);
    assert_eq!(app.display().timer, "0.00");
    assert!(draw(&mut app).contains("SINCRONIZAÇÃO FALHOU"));

    // Locks are swallowed while the modal is up
    app.handle_key(press(KeyCode::Char('3')));
    app.handle_key(press(KeyCode::Char('r')));
    settle(&mut app, 20).await;

    let display = app.display();
    assert!(!display.fail_modal);
    assert!(display.log.is_empty());
    assert_eq!(display.bars.len(), 5);
    assert!(display.bars.iter().all(|b| !b.locked));
    assert_eq!(display.timer, "1.00");
}

// ============================================================================
// Quit
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_escape_stops_app() {
    let mut app = app_with(ExperienceConfig::default());
    settle(&mut app, 20).await;
    assert!(app.is_running());

    app.handle_key(press(KeyCode::Esc));
    assert!(!app.is_running());
    assert_eq!(app.goodbye(), None);
}

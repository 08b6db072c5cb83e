//! Nulo TUI Entry Point
//!
//! Runs the Nulo experience full-screen in the terminal.
//!
//! Usage:
//!   nulo-tui
//!
//! Environment:
//!   NULO_CONFIG   Config file (default: ~/.config/nulo/config.toml)
//!   NULO_CONTENT  Dialogue content file (default: built-in dialogue)
//!   RUST_LOG      Log filter; logs go to stderr (e.g. `2>nulo.log`)

use std::io;
use std::panic;

use anyhow::Context;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nulo_core::{load_config, DialogueGraph};
use nulo_tui::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: nulo-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means:");
        eprintln!("  • Running in a non-interactive environment (CI, container)");
        eprintln!("  • SSH without -t flag");
        eprintln!("  • Piped stdin/stdout");
        std::process::exit(1);
    }

    // Configuration and content errors surface before the screen switches
    let config = load_config().context("loading configuration")?;
    tracing::info!(source = %config.source(), "Configuration loaded");
    let graph = DialogueGraph::load(config.dialogue.content_path.as_deref())
        .context("loading dialogue content")?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;
    terminal.clear()?;

    // Run the app
    let mut app = App::new(config, graph);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(goodbye) = app.goodbye() {
        println!("\n{goodbye}\n");
    }

    // Propagate any errors
    result
}

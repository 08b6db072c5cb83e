//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, resize)
//! - SessionHandle for player input
//! - DisplayState fed by RenderDirectives
//!
//! # Architecture
//!
//! The session controller runs in its own task and owns every rule and
//! timing. The App:
//! 1. Maps key presses to intents and sends them through the SessionHandle
//! 2. Drains RenderDirectives into the DisplayState
//! 3. Ages display deadlines (flashes, fades) each frame
//! 4. Renders based on DisplayState

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyEvent};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use unicode_width::UnicodeWidthStr;

use nulo_core::dialogue::content::DESTROY_STYLE;
use nulo_core::{
    ChannelRenderer, DialogueGraph, ExperienceConfig, LockWindow, Phase, RenderDirective,
    SessionController, SessionError, SessionHandle,
};

use crate::display::{DisplayState, Speck};
use crate::input::{map_key, Intent};
use crate::theme;
use crate::widgets::{SyncTrack, TextBlock, TextBlockState};

/// Frame tick
const FRAME: Duration = Duration::from_millis(16);

/// Track column width, borders included
const TRACK_WIDTH: u16 = 5;

/// Widest the dialogue panel gets
const DIALOGUE_WIDTH: u16 = 72;

/// Printed after the black screen
const FAREWELL: &str = "> CONEXÃO ENCERRADA.";

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,
    /// Message to print after the TUI closes
    goodbye_message: Option<String>,

    // === Session ===
    /// Input side of the session
    session: SessionHandle,
    /// Directives from the session's renderer
    directives: UnboundedReceiver<RenderDirective>,
    /// The running session controller
    session_task: Option<JoinHandle<Result<(), SessionError>>>,
    /// Lock window, for drawing the band
    window: LockWindow,

    // === Display ===
    /// Display state derived from directives
    display: DisplayState,
    /// System log scroll
    log_state: TextBlockState,
    /// Dialogue text scroll
    dialogue_state: TextBlockState,
}

impl App {
    /// Create the app and start the session controller task
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ExperienceConfig, graph: DialogueGraph) -> Self {
        let window = config.puzzle.lock_window;
        let (renderer, directives) = ChannelRenderer::new();
        let (controller, session) =
            SessionController::new(config, Arc::new(graph), Arc::new(renderer));
        let session_task = tokio::spawn(controller.run());

        Self {
            running: true,
            goodbye_message: None,
            session,
            directives,
            session_task: Some(session_task),
            window,
            display: DisplayState::new(),
            log_state: TextBlockState::following(),
            dialogue_state: TextBlockState::following(),
        }
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();

        terminal.draw(|frame| self.draw(frame))?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events first so input never waits behind a frame
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) => self.handle_key(key),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => tracing::warn!("Terminal event error: {}", e),
                        None => self.running = false,
                    }
                }

                directive = self.directives.recv() => {
                    match directive {
                        Some(directive) => self.display.apply_directive(directive),
                        None => {
                            tracing::warn!("Session renderer closed");
                            self.running = false;
                        }
                    }
                }

                _ = tokio::time::sleep(FRAME) => {}
            }

            self.process_directives();
            self.update(Instant::now());
            terminal.draw(|frame| self.draw(frame))?;
        }

        self.shutdown().await;
        Ok(())
    }

    /// Drain every pending directive into the display state
    pub fn process_directives(&mut self) {
        while let Ok(directive) = self.directives.try_recv() {
            self.display.apply_directive(directive);
        }
    }

    /// Age display deadlines
    pub fn update(&mut self, now: Instant) {
        self.display.update(now);
        if self.display.black && self.goodbye_message.is_none() {
            self.goodbye_message = Some(FAREWELL.to_string());
        }
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        let Some(intent) = map_key(key, &self.display) else {
            return;
        };
        tracing::debug!(?intent, phase = %self.display.phase, "Key intent");

        let sent = match intent {
            Intent::Quit => {
                self.running = false;
                Ok(())
            }
            Intent::Lock(index) => {
                self.display.selected_bar = index.min(self.display.bars.len().saturating_sub(1));
                self.session.lock(index)
            }
            Intent::MoveBar(delta) => {
                self.display.move_bar_selection(delta);
                Ok(())
            }
            Intent::Choose(index) => self.session.choose(index),
            Intent::MoveChoice(delta) => {
                self.display.move_choice_selection(delta);
                Ok(())
            }
            Intent::Restart => self.session.restart(),
        };

        if let Err(e) = sent {
            tracing::warn!("Session unavailable: {}", e);
            self.running = false;
        }
    }

    /// Stop the session task and wait for it
    async fn shutdown(&mut self) {
        // Already gone if the session ended on its own
        let _ = self.session.quit();
        if let Some(task) = self.session_task.take() {
            match task.await {
                Ok(Ok(())) => tracing::debug!("Session stopped"),
                Ok(Err(e)) => tracing::warn!("Session ended with error: {}", e),
                Err(e) => tracing::warn!("Session task failed: {}", e),
            }
        }
    }

    /// Is the app still running?
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current display state
    #[must_use]
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Get the goodbye message for display after TUI closes
    #[must_use]
    pub fn goodbye(&self) -> Option<&str> {
        self.goodbye_message.as_deref()
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render the whole screen
    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let now = Instant::now();

        let background = if self.display.cover && !self.display.black {
            theme::COVER_WHITE
        } else {
            theme::VOID_BLACK
        };
        frame.render_widget(Block::default().style(Style::default().bg(background)), area);

        if self.display.black || self.display.cover {
            return;
        }

        render_specks(frame, area, &self.display.particles, theme::PARTICLE);

        match self.display.phase {
            Phase::Puzzle => self.render_puzzle(frame, area, now),
            Phase::Interstitial => render_status(frame, area, &self.display, "..."),
            Phase::Dialogue | Phase::Destruction => self.render_dialogue(frame, area, now),
        }

        render_specks(frame, area, &self.display.blobs, theme::BLOB_RED);
    }

    fn render_puzzle(&mut self, frame: &mut Frame, area: Rect, now: Instant) {
        let [header, gauge, tracks, log, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(6),
            Constraint::Length(1),
        ])
        .areas(area);

        // Header: title left, timer right
        frame.render_widget(
            Paragraph::new(" PROTOCOLO DE SINCRONIZAÇÃO")
                .style(Style::default().fg(theme::SIGNAL_CYAN).add_modifier(Modifier::BOLD)),
            header,
        );
        let timer_style = if self.display.timer_flashing(now) {
            Style::default()
                .fg(theme::ERROR_RED)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(theme::TIMER_WHITE)
        };
        frame.render_widget(
            Paragraph::new(format!("{} ", self.display.timer))
                .style(timer_style)
                .alignment(Alignment::Right),
            header,
        );

        frame.render_widget(
            Gauge::default()
                .gauge_style(Style::default().fg(theme::SYNC_GREEN).bg(theme::TRACK_GRAY))
                .ratio((self.display.progress / 100.0).clamp(0.0, 1.0))
                .label(format!("{:.0}%", self.display.progress)),
            gauge,
        );

        // Tracks, centered
        let count = self.display.bars.len() as u16;
        if count > 0 {
            let total = count * (TRACK_WIDTH + 1);
            let x = tracks.x + tracks.width.saturating_sub(total) / 2;
            for (i, bar) in self.display.bars.iter().enumerate() {
                let column = Rect::new(x + i as u16 * (TRACK_WIDTH + 1), tracks.y, TRACK_WIDTH, tracks.height)
                    .intersection(tracks);
                frame.render_widget(
                    SyncTrack::new(bar, i, self.window).selected(i == self.display.selected_bar),
                    column,
                );
            }
        }

        let log_lines = self.display.log.iter().map(|line| {
            let color = if line.contains("ERRO") {
                theme::ERROR_RED
            } else {
                theme::SYNC_GREEN
            };
            (line.as_str(), Style::default().fg(color))
        });
        frame.render_stateful_widget(
            TextBlock::from_lines(log_lines),
            log.inner(Margin::new(1, 0)),
            &mut self.log_state,
        );

        render_status(
            frame,
            status,
            &self.display,
            "1-9/Espaço: travar | ←/→: coluna | Esc: sair",
        );

        if self.display.fail_modal {
            render_fail_modal(frame, area);
        }
    }

    fn render_dialogue(&mut self, frame: &mut Frame, area: Rect, now: Instant) {
        let width = DIALOGUE_WIDTH.min(area.width.saturating_sub(4));
        let panel = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + 1,
            width,
            area.height.saturating_sub(3),
        );

        let choice_count = self.display.choices.as_ref().map_or(0, |c| c.items.len()) as u16;
        let [text_area, choices_area] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(choice_count + 1)]).areas(panel);

        let text_style = if self.display.critical {
            Style::default()
                .fg(theme::CRITICAL_RED)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme::TEXT)
        };
        let mut lines: Vec<(&str, Style)> = self
            .display
            .dialogue_text
            .lines()
            .map(|line| (line, text_style))
            .collect();
        if let Some(decoration) = &self.display.decoration {
            lines.push((decoration.as_str(), Style::default().fg(theme::GLITCH_MAGENTA)));
        }
        frame.render_stateful_widget(TextBlock::from_lines(lines), text_area, &mut self.dialogue_state);

        if let Some(choices) = &self.display.choices {
            let opacity = choices.opacity(now);
            for (i, choice) in choices.items.iter().enumerate() {
                let base = if choice.style.as_deref() == Some(DESTROY_STYLE) {
                    theme::DESTROY_ORANGE
                } else {
                    theme::SIGNAL_CYAN
                };
                let mut style = Style::default().fg(theme::blend(theme::VOID_BLACK, base, opacity));
                if i == self.display.selected_choice && choices.settled(now) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                let y = choices_area.y + 1 + i as u16;
                if y < choices_area.bottom() {
                    let label = format!("[{}] {}", i + 1, choice.label);
                    frame.buffer_mut().set_stringn(
                        choices_area.x,
                        y,
                        &label,
                        choices_area.width as usize,
                        style,
                    );
                }
            }
        }

        let bottom = Rect::new(area.x, area.bottom().saturating_sub(1), area.width, 1);
        render_status(frame, bottom, &self.display, "↑/↓ + Enter ou 1-9: escolher | Esc: sair");
    }
}

/// Status line: hint on the left, ambient volume on the right
fn render_status(frame: &mut Frame, area: Rect, display: &DisplayState, hint: &str) {
    let area = Rect::new(area.x, area.bottom().saturating_sub(1), area.width, 1);
    let dim = Style::default().fg(theme::DIM_GRAY);
    frame.render_widget(Paragraph::new(format!(" {hint}")).style(dim), area);

    if let Some(volume) = display.volume {
        let filled = (volume.clamp(0.0, 1.0) * 10.0).round() as usize;
        let meter = format!("♪ {}{} ", "▮".repeat(filled), "▯".repeat(10 - filled));
        let x = area.right().saturating_sub(meter.width() as u16);
        frame.buffer_mut().set_string(x, area.y, &meter, dim);
    }
}

/// Relative-position glyphs scattered over `area`
fn render_specks(frame: &mut Frame, area: Rect, specks: &[Speck], color: Color) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let buf = frame.buffer_mut();
    for speck in specks {
        let x = area.x + ((speck.x * f32::from(area.width)) as u16).min(area.width - 1);
        let y = area.y + ((speck.y * f32::from(area.height)) as u16).min(area.height - 1);
        buf[(x, y)]
            .set_char(speck.glyph)
            .set_style(Style::default().fg(color));
    }
}

fn render_fail_modal(frame: &mut Frame, area: Rect) {
    let width = 34.min(area.width);
    let height = 5.min(area.height);
    let modal = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );
    let text = vec![
        Line::from(Span::styled(
            "SINCRONIZAÇÃO FALHOU",
            Style::default()
                .fg(theme::ERROR_RED)
                .add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "[R] tentar novamente",
            Style::default().fg(theme::TIMER_WHITE),
        )),
    ];
    frame.render_widget(Clear, modal);
    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(theme::ERROR_RED))
                .style(Style::default().bg(theme::VOID_BLACK)),
        ),
        modal,
    );
}

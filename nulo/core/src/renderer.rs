//! Renderer Seam
//!
//! The engines talk to presentation only through [`Renderer`]. A renderer
//! implements a single required method, [`Renderer::dispatch`]; the named
//! operations are provided methods that build the matching
//! [`RenderDirective`].
//!
//! Two implementations ship with the core:
//!
//! - [`ChannelRenderer`] forwards directives over an unbounded channel to a
//!   surface running elsewhere (the TUI uses this).
//! - [`RecordingRenderer`] keeps every directive in memory for assertions and
//!   headless runs.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::messages::{ChoiceView, Phase, RenderDirective};

/// Sink for render directives
///
/// Implementations must not block: the session actor calls them inline.
pub trait Renderer: Send + Sync {
    /// Deliver one directive
    fn dispatch(&self, directive: RenderDirective);

    /// Move a bar's block to `percent` of its track
    fn render_bar_position(&self, index: usize, percent: f64) {
        self.dispatch(RenderDirective::RenderBarPosition { index, percent });
    }

    /// Show a bar as locked
    fn set_locked_visual(&self, index: usize) {
        self.dispatch(RenderDirective::SetLockedVisual { index });
    }

    /// Update the progress meter
    fn set_progress(&self, percent: f64) {
        self.dispatch(RenderDirective::SetProgress { percent });
    }

    /// Append a line to the system log
    fn append_log(&self, line: String) {
        self.dispatch(RenderDirective::AppendLog { line });
    }

    /// Flash the timer as an error
    fn flash_timer_error(&self, duration: Duration) {
        self.dispatch(RenderDirective::FlashTimerError { duration });
    }

    /// Replace the timer text
    fn set_timer_display(&self, text: String) {
        self.dispatch(RenderDirective::SetTimerDisplay { text });
    }

    /// Show the failure modal
    fn show_fail_modal(&self) {
        self.dispatch(RenderDirective::ShowFailModal);
    }

    /// Switch the visible screen
    fn transition_to_phase(&self, phase: Phase) {
        self.dispatch(RenderDirective::TransitionToPhase { phase });
    }

    /// Start the ambient track
    fn play_ambient_audio(&self, volume: f32) {
        self.dispatch(RenderDirective::PlayAmbientAudio { volume });
    }

    /// Spawn ambient particles
    fn spawn_ambient_particles(&self, count: usize) {
        self.dispatch(RenderDirective::SpawnAmbientParticles { count });
    }

    /// Empty the dialogue area
    fn clear_dialogue(&self) {
        self.dispatch(RenderDirective::ClearDialogue);
    }

    /// Switch to critical-error styling
    fn raise_critical_alert(&self) {
        self.dispatch(RenderDirective::RaiseCriticalAlert);
    }

    /// Append one revealed character
    fn reveal_text(&self, ch: char) {
        self.dispatch(RenderDirective::RevealText { ch });
    }

    /// Replace the decoration text
    fn set_decoration_text(&self, text: String) {
        self.dispatch(RenderDirective::SetDecorationText { text });
    }

    /// Show the choice list
    fn show_choices(&self, choices: Vec<ChoiceView>, fade_in: Duration) {
        self.dispatch(RenderDirective::ShowChoices { choices, fade_in });
    }

    /// Remove the choice list
    fn dismiss_choices(&self, fade_out: Duration) {
        self.dispatch(RenderDirective::DismissChoices { fade_out });
    }

    /// Spawn one destruction effect
    fn spawn_destruction_effect(&self) {
        self.dispatch(RenderDirective::SpawnDestructionEffect);
    }

    /// Set the ambient volume
    fn fade_audio_volume(&self, level: f32) {
        self.dispatch(RenderDirective::FadeAudioVolume { level });
    }

    /// Cover the screen
    fn show_final_cover(&self) {
        self.dispatch(RenderDirective::ShowFinalCover);
    }

    /// Clear to black
    fn clear_to_black(&self) {
        self.dispatch(RenderDirective::ClearToBlack);
    }
}

/// Forwards directives to a surface over an unbounded channel
#[derive(Clone, Debug)]
pub struct ChannelRenderer {
    tx: mpsc::UnboundedSender<RenderDirective>,
}

impl ChannelRenderer {
    /// Create a renderer and the receiving end for the surface
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RenderDirective>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Renderer for ChannelRenderer {
    fn dispatch(&self, directive: RenderDirective) {
        if let Err(err) = self.tx.send(directive) {
            // Surface is gone; nothing left to draw on
            tracing::trace!(kind = err.0.kind(), "Dropping directive, surface disconnected");
        }
    }
}

/// Keeps every directive in memory
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    directives: Mutex<Vec<RenderDirective>>,
}

impl RecordingRenderer {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    #[must_use]
    pub fn snapshot(&self) -> Vec<RenderDirective> {
        self.directives.lock().clone()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<RenderDirective> {
        std::mem::take(&mut *self.directives.lock())
    }

    /// Number of recorded directives matching `pred`
    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&RenderDirective) -> bool,
    {
        self.directives.lock().iter().filter(|d| pred(d)).count()
    }

    /// All appended log lines, in order
    #[must_use]
    pub fn log_lines(&self) -> Vec<String> {
        self.directives
            .lock()
            .iter()
            .filter_map(|d| match d {
                RenderDirective::AppendLog { line } => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    /// Text revealed so far, concatenated
    #[must_use]
    pub fn revealed_text(&self) -> String {
        self.directives
            .lock()
            .iter()
            .filter_map(|d| match d {
                RenderDirective::RevealText { ch } => Some(*ch),
                _ => None,
            })
            .collect()
    }

    /// Most recent directive, if any
    #[must_use]
    pub fn last(&self) -> Option<RenderDirective> {
        self.directives.lock().last().cloned()
    }
}

impl Renderer for RecordingRenderer {
    fn dispatch(&self, directive: RenderDirective) {
        self.directives.lock().push(directive);
    }
}

//! Render Directives
//!
//! Messages sent from the core to a rendering surface. Every presentational
//! effect the engines want is one [`RenderDirective`]. Directives are
//! fire-and-forget: the core never waits for them and never reads anything
//! back, so a surface is free to render them coarsely or not at all.
//!
//! Durations carried by directives are hints for the surface's own
//! animations. The core keeps its own timing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level phases of the experience
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Synchronization puzzle
    #[default]
    Puzzle,
    /// Wait between the puzzle and the dialogue
    Interstitial,
    /// Branching dialogue
    Dialogue,
    /// Closing sequence (terminal)
    Destruction,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Puzzle => write!(f, "puzzle"),
            Self::Interstitial => write!(f, "interstitial"),
            Self::Dialogue => write!(f, "dialogue"),
            Self::Destruction => write!(f, "destruction"),
        }
    }
}

/// A choice as presented to the player
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceView {
    /// Button label
    pub label: String,
    /// Optional presentation tag (e.g. `"destroy"`)
    pub style: Option<String>,
}

/// Directives from the core to a rendering surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RenderDirective {
    // ============================================
    // Puzzle
    // ============================================
    /// Move a bar's block to `percent` of its track
    RenderBarPosition {
        /// Bar index
        index: usize,
        /// Position, 0-100
        percent: f64,
    },

    /// Show a bar as locked
    SetLockedVisual {
        /// Bar index
        index: usize,
    },

    /// Update the progress meter
    SetProgress {
        /// Fraction of locked bars, 0-100
        percent: f64,
    },

    /// Append a line to the system log
    AppendLog {
        /// Log line
        line: String,
    },

    /// Flash the timer as an error for `duration`
    FlashTimerError {
        /// How long the flash lasts
        duration: Duration,
    },

    /// Replace the timer text
    SetTimerDisplay {
        /// Already formatted text (two decimals)
        text: String,
    },

    /// Show the failure modal (restart is external)
    ShowFailModal,

    // ============================================
    // Phase Transitions
    // ============================================
    /// Switch the visible screen to `phase`
    TransitionToPhase {
        /// Target phase
        phase: Phase,
    },

    /// Start the ambient audio track at `volume`
    PlayAmbientAudio {
        /// Volume, 0.0-1.0
        volume: f32,
    },

    /// Spawn decorative ambient particles
    SpawnAmbientParticles {
        /// Particle count
        count: usize,
    },

    // ============================================
    // Dialogue
    // ============================================
    /// Empty the text area and choice list for a new node
    ClearDialogue,

    /// Switch to critical-error styling
    RaiseCriticalAlert,

    /// Append one revealed character
    RevealText {
        /// The character
        ch: char,
    },

    /// Replace the decoration text
    SetDecorationText {
        /// New decoration
        text: String,
    },

    /// Show the choice list
    ShowChoices {
        /// Choices in order
        choices: Vec<ChoiceView>,
        /// Fade-in hint
        fade_in: Duration,
    },

    /// Remove the choice list
    DismissChoices {
        /// Fade-out hint
        fade_out: Duration,
    },

    // ============================================
    // Destruction
    // ============================================
    /// Spawn one destruction effect
    SpawnDestructionEffect,

    /// Set the ambient audio volume
    FadeAudioVolume {
        /// Volume, 0.0-1.0
        level: f32,
    },

    /// Cover the whole screen
    ShowFinalCover,

    /// Clear the screen to black
    ClearToBlack,
}

impl RenderDirective {
    /// Short name for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RenderBarPosition { .. } => "render_bar_position",
            Self::SetLockedVisual { .. } => "set_locked_visual",
            Self::SetProgress { .. } => "set_progress",
            Self::AppendLog { .. } => "append_log",
            Self::FlashTimerError { .. } => "flash_timer_error",
            Self::SetTimerDisplay { .. } => "set_timer_display",
            Self::ShowFailModal => "show_fail_modal",
            Self::TransitionToPhase { .. } => "transition_to_phase",
            Self::PlayAmbientAudio { .. } => "play_ambient_audio",
            Self::SpawnAmbientParticles { .. } => "spawn_ambient_particles",
            Self::ClearDialogue => "clear_dialogue",
            Self::RaiseCriticalAlert => "raise_critical_alert",
            Self::RevealText { .. } => "reveal_text",
            Self::SetDecorationText { .. } => "set_decoration_text",
            Self::ShowChoices { .. } => "show_choices",
            Self::DismissChoices { .. } => "dismiss_choices",
            Self::SpawnDestructionEffect => "spawn_destruction_effect",
            Self::FadeAudioVolume { .. } => "fade_audio_volume",
            Self::ShowFinalCover => "show_final_cover",
            Self::ClearToBlack => "clear_to_black",
        }
    }
}

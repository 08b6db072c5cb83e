//! Session Events
//!
//! Everything that reaches the [`SessionController`](crate::session::SessionController)
//! arrives through one inbox as a [`SessionEvent`]: player input forwarded by a
//! surface, and ticks/cues posted by scheduler tasks.
//!
//! Surfaces only report what the player did. They never interpret it; the
//! controller decides what an input means in the current phase.
//!
//! Timer events carry the epoch of the owner that scheduled them. Owners bump
//! their epoch whenever they cancel their tasks, so an event that was already
//! queued when its task was cancelled is recognized as stale and dropped.

use serde::{Deserialize, Serialize};

/// Generation counter stamped on timer events
pub type Epoch = u64;

/// Events delivered to the session inbox
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    // ============================================
    // Player Input
    // ============================================
    /// Attempt to lock the bar at `index` (zero-based)
    LockAttempt {
        /// Bar index
        index: usize,
    },

    /// Pick the choice at `index` (zero-based) of the visible list
    Choose {
        /// Choice index
        index: usize,
    },

    /// Reinitialize the puzzle after a loss
    Restart,

    /// Stop the session loop
    Quit,

    // ============================================
    // Puzzle Drivers
    // ============================================
    /// Advance every unlocked bar by one step
    Frame {
        /// Puzzle epoch at scheduling time
        epoch: Epoch,
    },

    /// Advance the countdown by one fixed tick
    ClockTick {
        /// Puzzle epoch at scheduling time
        epoch: Epoch,
    },

    // ============================================
    // Dialogue Drivers
    // ============================================
    /// Reveal the next character of the current node
    RevealTick {
        /// Dialogue epoch at scheduling time
        epoch: Epoch,
    },

    /// Refresh the decoration text
    DecorationTick {
        /// Dialogue epoch at scheduling time
        epoch: Epoch,
    },

    // ============================================
    // Phase Cues
    // ============================================
    /// One-shot or periodic cue of a scripted phase sequence
    Cue {
        /// Phase epoch at scheduling time
        epoch: Epoch,
        /// What the cue triggers
        cue: Cue,
    },
}

impl SessionEvent {
    /// Whether the event was produced by a scheduler task
    #[must_use]
    pub fn is_timer(&self) -> bool {
        matches!(
            self,
            Self::Frame { .. }
                | Self::ClockTick { .. }
                | Self::RevealTick { .. }
                | Self::DecorationTick { .. }
                | Self::Cue { .. }
        )
    }
}

/// Scripted steps owned by the session controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cue {
    /// Step of the puzzle → dialogue interstitial
    Interstitial(InterstitialStage),
    /// Step of the closing sequence
    Destruction(DestructionStep),
}

/// Stages of the interstitial, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterstitialStage {
    /// Hand-off delay elapsed: start the screen transition and ambient audio
    Transition,
    /// Transition finished: ambient-only wait begins
    Ambient,
    /// Ambient wait finished: enter the dialogue at its entry node
    DialogueStart,
}

/// Steps of the destruction sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestructionStep {
    /// Spawn the n-th destruction effect
    Spawn(u32),
    /// Lower the ambient volume by one step
    FadeAudio,
    /// Show the full-screen cover
    Cover,
    /// Clear to black; the session is over
    Clear,
}

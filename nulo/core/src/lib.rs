//! Nulo Core - Headless engines for the Nulo experience
//!
//! A timed synchronization puzzle gates entry to a branching dialogue that
//! ends in a scripted destruction sequence. This crate holds every rule and
//! every timing of that experience, and nothing about how it looks.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Surfaces                              │
//! │        ┌──────────────┐            ┌─────────────────┐        │
//! │        │     TUI      │            │    Headless     │        │
//! │        │  (ratatui)   │            │ (RecordingRenderer)      │
//! │        └──────┬───────┘            └────────┬────────┘        │
//! │               │ SessionHandle (input, up)   │                 │
//! │               │ RenderDirective (down)      │                 │
//! └───────────────┼─────────────────────────────┼─────────────────┘
//!                 │                             │
//! ┌───────────────┼─────────────────────────────┼─────────────────┐
//! │               ▼          NULO CORE          ▼                 │
//! │   ┌─────────────────────────────────────────────────────┐     │
//! │   │                SessionController (actor)            │     │
//! │   │  ┌──────────────┐  ┌────────────────┐  ┌──────────┐ │     │
//! │   │  │ PuzzleEngine │  │ DialogueEngine │  │  Cues    │ │     │
//! │   │  │ bars + clock │  │ graph + reveal │  │ per phase│ │     │
//! │   │  └──────────────┘  └────────────────┘  └──────────┘ │     │
//! │   └───────────────────────────▲─────────────────────────┘     │
//! │                               │ SessionEvent (ticks, cues)    │
//! │                        ┌──────┴──────┐                        │
//! │                        │  Scheduler  │                        │
//! │                        └─────────────┘                        │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use nulo_core::{load_config, ChannelRenderer, DialogueGraph, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let graph = Arc::new(DialogueGraph::load(config.dialogue.content_path.as_deref())?);
//!     let (renderer, mut directives) = ChannelRenderer::new();
//!
//!     let (controller, handle) = SessionController::new(config, graph, Arc::new(renderer));
//!     tokio::spawn(controller.run());
//!
//!     handle.lock(0)?;
//!     while let Some(directive) = directives.recv().await {
//!         // draw it
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`clock`]: passive countdown
//! - [`puzzle`]: sync bars and the puzzle engine
//! - [`dialogue`]: dialogue graph, built-in content and the dialogue engine
//! - [`session`]: phase sequencing actor
//! - [`scheduler`]: cancellable timer tasks (the only timer user)
//! - [`events`]: inbox events
//! - [`messages`]: render directives
//! - [`renderer`]: the renderer seam
//! - [`config`]: configuration loading
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod clock;
pub mod config;
pub mod dialogue;
pub mod events;
pub mod messages;
pub mod puzzle;
pub mod renderer;
pub mod scheduler;
pub mod session;

// Re-exports for convenience
pub use clock::{format_remaining, ClockState, CountdownClock, TimeChanged};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigSource,
    DestructionConfig, DialogueConfig, ExperienceConfig, ExperienceToml, InterstitialConfig,
    LockWindow, PuzzleConfig, SpeedRange,
};
pub use dialogue::{
    ActionTag, Choice, ChoiceOutcome, ChoiceTarget, DialogueEngine, DialogueError, DialogueGraph,
    DialogueNode, DialogueSession, GraphError, NodeId,
};
pub use events::{Cue, DestructionStep, Epoch, InterstitialStage, SessionEvent};
pub use messages::{ChoiceView, Phase, RenderDirective};
pub use puzzle::{
    Direction, IgnoreReason, LockOutcome, PuzzleEngine, PuzzleOutcome, PuzzleState, SyncBar,
};
pub use renderer::{ChannelRenderer, RecordingRenderer, Renderer};
pub use scheduler::{Scheduler, TaskGroup, TaskHandle, TaskSlot};
pub use session::{SessionController, SessionError, SessionHandle};

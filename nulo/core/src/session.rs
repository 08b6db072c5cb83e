//! Session Controller
//!
//! Owns both engines and sequences the four phases:
//!
//! ```text
//!   Puzzle ──won──▶ Interstitial ──cues──▶ Dialogue ──terminal action──▶ Destruction
//!     │  ▲
//!     └──┘ lost: fail modal, waits for Restart
//! ```
//!
//! The controller is a single-writer actor: player input (through a
//! [`SessionHandle`]) and scheduler ticks all arrive in one inbox and are
//! handled one at a time, so a lock attempt can never interleave with a
//! frame advance.
//!
//! Scripted sequences (interstitial stages, destruction steps) are one-shot
//! cues owned by the controller and grouped per phase. Entering a phase
//! cancels the group and bumps the phase epoch, so cues already queued by the
//! previous phase are dropped on arrival.

use std::ops::ControlFlow;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::ExperienceConfig;
use crate::dialogue::{ActionTag, ChoiceOutcome, DialogueEngine, DialogueError, DialogueGraph, NodeId};
use crate::events::{Cue, DestructionStep, Epoch, InterstitialStage, SessionEvent};
use crate::messages::Phase;
use crate::puzzle::{PuzzleEngine, PuzzleOutcome, PuzzleState};
use crate::renderer::Renderer;
use crate::scheduler::{Scheduler, TaskGroup, TaskSlot};

/// Errors surfaced by the session loop
#[derive(Debug, Error)]
pub enum SessionError {
    /// Dialogue walk failed
    #[error("dialogue error: {0}")]
    Dialogue(#[from] DialogueError),

    /// The session loop is gone
    #[error("session is closed")]
    Closed,
}

/// Cloneable input side of a session
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Forward any event to the session
    ///
    /// # Errors
    ///
    /// [`SessionError::Closed`] once the controller has been dropped.
    pub fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.tx.send(event).map_err(|_| SessionError::Closed)
    }

    /// Try to lock bar `index`
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn lock(&self, index: usize) -> Result<(), SessionError> {
        self.send(SessionEvent::LockAttempt { index })
    }

    /// Pick choice `index`
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn choose(&self, index: usize) -> Result<(), SessionError> {
        self.send(SessionEvent::Choose { index })
    }

    /// Restart a lost puzzle
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn restart(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Restart)
    }

    /// Stop the session loop
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn quit(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Quit)
    }
}

/// The whole experience, driven by one inbox
pub struct SessionController {
    config: ExperienceConfig,
    phase: Phase,
    puzzle: PuzzleEngine,
    dialogue: DialogueEngine,
    renderer: Arc<dyn Renderer>,
    scheduler: Scheduler,
    inbox: mpsc::UnboundedReceiver<SessionEvent>,
    phase_tasks: TaskGroup,
    audio_fade: TaskSlot,
    phase_epoch: Epoch,
    volume: f32,
    fade_step: f32,
    started: bool,
    finished: bool,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase)
            .field("phase_epoch", &self.phase_epoch)
            .field("puzzle", &self.puzzle)
            .field("dialogue", &self.dialogue)
            .field("volume", &self.volume)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller and the handle surfaces use to feed it
    #[must_use]
    pub fn new(
        config: ExperienceConfig,
        graph: Arc<DialogueGraph>,
        renderer: Arc<dyn Renderer>,
    ) -> (Self, SessionHandle) {
        Self::build(
            config,
            graph,
            renderer,
            StdRng::from_entropy(),
            StdRng::from_entropy(),
        )
    }

    /// Like [`Self::new`] with deterministic randomness
    #[must_use]
    pub fn with_seed(
        config: ExperienceConfig,
        graph: Arc<DialogueGraph>,
        renderer: Arc<dyn Renderer>,
        seed: u64,
    ) -> (Self, SessionHandle) {
        Self::build(
            config,
            graph,
            renderer,
            StdRng::seed_from_u64(seed),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        )
    }

    fn build(
        config: ExperienceConfig,
        graph: Arc<DialogueGraph>,
        renderer: Arc<dyn Renderer>,
        puzzle_rng: StdRng,
        dialogue_rng: StdRng,
    ) -> (Self, SessionHandle) {
        let (scheduler, inbox) = Scheduler::channel();
        let handle = SessionHandle {
            tx: scheduler.sender(),
        };

        let puzzle = PuzzleEngine::with_rng(
            config.puzzle.clone(),
            renderer.clone(),
            scheduler.clone(),
            puzzle_rng,
        );
        let dialogue = DialogueEngine::with_rng(
            graph,
            config.dialogue.clone(),
            renderer.clone(),
            scheduler.clone(),
            dialogue_rng,
        );

        let controller = Self {
            config,
            phase: Phase::Puzzle,
            puzzle,
            dialogue,
            renderer,
            scheduler,
            inbox,
            phase_tasks: TaskGroup::new(),
            audio_fade: TaskSlot::new(),
            phase_epoch: 0,
            volume: 0.0,
            fade_step: 0.0,
            started: false,
            finished: false,
        };
        (controller, handle)
    }

    /// Show the puzzle and start its frame driver. Runs once.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.renderer.transition_to_phase(Phase::Puzzle);
        self.puzzle.start();
        tracing::info!("Session started");
    }

    /// Start, then handle events until `Quit` arrives
    ///
    /// # Errors
    ///
    /// Propagates the first [`SessionError`] raised by an event.
    pub async fn run(mut self) -> Result<(), SessionError> {
        self.start();
        while self.step().await?.is_continue() {}
        self.shutdown();
        Ok(())
    }

    /// Wait for the next event and handle it
    ///
    /// # Errors
    ///
    /// See [`Self::handle_event`].
    pub async fn step(&mut self) -> Result<ControlFlow<()>, SessionError> {
        match self.inbox.recv().await {
            Some(event) => self.handle_event(event),
            None => Ok(ControlFlow::Break(())),
        }
    }

    /// Handle one event
    ///
    /// # Errors
    ///
    /// [`SessionError::Dialogue`] if the dialogue walk hits a missing node.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<ControlFlow<()>, SessionError> {
        if event == SessionEvent::Quit {
            tracing::info!(phase = %self.phase, "Quit requested");
            return Ok(ControlFlow::Break(()));
        }
        if self.finished {
            if event.is_timer() {
                tracing::trace!(?event, "Session finished, dropping timer event");
            } else {
                tracing::debug!(?event, "Session finished, ignoring input");
            }
            return Ok(ControlFlow::Continue(()));
        }

        match event {
            SessionEvent::LockAttempt { index } => self.on_lock_attempt(index),
            SessionEvent::Choose { index } => self.on_choose(index)?,
            SessionEvent::Restart => self.on_restart(),
            SessionEvent::Frame { epoch } => self.puzzle.on_frame(epoch),
            SessionEvent::ClockTick { epoch } => {
                if let Some(outcome) = self.puzzle.on_clock_tick(epoch) {
                    self.on_puzzle_outcome(outcome);
                }
            }
            SessionEvent::RevealTick { epoch } => self.dialogue.on_reveal_tick(epoch),
            SessionEvent::DecorationTick { epoch } => self.dialogue.on_decoration_tick(epoch),
            SessionEvent::Cue { epoch, cue } => {
                if epoch == self.phase_epoch {
                    self.on_cue(cue)?;
                } else {
                    tracing::trace!(epoch, current = self.phase_epoch, ?cue, "Dropping stale cue");
                }
            }
            SessionEvent::Quit => {}
        }
        Ok(ControlFlow::Continue(()))
    }

    // ============================================
    // Input
    // ============================================

    fn on_lock_attempt(&mut self, index: usize) {
        if self.phase != Phase::Puzzle {
            tracing::warn!(index, phase = %self.phase, "Lock attempt outside the puzzle");
            return;
        }
        let outcome = self.puzzle.attempt_lock(index);
        if let Some(outcome) = outcome.outcome() {
            self.on_puzzle_outcome(outcome);
        }
    }

    fn on_choose(&mut self, index: usize) -> Result<(), SessionError> {
        if self.phase != Phase::Dialogue {
            tracing::warn!(index, phase = %self.phase, "Choice outside the dialogue");
            return Ok(());
        }
        match self.dialogue.choose(index)? {
            ChoiceOutcome::Terminal(action) => self.on_action(action),
            ChoiceOutcome::Advanced(next) => {
                tracing::debug!(node = %next, "Dialogue advanced");
            }
            ChoiceOutcome::Ignored => {}
        }
        Ok(())
    }

    fn on_restart(&mut self) {
        if self.phase != Phase::Puzzle || self.puzzle.state() != PuzzleState::Lost {
            tracing::warn!(phase = %self.phase, "Restart ignored, puzzle not lost");
            return;
        }
        tracing::info!("Restarting puzzle");
        self.renderer.transition_to_phase(Phase::Puzzle);
        self.puzzle.reinitialize();
    }

    // ============================================
    // Phase sequencing
    // ============================================

    fn enter_phase(&mut self, phase: Phase) {
        self.phase_tasks.cancel_all();
        self.audio_fade.cancel();
        self.phase_epoch += 1;
        tracing::info!(from = %self.phase, to = %phase, epoch = self.phase_epoch, "Phase change");
        self.phase = phase;
    }

    fn schedule_cue(&mut self, delay: std::time::Duration, cue: Cue) {
        let event = SessionEvent::Cue {
            epoch: self.phase_epoch,
            cue,
        };
        self.phase_tasks.push(self.scheduler.after(delay, event));
    }

    fn on_puzzle_outcome(&mut self, outcome: PuzzleOutcome) {
        match outcome {
            PuzzleOutcome::Won => {
                self.enter_phase(Phase::Interstitial);
                self.schedule_cue(
                    self.config.interstitial.handoff_delay,
                    Cue::Interstitial(InterstitialStage::Transition),
                );
            }
            PuzzleOutcome::Lost => {
                self.renderer.show_fail_modal();
            }
        }
    }

    fn on_action(&mut self, action: ActionTag) {
        match action {
            ActionTag::Destroy => self.begin_destruction(),
        }
    }

    fn on_cue(&mut self, cue: Cue) -> Result<(), SessionError> {
        match cue {
            Cue::Interstitial(stage) => self.on_interstitial(stage)?,
            Cue::Destruction(step) => self.on_destruction(step),
        }
        Ok(())
    }

    fn on_interstitial(&mut self, stage: InterstitialStage) -> Result<(), SessionError> {
        let timings = self.config.interstitial.clone();
        match stage {
            InterstitialStage::Transition => {
                self.volume = timings.audio_volume;
                self.renderer.play_ambient_audio(self.volume);
                self.renderer.transition_to_phase(Phase::Interstitial);
                self.schedule_cue(
                    timings.transition,
                    Cue::Interstitial(InterstitialStage::Ambient),
                );
            }
            InterstitialStage::Ambient => {
                self.renderer
                    .spawn_ambient_particles(timings.ambient_particles);
                self.schedule_cue(
                    timings.ambient_wait,
                    Cue::Interstitial(InterstitialStage::DialogueStart),
                );
            }
            InterstitialStage::DialogueStart => {
                self.enter_phase(Phase::Dialogue);
                self.renderer.transition_to_phase(Phase::Dialogue);
                self.dialogue.enter(NodeId::Entry)?;
            }
        }
        Ok(())
    }

    fn begin_destruction(&mut self) {
        self.dialogue.stop();
        self.enter_phase(Phase::Destruction);

        let timings = self.config.destruction.clone();
        self.renderer.transition_to_phase(Phase::Destruction);
        self.renderer.dismiss_choices(timings.choice_fade_out);

        for n in 0..timings.spawn_count {
            self.schedule_cue(
                timings.spawn_stagger * n,
                Cue::Destruction(DestructionStep::Spawn(n)),
            );
        }

        let steps = (timings.audio_fade.as_millis() / timings.audio_fade_step.as_millis().max(1))
            .max(1);
        self.fade_step = self.volume / steps as f32;
        self.audio_fade.replace(self.scheduler.every(
            timings.audio_fade_step,
            SessionEvent::Cue {
                epoch: self.phase_epoch,
                cue: Cue::Destruction(DestructionStep::FadeAudio),
            },
        ));

        self.schedule_cue(timings.cover_at, Cue::Destruction(DestructionStep::Cover));
        self.schedule_cue(timings.clear_at, Cue::Destruction(DestructionStep::Clear));
        tracing::info!(spawns = timings.spawn_count, "Destruction sequence scheduled");
    }

    fn on_destruction(&mut self, step: DestructionStep) {
        match step {
            DestructionStep::Spawn(n) => {
                tracing::trace!(n, "Destruction effect");
                self.renderer.spawn_destruction_effect();
            }
            DestructionStep::FadeAudio => {
                self.volume = (self.volume - self.fade_step).max(0.0);
                if self.volume < self.fade_step / 2.0 {
                    self.volume = 0.0;
                }
                self.renderer.fade_audio_volume(self.volume);
                if self.volume <= 0.0 {
                    self.audio_fade.cancel();
                }
            }
            DestructionStep::Cover => self.renderer.show_final_cover(),
            DestructionStep::Clear => {
                self.renderer.clear_to_black();
                self.shutdown();
                self.finished = true;
                tracing::info!("Session complete");
            }
        }
    }

    /// Cancel every outstanding task
    fn shutdown(&mut self) {
        self.phase_tasks.cancel_all();
        self.audio_fade.cancel();
        self.dialogue.stop();
    }

    // ============================================
    // Accessors
    // ============================================

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The puzzle engine
    #[must_use]
    pub fn puzzle(&self) -> &PuzzleEngine {
        &self.puzzle
    }

    /// The dialogue engine
    #[must_use]
    pub fn dialogue(&self) -> &DialogueEngine {
        &self.dialogue
    }

    /// Current ambient volume
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Whether the closing sequence has finished
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Cues scheduled for the current phase that have not fired yet
    #[must_use]
    pub fn pending_cues(&self) -> usize {
        self.phase_tasks.pending()
    }
}

//! Synchronization Puzzle
//!
//! N bars bounce along their tracks; the player locks each one while its
//! block sits inside the sync window before the countdown runs out.
//!
//! # State Machine
//!
//! ```text
//!   Idle ──start──▶ Active ──all bars locked──▶ Won
//!                     │
//!                     └────clock expired──────▶ Lost
//!
//!   reinitialize: any state ──▶ Active (fresh bars, full clock)
//! ```
//!
//! The engine owns two periodic drivers: a frame driver advancing the bars
//! and a clock driver ticking the countdown. The frame driver runs from the
//! moment the puzzle is (re)initialized; the clock driver starts with the
//! first lock attempt. Both are cancelled when the puzzle reaches a terminal
//! state.

mod bar;

pub use bar::{Direction, SyncBar};

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::clock::{format_remaining, CountdownClock};
use crate::config::PuzzleConfig;
use crate::events::{Epoch, SessionEvent};
use crate::renderer::Renderer;
use crate::scheduler::{Scheduler, TaskSlot};

/// Log line for a successfully locked bar (1-based)
#[must_use]
pub fn sync_log_line(bar_number: usize) -> String {
    format!("> NÓ {bar_number} SINCRONIZADO.")
}

/// Log line for a lock attempt outside the window
pub const SYNC_ERROR_LOG: &str = "> ERRO DE SINCRONIA. DADOS PERDIDOS.";

/// Log lines appended when every bar is locked
pub const VICTORY_LOG: [&str; 2] = ["> ENGRAMA ESTABILIZADO.", "> INICIANDO IMERSÃO NO VAZIO..."];

/// Lifecycle of the puzzle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuzzleState {
    /// Built but never started
    Idle,
    /// Accepting lock attempts
    Active,
    /// Every bar locked in time
    Won,
    /// Countdown expired first
    Lost,
}

impl PuzzleState {
    /// Whether only `reinitialize` can leave this state
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Terminal result reported to the session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PuzzleOutcome {
    /// Every bar locked
    Won,
    /// Time ran out
    Lost,
}

/// Why a lock attempt did nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Puzzle is not active (idle or finished)
    NotActive,
    /// No bar at that index
    InvalidIndex,
    /// Bar already locked
    AlreadyLocked,
}

/// Result of [`PuzzleEngine::attempt_lock`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LockOutcome {
    /// Nothing happened
    Ignored(IgnoreReason),
    /// Bar locked, puzzle continues
    Locked {
        /// Bar index
        index: usize,
        /// Bars locked so far
        locked_count: usize,
    },
    /// Last bar locked; the puzzle is won
    Completed,
    /// Outside the window; penalty applied
    Missed {
        /// Seconds left after the penalty
        remaining: f64,
    },
    /// Outside the window and the penalty ran the clock out
    Expired,
}

impl LockOutcome {
    /// Terminal outcome caused by this attempt, if any
    #[must_use]
    pub fn outcome(&self) -> Option<PuzzleOutcome> {
        match self {
            Self::Completed => Some(PuzzleOutcome::Won),
            Self::Expired => Some(PuzzleOutcome::Lost),
            _ => None,
        }
    }
}

/// The synchronization puzzle
pub struct PuzzleEngine {
    config: PuzzleConfig,
    bars: Vec<SyncBar>,
    clock: CountdownClock,
    locked_count: usize,
    started: bool,
    state: PuzzleState,
    rng: StdRng,
    renderer: Arc<dyn Renderer>,
    scheduler: Scheduler,
    epoch: Epoch,
    frame_driver: TaskSlot,
    clock_driver: TaskSlot,
}

impl std::fmt::Debug for PuzzleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PuzzleEngine")
            .field("state", &self.state)
            .field("locked_count", &self.locked_count)
            .field("started", &self.started)
            .field("remaining", &self.clock.remaining())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl PuzzleEngine {
    /// Create an idle puzzle seeded from OS entropy
    #[must_use]
    pub fn new(config: PuzzleConfig, renderer: Arc<dyn Renderer>, scheduler: Scheduler) -> Self {
        Self::with_rng(config, renderer, scheduler, StdRng::from_entropy())
    }

    /// Create an idle puzzle with an explicit random source
    #[must_use]
    pub fn with_rng(
        config: PuzzleConfig,
        renderer: Arc<dyn Renderer>,
        scheduler: Scheduler,
        rng: StdRng,
    ) -> Self {
        let clock = CountdownClock::new(config.time_limit);
        Self {
            config,
            bars: Vec::new(),
            clock,
            locked_count: 0,
            started: false,
            state: PuzzleState::Idle,
            rng,
            renderer,
            scheduler,
            epoch: 0,
            frame_driver: TaskSlot::new(),
            clock_driver: TaskSlot::new(),
        }
    }

    /// Leave `Idle` and start the frame driver. No-op otherwise.
    pub fn start(&mut self) -> bool {
        if self.state != PuzzleState::Idle {
            return false;
        }
        self.setup();
        true
    }

    /// Fresh random bars, full clock, counters reset, `Active`
    ///
    /// Valid from any state; this is the only way out of `Won` or `Lost`.
    pub fn reinitialize(&mut self) {
        self.setup();
    }

    fn setup(&mut self) {
        self.halt_drivers();

        let speed = self.config.speed;
        self.bars = (0..self.config.columns)
            .map(|id| SyncBar::random(id, &mut self.rng, speed))
            .collect();
        self.clock.reset();
        self.locked_count = 0;
        self.started = false;
        self.state = PuzzleState::Active;

        self.renderer
            .set_timer_display(format_remaining(self.clock.limit()));
        self.renderer.set_progress(0.0);
        for bar in &self.bars {
            self.renderer.render_bar_position(bar.id, bar.position);
        }

        self.frame_driver.replace(self.scheduler.every(
            self.config.frame_interval,
            SessionEvent::Frame { epoch: self.epoch },
        ));

        tracing::info!(
            columns = self.bars.len(),
            time_limit = self.config.time_limit,
            epoch = self.epoch,
            "Puzzle initialized"
        );
    }

    /// Try to lock the bar at `index`
    pub fn attempt_lock(&mut self, index: usize) -> LockOutcome {
        if self.state != PuzzleState::Active {
            tracing::debug!(index, state = ?self.state, "Lock attempt ignored, puzzle not active");
            return LockOutcome::Ignored(IgnoreReason::NotActive);
        }
        let Some(bar) = self.bars.get(index) else {
            tracing::debug!(index, "Lock attempt ignored, no such bar");
            return LockOutcome::Ignored(IgnoreReason::InvalidIndex);
        };
        if bar.locked {
            tracing::debug!(index, "Lock attempt ignored, bar already locked");
            return LockOutcome::Ignored(IgnoreReason::AlreadyLocked);
        }

        if !self.started {
            self.started = true;
            self.clock.start();
            self.clock_driver.replace(self.scheduler.every(
                self.config.clock_tick,
                SessionEvent::ClockTick { epoch: self.epoch },
            ));
            tracing::debug!("Countdown started by first lock attempt");
        }

        let position = self.bars[index].position;
        if self.config.lock_window.contains(position) {
            self.bars[index].lock();
            self.locked_count += 1;
            tracing::debug!(index, position, locked = self.locked_count, "Bar locked");

            self.renderer.set_locked_visual(index);
            self.renderer.append_log(sync_log_line(index + 1));
            self.renderer.set_progress(self.progress());

            if self.locked_count == self.bars.len() {
                self.win();
                return LockOutcome::Completed;
            }
            return LockOutcome::Locked {
                index,
                locked_count: self.locked_count,
            };
        }

        tracing::debug!(index, position, "Lock attempt missed the window");
        self.renderer.append_log(SYNC_ERROR_LOG.to_string());
        self.renderer.flash_timer_error(self.config.flash_duration);

        let Some(change) = self.clock.penalize(self.config.error_penalty) else {
            return LockOutcome::Missed {
                remaining: self.clock.remaining(),
            };
        };
        self.renderer.set_timer_display(change.display());
        if change.expired {
            self.lose();
            return LockOutcome::Expired;
        }
        LockOutcome::Missed {
            remaining: change.remaining,
        }
    }

    /// Frame driver callback: advance and render unlocked bars
    pub fn on_frame(&mut self, epoch: Epoch) {
        if epoch != self.epoch || self.state != PuzzleState::Active {
            return;
        }
        for bar in self.bars.iter_mut().filter(|b| !b.locked) {
            bar.advance();
            self.renderer.render_bar_position(bar.id, bar.position);
        }
    }

    /// Clock driver callback: one fixed tick. Returns `Lost` on expiry.
    pub fn on_clock_tick(&mut self, epoch: Epoch) -> Option<PuzzleOutcome> {
        if epoch != self.epoch || self.state != PuzzleState::Active {
            return None;
        }
        let change = self.clock.tick(self.config.clock_tick.as_secs_f64())?;
        tracing::trace!(remaining = change.remaining, "Clock tick");
        self.renderer.set_timer_display(change.display());
        if change.expired {
            self.lose();
            return Some(PuzzleOutcome::Lost);
        }
        None
    }

    fn win(&mut self) {
        self.state = PuzzleState::Won;
        self.clock.stop();
        self.halt_drivers();
        for line in VICTORY_LOG {
            self.renderer.append_log(line.to_string());
        }
        tracing::info!(remaining = self.clock.remaining(), "Puzzle won");
    }

    fn lose(&mut self) {
        self.state = PuzzleState::Lost;
        self.clock.stop();
        self.halt_drivers();
        tracing::info!(locked = self.locked_count, "Puzzle lost, countdown expired");
    }

    /// Cancel both drivers and invalidate anything they already queued
    fn halt_drivers(&mut self) {
        self.frame_driver.cancel();
        self.clock_driver.cancel();
        self.epoch += 1;
    }

    /// Progress as a percentage of locked bars
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.bars.is_empty() {
            return 0.0;
        }
        self.locked_count as f64 / self.bars.len() as f64 * 100.0
    }

    /// Current bars
    #[must_use]
    pub fn bars(&self) -> &[SyncBar] {
        &self.bars
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> PuzzleState {
        self.state
    }

    /// Whether lock attempts are accepted
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == PuzzleState::Active
    }

    /// Whether the first lock attempt has happened
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Bars locked so far
    #[must_use]
    pub fn locked_count(&self) -> usize {
        self.locked_count
    }

    /// Seconds left on the countdown
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.clock.remaining()
    }

    /// Epoch stamped on driver events
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Whether the frame driver is running
    #[must_use]
    pub fn frames_running(&self) -> bool {
        self.frame_driver.is_active()
    }

    /// Whether the clock driver is running
    #[must_use]
    pub fn clock_running(&self) -> bool {
        self.clock_driver.is_active()
    }
}

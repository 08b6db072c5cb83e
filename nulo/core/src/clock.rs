//! Countdown Clock
//!
//! A passive countdown used by the puzzle. The clock never schedules anything
//! on its own: a driver feeds it fixed deltas (50ms by default) and the clock
//! reports what changed. Crossing zero is reported once as an expiry event;
//! afterwards the clock is frozen at `0.0`.

use serde::{Deserialize, Serialize};

/// Lifecycle of a [`CountdownClock`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    /// Seeded but not counting yet
    Idle,
    /// Counting down
    Running,
    /// Frozen by `stop()`
    Stopped,
    /// Reached zero
    Expired,
}

/// Notification produced by every `tick`/`penalize` that changed the clock
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeChanged {
    /// Remaining seconds after the change (never negative)
    pub remaining: f64,
    /// True only for the change that crossed zero
    pub expired: bool,
}

impl TimeChanged {
    /// Remaining time as shown on the timer display (two decimals)
    #[must_use]
    pub fn display(&self) -> String {
        format_remaining(self.remaining)
    }
}

/// Format seconds the way the timer display shows them
#[must_use]
pub fn format_remaining(seconds: f64) -> String {
    format!("{:.2}", seconds.max(0.0))
}

/// Monotonic countdown with start/stop and penalties
#[derive(Clone, Debug)]
pub struct CountdownClock {
    limit: f64,
    remaining: f64,
    state: ClockState,
}

impl CountdownClock {
    /// Create an idle clock seeded with `limit` seconds
    #[must_use]
    pub fn new(limit: f64) -> Self {
        Self {
            limit,
            remaining: limit,
            state: ClockState::Idle,
        }
    }

    /// Begin counting down. Returns false if the clock was already started.
    pub fn start(&mut self) -> bool {
        if self.state != ClockState::Idle {
            return false;
        }
        self.state = ClockState::Running;
        true
    }

    /// Advance the countdown by `delta` seconds.
    ///
    /// Only a running clock reacts; everything else is a no-op returning `None`.
    pub fn tick(&mut self, delta: f64) -> Option<TimeChanged> {
        if self.state != ClockState::Running {
            return None;
        }
        Some(self.subtract(delta))
    }

    /// Subtract a penalty immediately. May expire the clock.
    ///
    /// Penalties apply to an idle or running clock; a stopped or expired
    /// clock ignores them.
    pub fn penalize(&mut self, amount: f64) -> Option<TimeChanged> {
        match self.state {
            ClockState::Idle | ClockState::Running => Some(self.subtract(amount)),
            ClockState::Stopped | ClockState::Expired => None,
        }
    }

    /// Freeze the remaining value. Idempotent; an expired clock stays expired.
    pub fn stop(&mut self) {
        if matches!(self.state, ClockState::Idle | ClockState::Running) {
            self.state = ClockState::Stopped;
        }
    }

    /// Reseed with the configured limit and return to idle
    pub fn reset(&mut self) {
        self.remaining = self.limit;
        self.state = ClockState::Idle;
    }

    fn subtract(&mut self, amount: f64) -> TimeChanged {
        self.remaining -= amount.max(0.0);
        let expired = self.remaining <= 0.0;
        if expired {
            self.remaining = 0.0;
            self.state = ClockState::Expired;
        }
        TimeChanged {
            remaining: self.remaining,
            expired,
        }
    }

    /// Seconds left
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Configured starting value
    #[must_use]
    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Whether the clock is counting down
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Whether the clock has crossed zero
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.state == ClockState::Expired
    }
}

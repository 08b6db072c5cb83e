//! Sync bars
//!
//! A bar is a block bouncing along a vertical track. Positions are track
//! percentages; the block is 10% tall so its top never passes 90.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{LockWindow, SpeedRange, TRACK_MAX, TRACK_MIN};

/// Direction of travel along the track
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Toward 90
    Up,
    /// Toward 0
    Down,
}

impl Direction {
    /// `+1.0` or `-1.0`
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Up => 1.0,
            Self::Down => -1.0,
        }
    }
}

/// One puzzle column
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncBar {
    /// Column index
    pub id: usize,
    /// Track position, 0-90 while unlocked
    pub position: f64,
    /// Current direction of travel
    pub direction: Direction,
    /// Track percent per frame
    pub speed: f64,
    /// Frozen in place
    pub locked: bool,
}

impl SyncBar {
    /// Build an unlocked bar at a fixed state
    #[must_use]
    pub fn new(id: usize, position: f64, direction: Direction, speed: f64) -> Self {
        Self {
            id,
            position,
            direction,
            speed,
            locked: false,
        }
    }

    /// Randomize a fresh bar
    ///
    /// Position is uniform in `[10, 90)`, direction is a coin flip and speed
    /// is uniform in the configured range.
    pub fn random<R: Rng + ?Sized>(id: usize, rng: &mut R, speed: SpeedRange) -> Self {
        let position = rng.gen_range(10.0..TRACK_MAX);
        let direction = if rng.gen_bool(0.5) {
            Direction::Up
        } else {
            Direction::Down
        };
        let speed = rng.gen_range(speed.min..speed.max);
        Self::new(id, position, direction, speed)
    }

    /// Move one frame. Reflects off the track ends; locked bars stay put.
    pub fn advance(&mut self) {
        if self.locked {
            return;
        }
        self.position += self.speed * self.direction.sign();
        if self.position >= TRACK_MAX {
            self.position = TRACK_MAX;
            self.direction = Direction::Down;
        } else if self.position <= TRACK_MIN {
            self.position = TRACK_MIN;
            self.direction = Direction::Up;
        }
    }

    /// Whether the block currently sits in the sync window
    #[must_use]
    pub fn in_window(&self, window: &LockWindow) -> bool {
        window.contains(self.position)
    }

    /// Freeze the bar
    pub fn lock(&mut self) {
        self.locked = true;
    }
}

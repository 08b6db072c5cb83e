//! Key Mapping
//!
//! Turns key presses into player intents, given what is on screen. The
//! mapping is deliberately dumb: it only checks what the display shows.
//! Whether an intent is legal right now is the session's call.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use nulo_core::Phase;

use crate::display::DisplayState;

/// What a key press asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Leave the experience
    Quit,
    /// Lock the bar at this index
    Lock(usize),
    /// Move the bar cursor
    MoveBar(isize),
    /// Pick the choice at this index
    Choose(usize),
    /// Move the choice cursor
    MoveChoice(isize),
    /// Retry a failed puzzle
    Restart,
}

/// Map a key event to an intent
#[must_use]
pub fn map_key(key: KeyEvent, display: &DisplayState) -> Option<Intent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    {
        return Some(Intent::Quit);
    }
    // The black screen waits for any key
    if display.black {
        return Some(Intent::Quit);
    }

    match display.phase {
        Phase::Puzzle => puzzle_key(key.code, display),
        Phase::Dialogue => dialogue_key(key.code, display),
        Phase::Interstitial | Phase::Destruction => None,
    }
}

fn digit_index(c: char) -> Option<usize> {
    match c.to_digit(10) {
        Some(d @ 1..=9) => Some(d as usize - 1),
        _ => None,
    }
}

fn puzzle_key(code: KeyCode, display: &DisplayState) -> Option<Intent> {
    if display.fail_modal {
        return match code {
            KeyCode::Char('r' | 'R') | KeyCode::Enter => Some(Intent::Restart),
            _ => None,
        };
    }
    match code {
        KeyCode::Char(c) => digit_index(c)
            .map(Intent::Lock)
            .or_else(|| (c == ' ').then_some(Intent::Lock(display.selected_bar))),
        KeyCode::Enter => Some(Intent::Lock(display.selected_bar)),
        KeyCode::Left => Some(Intent::MoveBar(-1)),
        KeyCode::Right => Some(Intent::MoveBar(1)),
        _ => None,
    }
}

fn dialogue_key(code: KeyCode, display: &DisplayState) -> Option<Intent> {
    if display.selectable_choices() == 0 {
        return None;
    }
    match code {
        KeyCode::Char(c) => digit_index(c).map(Intent::Choose),
        KeyCode::Enter => Some(Intent::Choose(display.selected_choice)),
        KeyCode::Up => Some(Intent::MoveChoice(-1)),
        KeyCode::Down => Some(Intent::MoveChoice(1)),
        _ => None,
    }
}

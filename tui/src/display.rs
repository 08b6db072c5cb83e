//! Display State
//!
//! Everything the TUI draws, derived only from [`RenderDirective`]s.
//!
//! # Design Philosophy
//!
//! The TUI is a "thin client": the core decides what happens and when, the
//! display state just remembers the latest instruction for every part of the
//! screen. Durations carried by directives (timer flash, choice fades) become
//! deadlines here so the frame loop can age them out.

use std::time::{Duration, Instant};

use nulo_core::{ChoiceView, Phase, RenderDirective};

/// Upper bound on kept log lines
const MAX_LOG_LINES: usize = 64;

/// One puzzle column as last rendered
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayBar {
    /// Block position, 0-100
    pub percent: f64,
    /// Locked visual
    pub locked: bool,
}

/// A decorative point placed at a relative screen position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Speck {
    /// Horizontal position, 0.0-1.0
    pub x: f32,
    /// Vertical position, 0.0-1.0
    pub y: f32,
    /// Glyph to draw
    pub glyph: char,
}

impl Speck {
    fn random(glyphs: &[char]) -> Self {
        let glyph = glyphs[rand::random::<usize>() % glyphs.len()];
        Self {
            x: rand::random::<f32>(),
            y: rand::random::<f32>(),
            glyph,
        }
    }
}

const PARTICLE_GLYPHS: &[char] = &['.', '·', '+', '*', '°'];
const BLOB_GLYPHS: &[char] = &['█', '▓', '▒', '░'];

/// The choice list and its fade timing
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayChoices {
    /// Choices in order
    pub items: Vec<ChoiceView>,
    /// When the list appeared
    pub shown_at: Instant,
    /// Fade-in length
    pub fade_in: Duration,
    /// Set once the list is being dismissed
    pub fading_out: Option<(Instant, Duration)>,
    /// Fade-in finished; selection opens
    pub ready: bool,
}

impl DisplayChoices {
    /// Opacity in `[0, 1]` at `now`
    #[must_use]
    pub fn opacity(&self, now: Instant) -> f32 {
        if let Some((since, fade_out)) = self.fading_out {
            return 1.0 - fraction(now.saturating_duration_since(since), fade_out);
        }
        fraction(now.saturating_duration_since(self.shown_at), self.fade_in)
    }

    /// Whether the list has fully faded in and is not leaving
    #[must_use]
    pub fn settled(&self, now: Instant) -> bool {
        self.fading_out.is_none() && self.opacity(now) >= 1.0
    }
}

fn fraction(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / total.as_secs_f32()).min(1.0)
}

/// Current display state for rendering
#[derive(Clone, Debug)]
pub struct DisplayState {
    /// Visible screen
    pub phase: Phase,

    // === Puzzle ===
    /// Columns, indexed by bar id
    pub bars: Vec<DisplayBar>,
    /// Progress meter, 0-100
    pub progress: f64,
    /// System log, oldest first
    pub log: Vec<String>,
    /// Timer text
    pub timer: String,
    /// Timer shows as an error until this instant
    pub timer_flash_until: Option<Instant>,
    /// Failure modal up
    pub fail_modal: bool,
    /// Column the arrow keys point at
    pub selected_bar: usize,

    // === Interstitial / Dialogue ===
    /// Ambient audio volume, if the track has started
    pub volume: Option<f32>,
    /// Ambient particles
    pub particles: Vec<Speck>,
    /// Text revealed so far
    pub dialogue_text: String,
    /// Glitch decoration appended after the text
    pub decoration: Option<String>,
    /// Choice list, if shown
    pub choices: Option<DisplayChoices>,
    /// Choice the arrow keys point at
    pub selected_choice: usize,
    /// Critical-error styling
    pub critical: bool,

    // === Destruction ===
    /// Destruction effects
    pub blobs: Vec<Speck>,
    /// Full-screen cover
    pub cover: bool,
    /// Screen cleared to black
    pub black: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            phase: Phase::Puzzle,
            bars: Vec::new(),
            progress: 0.0,
            log: Vec::new(),
            timer: String::new(),
            timer_flash_until: None,
            fail_modal: false,
            selected_bar: 0,
            volume: None,
            particles: Vec::new(),
            dialogue_text: String::new(),
            decoration: None,
            choices: None,
            selected_choice: 0,
            critical: false,
            blobs: Vec::new(),
            cover: false,
            black: false,
        }
    }
}

impl DisplayState {
    /// Create a new display state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a directive received now
    pub fn apply_directive(&mut self, directive: RenderDirective) {
        self.apply_directive_at(directive, Instant::now());
    }

    /// Apply a directive as if received at `now`
    pub fn apply_directive_at(&mut self, directive: RenderDirective, now: Instant) {
        match directive {
            // Puzzle
            RenderDirective::RenderBarPosition { index, percent } => {
                self.bar_mut(index).percent = percent;
            }
            RenderDirective::SetLockedVisual { index } => {
                self.bar_mut(index).locked = true;
            }
            RenderDirective::SetProgress { percent } => {
                self.progress = percent;
            }
            RenderDirective::AppendLog { line } => {
                self.log.push(line);
                if self.log.len() > MAX_LOG_LINES {
                    self.log.remove(0);
                }
            }
            RenderDirective::FlashTimerError { duration } => {
                self.timer_flash_until = Some(now + duration);
            }
            RenderDirective::SetTimerDisplay { text } => {
                self.timer = text;
            }
            RenderDirective::ShowFailModal => {
                self.fail_modal = true;
            }

            // Phase transitions
            RenderDirective::TransitionToPhase { phase } => {
                if phase == Phase::Puzzle {
                    self.reset_puzzle();
                }
                self.phase = phase;
            }
            RenderDirective::PlayAmbientAudio { volume } => {
                self.volume = Some(volume);
            }
            RenderDirective::SpawnAmbientParticles { count } => {
                self.particles
                    .extend((0..count).map(|_| Speck::random(PARTICLE_GLYPHS)));
            }

            // Dialogue
            RenderDirective::ClearDialogue => {
                self.dialogue_text.clear();
                self.decoration = None;
                self.choices = None;
                self.selected_choice = 0;
            }
            RenderDirective::RaiseCriticalAlert => {
                self.critical = true;
            }
            RenderDirective::RevealText { ch } => {
                self.dialogue_text.push(ch);
            }
            RenderDirective::SetDecorationText { text } => {
                self.decoration = Some(text);
            }
            RenderDirective::ShowChoices { choices, fade_in } => {
                self.selected_choice = 0;
                self.choices = Some(DisplayChoices {
                    items: choices,
                    shown_at: now,
                    fade_in,
                    fading_out: None,
                    ready: fade_in.is_zero(),
                });
            }
            RenderDirective::DismissChoices { fade_out } => {
                if let Some(choices) = self.choices.as_mut() {
                    choices.fading_out = Some((now, fade_out));
                }
                self.decoration = None;
            }

            // Destruction
            RenderDirective::SpawnDestructionEffect => {
                self.blobs.push(Speck::random(BLOB_GLYPHS));
            }
            RenderDirective::FadeAudioVolume { level } => {
                self.volume = Some(level);
            }
            RenderDirective::ShowFinalCover => {
                self.cover = true;
            }
            RenderDirective::ClearToBlack => {
                self.black = true;
            }
        }
    }

    /// Age out deadlines
    pub fn update(&mut self, now: Instant) {
        if self.timer_flash_until.is_some_and(|until| now >= until) {
            self.timer_flash_until = None;
        }
        let gone = self
            .choices
            .as_ref()
            .is_some_and(|c| c.fading_out.is_some() && c.opacity(now) <= 0.0);
        if gone {
            self.choices = None;
        } else if let Some(choices) = self.choices.as_mut() {
            choices.ready = choices.ready || choices.settled(now);
        }
    }

    /// Whether the timer should show as an error at `now`
    #[must_use]
    pub fn timer_flashing(&self, now: Instant) -> bool {
        self.timer_flash_until.is_some_and(|until| now < until)
    }

    /// Number of choices the player can currently pick from
    ///
    /// Zero until the list has faded in, and again once it is dismissed.
    #[must_use]
    pub fn selectable_choices(&self) -> usize {
        match &self.choices {
            Some(choices) if choices.ready && choices.fading_out.is_none() => choices.items.len(),
            _ => 0,
        }
    }

    /// Move the bar cursor, wrapping around
    pub fn move_bar_selection(&mut self, delta: isize) {
        self.selected_bar = wrap_index(self.selected_bar, delta, self.bars.len());
    }

    /// Move the choice cursor, wrapping around
    pub fn move_choice_selection(&mut self, delta: isize) {
        self.selected_choice = wrap_index(self.selected_choice, delta, self.selectable_choices());
    }

    fn bar_mut(&mut self, index: usize) -> &mut DisplayBar {
        if index >= self.bars.len() {
            self.bars.resize(index + 1, DisplayBar::default());
        }
        &mut self.bars[index]
    }

    fn reset_puzzle(&mut self) {
        self.bars.clear();
        self.progress = 0.0;
        self.log.clear();
        self.timer_flash_until = None;
        self.fail_modal = false;
        self.selected_bar = 0;
    }
}

fn wrap_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as isize;
    ((current as isize + delta) % len + len) as usize % len as usize
}

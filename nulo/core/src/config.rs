//! Experience Configuration
//!
//! All tunables of the experience: puzzle difficulty, dialogue pacing and the
//! scripted interstitial/destruction timings.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! The file lives at `$NULO_CONFIG` if set, otherwise
//! `$XDG_CONFIG_HOME/nulo/config.toml` (typically `~/.config/nulo/config.toml`).
//! A missing file is not an error.
//!
//! # Example Configuration
//!
//! ```toml
//! [puzzle]
//! columns = 5
//! time_limit_secs = 20.0
//! speed_min = 1.0
//! speed_max = 2.5
//! lock_window = [40.0, 60.0]
//! error_penalty_secs = 2.0
//!
//! [dialogue]
//! type_speed_ms = 50
//! decoration_interval_ms = 60
//! content_path = "/usr/share/nulo/dialogue.toml"
//!
//! [interstitial]
//! ambient_wait_secs = 50
//!
//! [destruction]
//! spawn_count = 50
//! spawn_stagger_ms = 80
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest position a bar can reach on its track
pub const TRACK_MIN: f64 = 0.0;

/// Highest position a bar can reach on its track (the block is 10% tall)
pub const TRACK_MAX: f64 = 90.0;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the effective configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// At least one value came from the environment
    Env,
    /// Values came from the TOML configuration file
    File,
    /// Default values only
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Effective Configuration
// =============================================================================

/// Inclusive track range in which a lock attempt succeeds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockWindow {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl LockWindow {
    /// Whether `position` falls inside the window
    #[must_use]
    pub fn contains(&self, position: f64) -> bool {
        position >= self.min && position <= self.max
    }
}

impl Default for LockWindow {
    fn default() -> Self {
        Self {
            min: 40.0,
            max: 60.0,
        }
    }
}

/// Half-open range `[min, max)` bar speeds are drawn from
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    /// Slowest speed (track percent per frame)
    pub min: f64,
    /// Upper bound, exclusive
    pub max: f64,
}

impl Default for SpeedRange {
    fn default() -> Self {
        Self { min: 1.0, max: 2.5 }
    }
}

/// Synchronization puzzle settings
#[derive(Clone, Debug, PartialEq)]
pub struct PuzzleConfig {
    /// Number of bars (columns)
    pub columns: usize,
    /// Countdown seeded on every (re)initialization, in seconds
    pub time_limit: f64,
    /// Bar speed range
    pub speed: SpeedRange,
    /// Sync window
    pub lock_window: LockWindow,
    /// Seconds removed for a lock attempt outside the window
    pub error_penalty: f64,
    /// Clock driver cadence
    pub clock_tick: Duration,
    /// Frame driver cadence (one bar step per frame)
    pub frame_interval: Duration,
    /// How long the timer flashes after a miss
    pub flash_duration: Duration,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            columns: 5,
            time_limit: 20.0,
            speed: SpeedRange::default(),
            lock_window: LockWindow::default(),
            error_penalty: 2.0,
            clock_tick: Duration::from_millis(50),
            frame_interval: Duration::from_millis(16),
            flash_duration: Duration::from_millis(100),
        }
    }
}

/// Dialogue pacing settings
#[derive(Clone, Debug, PartialEq)]
pub struct DialogueConfig {
    /// Delay between revealed characters
    pub type_speed: Duration,
    /// Refresh period of the decoration loop
    pub decoration_interval: Duration,
    /// Characters per decoration refresh
    pub decoration_len: usize,
    /// Fade-in hint for the choice list
    pub choice_fade_in: Duration,
    /// Optional TOML dialogue table replacing the built-in content
    pub content_path: Option<PathBuf>,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            type_speed: Duration::from_millis(50),
            decoration_interval: Duration::from_millis(60),
            decoration_len: 4,
            choice_fade_in: Duration::from_millis(500),
            content_path: None,
        }
    }
}

/// Timings of the wait between puzzle and dialogue
#[derive(Clone, Debug, PartialEq)]
pub struct InterstitialConfig {
    /// Pause after winning before the screen transition starts
    pub handoff_delay: Duration,
    /// Screen transition stage
    pub transition: Duration,
    /// Ambient-only stage before the dialogue starts
    pub ambient_wait: Duration,
    /// Particles spawned when the ambient stage begins
    pub ambient_particles: usize,
    /// Volume the ambient track starts at
    pub audio_volume: f32,
}

impl Default for InterstitialConfig {
    fn default() -> Self {
        Self {
            handoff_delay: Duration::from_secs(1),
            transition: Duration::from_secs(2),
            ambient_wait: Duration::from_secs(50),
            ambient_particles: 30,
            audio_volume: 0.5,
        }
    }
}

/// Timings of the closing sequence
#[derive(Clone, Debug, PartialEq)]
pub struct DestructionConfig {
    /// Fade-out hint for the dismissed choice list
    pub choice_fade_out: Duration,
    /// Number of staggered spawn effects
    pub spawn_count: u32,
    /// Delay between two spawn effects
    pub spawn_stagger: Duration,
    /// Total duration of the volume fade-out
    pub audio_fade: Duration,
    /// Cadence of volume fade steps
    pub audio_fade_step: Duration,
    /// When the full-screen cover appears
    pub cover_at: Duration,
    /// When the screen is cleared to black
    pub clear_at: Duration,
}

impl Default for DestructionConfig {
    fn default() -> Self {
        Self {
            choice_fade_out: Duration::from_secs(1),
            spawn_count: 50,
            spawn_stagger: Duration::from_millis(80),
            audio_fade: Duration::from_secs(5),
            audio_fade_step: Duration::from_millis(100),
            cover_at: Duration::from_millis(2500),
            clear_at: Duration::from_millis(5500),
        }
    }
}

/// Complete configuration of one run
#[derive(Clone, Debug)]
pub struct ExperienceConfig {
    /// Puzzle settings
    pub puzzle: PuzzleConfig,
    /// Dialogue settings
    pub dialogue: DialogueConfig,
    /// Interstitial timings
    pub interstitial: InterstitialConfig,
    /// Destruction timings
    pub destruction: DestructionConfig,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            puzzle: PuzzleConfig::default(),
            dialogue: DialogueConfig::default(),
            interstitial: InterstitialConfig::default(),
            destruction: DestructionConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ExperienceConfig {
    /// Primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check invariants the engines rely on
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.puzzle;
        if p.columns == 0 {
            return Err(invalid("puzzle.columns must be at least 1"));
        }
        if !p.time_limit.is_finite() || p.time_limit <= 0.0 {
            return Err(invalid("puzzle.time_limit_secs must be positive"));
        }
        if !p.speed.min.is_finite()
            || !p.speed.max.is_finite()
            || p.speed.min <= 0.0
            || p.speed.max <= p.speed.min
        {
            return Err(invalid("puzzle speed range must satisfy 0 < speed_min < speed_max"));
        }
        if !p.lock_window.min.is_finite()
            || !p.lock_window.max.is_finite()
            || p.lock_window.min > p.lock_window.max
            || p.lock_window.min < TRACK_MIN
            || p.lock_window.max > TRACK_MAX
        {
            return Err(invalid("puzzle.lock_window must be ordered and inside [0, 90]"));
        }
        if !p.error_penalty.is_finite() || p.error_penalty < 0.0 {
            return Err(invalid("puzzle.error_penalty_secs must not be negative"));
        }
        if p.clock_tick.is_zero() || p.frame_interval.is_zero() {
            return Err(invalid("puzzle driver intervals must be positive"));
        }

        let d = &self.dialogue;
        if d.type_speed.is_zero() || d.decoration_interval.is_zero() {
            return Err(invalid("dialogue intervals must be positive"));
        }
        if d.decoration_len == 0 {
            return Err(invalid("dialogue.decoration_len must be at least 1"));
        }

        let volume = self.interstitial.audio_volume;
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            return Err(invalid("interstitial.audio_volume must be within [0, 1]"));
        }

        let x = &self.destruction;
        if x.audio_fade_step.is_zero() || x.spawn_stagger.is_zero() {
            return Err(invalid("destruction intervals must be positive"));
        }
        if x.clear_at < x.cover_at {
            return Err(invalid("destruction.clear_at_ms must not precede cover_at_ms"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[puzzle]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleToml {
    /// Number of bars
    pub columns: Option<usize>,
    /// Countdown in seconds
    pub time_limit_secs: Option<f64>,
    /// Slowest bar speed
    pub speed_min: Option<f64>,
    /// Upper bound of bar speed
    pub speed_max: Option<f64>,
    /// `[min, max]` sync window
    pub lock_window: Option<[f64; 2]>,
    /// Penalty for a miss, in seconds
    pub error_penalty_secs: Option<f64>,
    /// Clock driver cadence
    pub clock_tick_ms: Option<u64>,
    /// Frame driver cadence
    pub frame_interval_ms: Option<u64>,
}

/// `[dialogue]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueToml {
    /// Delay between revealed characters
    pub type_speed_ms: Option<u64>,
    /// Decoration refresh period
    pub decoration_interval_ms: Option<u64>,
    /// Choice list fade-in hint
    pub choice_fade_in_ms: Option<u64>,
    /// Dialogue table file
    pub content_path: Option<String>,
}

/// `[interstitial]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterstitialToml {
    /// Pause before the transition
    pub handoff_delay_ms: Option<u64>,
    /// Screen transition stage
    pub transition_ms: Option<u64>,
    /// Ambient-only stage
    pub ambient_wait_secs: Option<u64>,
    /// Ambient particle count
    pub ambient_particles: Option<usize>,
    /// Starting volume
    pub audio_volume: Option<f32>,
}

/// `[destruction]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DestructionToml {
    /// Spawn effect count
    pub spawn_count: Option<u32>,
    /// Delay between spawn effects
    pub spawn_stagger_ms: Option<u64>,
    /// Total audio fade duration
    pub audio_fade_ms: Option<u64>,
    /// Cover time
    pub cover_at_ms: Option<u64>,
    /// Clear time
    pub clear_at_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceToml {
    /// Puzzle section
    pub puzzle: PuzzleToml,
    /// Dialogue section
    pub dialogue: DialogueToml,
    /// Interstitial section
    pub interstitial: InterstitialToml,
    /// Destruction section
    pub destruction: DestructionToml,
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// `$NULO_CONFIG` wins; otherwise `$XDG_CONFIG_HOME/nulo/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("NULO_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|p| p.join("nulo").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed,
/// or if the resulting values are invalid.
pub fn load_config() -> Result<ExperienceConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then apply the environment
///
/// # Errors
///
/// Returns an error if the specified file cannot be read or parsed, or if
/// the resulting values are invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ExperienceConfig, ConfigError> {
    let mut config = ExperienceConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ExperienceToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(path = %config_path.display(), "Config file not found, using defaults");
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Apply TOML values on top of `config`
pub fn apply_toml_config(config: &mut ExperienceConfig, toml: &ExperienceToml) {
    let p = &toml.puzzle;
    if let Some(columns) = p.columns {
        config.puzzle.columns = columns;
    }
    if let Some(limit) = p.time_limit_secs {
        config.puzzle.time_limit = limit;
    }
    if let Some(min) = p.speed_min {
        config.puzzle.speed.min = min;
    }
    if let Some(max) = p.speed_max {
        config.puzzle.speed.max = max;
    }
    if let Some([min, max]) = p.lock_window {
        config.puzzle.lock_window = LockWindow { min, max };
    }
    if let Some(penalty) = p.error_penalty_secs {
        config.puzzle.error_penalty = penalty;
    }
    if let Some(ms) = p.clock_tick_ms {
        config.puzzle.clock_tick = Duration::from_millis(ms);
    }
    if let Some(ms) = p.frame_interval_ms {
        config.puzzle.frame_interval = Duration::from_millis(ms);
    }

    let d = &toml.dialogue;
    if let Some(ms) = d.type_speed_ms {
        config.dialogue.type_speed = Duration::from_millis(ms);
    }
    if let Some(ms) = d.decoration_interval_ms {
        config.dialogue.decoration_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = d.choice_fade_in_ms {
        config.dialogue.choice_fade_in = Duration::from_millis(ms);
    }
    if let Some(ref path) = d.content_path {
        config.dialogue.content_path = Some(PathBuf::from(path));
    }

    let i = &toml.interstitial;
    if let Some(ms) = i.handoff_delay_ms {
        config.interstitial.handoff_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = i.transition_ms {
        config.interstitial.transition = Duration::from_millis(ms);
    }
    if let Some(secs) = i.ambient_wait_secs {
        config.interstitial.ambient_wait = Duration::from_secs(secs);
    }
    if let Some(count) = i.ambient_particles {
        config.interstitial.ambient_particles = count;
    }
    if let Some(volume) = i.audio_volume {
        config.interstitial.audio_volume = volume;
    }

    let x = &toml.destruction;
    if let Some(count) = x.spawn_count {
        config.destruction.spawn_count = count;
    }
    if let Some(ms) = x.spawn_stagger_ms {
        config.destruction.spawn_stagger = Duration::from_millis(ms);
    }
    if let Some(ms) = x.audio_fade_ms {
        config.destruction.audio_fade = Duration::from_millis(ms);
    }
    if let Some(ms) = x.cover_at_ms {
        config.destruction.cover_at = Duration::from_millis(ms);
    }
    if let Some(ms) = x.clear_at_ms {
        config.destruction.clear_at = Duration::from_millis(ms);
    }
}

/// Apply environment overrides, reading variables through `lookup`
///
/// Recognized variables: `NULO_COLUMNS`, `NULO_TIME_LIMIT`,
/// `NULO_ERROR_PENALTY`, `NULO_TYPE_SPEED_MS`, `NULO_DECORATION_INTERVAL_MS`,
/// `NULO_AMBIENT_WAIT_SECS`, `NULO_CONTENT`. Unparseable values are ignored
/// with a warning.
pub fn apply_env_config<F>(config: &mut ExperienceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(n) = parse_env::<usize, _>(&lookup, "NULO_COLUMNS") {
        config.puzzle.columns = n;
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = parse_env::<f64, _>(&lookup, "NULO_TIME_LIMIT") {
        config.puzzle.time_limit = secs;
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = parse_env::<f64, _>(&lookup, "NULO_ERROR_PENALTY") {
        config.puzzle.error_penalty = secs;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_env::<u64, _>(&lookup, "NULO_TYPE_SPEED_MS") {
        config.dialogue.type_speed = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_env::<u64, _>(&lookup, "NULO_DECORATION_INTERVAL_MS") {
        config.dialogue.decoration_interval = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = parse_env::<u64, _>(&lookup, "NULO_AMBIENT_WAIT_SECS") {
        config.interstitial.ambient_wait = Duration::from_secs(secs);
        config.source = ConfigSource::Env;
    }
    if let Some(path) = lookup("NULO_CONTENT") {
        config.dialogue.content_path = Some(PathBuf::from(path));
        config.source = ConfigSource::Env;
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Nulo TUI - Terminal surface for the Nulo experience
//!
//! A thin client over `nulo-core`: it forwards key presses to the session
//! and draws whatever the session's render directives describe.
//!
//! # Architecture
//!
//! - **App**: event loop, session task, screen layout per phase
//! - **Display**: state rebuilt from render directives
//! - **Input**: key to intent mapping
//! - **Widgets**: sync track columns and follow-the-tail text blocks
//! - **Theme**: the palette

pub mod app;
pub mod display;
pub mod input;
pub mod theme;
pub mod widgets;

pub use app::App;
pub use display::DisplayState;

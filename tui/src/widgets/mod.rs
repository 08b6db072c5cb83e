//! Widgets
//!
//! - [`text_block`]: wrapped text that can follow its tail
//! - [`sync_track`]: one puzzle column

pub mod sync_track;
pub mod text_block;

pub use sync_track::SyncTrack;
pub use text_block::{TextBlock, TextBlockState};

//! Theme and Colors
//!
//! Nulo's terminal palette: near-black void, cyan signal, green for synced
//! nodes and hot red for anything going wrong.

use ratatui::style::Color;

// ============================================================================
// Void
// ============================================================================

/// Background everywhere
pub const VOID_BLACK: Color = Color::Rgb(5, 5, 8);

/// Final cover fill
pub const COVER_WHITE: Color = Color::Rgb(235, 235, 240);

/// Ambient particle
pub const PARTICLE: Color = Color::Rgb(70, 90, 110);

// ============================================================================
// Puzzle
// ============================================================================

/// Moving block
pub const SIGNAL_CYAN: Color = Color::Rgb(0, 230, 255);

/// Locked block and sync log lines
pub const SYNC_GREEN: Color = Color::Rgb(60, 255, 120);

/// Track outline
pub const TRACK_GRAY: Color = Color::Rgb(45, 45, 55);

/// Lock window band
pub const WINDOW_BAND: Color = Color::Rgb(30, 60, 70);

/// Timer at rest
pub const TIMER_WHITE: Color = Color::Rgb(220, 220, 220);

// ============================================================================
// Alerts
// ============================================================================

/// Timer flash, failure modal, error log lines
pub const ERROR_RED: Color = Color::Rgb(255, 60, 60);

/// Critical dialogue node text
pub const CRITICAL_RED: Color = Color::Rgb(200, 20, 40);

/// Glitch decoration
pub const GLITCH_MAGENTA: Color = Color::Rgb(255, 0, 170);

/// Destructive choice
pub const DESTROY_ORANGE: Color = Color::Rgb(255, 120, 0);

/// Destruction blobs
pub const BLOB_RED: Color = Color::Rgb(120, 0, 10);

// ============================================================================
// Text
// ============================================================================

/// Dialogue text
pub const TEXT: Color = Color::Rgb(200, 205, 210);

/// Hints and status lines
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Interpolate between two RGB colors, `t` in `[0, 1]`
#[must_use]
pub fn blend(from: Color, to: Color, t: f32) -> Color {
    match (from, to) {
        (Color::Rgb(r1, g1, b1), Color::Rgb(r2, g2, b2)) => {
            let t = t.clamp(0.0, 1.0);
            let mix = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
            Color::Rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2))
        }
        _ if t >= 0.5 => to,
        _ => from,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_endpoints() {
        assert_eq!(blend(VOID_BLACK, TEXT, 0.0), VOID_BLACK);
        assert_eq!(blend(VOID_BLACK, TEXT, 1.0), TEXT);
        assert_eq!(
            blend(Color::Rgb(0, 0, 0), Color::Rgb(100, 200, 50), 0.5),
            Color::Rgb(50, 100, 25)
        );
    }
}

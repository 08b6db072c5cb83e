//! SyncTrack Widget
//!
//! One puzzle column: a vertical track, the lock-window band and the block.
//! Positions are percent-from-bottom; the block is a tenth of the track tall,
//! so a position of 90 puts its top edge at the top.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Widget;

use nulo_core::LockWindow;

use crate::display::DisplayBar;
use crate::theme;

/// Block height as a share of the track
const BLOCK_SHARE: f64 = 10.0;

/// A single column of the sync puzzle
pub struct SyncTrack<'a> {
    bar: &'a DisplayBar,
    window: LockWindow,
    selected: bool,
    label: String,
}

impl<'a> SyncTrack<'a> {
    /// Column for `bar`, labelled with its 1-based key
    pub fn new(bar: &'a DisplayBar, index: usize, window: LockWindow) -> Self {
        Self {
            bar,
            window,
            selected: false,
            label: (index + 1).to_string(),
        }
    }

    /// Mark as the keyboard cursor's column
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

/// Row (from the top of `height` rows) holding percent `p`
fn row_for(p: f64, height: u16) -> u16 {
    let h = f64::from(height);
    let from_bottom = (p / 100.0 * h).floor().clamp(0.0, h - 1.0);
    (h - 1.0 - from_bottom) as u16
}

impl Widget for SyncTrack<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 3 || area.width == 0 {
            return;
        }

        // Label on the last row, track above it
        let track = Rect::new(area.x, area.y, area.width, area.height - 1);
        let label_style = if self.selected {
            Style::default()
                .fg(theme::SIGNAL_CYAN)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(theme::DIM_GRAY)
        };
        let label_x = area.x + area.width.saturating_sub(self.label.len() as u16) / 2;
        buf.set_string(label_x, area.y + area.height - 1, &self.label, label_style);

        // Window band spans every block placement the window accepts
        let band_top = row_for(self.window.max + BLOCK_SHARE - 0.01, track.height);
        let band_bottom = row_for(self.window.min, track.height);

        let block_top = row_for(self.bar.percent + BLOCK_SHARE - 0.01, track.height);
        let block_bottom = row_for(self.bar.percent, track.height);
        let block_color = if self.bar.locked {
            theme::SYNC_GREEN
        } else {
            theme::SIGNAL_CYAN
        };

        for dy in 0..track.height {
            let y = track.y + dy;
            let in_band = (band_top..=band_bottom).contains(&dy);
            let in_block = (block_top..=block_bottom).contains(&dy);
            for dx in 0..track.width {
                let x = track.x + dx;
                let edge = dx == 0 || dx == track.width - 1;
                let (symbol, style) = if in_block && !edge {
                    ("█", Style::default().fg(block_color))
                } else if edge {
                    ("│", Style::default().fg(theme::TRACK_GRAY))
                } else if in_band {
                    ("░", Style::default().fg(theme::WINDOW_BAND))
                } else {
                    (" ", Style::default())
                };
                buf[(x, y)].set_symbol(symbol).set_style(style);
            }
        }
    }
}

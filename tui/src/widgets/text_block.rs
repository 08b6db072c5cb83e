//! TextBlock Widget
//!
//! A borderless, scrollable text region. With `follow` set the view sticks
//! to the last line, which is what the system log and the dialogue reveal
//! both want.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::StatefulWidget;
use textwrap::wrap;

/// State for a scrollable text block
#[derive(Debug, Default)]
pub struct TextBlockState {
    /// Scroll offset (lines from top)
    pub scroll_offset: usize,
    /// Total content lines
    pub total_lines: usize,
    /// Keep the last line in view
    pub follow: bool,
}

impl TextBlockState {
    /// State that sticks to the tail
    #[must_use]
    pub fn following() -> Self {
        Self {
            follow: true,
            ..Self::default()
        }
    }

    /// Scroll by delta (positive = down); scrolling up stops following
    pub fn scroll(&mut self, delta: i32) {
        let new_offset = self.scroll_offset as i32 + delta;
        self.scroll_offset = new_offset.max(0) as usize;
        if delta < 0 {
            self.follow = false;
        }
    }
}

/// A styled run of text, one per logical line
pub struct TextBlock<'a> {
    lines: Vec<(&'a str, Style)>,
}

impl<'a> TextBlock<'a> {
    /// Single-style block; `\n` splits lines
    pub fn new(content: &'a str, style: Style) -> Self {
        Self {
            lines: content.lines().map(|line| (line, style)).collect(),
        }
    }

    /// Block built from lines styled one by one
    pub fn from_lines(lines: impl IntoIterator<Item = (&'a str, Style)>) -> Self {
        Self {
            lines: lines.into_iter().collect(),
        }
    }

    /// Wrap to `width`, keeping each line's style
    fn wrapped(&self, width: usize) -> Vec<(String, Style)> {
        self.lines
            .iter()
            .flat_map(|(line, style)| {
                if line.is_empty() || width == 0 {
                    vec![(String::new(), *style)]
                } else {
                    wrap(line, width)
                        .into_iter()
                        .map(|cow| (cow.into_owned(), *style))
                        .collect()
                }
            })
            .collect()
    }
}

impl StatefulWidget for TextBlock<'_> {
    type State = TextBlockState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let wrapped = self.wrapped(area.width as usize);
        state.total_lines = wrapped.len();

        let max_scroll = state.total_lines.saturating_sub(area.height as usize);
        if state.follow {
            state.scroll_offset = max_scroll;
        }
        state.scroll_offset = state.scroll_offset.min(max_scroll);

        for (i, (text, style)) in wrapped
            .iter()
            .skip(state.scroll_offset)
            .take(area.height as usize)
            .enumerate()
        {
            let y = area.y + i as u16;
            buf.set_line(area.x, y, &Line::styled(text.as_str(), *style), area.width);
        }
    }
}

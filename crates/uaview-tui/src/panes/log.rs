//! Info log pane. Follows the newest line until the user scrolls back.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use uaview_core::LogUpdate;

use crate::action::Action;
use crate::component::Component;
use crate::panes::pane_block;
use crate::theme;

#[derive(Default)]
pub struct LogPane {
    lines: Vec<String>,
    /// Lines scrolled back from the bottom.
    offset: usize,
    focused: bool,
}

impl LogPane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index range of the lines visible in `height` rows.
    fn window(&self, height: usize) -> (usize, usize) {
        let end = self.lines.len().saturating_sub(self.offset);
        (end.saturating_sub(height), end)
    }
}

impl Component for LogPane {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let last = self.lines.len().saturating_sub(1);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.offset = (self.offset + 1).min(last),
            KeyCode::Down | KeyCode::Char('j') => self.offset = self.offset.saturating_sub(1),
            KeyCode::Home | KeyCode::Char('g') => self.offset = last,
            KeyCode::End | KeyCode::Char('G') => self.offset = 0,
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::LogChanged(LogUpdate::Appended(added)) => {
                // Keep the same lines in view while scrolled back.
                if self.offset > 0 {
                    self.offset += added.len();
                }
                self.lines.extend_from_slice(added);
            }
            Action::LogChanged(LogUpdate::Reset(lines)) => {
                self.lines.clone_from(lines);
                self.offset = self.offset.min(self.lines.len().saturating_sub(1));
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = pane_block(format!(" Info ({}) ", self.lines.len()), self.focused);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let (start, end) = self.window(usize::from(inner.height));
        let lines: Vec<Line> = self
            .lines
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|l| Line::styled(l.clone(), theme::table_row()))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn appended(range: std::ops::Range<usize>) -> Action {
        Action::LogChanged(LogUpdate::Appended(
            range.map(|i| format!("line {i}")).collect(),
        ))
    }

    #[test]
    fn follows_the_tail_by_default() {
        let mut pane = LogPane::new();
        pane.update(&appended(0..10)).unwrap();
        assert_eq!(pane.window(3), (7, 10));
    }

    #[test]
    fn appended_lines_extend_the_buffer() {
        let mut pane = LogPane::new();
        pane.update(&appended(0..2)).unwrap();
        pane.update(&appended(2..3)).unwrap();
        assert_eq!(pane.lines, ["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn scrolled_back_view_stays_put_when_lines_arrive() {
        let mut pane = LogPane::new();
        pane.update(&appended(0..10)).unwrap();
        pane.handle_key_event(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE))
            .unwrap();
        assert_eq!(pane.window(3), (6, 9));

        pane.update(&appended(10..12)).unwrap();
        assert_eq!(pane.window(3), (6, 9));
    }

    #[test]
    fn clearing_resets_the_view() {
        let mut pane = LogPane::new();
        pane.update(&appended(0..10)).unwrap();
        pane.handle_key_event(KeyEvent::new(KeyCode::Home, KeyModifiers::NONE))
            .unwrap();
        pane.update(&Action::LogChanged(LogUpdate::Reset(Vec::new())))
            .unwrap();
        assert_eq!(pane.window(3), (0, 0));
    }
}

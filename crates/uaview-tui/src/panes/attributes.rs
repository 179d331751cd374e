//! Attribute panel of the selected node.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use uaview_core::AttributePanel;

use crate::action::Action;
use crate::component::Component;
use crate::panes::{clamp_scroll, pane_block};
use crate::theme;

pub struct AttributesPane {
    panel: Arc<AttributePanel>,
    label_width: usize,
    scroll: usize,
    focused: bool,
}

impl AttributesPane {
    pub fn new(label_width: usize) -> Self {
        Self {
            panel: Arc::default(),
            label_width,
            scroll: 0,
            focused: false,
        }
    }

    /// Lines for an inner width of `width` columns.
    pub fn lines(&self, width: usize) -> Vec<String> {
        // `render` adds ": " between the two columns.
        let value_width = width.saturating_sub(self.label_width + 2);
        self.panel.render(self.label_width, value_width)
    }
}

impl Component for AttributesPane {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll += 1,
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::PanelChanged(panel) = action {
            if panel.node != self.panel.node {
                self.scroll = 0;
            }
            self.panel = Arc::clone(panel);
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = match &self.panel.node {
            Some(node) => format!(" Attributes: {node} "),
            None => " Attributes ".into(),
        };
        let block = pane_block(title, self.focused);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = self.lines(usize::from(inner.width));
        let height = usize::from(inner.height);
        let scroll = clamp_scroll(self.scroll, lines.len(), height);
        let visible: Vec<Line> = lines
            .into_iter()
            .skip(scroll)
            .take(height)
            .map(|line| Line::styled(line, theme::table_row()))
            .collect();
        frame.render_widget(Paragraph::new(visible), inner);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uaview_core::{AttributeRecord, NodeId};

    #[test]
    fn lines_fill_the_pane_width() {
        let mut pane = AttributesPane::new(10);
        let panel = AttributePanel::from_attributes(
            NodeId::from("n"),
            &[AttributeRecord::new("DataType", "Double\nscaled")],
        );
        pane.update(&Action::PanelChanged(Arc::new(panel))).unwrap();

        assert_eq!(
            pane.lines(20),
            ["DataType..: Double  ", "   |    ..: scaled  "]
        );
    }

    #[test]
    fn new_node_resets_the_scroll() {
        let mut pane = AttributesPane::new(10);
        pane.scroll = 4;
        let panel = AttributePanel::from_attributes(NodeId::from("n"), &[]);
        pane.update(&Action::PanelChanged(Arc::new(panel))).unwrap();
        assert_eq!(pane.scroll, 0);
    }
}

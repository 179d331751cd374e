//! Live table pane, used for both subscribed items and alarms.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::widgets::{Cell, Row, Table};

use uaview_core::{RenderedTable, TableKind};

use crate::action::Action;
use crate::component::Component;
use crate::panes::{clamp_scroll, pane_block};
use crate::theme;

pub struct TablePane {
    kind: TableKind,
    table: Option<RenderedTable>,
    scroll: usize,
    focused: bool,
}

impl TablePane {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            table: None,
            scroll: 0,
            focused: false,
        }
    }

    /// Real rows shown; the placeholder row does not count.
    pub fn row_count(&self) -> usize {
        match &self.table {
            Some(table) if !table.is_placeholder => table.rows.len(),
            _ => 0,
        }
    }

    fn column_width(&self, width: u16) -> u16 {
        let columns = u16::try_from(self.kind.headers().len()).unwrap_or(u16::MAX).max(1);
        // One column of spacing between cells.
        (width / columns).saturating_sub(1).max(1)
    }
}

impl Component for TablePane {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll += 1,
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TableUpdated(table) = action {
            if table.kind == self.kind {
                self.table = Some(table.clone());
            }
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!(" {} ({}) ", self.kind, self.row_count());
        let block = pane_block(title, self.focused);
        let inner = block.inner(area);

        let width = self.column_width(inner.width);
        let header = Row::new(self.kind.headers().iter().map(|h| Cell::from(*h)))
            .style(theme::table_header());

        let rows = self
            .table
            .as_ref()
            .map(|t| t.formatted(usize::from(width)))
            .unwrap_or_default();
        let height = usize::from(inner.height.saturating_sub(1));
        let scroll = clamp_scroll(self.scroll, rows.len(), height);
        let body: Vec<Row> = rows
            .into_iter()
            .skip(scroll)
            .map(|fields| Row::new(fields).style(theme::table_row()))
            .collect();

        let widths = vec![Constraint::Length(width); self.kind.headers().len()];
        let table = Table::new(body, widths).header(header).block(block);
        frame.render_widget(table, area);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use uaview_core::{LiveTable, TableEvent, TableRow};

    fn row(key: &str) -> TableRow {
        TableRow::new(key, vec![key.to_owned(), "1.0".into()])
    }

    #[test]
    fn keeps_only_tables_of_its_kind() {
        let mut pane = TablePane::new(TableKind::Alarms);
        let mut items = LiveTable::new(TableKind::SubscribedItems);
        let rendered = items.apply(TableEvent::Snapshot(vec![row("a")]));
        pane.update(&Action::TableUpdated(rendered)).unwrap();
        assert!(pane.table.is_none());

        let mut alarms = LiveTable::new(TableKind::Alarms);
        let rendered = alarms.apply(TableEvent::Delta(vec![row("c1"), row("c2")]));
        pane.update(&Action::TableUpdated(rendered)).unwrap();
        assert_eq!(pane.row_count(), 2);
    }

    #[test]
    fn placeholder_counts_as_empty() {
        let mut pane = TablePane::new(TableKind::SubscribedItems);
        let table = LiveTable::new(TableKind::SubscribedItems);
        pane.update(&Action::TableUpdated(table.render())).unwrap();
        assert!(pane.table.as_ref().unwrap().is_placeholder);
        assert_eq!(pane.row_count(), 0);
    }

    #[test]
    fn columns_split_the_width_evenly() {
        let pane = TablePane::new(TableKind::SubscribedItems);
        assert_eq!(pane.column_width(80), 19);
        assert_eq!(pane.column_width(2), 1);
    }
}

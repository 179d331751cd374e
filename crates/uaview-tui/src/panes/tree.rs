//! Address-space tree pane.
//!
//! Keeps the set of nodes the user has opened and re-flattens the store
//! whenever it changes. The cursor follows the selected node id, not the
//! row index, so rows appearing above it do not move the selection.

use std::collections::HashSet;
use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use uaview_core::{ExpansionState, NodeId, NodeStore, TreeRow, flatten_visible};

use crate::action::Action;
use crate::component::Component;
use crate::panes::pane_block;
use crate::theme;

pub struct TreePane {
    store: Arc<NodeStore>,
    open: HashSet<NodeId>,
    rows: Vec<TreeRow>,
    cursor: usize,
    selected: Option<NodeId>,
    focused: bool,
}

impl TreePane {
    /// Starts with the root open and under the cursor.
    pub fn new(store: Arc<NodeStore>) -> Self {
        let root = store.root_id().clone();
        let mut pane = Self {
            store,
            open: HashSet::from([root.clone()]),
            rows: Vec::new(),
            cursor: 0,
            selected: Some(root),
            focused: true,
        };
        pane.rebuild();
        pane
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    /// Re-flatten the store. If the selected node is gone the cursor
    /// stays at its row index, and the node now under it is selected.
    fn rebuild(&mut self) -> Option<Action> {
        self.rows = flatten_visible(&self.store, &self.open);
        let position = self
            .selected
            .as_ref()
            .and_then(|id| self.rows.iter().position(|r| &r.record.id == id));
        self.cursor = position.unwrap_or_else(|| self.cursor.min(self.rows.len().saturating_sub(1)));

        let selected = self.rows.get(self.cursor).map(|r| r.record.id.clone());
        if selected == self.selected {
            return None;
        }
        self.selected.clone_from(&selected);
        selected.map(Action::Select)
    }

    fn move_to(&mut self, index: usize) -> Option<Action> {
        let row = self.rows.get(index)?;
        if self.cursor == index {
            return None;
        }
        self.cursor = index;
        self.selected = Some(row.record.id.clone());
        Some(Action::Select(row.record.id.clone()))
    }

    fn open_selected(&mut self) -> Option<NodeId> {
        let id = self.selected.clone()?;
        self.open.insert(id.clone());
        self.rebuild();
        Some(id)
    }

    /// Close the selected node, or step to its parent if it is closed.
    fn collapse(&mut self) -> Option<Action> {
        let id = self.selected.clone()?;
        if self.open.remove(&id) {
            self.rebuild();
            return None;
        }
        let parent = self.store.parent(&id)?;
        let index = self.rows.iter().position(|r| r.record.id == parent.id)?;
        self.move_to(index)
    }
}

impl Component for TreePane {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_to(self.cursor.saturating_sub(1)),
            KeyCode::Down | KeyCode::Char('j') => self.move_to(self.cursor + 1),
            KeyCode::Home | KeyCode::Char('g') => self.move_to(0),
            KeyCode::End | KeyCode::Char('G') => self.move_to(self.rows.len().saturating_sub(1)),
            KeyCode::Right => self.open_selected().map(Action::Expand),
            KeyCode::Enter => self.open_selected().map(Action::Activate),
            KeyCode::Left => self.collapse(),
            KeyCode::Char('r') => self.selected.clone().map(Action::Refresh),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if matches!(action, Action::TreeChanged) {
            return Ok(self.rebuild());
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = pane_block(" Address Space ".into(), self.focused);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let height = usize::from(inner.height);
        let start = self.cursor.saturating_sub(height.saturating_sub(1));
        let lines: Vec<Line> = self
            .rows
            .iter()
            .enumerate()
            .skip(start)
            .take(height)
            .map(|(i, row)| tree_line(row, i == self.cursor))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

/// Expansion marker and its color.
fn marker(row: &TreeRow) -> (&'static str, Style) {
    match row.record.expansion_state {
        ExpansionState::Loading => ("⟳ ", Style::default().fg(theme::ELECTRIC_YELLOW)),
        ExpansionState::Failed => ("✗ ", Style::default().fg(theme::ERROR_RED)),
        ExpansionState::Loaded if row.record.children.is_empty() => ("  ", theme::table_row()),
        ExpansionState::Loaded if row.is_open => ("▾ ", theme::table_row()),
        ExpansionState::Loaded | ExpansionState::Unloaded => ("▸ ", theme::table_row()),
    }
}

fn tree_line(row: &TreeRow, is_cursor: bool) -> Line<'static> {
    let (glyph, glyph_style) = marker(row);
    let label_style = if is_cursor {
        theme::table_selected()
    } else {
        theme::table_row()
    };
    let mut spans = vec![
        Span::raw("  ".repeat(row.depth)),
        Span::styled(glyph, glyph_style),
        Span::styled(row.record.label.clone(), label_style),
    ];
    if row.record.is_monitored {
        spans.push(Span::styled(" ●", theme::monitored()));
    }
    Line::from(spans)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use uaview_core::{ChildDescriptor, NodePatch};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    /// Root loaded with children A and B; A loaded with child A1.
    fn store() -> Arc<NodeStore> {
        let store = Arc::new(NodeStore::new(id("Root"), "Root"));
        let load = |parent: &str, children: &[&str]| {
            store
                .upsert(&id(parent), NodePatch::state(ExpansionState::Loading))
                .unwrap();
            store
                .set_children(
                    &id(parent),
                    children.iter().map(|c| ChildDescriptor::new(*c, *c)).collect(),
                )
                .unwrap();
        };
        load("Root", &["A", "B"]);
        load("A", &["A1"]);
        store
    }

    fn labels(pane: &TreePane) -> Vec<String> {
        pane.rows.iter().map(|r| r.record.label.clone()).collect()
    }

    #[test]
    fn root_starts_open_and_selected() {
        let pane = TreePane::new(store());
        assert_eq!(labels(&pane), ["Root", "A", "B"]);
        assert_eq!(pane.selected(), Some(&id("Root")));
    }

    #[test]
    fn moving_the_cursor_selects_nodes() {
        let mut pane = TreePane::new(store());
        let action = pane.handle_key_event(key(KeyCode::Down)).unwrap();
        assert_eq!(action, Some(Action::Select(id("A"))));

        let action = pane.handle_key_event(key(KeyCode::Char('k'))).unwrap();
        assert_eq!(action, Some(Action::Select(id("Root"))));

        // Already at the top.
        assert_eq!(pane.handle_key_event(key(KeyCode::Up)).unwrap(), None);
    }

    #[test]
    fn expand_opens_the_node_and_requests_children() {
        let mut pane = TreePane::new(store());
        pane.handle_key_event(key(KeyCode::Down)).unwrap();

        let action = pane.handle_key_event(key(KeyCode::Right)).unwrap();
        assert_eq!(action, Some(Action::Expand(id("A"))));
        assert_eq!(labels(&pane), ["Root", "A", "A1", "B"]);
    }

    #[test]
    fn left_closes_then_steps_to_parent() {
        let mut pane = TreePane::new(store());
        pane.handle_key_event(key(KeyCode::Down)).unwrap();
        pane.handle_key_event(key(KeyCode::Right)).unwrap();
        pane.handle_key_event(key(KeyCode::Down)).unwrap();
        assert_eq!(pane.selected(), Some(&id("A1")));

        let action = pane.handle_key_event(key(KeyCode::Left)).unwrap();
        assert_eq!(action, Some(Action::Select(id("A"))));

        assert_eq!(pane.handle_key_event(key(KeyCode::Left)).unwrap(), None);
        assert_eq!(labels(&pane), ["Root", "A", "B"]);
    }

    #[test]
    fn cursor_follows_the_selected_node_across_rebuilds() {
        let store = store();
        let mut pane = TreePane::new(Arc::clone(&store));
        pane.handle_key_event(key(KeyCode::End)).unwrap();
        assert_eq!(pane.selected(), Some(&id("B")));

        // Opening A above B inserts a row; B stays selected.
        pane.open.insert(id("A"));
        pane.update(&Action::TreeChanged).unwrap();
        assert_eq!(pane.selected(), Some(&id("B")));
        assert_eq!(pane.cursor, 3);
    }

    #[test]
    fn losing_the_selected_node_selects_its_replacement() {
        let store = store();
        let mut pane = TreePane::new(Arc::clone(&store));
        pane.handle_key_event(key(KeyCode::End)).unwrap();
        assert_eq!(pane.selected(), Some(&id("B")));

        // A forced refresh of Root no longer lists B.
        let reopen = NodePatch {
            expansion_state: Some(ExpansionState::Loading),
            force_refresh: true,
            ..NodePatch::default()
        };
        store.upsert(&id("Root"), reopen).unwrap();
        store
            .set_children(&id("Root"), vec![ChildDescriptor::new("A", "A")])
            .unwrap();

        let follow_up = pane.update(&Action::TreeChanged).unwrap();
        assert_eq!(follow_up, Some(Action::Select(id("A"))));
        assert_eq!(pane.selected(), Some(&id("A")));

        // Nothing moved on the next rebuild.
        assert_eq!(pane.update(&Action::TreeChanged).unwrap(), None);
    }

    #[test]
    fn refresh_targets_the_selected_node() {
        let mut pane = TreePane::new(store());
        let action = pane.handle_key_event(key(KeyCode::Char('r'))).unwrap();
        assert_eq!(action, Some(Action::Refresh(id("Root"))));
    }
}

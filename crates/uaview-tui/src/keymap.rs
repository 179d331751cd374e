//! Global key bindings. Anything not bound here goes to the focused pane.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use uaview_core::Command;

use crate::action::Action;

/// Key and description pairs for the help overlay and status bar.
pub const BINDINGS: &[(&str, &str)] = &[
    ("m", "monitor"),
    ("u", "unmonitor"),
    ("t", "tree"),
    ("l", "attributes"),
    ("i", "info log"),
    ("c", "clear log"),
    ("a", "alarms"),
    ("s", "statistics"),
    ("q", "quit"),
];

/// Navigation keys of the tree pane, for the help overlay.
pub const TREE_BINDINGS: &[(&str, &str)] = &[
    ("↑/↓ j/k", "move"),
    ("→", "expand"),
    ("Enter", "expand and show details"),
    ("←", "collapse / parent"),
    ("r", "refresh children"),
];

/// Map a key to a global action.
pub fn global_action(key: KeyEvent) -> Option<Action> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        return Some(Action::Command(Command::Exit));
    }
    if !(key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT) {
        return None;
    }
    let command = match key.code {
        KeyCode::Char('m') => Command::Monitor,
        KeyCode::Char('u') => Command::Unmonitor,
        KeyCode::Char('t') => Command::FocusTree,
        KeyCode::Char('l') => Command::FocusAttributes,
        KeyCode::Char('i') => Command::FocusLog,
        KeyCode::Char('c') => Command::ClearLog,
        KeyCode::Char('a') => Command::ToggleAlarms,
        KeyCode::Char('s') => Command::DumpStatistics,
        KeyCode::Char('q') => Command::Exit,
        KeyCode::Char('?') => return Some(Action::ToggleHelp),
        _ => return None,
    };
    Some(Action::Command(command))
}

//! Every UI action. Actions are the only way app and pane state changes.

use std::sync::Arc;

use uaview_core::{
    AttributePanel, Command, Focus, LogUpdate, NodeId, PanelState, RefreshOutcome, RenderedTable,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ── Lifecycle ──
    Quit,
    Tick,
    Render,
    ToggleHelp,

    // ── Explorer ──
    /// Cursor moved onto a node; its details follow after the debounce.
    Select(NodeId),
    /// Load the children of a node the tree pane just opened.
    Expand(NodeId),
    /// Show details right away and open the node.
    Activate(NodeId),
    /// Re-list children even if cached.
    Refresh(NodeId),

    // ── Commands ──
    Command(Command),

    // ── Data updates ──
    TreeChanged,
    PanelChanged(Arc<AttributePanel>),
    LogChanged(LogUpdate),
    TableUpdated(RenderedTable),
    DetailsRefreshed {
        node: NodeId,
        outcome: RefreshOutcome,
    },
    FocusChanged(Focus),
    AlarmPanelChanged(PanelState),
}

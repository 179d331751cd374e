//! Lazy address-space explorer and live-table reconciliation engine.
//!
//! This crate is the interactive core of the `uaview` terminal dashboard.
//! It never speaks a wire protocol itself; everything remote goes through
//! the [`SessionService`] trait.
//!
//! - **[`Dashboard`]**: Owns one explorer session: the node store, the
//!   engines below, the background tasks feeding them, and the optional
//!   alarm panel. Routes named [`Command`]s against the selected node.
//!
//! - **[`NodeStore`]**: `DashMap`-backed record store enforcing the
//!   expansion state machine, with a `watch` mutation counter for renders.
//!
//! - **[`ExpansionEngine`]**: On-demand child listing with at most one
//!   outstanding fetch per node; concurrent callers share its result.
//!
//! - **[`SelectionDebouncer`]** / **[`DetailBinder`]**: Coalesce rapid
//!   navigation into one attribute read and drop reads that finish after
//!   the user moved on.
//!
//! - **[`LiveTable`]**: Applies `Snapshot`/`Delta` events to a keyed row
//!   set and yields render-ready rows, never an empty table.
//!
//! - **[`LogSink`]**: The user-visible log pane, mirrored to `tracing`.

pub mod dashboard;
pub mod details;
pub mod error;
pub mod expansion;
pub mod format;
pub mod log_sink;
pub mod model;
pub mod selection;
pub mod session;
pub mod store;
pub mod table;
pub mod tree;

// ── Primary re-exports ──────────────────────────────────────────────
pub use dashboard::{
    Command, CommandOutcome, Dashboard, DashboardSettings, Focus, PanelState, UiEvent,
};
pub use details::{AttributePanel, AttributeRow, DetailBinder, RefreshOutcome};
pub use error::{CoreError, ServiceError};
pub use expansion::{ExpandPolicy, ExpansionEngine};
pub use log_sink::{LogCursor, LogSink, LogUpdate};
pub use model::{
    ExpansionState, NodeId, NodePatch, NodeRecord, TableEvent, TableKind, TableRow,
};
pub use selection::{Selection, SelectionDebouncer, SelectionState};
pub use session::{
    AttributeRecord, ChildDescriptor, SessionService, SessionStatistics, TableFeed,
};
pub use store::NodeStore;
pub use table::{LiveTable, RenderedTable};
pub use tree::{LazyNode, TreeRow, TreeSource, flatten_visible};

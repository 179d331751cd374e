// ── Live table reconciler ──
//
// Applies snapshot/delta events to an ordered, key-unique row set and
// produces the row sequence to render. Events are applied one at a time
// in arrival order; there is no batching and no validation.

use futures::StreamExt;
use indexmap::IndexMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::format::fit_row;
use crate::model::{TableEvent, TableKind, TableRow};
use crate::session::TableFeed;

/// Row substituted for an empty table. The terminal table widget does not
/// repaint on a transition to zero rows, so an empty table is never
/// rendered as empty.
pub const PLACEHOLDER_CELL: &str = " ";

/// Render-ready state of one table after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTable {
    pub kind: TableKind,
    /// Display fields per row; at least one row.
    pub rows: Vec<Vec<String>>,
    /// Reconciler revision this render was produced at.
    pub revision: u64,
    /// Rows whose content changed with this event.
    pub changed: usize,
    pub is_placeholder: bool,
}

impl RenderedTable {
    /// Rows with every field fitted to `column_width`.
    pub fn formatted(&self, column_width: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|fields| fit_row(fields, column_width))
            .collect()
    }
}

/// In-memory row set of one live table.
#[derive(Debug, Clone)]
pub struct LiveTable {
    kind: TableKind,
    rows: IndexMap<String, TableRow>,
    revision: u64,
}

impl LiveTable {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            rows: IndexMap::new(),
            revision: 0,
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.values()
    }

    /// Apply one event and return what to render.
    ///
    /// `Snapshot` replaces the row set in the order given. `Delta`
    /// replaces known keys in place and appends new keys. Rows whose
    /// fields did not change keep their revision.
    pub fn apply(&mut self, event: TableEvent) -> RenderedTable {
        self.revision += 1;
        let revision = self.revision;
        let mut changed = 0;

        match event {
            TableEvent::Snapshot(incoming) => {
                let mut next = IndexMap::with_capacity(incoming.len());
                for mut row in incoming {
                    match self.rows.get(&row.key) {
                        Some(old) if old.fields == row.fields => row.revision = old.revision,
                        _ => {
                            row.revision = revision;
                            changed += 1;
                        }
                    }
                    next.insert(row.key.clone(), row);
                }
                changed += self.rows.keys().filter(|k| !next.contains_key(*k)).count();
                self.rows = next;
            }
            TableEvent::Delta(incoming) => {
                for mut row in incoming {
                    if let Some(existing) = self.rows.get_mut(&row.key) {
                        if existing.fields != row.fields {
                            existing.fields = row.fields;
                            existing.revision = revision;
                            changed += 1;
                        }
                    } else {
                        row.revision = revision;
                        changed += 1;
                        self.rows.insert(row.key.clone(), row);
                    }
                }
            }
        }

        debug!(table = %self.kind, rows = self.rows.len(), changed, "table reconciled");
        self.render_with(changed)
    }

    /// Current render without applying anything.
    pub fn render(&self) -> RenderedTable {
        self.render_with(0)
    }

    fn render_with(&self, changed: usize) -> RenderedTable {
        let is_placeholder = self.rows.is_empty();
        let rows = if is_placeholder {
            vec![vec![PLACEHOLDER_CELL.to_owned()]]
        } else {
            self.rows.values().map(|r| r.fields.clone()).collect()
        };
        RenderedTable {
            kind: self.kind,
            rows,
            revision: self.revision,
            changed,
            is_placeholder,
        }
    }
}

/// Feed every event of `feed` through a fresh table, forwarding each
/// render to `out`, until the feed ends, `out` closes, or `cancel` fires.
pub async fn run_table_feed<T>(
    kind: TableKind,
    mut feed: TableFeed,
    out: mpsc::UnboundedSender<T>,
    cancel: CancellationToken,
) where
    T: From<RenderedTable>,
{
    let mut table = LiveTable::new(kind);
    if out.send(table.render().into()).is_err() {
        return;
    }

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            event = feed.next() => {
                let Some(event) = event else {
                    debug!(table = %kind, "table feed ended");
                    break;
                };
                if out.send(table.apply(event).into()).is_err() {
                    break;
                }
            }
        }
    }
}

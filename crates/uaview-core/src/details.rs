// ── Detail panel binder ──
//
// Fetches attributes for the selected node and publishes them as the
// attribute panel. A response is only shown if no navigation happened
// while it was in flight (last selection wins, not last response).

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::format::fit;
use crate::log_sink::LogSink;
use crate::model::NodeId;
use crate::selection::{Selection, SelectionState};
use crate::session::{AttributeRecord, SessionService};

/// Name column shown on continuation rows of multi-line values.
pub const CONTINUATION_PREFIX: &str = "   |    ";

/// Default width of the attribute name column.
pub const DEFAULT_LABEL_WIDTH: usize = 25;

/// One displayed line of the attribute panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRow {
    pub name: String,
    pub value: String,
}

/// Contents of the attribute panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributePanel {
    /// Node the rows belong to; `None` until the first refresh lands.
    pub node: Option<NodeId>,
    pub rows: Vec<AttributeRow>,
}

impl AttributePanel {
    pub fn from_attributes(node: NodeId, attributes: &[AttributeRecord]) -> Self {
        Self {
            node: Some(node),
            rows: attribute_rows(attributes),
        }
    }

    /// Render-ready lines: the name padded with `.` to `label_width`, then
    /// `": "`, then the value padded to `value_width`.
    pub fn render(&self, label_width: usize, value_width: usize) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                format!(
                    "{}: {}",
                    fit(&row.name, label_width, '.'),
                    fit(&row.value, value_width, ' ')
                )
            })
            .collect()
    }
}

/// Expand attributes into panel rows. A multi-line value becomes one row
/// with the attribute name plus one continuation row per further line.
pub fn attribute_rows(attributes: &[AttributeRecord]) -> Vec<AttributeRow> {
    let mut rows = Vec::with_capacity(attributes.len());
    for attribute in attributes {
        let mut lines = attribute.text.split('\n');
        rows.push(AttributeRow {
            name: attribute.name.clone(),
            value: lines.next().unwrap_or_default().to_owned(),
        });
        rows.extend(lines.map(|line| AttributeRow {
            name: CONTINUATION_PREFIX.to_owned(),
            value: line.to_owned(),
        }));
    }
    rows
}

/// What happened to one `refresh_details` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The panel now shows the node's attributes.
    Rendered,
    /// The selection moved while the fetch was in flight, or the node is
    /// not the selected one; result dropped.
    Stale { captured: u64, current: u64 },
    /// The node has no attributes; the panel was left as it was.
    Empty,
    /// The fetch failed; logged, panel left as it was.
    Failed,
}

/// Binds the attribute panel to the current selection.
#[derive(Clone)]
pub struct DetailBinder {
    session: Arc<dyn SessionService>,
    selection: Selection,
    panel: Arc<watch::Sender<Arc<AttributePanel>>>,
    log: LogSink,
}

impl DetailBinder {
    pub fn new(session: Arc<dyn SessionService>, selection: Selection, log: LogSink) -> Self {
        let (panel, _) = watch::channel(Arc::new(AttributePanel::default()));
        Self {
            session,
            selection,
            panel: Arc::new(panel),
            log,
        }
    }

    /// Read the attributes of `id` and publish them unless the selection
    /// changed in the meantime or no longer points at `id`.
    pub async fn refresh_details(&self, id: &NodeId) -> RefreshOutcome {
        let captured = self.selection.version();

        let attributes = match self.session.read_attributes(id).await {
            Ok(attributes) => attributes,
            Err(e) => {
                warn!(node = %id, error = %e, "attribute read failed");
                self.log.append(format!("cannot read attributes of {id}: {e}"));
                return RefreshOutcome::Failed;
            }
        };

        let SelectionState { selected, version: current } = self.selection.current();
        if current != captured || selected.as_ref() != Some(id) {
            debug!(node = %id, captured, current, "discarding stale attributes");
            return RefreshOutcome::Stale { captured, current };
        }
        if attributes.is_empty() {
            return RefreshOutcome::Empty;
        }

        self.panel
            .send_replace(Arc::new(AttributePanel::from_attributes(id.clone(), &attributes)));
        RefreshOutcome::Rendered
    }

    /// Current panel contents.
    pub fn panel(&self) -> Arc<AttributePanel> {
        self.panel.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AttributePanel>> {
        self.panel.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn multi_line_values_get_continuation_rows() {
        let rows = attribute_rows(&[
            AttributeRecord::new("BrowseName", "Pump"),
            AttributeRecord::new("Description", "line one\nline two\nline three"),
        ]);

        let flat: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.name.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(
            flat,
            [
                ("BrowseName", "Pump"),
                ("Description", "line one"),
                (CONTINUATION_PREFIX, "line two"),
                (CONTINUATION_PREFIX, "line three"),
            ]
        );
    }

    #[test]
    fn render_pads_name_with_dots_and_value_with_spaces() {
        let panel = AttributePanel::from_attributes(
            NodeId::from("n"),
            &[AttributeRecord::new("NodeClass", "Variable")],
        );
        assert_eq!(panel.render(12, 10), ["NodeClass...: Variable  "]);
    }

    #[test]
    fn empty_text_still_yields_one_row() {
        let rows = attribute_rows(&[AttributeRecord::new("Value", "")]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "");
    }
}

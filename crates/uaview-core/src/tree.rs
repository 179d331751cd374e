// ── Tree data source ──
//
// What the presentation layer sees of the explorer: a root descriptor,
// a lazy children resolver per node, and a flattened row list for the
// nodes the user has opened.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::expansion::ExpansionEngine;
use crate::model::{NodeId, NodeRecord};
use crate::store::NodeStore;

/// Entry point handed to the presentation layer.
#[derive(Clone)]
pub struct TreeSource {
    engine: ExpansionEngine,
}

impl TreeSource {
    pub fn new(engine: ExpansionEngine) -> Self {
        Self { engine }
    }

    /// The root node with its resolver attached.
    pub fn root(&self) -> Result<LazyNode, CoreError> {
        let store = self.engine.store();
        let record = store.get(store.root_id())?;
        Ok(LazyNode {
            record,
            engine: self.engine.clone(),
        })
    }

    /// Resolver for any node already in the store.
    pub fn node(&self, id: &NodeId) -> Result<LazyNode, CoreError> {
        Ok(LazyNode {
            record: self.engine.store().get(id)?,
            engine: self.engine.clone(),
        })
    }
}

/// A node record paired with the capability to resolve its children.
///
/// The record is a snapshot taken when the node was handed out.
#[derive(Clone)]
pub struct LazyNode {
    record: NodeRecord,
    engine: ExpansionEngine,
}

impl LazyNode {
    pub fn record(&self) -> &NodeRecord {
        &self.record
    }

    pub fn id(&self) -> &NodeId {
        &self.record.id
    }

    /// Expand this node. Children come back `Unloaded`, each with its own
    /// resolver; nothing below them is fetched.
    pub async fn children(&self) -> Result<Vec<LazyNode>, CoreError> {
        let records = self.engine.expand(&self.record.id).await?;
        Ok(records
            .into_iter()
            .map(|record| LazyNode {
                record,
                engine: self.engine.clone(),
            })
            .collect())
    }
}

/// One visible line of the tree pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub record: NodeRecord,
    /// Whether the user has this node open.
    pub is_open: bool,
}

/// Pre-order walk from the root, descending only into nodes in `open`
/// that are `Loaded`.
pub fn flatten_visible(store: &NodeStore, open: &HashSet<NodeId>) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    let mut path = Vec::new();
    walk(store, store.root_id(), 0, open, &mut path, &mut rows);
    rows
}

fn walk(
    store: &NodeStore,
    id: &NodeId,
    depth: usize,
    open: &HashSet<NodeId>,
    path: &mut Vec<NodeId>,
    rows: &mut Vec<TreeRow>,
) {
    // Address spaces are graphs; a reference back to an ancestor is shown
    // once and not descended into again.
    if path.contains(id) {
        return;
    }
    let Ok(record) = store.get(id) else {
        return;
    };
    let is_open = open.contains(id);
    let descend = is_open && record.expansion_state.is_loaded();
    let children = if descend {
        record.children.clone()
    } else {
        Vec::new()
    };

    rows.push(TreeRow {
        depth,
        record,
        is_open,
    });

    if descend {
        path.push(id.clone());
        for child in &children {
            walk(store, child, depth + 1, open, path, rows);
        }
        path.pop();
    }
}

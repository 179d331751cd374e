// ── Node record store ──
//
// Concurrent id -> record map with push-based change notification.
// Only the expansion engine mutates expansion state, and only while it
// holds the in-flight slot for that node id.

use dashmap::DashMap;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::model::{ExpansionState, NodeId, NodePatch, NodeRecord};
use crate::session::ChildDescriptor;

/// Owns every `NodeRecord` of one explorer tree, indexed by id.
///
/// Records are created when first referenced and live until the store
/// itself is dropped; there is no partial pruning.
pub struct NodeStore {
    records: DashMap<NodeId, NodeRecord>,
    root: NodeId,
    /// Bumped on every mutation so the render pass knows to rebuild.
    version: watch::Sender<u64>,
}

impl NodeStore {
    /// Create a store holding only the root record, `Unloaded`.
    pub fn new(root: NodeId, label: impl Into<String>) -> Self {
        let records = DashMap::new();
        records.insert(root.clone(), NodeRecord::new(root.clone(), label, None));
        let (version, _) = watch::channel(0u64);
        Self {
            records,
            root,
            version,
        }
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    pub fn get(&self, id: &NodeId) -> Result<NodeRecord, CoreError> {
        self.records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| CoreError::NotFound { id: id.clone() })
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge `patch` into the record for `id`, creating an `Unloaded`
    /// record first if the id is unknown.
    ///
    /// An expansion state change outside the transition table fails with
    /// `InvalidStateTransition` and leaves the record untouched.
    pub fn upsert(&self, id: &NodeId, patch: NodePatch) -> Result<NodeRecord, CoreError> {
        let mut entry = self.records.entry(id.clone()).or_insert_with(|| {
            let label = patch.label.clone().unwrap_or_else(|| id.to_string());
            NodeRecord::new(id.clone(), label, None)
        });
        let record = entry.value_mut();

        if let Some(next) = patch.expansion_state {
            let from = record.expansion_state;
            if !from.can_transition_to(next, patch.force_refresh) {
                return Err(CoreError::InvalidStateTransition {
                    id: id.clone(),
                    from,
                    to: next,
                });
            }
            record.expansion_state = next;
            if next != ExpansionState::Loaded {
                record.children.clear();
            }
        }
        if let Some(label) = patch.label {
            record.label = label;
        }
        if let Some(is_monitored) = patch.is_monitored {
            record.is_monitored = is_monitored;
        }

        let updated = record.clone();
        drop(entry);
        self.bump_version();
        Ok(updated)
    }

    /// Record the children of a node that is currently `Loading` and move
    /// it to `Loaded` in one step.
    ///
    /// Child ids not seen before get fresh `Unloaded` records with `id` as
    /// their parent. Ids already in the store keep their record as is, so
    /// a forced refresh never resets a subtree.
    pub fn set_children(
        &self,
        id: &NodeId,
        children: Vec<ChildDescriptor>,
    ) -> Result<Vec<NodeRecord>, CoreError> {
        self.ensure_loading(id)?;

        let mut child_ids = Vec::with_capacity(children.len());
        for child in children {
            self.records.entry(child.id.clone()).or_insert_with(|| {
                NodeRecord::new(child.id.clone(), child.label, Some(id.clone()))
            });
            child_ids.push(child.id);
        }

        {
            let mut parent = self
                .records
                .get_mut(id)
                .ok_or_else(|| CoreError::NotFound { id: id.clone() })?;
            parent.expansion_state = ExpansionState::Loaded;
            parent.children.clone_from(&child_ids);
        }
        self.bump_version();

        Ok(self.records_for(&child_ids))
    }

    /// Cached children of a `Loaded` node, in server order.
    pub fn children(&self, id: &NodeId) -> Result<Vec<NodeRecord>, CoreError> {
        let record = self.get(id)?;
        if record.expansion_state.is_loaded() {
            Ok(self.records_for(&record.children))
        } else {
            Ok(Vec::new())
        }
    }

    /// Parent record of `id`, if any.
    pub fn parent(&self, id: &NodeId) -> Option<NodeRecord> {
        let parent_id = self.records.get(id)?.parent.clone()?;
        self.get(&parent_id).ok()
    }

    /// Subscribe to the mutation counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// `set_children` is only valid on a node that is `Loading`.
    fn ensure_loading(&self, id: &NodeId) -> Result<(), CoreError> {
        let from = self.get(id)?.expansion_state;
        if from == ExpansionState::Loading {
            Ok(())
        } else {
            Err(CoreError::InvalidStateTransition {
                id: id.clone(),
                from,
                to: ExpansionState::Loaded,
            })
        }
    }

    fn records_for(&self, ids: &[NodeId]) -> Vec<NodeRecord> {
        ids.iter()
            .filter_map(|id| self.records.get(id).map(|r| r.value().clone()))
            .collect()
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> NodeStore {
        NodeStore::new(NodeId::from("RootFolder"), "RootFolder")
    }

    fn root() -> NodeId {
        NodeId::from("RootFolder")
    }

    #[test]
    fn new_store_holds_unloaded_root() {
        let store = store();
        let record = store.get(&root()).unwrap();
        assert_eq!(record.expansion_state, ExpansionState::Unloaded);
        assert!(record.is_root());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let err = store().get(&NodeId::from("nope")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn set_children_on_unloaded_node_is_rejected() {
        let store = store();
        let err = store
            .set_children(&root(), vec![ChildDescriptor::new("Objects", "Objects")])
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::InvalidStateTransition {
                from: ExpansionState::Unloaded,
                to: ExpansionState::Loaded,
                ..
            }
        ));
        let record = store.get(&root()).unwrap();
        assert!(record.children.is_empty());
        assert_eq!(record.expansion_state, ExpansionState::Unloaded);
        assert!(!store.contains(&NodeId::from("Objects")));
    }

    #[test]
    fn set_children_registers_unloaded_children_with_parent() {
        let store = store();
        store
            .upsert(&root(), NodePatch::state(ExpansionState::Loading))
            .unwrap();
        let children = store
            .set_children(
                &root(),
                vec![
                    ChildDescriptor::new("Objects", "Objects"),
                    ChildDescriptor::new("Types", "Types"),
                ],
            )
            .unwrap();

        let ids: Vec<_> = children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["Objects", "Types"]);
        assert!(
            children
                .iter()
                .all(|c| c.expansion_state == ExpansionState::Unloaded)
        );
        assert_eq!(store.get(&root()).unwrap().expansion_state, ExpansionState::Loaded);
        assert_eq!(store.parent(&NodeId::from("Types")).unwrap().id, root());
    }

    #[test]
    fn illegal_upsert_leaves_record_unchanged() {
        let store = store();
        let before = store.get(&root()).unwrap();
        let err = store
            .upsert(
                &root(),
                NodePatch {
                    label: Some("renamed".into()),
                    expansion_state: Some(ExpansionState::Loaded),
                    ..NodePatch::default()
                },
            )
            .unwrap_err();

        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
        assert_eq!(store.get(&root()).unwrap(), before);
    }

    #[test]
    fn loaded_node_reopens_only_with_force() {
        let store = store();
        store
            .upsert(&root(), NodePatch::state(ExpansionState::Loading))
            .unwrap();
        store.set_children(&root(), Vec::new()).unwrap();

        assert!(
            store
                .upsert(&root(), NodePatch::state(ExpansionState::Loading))
                .is_err()
        );
        let forced = NodePatch {
            expansion_state: Some(ExpansionState::Loading),
            force_refresh: true,
            ..NodePatch::default()
        };
        assert_eq!(
            store.upsert(&root(), forced).unwrap().expansion_state,
            ExpansionState::Loading
        );
    }

    #[test]
    fn refresh_keeps_existing_child_records() {
        let store = store();
        store
            .upsert(&root(), NodePatch::state(ExpansionState::Loading))
            .unwrap();
        store
            .set_children(&root(), vec![ChildDescriptor::new("Objects", "Objects")])
            .unwrap();
        store
            .upsert(&NodeId::from("Objects"), NodePatch::monitored(true))
            .unwrap();

        store
            .upsert(
                &root(),
                NodePatch {
                    expansion_state: Some(ExpansionState::Loading),
                    force_refresh: true,
                    ..NodePatch::default()
                },
            )
            .unwrap();
        store
            .set_children(
                &root(),
                vec![
                    ChildDescriptor::new("Objects", "Objects (renamed)"),
                    ChildDescriptor::new("Views", "Views"),
                ],
            )
            .unwrap();

        let objects = store.get(&NodeId::from("Objects")).unwrap();
        assert!(objects.is_monitored);
        assert_eq!(objects.label, "Objects");
        assert_eq!(store.children(&root()).unwrap().len(), 2);
    }

    #[test]
    fn mutations_bump_version() {
        let store = store();
        let rx = store.subscribe();
        let before = *rx.borrow();
        store
            .upsert(&root(), NodePatch::monitored(true))
            .unwrap();
        assert!(*rx.borrow() > before);
    }
}

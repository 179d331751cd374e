// ── Address-space node types ──

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── NodeId ──────────────────────────────────────────────────────────

/// Opaque node identifier, unique within one explorer tree.
///
/// The core never parses it; whatever the Session Service hands out is
/// echoed back verbatim on later calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

// ── ExpansionState ──────────────────────────────────────────────────

/// Where a node is in its lazy children lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum ExpansionState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl ExpansionState {
    /// The transition table.
    ///
    /// `Unloaded -> Loading -> {Loaded, Failed}`, `Failed -> Loading` is a
    /// retry, and `Loaded -> Loading` needs an explicit forced refresh.
    /// Staying in the same state is never a transition.
    pub fn can_transition_to(self, next: Self, force_refresh: bool) -> bool {
        match (self, next) {
            (Self::Unloaded | Self::Failed, Self::Loading)
            | (Self::Loading, Self::Loaded | Self::Failed) => true,
            (Self::Loaded, Self::Loading) => force_refresh,
            _ => false,
        }
    }

    /// Whether the node has (possibly cached) children to show.
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded)
    }
}

// ── NodeRecord ──────────────────────────────────────────────────────

/// One address-space entity as held by the node store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub label: String,
    pub expansion_state: ExpansionState,
    /// Ordered child ids. Only meaningful while `expansion_state` is
    /// `Loaded`; empty otherwise.
    pub children: Vec<NodeId>,
    pub is_monitored: bool,
    /// Lookup-only back reference. `None` for the root.
    pub parent: Option<NodeId>,
}

impl NodeRecord {
    pub fn new(id: NodeId, label: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            id,
            label: label.into(),
            expansion_state: ExpansionState::Unloaded,
            children: Vec::new(),
            is_monitored: false,
            parent,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Partial update merged into a record by `NodeStore::upsert`.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub label: Option<String>,
    pub expansion_state: Option<ExpansionState>,
    pub is_monitored: Option<bool>,
    /// Permits `Loaded -> Loading`.
    pub force_refresh: bool,
}

impl NodePatch {
    pub fn state(state: ExpansionState) -> Self {
        Self {
            expansion_state: Some(state),
            ..Self::default()
        }
    }

    pub fn monitored(is_monitored: bool) -> Self {
        Self {
            is_monitored: Some(is_monitored),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExpansionState::{Failed, Loaded, Loading, Unloaded};

    #[test]
    fn transition_table_without_force() {
        assert!(Unloaded.can_transition_to(Loading, false));
        assert!(Loading.can_transition_to(Loaded, false));
        assert!(Loading.can_transition_to(Failed, false));
        assert!(Failed.can_transition_to(Loading, false));

        assert!(!Unloaded.can_transition_to(Loaded, false));
        assert!(!Loaded.can_transition_to(Loading, false));
        assert!(!Loading.can_transition_to(Loading, false));
        assert!(!Failed.can_transition_to(Loaded, false));
        assert!(!Loaded.can_transition_to(Unloaded, false));
    }

    #[test]
    fn forced_refresh_only_reopens_loaded() {
        assert!(Loaded.can_transition_to(Loading, true));
        assert!(!Loading.can_transition_to(Loading, true));
        assert!(!Loaded.can_transition_to(Failed, true));
    }

    #[test]
    fn node_id_round_trips_through_display() {
        let id = NodeId::from("ns=2;s=Demo.Dynamic.Scalar");
        assert_eq!(id.to_string(), "ns=2;s=Demo.Dynamic.Scalar");
        assert_eq!(id, NodeId::from(String::from("ns=2;s=Demo.Dynamic.Scalar")));
    }
}

// ── Expansion engine ──
//
// Resolves a node's children on demand. Every node id has at most one
// outstanding child listing; later callers join it instead of issuing a
// second Session Service call.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::log_sink::LogSink;
use crate::model::{ExpansionState, NodeId, NodePatch, NodeRecord};
use crate::session::SessionService;
use crate::store::NodeStore;

type ChildrenResult = Result<Vec<NodeRecord>, CoreError>;
type SharedFetch = Shared<BoxFuture<'static, ChildrenResult>>;

/// Whether an already `Loaded` node may be listed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpandPolicy {
    /// Serve `Loaded` nodes from the store.
    #[default]
    Cached,
    /// Re-list children even if the node is `Loaded`.
    Force,
}

/// Drives lazy expansion of the node store.
///
/// Cheaply cloneable; all clones share the in-flight table.
#[derive(Clone)]
pub struct ExpansionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: Arc<NodeStore>,
    session: Arc<dyn SessionService>,
    log: LogSink,
    /// One entry per node with a listing outstanding. Holding the entry is
    /// the implicit Loading lock for that id.
    in_flight: DashMap<NodeId, SharedFetch>,
}

impl ExpansionEngine {
    pub fn new(store: Arc<NodeStore>, session: Arc<dyn SessionService>, log: LogSink) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                session,
                log,
                in_flight: DashMap::new(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<NodeStore> {
        &self.inner.store
    }

    /// Children of `id`, fetching them if the node is not `Loaded` yet.
    pub async fn expand(&self, id: &NodeId) -> ChildrenResult {
        self.expand_with(id, ExpandPolicy::Cached).await
    }

    /// Re-list the children of `id` even if it is already `Loaded`.
    pub async fn refresh(&self, id: &NodeId) -> ChildrenResult {
        self.expand_with(id, ExpandPolicy::Force).await
    }

    /// Expand `id` under `policy`.
    ///
    /// - `Loading`: joins the outstanding fetch and returns its result.
    /// - `Loaded` (cached policy): returns the stored children without
    ///   suspending on the session.
    /// - `Unloaded` / `Failed` (or forced): moves to `Loading` and lists
    ///   children through the Session Service.
    pub async fn expand_with(&self, id: &NodeId, policy: ExpandPolicy) -> ChildrenResult {
        let fetch = match self.inner.in_flight.entry(id.clone()) {
            Entry::Occupied(slot) => {
                debug!(node = %id, "joining outstanding expansion");
                slot.get().clone()
            }
            Entry::Vacant(slot) => {
                let record = self.inner.store.get(id)?;
                if record.expansion_state.is_loaded() && policy == ExpandPolicy::Cached {
                    return self.inner.store.children(id);
                }

                self.inner.store.upsert(
                    id,
                    NodePatch {
                        expansion_state: Some(ExpansionState::Loading),
                        force_refresh: policy == ExpandPolicy::Force,
                        ..NodePatch::default()
                    },
                )?;

                debug!(node = %id, ?policy, "listing children");
                let fetch = list_children(Arc::clone(&self.inner), id.clone())
                    .boxed()
                    .shared();
                slot.insert(fetch.clone());
                fetch
            }
        };

        fetch.await
    }

    /// Whether a listing for `id` is outstanding.
    pub fn is_loading(&self, id: &NodeId) -> bool {
        self.inner.in_flight.contains_key(id)
    }
}

/// The single Session Service call behind one expansion.
///
/// The store is updated before the in-flight slot is released, so a
/// caller arriving in between sees `Loaded`/`Failed`, never a `Loading`
/// node without a fetch to join.
async fn list_children(inner: Arc<EngineInner>, id: NodeId) -> ChildrenResult {
    let outcome = match inner.session.list_children(&id).await {
        Ok(children) => {
            debug!(node = %id, count = children.len(), "children listed");
            inner.store.set_children(&id, children)
        }
        Err(cause) => {
            warn!(node = %id, error = %cause, "expansion failed");
            inner.log.append(format!("cannot expand {id}: {cause}"));
            Err(CoreError::ExpansionFailed {
                node_id: id.clone(),
                cause,
            })
        }
    };

    if outcome.is_err() {
        if let Err(e) = inner
            .store
            .upsert(&id, NodePatch::state(ExpansionState::Failed))
        {
            warn!(node = %id, error = %e, "could not mark node failed");
        }
    }

    inner.in_flight.remove(&id);
    outcome
}

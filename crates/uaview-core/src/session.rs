// ── Session Service boundary ──
//
// The remote protocol (discovery, subscriptions, session management,
// reconnection) lives behind this trait. The core only ever calls
// through it and never retries on its behalf.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::model::{NodeId, TableEvent};

/// A child reference returned by `list_children`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildDescriptor {
    pub id: NodeId,
    pub label: String,
}

impl ChildDescriptor {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// One attribute of a node as read from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub name: String,
    /// Display text, possibly spanning several lines.
    pub text: String,
}

impl AttributeRecord {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Transport counters reported by the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub transaction_count: u64,
    pub sent_bytes: u64,
    pub received_bytes: u64,
    pub token_renewal_count: u64,
    pub reconnection_count: u64,
}

/// Ordered stream of snapshot/delta events for one live table.
pub type TableFeed = BoxStream<'static, TableEvent>;

/// The remote collaborator the explorer is built on.
///
/// Implementations must be cheap to share (`Arc<dyn SessionService>`).
#[async_trait]
pub trait SessionService: Send + Sync + 'static {
    /// Ordered children of `node`.
    async fn list_children(&self, node: &NodeId) -> Result<Vec<ChildDescriptor>, ServiceError>;

    /// Ordered attributes of `node`.
    async fn read_attributes(&self, node: &NodeId) -> Result<Vec<AttributeRecord>, ServiceError>;

    /// Start monitoring `node`. Not idempotent; callers guard against
    /// double monitoring.
    async fn monitor(&self, node: &NodeId) -> Result<(), ServiceError>;

    async fn unmonitor(&self, node: &NodeId) -> Result<(), ServiceError>;

    /// Event stream for the subscribed-items table.
    fn subscribed_items(&self) -> TableFeed;

    /// Start alarm/condition monitoring and return its event stream.
    /// Called at most once per dashboard.
    async fn subscribe_alarms(&self) -> Result<TableFeed, ServiceError>;

    fn statistics(&self) -> SessionStatistics;

    async fn disconnect(&self) -> Result<(), ServiceError>;
}

// ── Live table types ──

use serde::{Deserialize, Serialize};
use strum::Display;

/// Which live table a row set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum TableKind {
    #[strum(to_string = "Monitored Items")]
    SubscribedItems,
    #[strum(to_string = "Alarms - Conditions")]
    Alarms,
}

impl TableKind {
    /// Column headers shown above the rows.
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Self::SubscribedItems => &["Node", "Value", "Status", "Timestamp"],
            Self::Alarms => &[
                "EventType",
                "ConditionId",
                "Message",
                "Severity",
                "E!AC",
                "Comment",
            ],
        }
    }
}

/// One row of a live table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    /// Server-assigned identity of the item or condition.
    pub key: String,
    pub fields: Vec<String>,
    /// Reconciler-assigned marker of the event that last changed this
    /// row. Never displayed.
    #[serde(default)]
    pub revision: u64,
}

impl TableRow {
    pub fn new(key: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            key: key.into(),
            fields,
            revision: 0,
        }
    }
}

/// Update pushed by the Session Service for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableEvent {
    /// Full replacement of the row set.
    Snapshot(Vec<TableRow>),
    /// Merge by key: known keys replaced in place, new keys appended.
    Delta(Vec<TableRow>),
}

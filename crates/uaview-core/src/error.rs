// ── Core error types ──
//
// Session Service failures are recoverable and end up in the log sink.
// Store misuse is a programmer error: fatal to the call, never to the
// process. A discarded stale detail fetch is not an error at all and has
// no variant here (see `details::RefreshOutcome`).

use thiserror::Error;

use crate::model::{ExpansionState, NodeId};

/// Failure reported by the Session Service collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{operation} failed: {message}")]
    Failed { operation: String, message: String },

    #[error("Session is not connected")]
    NotConnected,

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl ServiceError {
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Unified error type for the core crate.
///
/// `Clone` because a single shared expansion result is handed to every
/// caller waiting on the same node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Node not found: {id}")]
    NotFound { id: NodeId },

    #[error("Invalid state transition for {id}: {from} -> {to}")]
    InvalidStateTransition {
        id: NodeId,
        from: ExpansionState,
        to: ExpansionState,
    },

    #[error("Cannot expand {node_id}: {cause}")]
    ExpansionFailed { node_id: NodeId, cause: ServiceError },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl CoreError {
    /// Whether re-invoking the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExpansionFailed { .. } | Self::Service(_))
    }
}

// ── Domain model ──
//
// Canonical types shared by the explorer engines and the presentation
// layer. Nothing in here talks to the Session Service.

pub mod node;
pub mod table;

pub use node::{ExpansionState, NodeId, NodePatch, NodeRecord};
pub use table::{TableEvent, TableKind, TableRow};

//! Simulated Session Service.
//!
//! An in-process address space (Objects, Types, Views with nested folders
//! and variables) answered with artificial latency. Monitored variables
//! tick new values every second as `Delta` events, and the alarm feed
//! cycles through a handful of conditions. Lets the dashboard run without
//! a remote server.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use strum::Display;
use tokio::sync::mpsc;
use tracing::debug;

use uaview_core::{
    AttributeRecord, ChildDescriptor, NodeId, ServiceError, SessionService, SessionStatistics,
    TableEvent, TableFeed, TableRow,
};

/// Id of the address-space root.
pub const ROOT: &str = "RootFolder";

const BROWSE_LATENCY: Duration = Duration::from_millis(120);
const VALUE_PERIOD: Duration = Duration::from_secs(1);
const ALARM_PERIOD: Duration = Duration::from_secs(4);
const DISCONNECT_LATENCY: Duration = Duration::from_millis(250);

/// Rough request and response sizes for the transport counters.
const REQUEST_BYTES: u64 = 96;
const RESPONSE_BYTES_PER_ITEM: u64 = 48;

// ── Address space ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum NodeClass {
    Object,
    Variable,
}

#[derive(Debug, Clone)]
struct DemoNode {
    label: String,
    class: NodeClass,
    children: Vec<NodeId>,
    description: String,
    data_type: Option<&'static str>,
}

#[derive(Default)]
struct AddressSpace {
    nodes: HashMap<NodeId, DemoNode>,
}

impl AddressSpace {
    fn demo() -> Self {
        let mut space = Self::default();
        space.object(None, ROOT, "Root", "The root of the server address space.");
        space.object(Some(ROOT), "Objects", "Objects", "Browse entry point for object instances.");
        space.object(Some(ROOT), "Types", "Types", "Browse entry point for type definitions.");
        space.object(Some(ROOT), "Views", "Views", "Browse entry point for views.");

        for folder in ["ObjectTypes", "VariableTypes", "DataTypes", "ReferenceTypes"] {
            space.object(Some("Types"), folder, folder, "");
        }

        space.object(Some("Objects"), "Server", "Server", "Server status and capabilities.");
        space.variable("Server", "Server.ServiceLevel", "ServiceLevel", "Byte");
        space.variable("Server", "Server.CurrentTime", "CurrentTime", "DateTime");

        space.object(Some("Objects"), "Demo", "Demo", "Simulation data.");
        space.object(Some("Demo"), "Demo.Dynamic", "Dynamic", "Values that change every second.");
        space.object(Some("Demo.Dynamic"), "Demo.Dynamic.Scalar", "Scalar", "");
        for (label, data_type) in [
            ("Double", "Double"),
            ("Float", "Float"),
            ("Int32", "Int32"),
            ("Boolean", "Boolean"),
        ] {
            space.variable(
                "Demo.Dynamic.Scalar",
                &format!("Demo.Dynamic.Scalar.{label}"),
                label,
                data_type,
            );
        }

        space.object(Some("Objects"), "Plant", "Plant", "Feed line 1.");
        for n in 1..=3 {
            let pump = format!("Plant.Pump_{n:02}");
            space.object(
                Some("Plant"),
                &pump,
                &format!("Pump_{n:02}"),
                "Centrifugal feed pump.\nRated 15 kW at 2900 rpm.\nMaintenance every 4000 h.",
            );
            space.variable(&pump, &format!("{pump}.Speed"), "Speed", "Double");
            space.variable(&pump, &format!("{pump}.Temperature"), "Temperature", "Double");
            space.variable(&pump, &format!("{pump}.Running"), "Running", "Boolean");
        }
        space
    }

    fn object(&mut self, parent: Option<&str>, id: &str, label: &str, description: &str) {
        self.insert(parent, id, DemoNode {
            label: label.into(),
            class: NodeClass::Object,
            children: Vec::new(),
            description: description.into(),
            data_type: None,
        });
    }

    fn variable(&mut self, parent: &str, id: &str, label: &str, data_type: &'static str) {
        self.insert(Some(parent), id, DemoNode {
            label: label.into(),
            class: NodeClass::Variable,
            children: Vec::new(),
            description: String::new(),
            data_type: Some(data_type),
        });
    }

    fn insert(&mut self, parent: Option<&str>, id: &str, node: DemoNode) {
        let id = NodeId::from(id);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&NodeId::from(p))) {
            parent.children.push(id.clone());
        }
        self.nodes.insert(id, node);
    }

    fn get(&self, id: &NodeId, operation: &str) -> Result<&DemoNode, ServiceError> {
        self.nodes
            .get(id)
            .ok_or_else(|| ServiceError::failed(operation, "BadNodeIdUnknown"))
    }
}

/// Simulated value of a variable at `tick`.
fn sample(id: &NodeId, data_type: Option<&str>, tick: u32) -> String {
    let phase = f64::from(u32::try_from(id.as_str().len()).unwrap_or(0));
    let wave = (f64::from(tick) * PI / 8.0 + phase).sin();
    match data_type {
        Some("Boolean") => (wave >= 0.0).to_string(),
        Some("Int32" | "Byte") => format!("{:.0}", 100.0 + 50.0 * wave),
        Some("DateTime") => chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => format!("{:.3}", 50.0 + 25.0 * wave),
    }
}

// ── Monitored values ────────────────────────────────────────────────

/// Monitored variables plus the simulation clock, shared with the feed.
struct ValueFeed {
    space: Arc<AddressSpace>,
    monitored: Mutex<Vec<NodeId>>,
    tick: AtomicU32,
}

impl ValueFeed {
    fn monitored(&self) -> MutexGuard<'_, Vec<NodeId>> {
        self.monitored.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current row of every monitored variable.
    fn rows(&self) -> Vec<TableRow> {
        let tick = self.tick.load(Ordering::Relaxed);
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        self.monitored()
            .iter()
            .filter_map(|id| {
                let node = self.space.nodes.get(id)?;
                Some(TableRow::new(
                    id.as_str(),
                    vec![
                        node.label.clone(),
                        sample(id, node.data_type, tick),
                        "Good".into(),
                        timestamp.clone(),
                    ],
                ))
            })
            .collect()
    }

    fn advance(&self) -> Vec<TableRow> {
        self.tick.fetch_add(1, Ordering::Relaxed);
        self.rows()
    }
}

// ── Alarms ──────────────────────────────────────────────────────────

const CONDITIONS: &[(&str, &str, &str)] = &[
    ("Plant.Pump_01.Overheat", "Temperature above limit", "OffNormalAlarmType"),
    ("Plant.Pump_02.DryRun", "Suction pressure low", "DiscreteAlarmType"),
    ("Plant.Pump_03.Vibration", "Vibration above limit", "LimitAlarmType"),
];

/// The `n`th alarm event: conditions take turns, and each one cycles
/// through active, acknowledged and back to normal.
fn alarm_row(n: u32) -> Option<TableRow> {
    let count = u32::try_from(CONDITIONS.len()).ok()?;
    let index = usize::try_from(n % count).ok()?;
    let (condition, message, event_type) = CONDITIONS.get(index)?;
    let (severity, flags, comment) = match (n / count) % 3 {
        0 => ("800", "1!10", ""),
        1 => ("800", "1!11", "acknowledged by operator"),
        _ => ("100", "1!01", "returned to normal"),
    };
    Some(TableRow::new(
        *condition,
        vec![
            (*event_type).into(),
            (*condition).into(),
            (*message).into(),
            severity.into(),
            flags.into(),
            comment.into(),
        ],
    ))
}

// ── Session ─────────────────────────────────────────────────────────

/// In-process stand-in for a remote session.
pub struct DemoSession {
    space: Arc<AddressSpace>,
    values: Arc<ValueFeed>,
    latency: Duration,
    connected: AtomicBool,
    items_tx: mpsc::UnboundedSender<TableEvent>,
    items_rx: Mutex<Option<mpsc::UnboundedReceiver<TableEvent>>>,
    transactions: AtomicU64,
    sent_bytes: AtomicU64,
    received_bytes: AtomicU64,
}

impl DemoSession {
    pub fn new() -> Self {
        Self::with_latency(BROWSE_LATENCY)
    }

    /// Every request waits `latency` before it is answered.
    pub fn with_latency(latency: Duration) -> Self {
        let space = Arc::new(AddressSpace::demo());
        let (items_tx, items_rx) = mpsc::unbounded_channel();
        Self {
            values: Arc::new(ValueFeed {
                space: Arc::clone(&space),
                monitored: Mutex::new(Vec::new()),
                tick: AtomicU32::new(0),
            }),
            space,
            latency,
            connected: AtomicBool::new(true),
            items_tx,
            items_rx: Mutex::new(Some(items_rx)),
            transactions: AtomicU64::new(0),
            sent_bytes: AtomicU64::new(0),
            received_bytes: AtomicU64::new(0),
        }
    }

    /// Count one round trip and simulate its latency.
    async fn round_trip(&self, items: usize) -> Result<(), ServiceError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(ServiceError::NotConnected);
        }
        tokio::time::sleep(self.latency).await;
        let items = u64::try_from(items).unwrap_or(u64::MAX);
        self.transactions.fetch_add(1, Ordering::Relaxed);
        self.sent_bytes.fetch_add(REQUEST_BYTES, Ordering::Relaxed);
        self.received_bytes.fetch_add(
            REQUEST_BYTES + items.saturating_mul(RESPONSE_BYTES_PER_ITEM),
            Ordering::Relaxed,
        );
        Ok(())
    }

    fn publish_items(&self) {
        let _ = self.items_tx.send(TableEvent::Snapshot(self.values.rows()));
    }
}

impl Default for DemoSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionService for DemoSession {
    async fn list_children(&self, node: &NodeId) -> Result<Vec<ChildDescriptor>, ServiceError> {
        let demo = self.space.get(node, "browse")?;
        self.round_trip(demo.children.len()).await?;
        Ok(demo
            .children
            .iter()
            .filter_map(|id| {
                let child = self.space.nodes.get(id)?;
                Some(ChildDescriptor::new(id.clone(), child.label.clone()))
            })
            .collect())
    }

    async fn read_attributes(&self, node: &NodeId) -> Result<Vec<AttributeRecord>, ServiceError> {
        let demo = self.space.get(node, "read")?;
        let mut attributes = vec![
            AttributeRecord::new("NodeId", node.as_str()),
            AttributeRecord::new("NodeClass", demo.class.to_string()),
            AttributeRecord::new("BrowseName", demo.label.clone()),
            AttributeRecord::new("DisplayName", demo.label.clone()),
        ];
        if !demo.description.is_empty() {
            attributes.push(AttributeRecord::new("Description", demo.description.clone()));
        }
        if let Some(data_type) = demo.data_type {
            let tick = self.values.tick.load(Ordering::Relaxed);
            attributes.push(AttributeRecord::new("DataType", data_type));
            attributes.push(AttributeRecord::new("Value", sample(node, Some(data_type), tick)));
            attributes.push(AttributeRecord::new("AccessLevel", "CurrentRead"));
        }
        self.round_trip(attributes.len()).await?;
        Ok(attributes)
    }

    async fn monitor(&self, node: &NodeId) -> Result<(), ServiceError> {
        let demo = self.space.get(node, "monitor")?;
        if demo.class != NodeClass::Variable {
            return Err(ServiceError::failed("monitor", "BadAttributeIdInvalid"));
        }
        self.round_trip(1).await?;
        self.values.monitored().push(node.clone());
        self.publish_items();
        debug!(%node, "monitoring");
        Ok(())
    }

    async fn unmonitor(&self, node: &NodeId) -> Result<(), ServiceError> {
        self.round_trip(1).await?;
        self.values.monitored().retain(|id| id != node);
        self.publish_items();
        debug!(%node, "stopped monitoring");
        Ok(())
    }

    fn subscribed_items(&self) -> TableFeed {
        let rx = self
            .items_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let changes = match rx {
            Some(rx) => futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            })
            .boxed(),
            None => futures::stream::empty().boxed(),
        };

        let ticks = futures::stream::unfold(Arc::clone(&self.values), |values| async move {
            loop {
                tokio::time::sleep(VALUE_PERIOD).await;
                let rows = values.advance();
                if !rows.is_empty() {
                    return Some((TableEvent::Delta(rows), values));
                }
            }
        });

        futures::stream::select(changes, ticks).boxed()
    }

    async fn subscribe_alarms(&self) -> Result<TableFeed, ServiceError> {
        self.round_trip(0).await?;
        let feed = futures::stream::unfold(0u32, |n| async move {
            tokio::time::sleep(ALARM_PERIOD).await;
            let row = alarm_row(n)?;
            Some((TableEvent::Delta(vec![row]), n.wrapping_add(1)))
        });
        Ok(feed.boxed())
    }

    fn statistics(&self) -> SessionStatistics {
        SessionStatistics {
            transaction_count: self.transactions.load(Ordering::Relaxed),
            sent_bytes: self.sent_bytes.load(Ordering::Relaxed),
            received_bytes: self.received_bytes.load(Ordering::Relaxed),
            token_renewal_count: 0,
            reconnection_count: 0,
        }
    }

    async fn disconnect(&self) -> Result<(), ServiceError> {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return Err(ServiceError::NotConnected);
        }
        tokio::time::sleep(DISCONNECT_LATENCY).await;
        Ok(())
    }
}

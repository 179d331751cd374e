// Scriptable in-memory Session Service shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};

use uaview_core::{
    AttributeRecord, ChildDescriptor, NodeId, ServiceError, SessionService, SessionStatistics,
    TableEvent, TableFeed,
};

pub struct FakeSession {
    children: Mutex<HashMap<NodeId, Vec<ChildDescriptor>>>,
    attributes: Mutex<HashMap<NodeId, Vec<AttributeRecord>>>,
    attribute_delays: Mutex<HashMap<NodeId, Duration>>,
    failing_attributes: Mutex<HashSet<NodeId>>,
    gates: Mutex<HashMap<NodeId, oneshot::Receiver<()>>>,
    fail_next_list: Mutex<HashSet<NodeId>>,
    list_calls: Mutex<HashMap<NodeId, usize>>,
    monitor_calls: AtomicUsize,
    unmonitor_calls: AtomicUsize,
    alarm_attempts: AtomicUsize,
    fail_alarms: AtomicBool,
    disconnect_calls: AtomicUsize,
    disconnect_delay: Mutex<Duration>,
    items_tx: mpsc::UnboundedSender<TableEvent>,
    items_rx: Mutex<Option<mpsc::UnboundedReceiver<TableEvent>>>,
    alarms_tx: mpsc::UnboundedSender<TableEvent>,
    alarms_rx: Mutex<Option<mpsc::UnboundedReceiver<TableEvent>>>,
    statistics: Mutex<SessionStatistics>,
}

impl FakeSession {
    pub fn new() -> Self {
        let (items_tx, items_rx) = mpsc::unbounded_channel();
        let (alarms_tx, alarms_rx) = mpsc::unbounded_channel();
        Self {
            children: Mutex::default(),
            attributes: Mutex::default(),
            attribute_delays: Mutex::default(),
            failing_attributes: Mutex::default(),
            gates: Mutex::default(),
            fail_next_list: Mutex::default(),
            list_calls: Mutex::default(),
            monitor_calls: AtomicUsize::new(0),
            unmonitor_calls: AtomicUsize::new(0),
            alarm_attempts: AtomicUsize::new(0),
            fail_alarms: AtomicBool::new(false),
            disconnect_calls: AtomicUsize::new(0),
            disconnect_delay: Mutex::new(Duration::ZERO),
            items_tx,
            items_rx: Mutex::new(Some(items_rx)),
            alarms_tx,
            alarms_rx: Mutex::new(Some(alarms_rx)),
            statistics: Mutex::default(),
        }
    }

    // ── Scripting ───────────────────────────────────────────────────

    pub fn set_children(&self, parent: &str, children: &[&str]) {
        let children = children
            .iter()
            .map(|c| ChildDescriptor::new(*c, *c))
            .collect();
        self.children
            .lock()
            .unwrap()
            .insert(NodeId::from(parent), children);
    }

    pub fn set_attributes(&self, node: &str, attributes: &[(&str, &str)]) {
        let attributes = attributes
            .iter()
            .map(|(name, text)| AttributeRecord::new(*name, *text))
            .collect();
        self.attributes
            .lock()
            .unwrap()
            .insert(NodeId::from(node), attributes);
    }

    pub fn delay_attributes(&self, node: &str, delay: Duration) {
        self.attribute_delays
            .lock()
            .unwrap()
            .insert(NodeId::from(node), delay);
    }

    /// Make every attribute read of `node` fail.
    pub fn fail_attributes(&self, node: &str) {
        self.failing_attributes
            .lock()
            .unwrap()
            .insert(NodeId::from(node));
    }

    /// Hold the next child listing of `node` until the sender fires.
    pub fn gate_children(&self, node: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(NodeId::from(node), rx);
        tx
    }

    pub fn fail_next_list(&self, node: &str) {
        self.fail_next_list
            .lock()
            .unwrap()
            .insert(NodeId::from(node));
    }

    pub fn fail_alarms(&self, fail: bool) {
        self.fail_alarms.store(fail, Ordering::SeqCst);
    }

    pub fn delay_disconnect(&self, delay: Duration) {
        *self.disconnect_delay.lock().unwrap() = delay;
    }

    pub fn set_statistics(&self, statistics: SessionStatistics) {
        *self.statistics.lock().unwrap() = statistics;
    }

    pub fn push_items(&self, event: TableEvent) {
        self.items_tx.send(event).unwrap();
    }

    pub fn push_alarms(&self, event: TableEvent) {
        self.alarms_tx.send(event).unwrap();
    }

    // ── Observation ─────────────────────────────────────────────────

    pub fn list_calls(&self, node: &str) -> usize {
        self.list_calls
            .lock()
            .unwrap()
            .get(&NodeId::from(node))
            .copied()
            .unwrap_or(0)
    }

    pub fn monitor_calls(&self) -> usize {
        self.monitor_calls.load(Ordering::SeqCst)
    }

    pub fn unmonitor_calls(&self) -> usize {
        self.unmonitor_calls.load(Ordering::SeqCst)
    }

    pub fn alarm_attempts(&self) -> usize {
        self.alarm_attempts.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

/// The fake as the trait object the core consumes.
pub fn as_session(fake: &Arc<FakeSession>) -> Arc<dyn SessionService> {
    fake.clone()
}

fn channel_feed(rx: Option<mpsc::UnboundedReceiver<TableEvent>>) -> TableFeed {
    match rx {
        Some(rx) => futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed(),
        None => futures::stream::empty().boxed(),
    }
}

#[async_trait]
impl SessionService for FakeSession {
    async fn list_children(&self, node: &NodeId) -> Result<Vec<ChildDescriptor>, ServiceError> {
        *self
            .list_calls
            .lock()
            .unwrap()
            .entry(node.clone())
            .or_default() += 1;

        let gate = self.gates.lock().unwrap().remove(node);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.fail_next_list.lock().unwrap().remove(node) {
            return Err(ServiceError::failed("browse", "BadCommunicationError"));
        }
        Ok(self
            .children
            .lock()
            .unwrap()
            .get(node)
            .cloned()
            .unwrap_or_default())
    }

    async fn read_attributes(&self, node: &NodeId) -> Result<Vec<AttributeRecord>, ServiceError> {
        let delay = self.attribute_delays.lock().unwrap().get(node).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_attributes.lock().unwrap().contains(node) {
            return Err(ServiceError::failed("read", "BadNodeIdUnknown"));
        }
        Ok(self
            .attributes
            .lock()
            .unwrap()
            .get(node)
            .cloned()
            .unwrap_or_default())
    }

    async fn monitor(&self, _node: &NodeId) -> Result<(), ServiceError> {
        self.monitor_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn unmonitor(&self, _node: &NodeId) -> Result<(), ServiceError> {
        self.unmonitor_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribed_items(&self) -> TableFeed {
        channel_feed(self.items_rx.lock().unwrap().take())
    }

    async fn subscribe_alarms(&self) -> Result<TableFeed, ServiceError> {
        self.alarm_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_alarms.load(Ordering::SeqCst) {
            return Err(ServiceError::NotConnected);
        }
        Ok(channel_feed(self.alarms_rx.lock().unwrap().take()))
    }

    fn statistics(&self) -> SessionStatistics {
        *self.statistics.lock().unwrap()
    }

    async fn disconnect(&self) -> Result<(), ServiceError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.disconnect_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

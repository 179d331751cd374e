// ── Selection state and debouncer ──
//
// Every navigation bumps the selection version immediately. The detail
// refresh itself is debounced: only the last node selected within one
// quiet window is refreshed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::model::NodeId;

/// Default quiet window before a refresh fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Highlighted node plus a counter bumped on every navigation event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: Option<NodeId>,
    pub version: u64,
}

/// Shared, observable selection.
#[derive(Clone)]
pub struct Selection {
    state: Arc<watch::Sender<SelectionState>>,
}

impl Selection {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SelectionState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Record a navigation to `id` and return the new version.
    pub fn select(&self, id: NodeId) -> u64 {
        let mut version = 0;
        self.state.send_modify(|s| {
            s.selected = Some(id);
            s.version += 1;
            version = s.version;
        });
        version
    }

    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.state.borrow().selected.clone()
    }

    pub fn current(&self) -> SelectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.state.subscribe()
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

/// Coalesces rapid navigation into a single refresh request.
///
/// States: Idle -> PendingRefresh (armed for `delay`) -> fires -> Idle. A
/// navigation while pending re-arms the timer with the new node.
pub struct SelectionDebouncer {
    selection: Selection,
    delay: Duration,
    nav_tx: mpsc::UnboundedSender<NodeId>,
    nav_rx: Mutex<Option<mpsc::UnboundedReceiver<NodeId>>>,
    cancel: CancellationToken,
}

impl SelectionDebouncer {
    pub fn new(selection: Selection, delay: Duration, cancel: CancellationToken) -> Self {
        let (nav_tx, nav_rx) = mpsc::unbounded_channel();
        Self {
            selection,
            delay,
            nav_tx,
            nav_rx: Mutex::new(Some(nav_rx)),
            cancel,
        }
    }

    /// Handle one navigation event. The selection version is bumped
    /// before this returns, independent of the timer.
    pub fn navigate(&self, id: NodeId) -> u64 {
        let version = self.selection.select(id.clone());
        trace!(node = %id, version, "navigation");
        // The timer task may already be gone after `stop`.
        let _ = self.nav_tx.send(id);
        version
    }

    /// Spawn the timer task; fired node ids are sent to `refresh_tx`.
    ///
    /// Returns `None` if the debouncer was already started.
    pub async fn start(&self, refresh_tx: mpsc::UnboundedSender<NodeId>) -> Option<JoinHandle<()>> {
        let nav_rx = self.nav_rx.lock().await.take()?;
        Some(tokio::spawn(debounce_loop(
            self.delay,
            nav_rx,
            refresh_tx,
            self.cancel.clone(),
        )))
    }

    /// Cancel any pending refresh and end the timer task.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

async fn debounce_loop(
    delay: Duration,
    mut nav_rx: mpsc::UnboundedReceiver<NodeId>,
    refresh_tx: mpsc::UnboundedSender<NodeId>,
    cancel: CancellationToken,
) {
    let mut pending: Option<NodeId> = None;
    let timer = sleep_until(Instant::now() + delay);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            nav = nav_rx.recv() => {
                let Some(id) = nav else { break };
                pending = Some(id);
                timer.as_mut().reset(Instant::now() + delay);
            }

            () = &mut timer, if pending.is_some() => {
                if let Some(id) = pending.take() {
                    debug!(node = %id, "debounced refresh");
                    if refresh_tx.send(id).is_err() {
                        break;
                    }
                }
            }
        }
    }
    debug!("selection debouncer stopped");
}

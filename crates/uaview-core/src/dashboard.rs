// ── Dashboard controller ──
//
// Owns every engine of one explorer session, the background tasks that
// feed them, and the optional alarm panel. Named commands resolve the
// selected node when they run, never earlier.

use std::sync::Arc;
use std::time::Duration;

use bytesize::ByteSize;
use strum::{Display, EnumString};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::details::{DetailBinder, RefreshOutcome};
use crate::error::CoreError;
use crate::expansion::ExpansionEngine;
use crate::log_sink::LogSink;
use crate::model::{NodeId, NodePatch, NodeRecord, TableKind};
use crate::selection::{DEFAULT_DEBOUNCE, Selection, SelectionDebouncer};
use crate::session::{SessionService, SessionStatistics};
use crate::store::NodeStore;
use crate::table::{RenderedTable, run_table_feed};
use crate::tree::TreeSource;

/// Separator written before the statistics dump.
const STATS_SEPARATOR_WIDTH: usize = 76;
/// Width of the right-aligned counter names in the statistics dump.
const STATS_LABEL_WIDTH: usize = 22;

// ── Commands ─────────────────────────────────────────────────────

/// Named commands the presentation layer can route to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Command {
    Monitor,
    Unmonitor,
    FocusTree,
    FocusAttributes,
    FocusLog,
    ClearLog,
    ToggleAlarms,
    DumpStatistics,
    Exit,
}

/// Result of dispatching a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    /// The exit sequence ran; the caller should tear the UI down.
    Exit,
}

/// Pane that currently owns keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum Focus {
    #[default]
    Tree,
    Attributes,
    Log,
    Alarms,
}

/// Lifecycle of an optional panel.
///
/// `NotCreated -> Hidden <-> Visible`. The first show creates the panel;
/// nothing ever goes back to `NotCreated` except a failed creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum PanelState {
    #[default]
    NotCreated,
    Hidden,
    Visible,
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A live table changed; render exactly this table.
    Table(RenderedTable),
    /// A debounced detail refresh finished.
    Refreshed { node: NodeId, outcome: RefreshOutcome },
}

impl From<RenderedTable> for UiEvent {
    fn from(table: RenderedTable) -> Self {
        Self::Table(table)
    }
}

/// Timing knobs of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSettings {
    /// Quiet window before a detail refresh fires.
    pub debounce: Duration,
    /// Upper bound on the graceful disconnect during exit.
    pub disconnect_timeout: Duration,
    /// Pause after disconnecting so the final log lines stay readable.
    pub exit_grace: Duration,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            disconnect_timeout: Duration::from_secs(3),
            exit_grace: Duration::from_secs(1),
        }
    }
}

// ── Dashboard ────────────────────────────────────────────────────

/// The explorer core as one handle.
///
/// Cheaply cloneable via `Arc<DashboardInner>`. Nothing runs until
/// [`start()`](Self::start) is called.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    settings: DashboardSettings,
    session: Arc<dyn SessionService>,
    store: Arc<NodeStore>,
    engine: ExpansionEngine,
    selection: Selection,
    debouncer: SelectionDebouncer,
    binder: DetailBinder,
    log: LogSink,
    focus: watch::Sender<Focus>,
    alarm_panel: watch::Sender<PanelState>,
    /// Serializes alarm toggles so the feed is subscribed at most once.
    alarm_toggle: Mutex<()>,
    events_tx: mpsc::UnboundedSender<UiEvent>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    /// Build a dashboard rooted at `root`. The receiver carries every
    /// table render and refresh outcome in arrival order.
    pub fn new(
        session: Arc<dyn SessionService>,
        root: NodeId,
        root_label: impl Into<String>,
        settings: DashboardSettings,
    ) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let store = Arc::new(NodeStore::new(root, root_label));
        let log = LogSink::new();
        let engine = ExpansionEngine::new(Arc::clone(&store), Arc::clone(&session), log.clone());
        let selection = Selection::new();
        let cancel = CancellationToken::new();
        let debouncer =
            SelectionDebouncer::new(selection.clone(), settings.debounce, cancel.child_token());
        let binder = DetailBinder::new(Arc::clone(&session), selection.clone(), log.clone());
        let (focus, _) = watch::channel(Focus::default());
        let (alarm_panel, _) = watch::channel(PanelState::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let dashboard = Self {
            inner: Arc::new(DashboardInner {
                settings,
                session,
                store,
                engine,
                selection,
                debouncer,
                binder,
                log,
                focus,
                alarm_panel,
                alarm_toggle: Mutex::new(()),
                events_tx,
                cancel,
                task_handles: Mutex::new(Vec::new()),
            }),
        };
        (dashboard, events_rx)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the debouncer, the detail refresh consumer and the
    /// subscribed-items feed. A second call does nothing.
    pub async fn start(&self) {
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let Some(debounce) = self.inner.debouncer.start(refresh_tx).await else {
            debug!("dashboard already started");
            return;
        };

        let mut handles = self.inner.task_handles.lock().await;
        handles.push(debounce);
        handles.push(tokio::spawn(refresh_consumer(
            self.inner.binder.clone(),
            refresh_rx,
            self.inner.events_tx.clone(),
            self.inner.cancel.child_token(),
        )));
        handles.push(tokio::spawn(run_table_feed(
            TableKind::SubscribedItems,
            self.inner.session.subscribed_items(),
            self.inner.events_tx.clone(),
            self.inner.cancel.child_token(),
        )));
        info!(root = %self.inner.store.root_id(), "dashboard started");
    }

    /// Cancel every background task and wait for them to finish.
    ///
    /// In-flight expansions and attribute reads are not aborted; their
    /// results still land in the store or get discarded as stale.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("dashboard stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Explorer operations ──────────────────────────────────────

    /// Record a navigation. The selection version moves now; the detail
    /// refresh follows once navigation has been quiet for the debounce
    /// window.
    pub fn navigate(&self, id: NodeId) -> u64 {
        self.inner.debouncer.navigate(id)
    }

    /// Select `id` and refresh its details right away, bypassing the
    /// debouncer.
    pub async fn activate(&self, id: NodeId) -> RefreshOutcome {
        self.inner.selection.select(id.clone());
        self.inner.binder.refresh_details(&id).await
    }

    /// Expand `id`. Failures are already in the log sink when this
    /// returns.
    pub async fn expand(&self, id: &NodeId) -> Result<Vec<NodeRecord>, CoreError> {
        self.inner.engine.expand(id).await
    }

    /// Re-list the children of `id` even if they are cached.
    pub async fn refresh_node(&self, id: &NodeId) -> Result<Vec<NodeRecord>, CoreError> {
        self.inner.engine.refresh(id).await
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Run one named command.
    pub async fn dispatch(&self, command: Command) -> CommandOutcome {
        debug!(%command, "dispatch");
        match command {
            Command::Monitor => self.monitor_selected().await,
            Command::Unmonitor => self.unmonitor_selected().await,
            Command::FocusTree => self.set_focus(Focus::Tree),
            Command::FocusAttributes => self.set_focus(Focus::Attributes),
            Command::FocusLog => self.set_focus(Focus::Log),
            Command::ClearLog => self.inner.log.clear(),
            Command::ToggleAlarms => self.toggle_alarms().await,
            Command::DumpStatistics => self.dump_statistics(),
            Command::Exit => {
                self.exit().await;
                return CommandOutcome::Exit;
            }
        }
        CommandOutcome::Done
    }

    async fn monitor_selected(&self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        if record.is_monitored {
            self.inner.log.append(format!("Already monitoring {}", record.id));
            return;
        }
        match self.inner.session.monitor(&record.id).await {
            Ok(()) => self.mark_monitored(&record.id, true),
            Err(e) => {
                warn!(node = %record.id, error = %e, "monitor failed");
                self.inner
                    .log
                    .append(format!("cannot monitor {}: {e}", record.id));
            }
        }
    }

    async fn unmonitor_selected(&self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        if !record.is_monitored {
            self.inner
                .log
                .append(format!("{} was not being monitored", record.id));
            return;
        }
        match self.inner.session.unmonitor(&record.id).await {
            Ok(()) => self.mark_monitored(&record.id, false),
            Err(e) => {
                warn!(node = %record.id, error = %e, "unmonitor failed");
                self.inner
                    .log
                    .append(format!("cannot unmonitor {}: {e}", record.id));
            }
        }
    }

    /// Record behind the current selection, logging why there is none.
    fn selected_record(&self) -> Option<NodeRecord> {
        let Some(id) = self.inner.selection.selected() else {
            self.inner.log.append("no node selected");
            return None;
        };
        match self.inner.store.get(&id) {
            Ok(record) => Some(record),
            Err(e) => {
                self.inner.log.append(e.to_string());
                None
            }
        }
    }

    fn mark_monitored(&self, id: &NodeId, is_monitored: bool) {
        if let Err(e) = self.inner.store.upsert(id, NodePatch::monitored(is_monitored)) {
            warn!(node = %id, error = %e, "could not update monitored flag");
        }
    }

    fn set_focus(&self, focus: Focus) {
        self.inner.focus.send_replace(focus);
    }

    /// `NotCreated -> Visible` subscribes the alarm feed; later toggles
    /// flip `Visible <-> Hidden` without touching the feed.
    async fn toggle_alarms(&self) {
        let _guard = self.inner.alarm_toggle.lock().await;
        let state = *self.inner.alarm_panel.borrow();
        match state {
            PanelState::NotCreated => self.create_alarm_panel().await,
            PanelState::Hidden => {
                self.inner.alarm_panel.send_replace(PanelState::Visible);
                self.set_focus(Focus::Alarms);
            }
            PanelState::Visible => {
                self.inner.alarm_panel.send_replace(PanelState::Hidden);
                self.set_focus(Focus::Tree);
            }
        }
    }

    async fn create_alarm_panel(&self) {
        let feed = match self.inner.session.subscribe_alarms().await {
            Ok(feed) => feed,
            Err(e) => {
                warn!(error = %e, "alarm subscription failed");
                self.inner
                    .log
                    .append(format!("cannot subscribe to alarms: {e}"));
                return;
            }
        };

        // The feed task renders the empty panel before its first event.
        let handle = tokio::spawn(run_table_feed(
            TableKind::Alarms,
            feed,
            self.inner.events_tx.clone(),
            self.inner.cancel.child_token(),
        ));
        self.inner.task_handles.lock().await.push(handle);

        self.inner.alarm_panel.send_replace(PanelState::Visible);
        self.set_focus(Focus::Alarms);
        info!("alarm panel created");
    }

    fn dump_statistics(&self) {
        let stats = self.inner.session.statistics();
        self.inner.log.append(statistics_report(&stats).join("\n"));
    }

    /// Best-effort teardown: the disconnect is bounded by
    /// `disconnect_timeout` and its failure never blocks exit.
    async fn exit(&self) {
        let log = &self.inner.log;
        log.append(" disconnecting .... ");

        let timeout = self.inner.settings.disconnect_timeout;
        match tokio::time::timeout(timeout, self.inner.session.disconnect()).await {
            Ok(Ok(())) => log.append(" disconnected .... "),
            Ok(Err(e)) => {
                warn!(error = %e, "disconnect failed");
                log.append(format!("disconnect failed: {e}"));
            }
            Err(_) => {
                warn!(?timeout, "disconnect timed out");
                log.append(format!(
                    "disconnect timed out after {}ms",
                    timeout.as_millis()
                ));
            }
        }

        tokio::time::sleep(self.inner.settings.exit_grace).await;
        self.stop().await;
        info!("exit sequence complete");
    }

    // ── State observation ────────────────────────────────────────

    pub fn store(&self) -> &Arc<NodeStore> {
        &self.inner.store
    }

    pub fn tree(&self) -> TreeSource {
        TreeSource::new(self.inner.engine.clone())
    }

    pub fn engine(&self) -> &ExpansionEngine {
        &self.inner.engine
    }

    pub fn selection(&self) -> &Selection {
        &self.inner.selection
    }

    pub fn details(&self) -> &DetailBinder {
        &self.inner.binder
    }

    pub fn log(&self) -> &LogSink {
        &self.inner.log
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.inner.settings
    }

    pub fn focus(&self) -> Focus {
        *self.inner.focus.borrow()
    }

    pub fn subscribe_focus(&self) -> watch::Receiver<Focus> {
        self.inner.focus.subscribe()
    }

    pub fn alarm_panel(&self) -> PanelState {
        *self.inner.alarm_panel.borrow()
    }

    pub fn subscribe_alarm_panel(&self) -> watch::Receiver<PanelState> {
        self.inner.alarm_panel.subscribe()
    }
}

/// Hand every debounced node to the binder. Each refresh runs in its own
/// task so a slow read never delays a newer one.
async fn refresh_consumer(
    binder: DetailBinder,
    mut refresh_rx: mpsc::UnboundedReceiver<NodeId>,
    events_tx: mpsc::UnboundedSender<UiEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            next = refresh_rx.recv() => {
                let Some(node) = next else { break };
                let binder = binder.clone();
                let events_tx = events_tx.clone();
                tokio::spawn(async move {
                    let outcome = binder.refresh_details(&node).await;
                    let _ = events_tx.send(UiEvent::Refreshed { node, outcome });
                });
            }
        }
    }
}

/// Log lines of the statistics dump.
pub fn statistics_report(stats: &SessionStatistics) -> Vec<String> {
    let line = |label: &str, value: String| format!("{label:>STATS_LABEL_WIDTH$} : {value}");
    vec![
        "-".repeat(STATS_SEPARATOR_WIDTH),
        line("transaction count", stats.transaction_count.to_string()),
        line("sent bytes", ByteSize(stats.sent_bytes).to_string()),
        line("received bytes", ByteSize(stats.received_bytes).to_string()),
        line("token renewal count", stats.token_renewal_count.to_string()),
        line("reconnection count", stats.reconnection_count.to_string()),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn commands_parse_from_kebab_case_names() {
        assert_eq!(Command::from_str("toggle-alarms").unwrap(), Command::ToggleAlarms);
        assert_eq!(Command::from_str("dump-statistics").unwrap(), Command::DumpStatistics);
        assert_eq!(Command::FocusAttributes.to_string(), "focus-attributes");
        assert!(Command::from_str("reboot").is_err());
    }

    #[test]
    fn statistics_report_aligns_counter_names() {
        let report = statistics_report(&SessionStatistics {
            transaction_count: 12,
            ..SessionStatistics::default()
        });
        assert_eq!(report.len(), 6);
        assert_eq!(report[0].len(), STATS_SEPARATOR_WIDTH);
        assert_eq!(report[1], "     transaction count : 12");
        assert_eq!(report[5], "    reconnection count : 0");
        assert!(report.iter().skip(1).all(|l| l.find(" : ") == Some(22)));
    }
}

//! Data bridge: forwards dashboard notifications to the TUI as actions.
//!
//! Runs as a background task. Table renders and refresh outcomes arrive
//! on the dashboard's event channel; store, panel, log, focus and alarm
//! panel changes arrive on watch channels.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use uaview_core::{Dashboard, LogCursor, UiEvent};

use crate::action::Action;

pub async fn spawn_data_bridge(
    dashboard: Dashboard,
    mut events: mpsc::UnboundedReceiver<UiEvent>,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut store = dashboard.store().subscribe();
    let mut panel = dashboard.details().subscribe();
    let mut log = dashboard.log().subscribe();
    let mut focus = dashboard.subscribe_focus();
    let mut alarm_panel = dashboard.subscribe_alarm_panel();
    let mut log_cursor = LogCursor::default();

    let _ = action_tx.send(Action::TreeChanged);
    let _ = action_tx.send(Action::FocusChanged(*focus.borrow_and_update()));

    loop {
        let action = tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(event) = events.recv() => match event {
                UiEvent::Table(table) => Action::TableUpdated(table),
                UiEvent::Refreshed { node, outcome } => {
                    Action::DetailsRefreshed { node, outcome }
                }
            },
            Ok(()) = store.changed() => Action::TreeChanged,
            Ok(()) = panel.changed() => {
                Action::PanelChanged(panel.borrow_and_update().clone())
            }
            Ok(()) = log.changed() => {
                Action::LogChanged(dashboard.log().read_since(&mut log_cursor))
            }
            Ok(()) = focus.changed() => Action::FocusChanged(*focus.borrow_and_update()),
            Ok(()) = alarm_panel.changed() => {
                Action::AlarmPanelChanged(*alarm_panel.borrow_and_update())
            }
            else => break,
        };

        if action_tx.send(action).is_err() {
            break;
        }
    }

    debug!("data bridge shut down");
}

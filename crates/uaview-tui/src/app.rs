//! Application core: event loop, pane focus and action dispatch.

use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use uaview_config::Config;
use uaview_core::{
    Command, CommandOutcome, Dashboard, Focus, NodeId, PanelState, TableKind, UiEvent,
};

use crate::action::Action;
use crate::component::Component;
use crate::data_bridge::spawn_data_bridge;
use crate::event::{Event, EventReader};
use crate::keymap::{self, BINDINGS, TREE_BINDINGS};
use crate::panes::{AttributesPane, LogPane, TablePane, TreePane};
use crate::theme;
use crate::tui::Tui;

/// Shown in the status bar when no endpoint is configured.
const DEMO_ENDPOINT: &str = "demo (simulated)";

pub struct App {
    dashboard: Dashboard,
    /// Handed to the data bridge when the loop starts.
    ui_events: Option<mpsc::UnboundedReceiver<UiEvent>>,
    endpoint: String,
    tick_rate: Duration,
    render_rate: Duration,

    tree: TreePane,
    attributes: AttributesPane,
    items: TablePane,
    alarms: TablePane,
    log: LogPane,

    focus: Focus,
    alarm_panel: PanelState,
    running: bool,
    /// Set once the exit command is in flight.
    exiting: bool,
    help_visible: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(
        dashboard: Dashboard,
        ui_events: mpsc::UnboundedReceiver<UiEvent>,
        config: &Config,
    ) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Self {
            tree: TreePane::new(dashboard.store().clone()),
            attributes: AttributesPane::new(config.ui.label_width),
            items: TablePane::new(TableKind::SubscribedItems),
            alarms: TablePane::new(TableKind::Alarms),
            log: LogPane::new(),
            dashboard,
            ui_events: Some(ui_events),
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEMO_ENDPOINT.into()),
            tick_rate: config.ui.tick_rate,
            render_rate: config.ui.render_rate,
            focus: Focus::default(),
            alarm_panel: PanelState::default(),
            running: true,
            exiting: false,
            help_visible: false,
            action_tx,
            action_rx,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::enter()?;

        self.dashboard.start().await;
        let cancel = CancellationToken::new();
        let bridge = self.ui_events.take().map(|ui_events| {
            tokio::spawn(spawn_data_bridge(
                self.dashboard.clone(),
                ui_events,
                self.action_tx.clone(),
                cancel.clone(),
            ))
        });
        if let Some(root) = self.tree.selected().cloned() {
            self.dashboard.navigate(root.clone());
            self.spawn_expand(root);
        }

        let mut events = EventReader::new(self.tick_rate, self.render_rate);
        info!(endpoint = %self.endpoint, "event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;
                if action == Action::Render {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        cancel.cancel();
        if let Some(bridge) = bridge {
            let _ = bridge.await;
        }
        self.dashboard.stop().await;
        self.dashboard.log().close();
        drop(tui);
        info!("event loop ended");
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }
        if let Some(action) = keymap::global_action(key) {
            return Ok(Some(action));
        }
        self.focused_pane().handle_key_event(key)
    }

    fn focused_pane(&mut self) -> &mut dyn Component {
        match self.focus {
            Focus::Tree => &mut self.tree,
            Focus::Attributes => &mut self.attributes,
            Focus::Log => &mut self.log,
            Focus::Alarms => &mut self.alarms,
        }
    }

    fn panes(&mut self) -> [&mut dyn Component; 5] {
        [
            &mut self.tree,
            &mut self.attributes,
            &mut self.items,
            &mut self.alarms,
            &mut self.log,
        ]
    }

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,
            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::Select(id) => {
                self.dashboard.navigate(id.clone());
            }
            Action::Expand(id) => self.spawn_expand(id.clone()),
            Action::Activate(id) => {
                let dashboard = self.dashboard.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    dashboard.activate(id.clone()).await;
                    let _ = dashboard.expand(&id).await;
                });
            }
            Action::Refresh(id) => {
                let dashboard = self.dashboard.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    let _ = dashboard.refresh_node(&id).await;
                });
            }
            Action::Command(command) => self.spawn_command(*command),

            Action::FocusChanged(focus) => {
                let focus = *focus;
                self.focus = focus;
                self.tree.set_focused(focus == Focus::Tree);
                self.attributes.set_focused(focus == Focus::Attributes);
                self.log.set_focused(focus == Focus::Log);
                self.alarms.set_focused(focus == Focus::Alarms);
            }
            Action::AlarmPanelChanged(state) => self.alarm_panel = *state,
            Action::DetailsRefreshed { node, outcome } => {
                debug!(%node, ?outcome, "details refreshed");
            }

            Action::Tick | Action::Render => {}

            other => {
                let mut follow_ups = Vec::new();
                for pane in self.panes() {
                    if let Some(follow_up) = pane.update(other)? {
                        follow_ups.push(follow_up);
                    }
                }
                for follow_up in follow_ups {
                    self.action_tx.send(follow_up)?;
                }
            }
        }
        Ok(())
    }

    fn spawn_expand(&self, id: NodeId) {
        let dashboard = self.dashboard.clone();
        tokio::spawn(async move {
            // Failures are already in the log pane.
            let _ = dashboard.expand(&id).await;
        });
    }

    fn spawn_command(&mut self, command: Command) {
        if command == Command::Exit {
            if self.exiting {
                return;
            }
            self.exiting = true;
        }
        let dashboard = self.dashboard.clone();
        let action_tx = self.action_tx.clone();
        tokio::spawn(async move {
            if dashboard.dispatch(command).await == CommandOutcome::Exit {
                let _ = action_tx.send(Action::Quit);
            }
        });
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let [content, status] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)])
                .areas(content);

        self.tree.render(frame, left);

        if self.alarm_panel == PanelState::Visible {
            let [attributes, items, alarms, log] = Layout::vertical([
                Constraint::Percentage(35),
                Constraint::Percentage(25),
                Constraint::Percentage(20),
                Constraint::Min(3),
            ])
            .areas(right);
            self.attributes.render(frame, attributes);
            self.items.render(frame, items);
            self.alarms.render(frame, alarms);
            self.log.render(frame, log);
        } else {
            let [attributes, items, log] = Layout::vertical([
                Constraint::Percentage(40),
                Constraint::Percentage(30),
                Constraint::Min(3),
            ])
            .areas(right);
            self.attributes.render(frame, attributes);
            self.items.render(frame, items);
            self.log.render(frame, log);
        }

        self.render_status_bar(frame, status);
        if self.help_visible {
            Self::render_help_overlay(frame, area);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::raw(" "),
            Span::styled(self.endpoint.clone(), Style::default().fg(theme::CORAL)),
            Span::styled(format!(" │ {} │", self.focus), theme::key_hint()),
        ];
        for (key, description) in BINDINGS {
            spans.push(Span::styled(format!(" {key}"), theme::key_hint_key()));
            spans.push(Span::styled(format!(" {description} "), theme::key_hint()));
        }
        spans.push(Span::styled(" ?", theme::key_hint_key()));
        spans.push(Span::styled(" help", theme::key_hint()));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_help_overlay(frame: &mut Frame, area: Rect) {
        let width = 52u16.min(area.width.saturating_sub(4));
        let height = 22u16.min(area.height.saturating_sub(2));
        let help_area = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, help_area);

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .style(Style::default().bg(theme::BG_DARK));
        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let section = |title: &'static str| {
            Line::from(Span::styled(
                format!("  {title}"),
                Style::default().fg(theme::NEON_CYAN),
            ))
        };
        let binding = |key: &str, description: &str| {
            Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled(description.to_owned(), theme::key_hint()),
            ])
        };

        let mut lines = vec![Line::from(""), section("Tree")];
        lines.extend(TREE_BINDINGS.iter().map(|(k, d)| binding(k, d)));
        lines.push(Line::from(""));
        lines.push(section("Commands"));
        lines.extend(BINDINGS.iter().map(|(k, d)| binding(k, d)));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  Esc or ? to close",
            theme::key_hint(),
        )));
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

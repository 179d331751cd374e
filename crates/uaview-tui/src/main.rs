//! `uaview`: terminal dashboard for exploring a server address space.
//!
//! Left pane is the lazily expanded node tree; the right column shows the
//! attributes of the selected node, the subscribed items table, the
//! optional alarms table and the info log. Without a remote session the
//! bundled simulated service answers every request.
//!
//! Logs go to a file (default `<tmp>/uaview.log`) so they never corrupt
//! the terminal.

mod action;
mod app;
mod component;
mod data_bridge;
mod demo;
mod event;
mod keymap;
mod panes;
mod theme;
mod tui;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use uaview_config::LogSettings;
use uaview_core::{Dashboard, NodeId, SessionService};

use crate::app::App;
use crate::demo::DemoSession;

const DEFAULT_LOG_FILE: &str = "uaview.log";

#[derive(Parser, Debug)]
#[command(name = "uaview", version, about)]
struct Cli {
    /// Server endpoint shown in the status bar
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file (defaults to uaview.log in the temp directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing. Nothing may be written to stdout while the
/// terminal is in raw mode. Hold the guard until exit so logs flush.
fn setup_tracing(log: &LogSettings, verbose: u8) -> WorkerGuard {
    let level = match verbose {
        0 => log.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "uaview={level},uaview_core={level},uaview_tui={level}"
        ))
    });

    let log_file = log
        .file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_FILE));
    let log_dir = log_file.parent().unwrap_or(Path::new("."));
    let log_name = log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new(DEFAULT_LOG_FILE));

    let file_appender = tracing_appender::rolling::never(log_dir, log_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tui::install_hooks()?;

    // CLI flags > environment > config file > defaults
    let mut config = match &cli.config {
        Some(path) => uaview_config::load_config_from(path)?,
        None => uaview_config::load_config()?,
    };
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(log_file) = cli.log_file {
        config.log.file = Some(log_file);
    }

    let _log_guard = setup_tracing(&config.log, cli.verbose);
    info!(
        endpoint = config.endpoint.as_deref().unwrap_or("(demo)"),
        root = %config.root_node,
        debounce = %humantime::format_duration(config.ui.debounce),
        "starting uaview"
    );

    let session: Arc<dyn SessionService> = Arc::new(DemoSession::new());
    let (dashboard, ui_events) = Dashboard::new(
        session,
        NodeId::from(config.root_node.as_str()),
        config.root_label(),
        config.dashboard_settings(),
    );

    let mut app = App::new(dashboard, ui_events, &config);
    app.run().await
}

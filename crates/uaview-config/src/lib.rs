//! Configuration for the uaview dashboard.
//!
//! Layered with figment: built-in defaults, then the TOML file at the
//! platform config path, then `UAVIEW_` environment variables (nested
//! keys separated by `__`, e.g. `UAVIEW_UI__DEBOUNCE=150ms`). Durations
//! are humantime strings (`100ms`, `3s`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use uaview_core::DashboardSettings;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Server endpoint, shown in the status bar and passed to the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Id of the node the explorer starts from.
    #[serde(default = "default_root_node")]
    pub root_node: String,

    /// Display label of the root; the id is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_label: Option<String>,

    #[serde(default)]
    pub ui: UiSettings,

    #[serde(default)]
    pub log: LogSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            root_node: default_root_node(),
            root_label: None,
            ui: UiSettings::default(),
            log: LogSettings::default(),
        }
    }
}

fn default_root_node() -> String {
    "RootFolder".into()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UiSettings {
    /// Quiet window before the attribute panel follows the selection.
    #[serde(default = "default_debounce", with = "humantime_duration")]
    pub debounce: Duration,

    #[serde(default = "default_tick_rate", with = "humantime_duration")]
    pub tick_rate: Duration,

    #[serde(default = "default_render_rate", with = "humantime_duration")]
    pub render_rate: Duration,

    /// Width of the attribute name column.
    #[serde(default = "default_label_width")]
    pub label_width: usize,

    #[serde(default = "default_disconnect_timeout", with = "humantime_duration")]
    pub disconnect_timeout: Duration,

    #[serde(default = "default_exit_grace", with = "humantime_duration")]
    pub exit_grace: Duration,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            tick_rate: default_tick_rate(),
            render_rate: default_render_rate(),
            label_width: default_label_width(),
            disconnect_timeout: default_disconnect_timeout(),
            exit_grace: default_exit_grace(),
        }
    }
}

fn default_debounce() -> Duration {
    Duration::from_millis(100)
}
fn default_tick_rate() -> Duration {
    Duration::from_millis(250)
}
fn default_render_rate() -> Duration {
    Duration::from_millis(33)
}
fn default_label_width() -> usize {
    25
}
fn default_disconnect_timeout() -> Duration {
    Duration::from_secs(3)
}
fn default_exit_grace() -> Duration {
    Duration::from_secs(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogSettings {
    /// Log file; the binary picks a temp-dir default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Filter directive used when neither `-v` nor `RUST_LOG` is given.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".into()
}

impl Config {
    /// Reject values the dashboard cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_node.trim().is_empty() {
            return Err(validation("root_node", "must not be empty"));
        }
        if self.ui.label_width == 0 {
            return Err(validation("ui.label_width", "must be at least 1"));
        }
        if self.ui.tick_rate.is_zero() {
            return Err(validation("ui.tick_rate", "must be greater than zero"));
        }
        if self.ui.render_rate.is_zero() {
            return Err(validation("ui.render_rate", "must be greater than zero"));
        }
        Ok(())
    }

    /// Label shown for the root node.
    pub fn root_label(&self) -> &str {
        self.root_label.as_deref().unwrap_or(&self.root_node)
    }

    /// Timing knobs for `uaview_core::Dashboard`.
    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            debounce: self.ui.debounce,
            disconnect_timeout: self.ui.disconnect_timeout,
            exit_grace: self.ui.exit_grace,
        }
    }
}

fn validation(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "uaview", "uaview").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("uaview");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment. A missing file is
/// not an error; the defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UAVIEW_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Duration (de)serialization ──────────────────────────────────────

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.root_node, "RootFolder");
        assert_eq!(config.ui.debounce, Duration::from_millis(100));
        assert_eq!(config.ui.label_width, 25);
        assert_eq!(config.root_label(), "RootFolder");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
endpoint = "opc.tcp://localhost:48010"
root_label = "Root"

[ui]
debounce = "250ms"
disconnect_timeout = "5s"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("opc.tcp://localhost:48010"));
        assert_eq!(config.root_label(), "Root");
        assert_eq!(config.ui.debounce, Duration::from_millis(250));
        assert_eq!(config.ui.exit_grace, Duration::from_secs(1));

        let settings = config.dashboard_settings();
        assert_eq!(settings.disconnect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_duration_is_a_loading_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ui]\ndebounce = \"soon\"\n").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Figment(_))
        ));
    }

    #[test]
    fn zero_label_width_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ui]\nlabel_width = 0\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert_eq!(err.to_string(), "invalid ui.label_width: must be at least 1");
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            endpoint: Some("opc.tcp://plc:4840".into()),
            ui: UiSettings {
                exit_grace: Duration::from_millis(500),
                ..UiSettings::default()
            },
            ..Config::default()
        };

        save_config_to(&config, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("exit_grace = \"500ms\""));
        assert_eq!(load_config_from(&path).unwrap(), config);
    }
}

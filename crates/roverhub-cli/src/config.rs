//! Configuration – reads/writes `~/.roverhub/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use roverhub_core::CoreConfig;

/// Persisted hub configuration stored in `~/.roverhub/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket port the operator's device connects to.
    #[serde(default = "default_radio_port")]
    pub radio_port: u16,

    /// Serial device of the motor-controller board.
    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    /// Serial baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Base URL of the planning/vision backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request backend timeout in seconds.
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    /// Still-capture binary invoked for snapshots.
    #[serde(default = "default_capture_program")]
    pub capture_program: String,

    /// File the capture binary writes.
    #[serde(default = "default_capture_output")]
    pub capture_output: String,

    /// Request a mosaic stitch after a path run finishes.
    #[serde(default)]
    pub stitch_on_finish: bool,

    /// Use the canned single-obstacle arc instead of calling the backend.
    #[serde(default)]
    pub fixed_single_obstacle_path: bool,

    /// Radio reconnect attempts before giving up.
    #[serde(default = "default_reconnect_max_retries")]
    pub reconnect_max_retries: u32,

    /// Initial reconnect back-off in milliseconds (doubles per attempt).
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
}

fn default_radio_port() -> u16 {
    9004
}
fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    115200
}
fn default_api_url() -> String {
    "http://192.168.2.10:5000".to_string()
}
fn default_api_timeout_secs() -> u64 {
    10
}
fn default_capture_program() -> String {
    "libcamera-still".to_string()
}
fn default_capture_output() -> String {
    "/tmp/roverhub-frame.jpg".to_string()
}
fn default_reconnect_max_retries() -> u32 {
    5
}
fn default_reconnect_backoff_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            radio_port: default_radio_port(),
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
            api_url: default_api_url(),
            api_timeout_secs: default_api_timeout_secs(),
            capture_program: default_capture_program(),
            capture_output: default_capture_output(),
            stitch_on_finish: false,
            fixed_single_obstacle_path: false,
            reconnect_max_retries: default_reconnect_max_retries(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
        }
    }
}

impl Config {
    /// The subset of knobs the coordination core needs.
    pub fn core(&self) -> CoreConfig {
        CoreConfig {
            stitch_on_finish: self.stitch_on_finish,
            fixed_single_obstacle_path: self.fixed_single_obstacle_path,
            reconnect_max_retries: self.reconnect_max_retries,
            reconnect_backoff: Duration::from_millis(self.reconnect_backoff_ms),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

/// Return the path to `~/.roverhub/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".roverhub").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ROVERHUB_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVERHUB_API_URL` | `api_url` |
/// | `ROVERHUB_SERIAL_PORT` | `serial_port` |
/// | `ROVERHUB_RADIO_PORT` | `radio_port` |
/// | `ROVERHUB_BAUD_RATE` | `baud_rate` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROVERHUB_API_URL") {
        cfg.api_url = v;
    }
    if let Ok(v) = std::env::var("ROVERHUB_SERIAL_PORT") {
        cfg.serial_port = v;
    }
    if let Ok(v) = std::env::var("ROVERHUB_RADIO_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.radio_port = port;
    }
    if let Ok(v) = std::env::var("ROVERHUB_BAUD_RATE")
        && let Ok(baud) = v.parse::<u32>()
    {
        cfg.baud_rate = baud;
    }
}

/// Save the config to disk, creating `~/.roverhub/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

//! Application configuration management.
//!
//! Handles loading, saving, and accessing the configuration: backend address,
//! the admin auth token, realtime reconnect/keep-alive tuning and logging.
//! Configuration is persisted as TOML on disk; a few environment variables
//! override it at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::constants;
use crate::error::{SbError, SbResult};

/// Overrides `server.address`.
pub const ENV_API_URL: &str = "SUPPORTBOT_API_URL";
/// Overrides `realtime.ws_url`.
pub const ENV_WS_URL: &str = "SUPPORTBOT_WS_URL";
/// Overrides `auth.token`.
pub const ENV_TOKEN: &str = "SUPPORTBOT_TOKEN";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend connection settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Admin authentication state.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Realtime socket settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Chat widget session settings.
    #[serde(default)]
    pub widget: WidgetConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Backend origin (e.g., "https://support.example-bank.com").
    #[serde(default = "default_server_address")]
    pub address: String,

    /// Custom HTTP headers as key-value pairs.
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,

    /// REST request timeout in milliseconds.
    #[serde(default = "default_api_timeout")]
    pub api_timeout_ms: u64,

    /// Whether to accept invalid TLS certificates (local testing only).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Admin authentication state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token returned by `/auth/login`. Empty when logged out.
    #[serde(default)]
    pub token: String,

    /// Email of the logged-in agent, kept for prompts.
    #[serde(default)]
    pub email: String,
}

/// Realtime socket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Explicit WebSocket origin ("wss://host:port"). Empty derives it from
    /// `server.address`.
    #[serde(default)]
    pub ws_url: String,

    /// Admin endpoint path.
    #[serde(default = "default_admin_path")]
    pub admin_path: String,

    /// Widget endpoint path prefix.
    #[serde(default = "default_widget_path")]
    pub widget_path: String,

    /// Base reconnect delay; attempt N waits N times this.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Reconnect attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Admin keep-alive ping interval. 0 disables it.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,
}

/// Chat widget session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Stable customer id sent to `/chat/start`. Empty lets the client pick
    /// a fallback id.
    #[serde(default)]
    pub user_id: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_server_address() -> String {
    constants::DEFAULT_SERVER_ADDRESS.to_string()
}

fn default_api_timeout() -> u64 {
    constants::DEFAULT_API_TIMEOUT_MS
}

fn default_admin_path() -> String {
    constants::ADMIN_WS_PATH.to_string()
}

fn default_widget_path() -> String {
    constants::WIDGET_WS_PATH.to_string()
}

fn default_reconnect_delay() -> u64 {
    constants::RECONNECT_DELAY_MS
}

fn default_max_reconnect_attempts() -> u32 {
    constants::MAX_RECONNECT_ATTEMPTS
}

fn default_ping_interval() -> u64 {
    constants::KEEPALIVE_INTERVAL_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_server_address(),
            custom_headers: HashMap::new(),
            api_timeout_ms: default_api_timeout(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_url: String::new(),
            admin_path: default_admin_path(),
            widget_path: default_widget_path(),
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            ping_interval_ms: default_ping_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl RealtimeConfig {
    /// Base reconnect delay as a Duration.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Keep-alive interval, or None when disabled.
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_ms > 0).then(|| Duration::from_millis(self.ping_interval_ms))
    }
}

/// Per-user application directory under an OS base directory.
fn app_dir(base: Option<PathBuf>, kind: &str) -> SbResult<PathBuf> {
    base.map(|b| b.join(constants::APP_NAME))
        .ok_or_else(|| SbError::Config(format!("could not determine {kind} directory")))
}

impl AppConfig {
    /// Load the default config file, or defaults when there is none.
    ///
    /// Environment overrides are not applied; `ConfigHandle::load` does that.
    pub fn load_default() -> SbResult<Self> {
        Self::load_or_default(&Self::default_config_path()?)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &Path) -> SbResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> SbResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file path.
    pub fn save_default(&self) -> SbResult<()> {
        let path = Self::default_config_path()?;
        self.save_to_file(&path)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> SbResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> SbResult<PathBuf> {
        Ok(app_dir(dirs::config_dir(), "config")?.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> SbResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Ok(app_dir(dirs::data_dir(), "data")?.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Apply `SUPPORTBOT_*` environment overrides.
    ///
    /// The returned overlay remembers what was replaced so the file values
    /// can be written back on save.
    pub fn apply_env_overrides(&mut self) -> EnvOverlay {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> EnvOverlay {
        let mut overlay = EnvOverlay::default();
        if let Some(addr) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            let addr = Self::sanitize_server_address(&addr);
            overlay.address = Some(Shadowed::replace(&mut self.server.address, addr));
        }
        if let Some(ws) = lookup(ENV_WS_URL).filter(|v| !v.trim().is_empty()) {
            let ws = ws.trim().trim_end_matches('/').to_string();
            overlay.ws_url = Some(Shadowed::replace(&mut self.realtime.ws_url, ws));
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.trim().is_empty()) {
            let token = token.trim().to_string();
            overlay.token = Some(Shadowed::replace(&mut self.auth.token, token));
        }
        overlay
    }

    /// Whether an admin token is available.
    pub fn is_logged_in(&self) -> bool {
        !self.auth.token.is_empty()
    }

    /// Sanitize and normalize a backend address.
    ///
    /// Ensures the address has a scheme and strips trailing slashes. Local
    /// hosts default to http, everything else to https.
    pub fn sanitize_server_address(address: &str) -> String {
        let trimmed = address.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else if is_local_host(trimmed) {
            format!("http://{trimmed}")
        } else {
            format!("https://{trimmed}")
        };

        with_scheme.trim_end_matches('/').to_string()
    }
}

fn is_local_host(address: &str) -> bool {
    let host = address.split(['/', ':']).next().unwrap_or_default();
    host == "localhost"
        || host.starts_with("127.")
        || host.starts_with("192.168.")
        || host.starts_with("10.")
}

/// A file value hidden behind an environment override.
#[derive(Debug, Clone)]
struct Shadowed {
    file: String,
    env: String,
}

impl Shadowed {
    fn replace(slot: &mut String, env: String) -> Self {
        let file = std::mem::replace(slot, env.clone());
        Self { file, env }
    }

    /// Put the file value back unless the field was changed since.
    fn restore(&self, slot: &mut String) {
        if *slot == self.env {
            slot.clone_from(&self.file);
        }
    }
}

/// Which fields the environment overrode, and their file values.
#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
    address: Option<Shadowed>,
    ws_url: Option<Shadowed>,
    token: Option<Shadowed>,
}

impl EnvOverlay {
    /// Whether any override was applied.
    pub fn is_empty(&self) -> bool {
        self.address.is_none() && self.ws_url.is_none() && self.token.is_none()
    }

    /// The config as it should be persisted: overridden fields get their
    /// file values back, edits made at runtime are kept.
    pub fn persisted(&self, config: &AppConfig) -> AppConfig {
        let mut out = config.clone();
        if let Some(shadow) = &self.address {
            shadow.restore(&mut out.server.address);
        }
        if let Some(shadow) = &self.ws_url {
            shadow.restore(&mut out.realtime.ws_url);
        }
        if let Some(shadow) = &self.token {
            shadow.restore(&mut out.auth.token);
        }
        out
    }
}

/// Thread-safe configuration holder for shared access across commands.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
    path: Option<PathBuf>,
    overlay: EnvOverlay,
}

impl ConfigHandle {
    /// Create a new configuration handle saving to the default location.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: None,
            overlay: EnvOverlay::default(),
        }
    }

    /// Create a handle that saves back to an explicit file.
    pub fn with_path(config: AppConfig, path: PathBuf) -> Self {
        Self {
            path: Some(path),
            ..Self::new(config)
        }
    }

    /// Load `path` (or the default config file) and layer the environment
    /// overrides on top. Saving never writes the overrides back.
    pub fn load(path: Option<PathBuf>) -> SbResult<Self> {
        let path = match path {
            Some(p) => p,
            None => AppConfig::default_config_path()?,
        };
        let mut config = AppConfig::load_or_default(&path)?;
        let overlay = config.apply_env_overrides();
        Ok(Self::with_path(config, path).with_overlay(overlay))
    }

    fn with_overlay(mut self, overlay: EnvOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }

    /// Save the current configuration to disk, minus environment overrides.
    pub async fn save(&self) -> SbResult<PathBuf> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => AppConfig::default_config_path()?,
        };
        let persisted = self.overlay.persisted(&*self.inner.read().await);
        persisted.save_to_file(&path)?;
        Ok(path)
    }
}

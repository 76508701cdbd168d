//! # Configuration
//!
//! [`ListenerConfig`] holds everything needed to subscribe to ntfy topics.
//!
//! ## Loading Priority
//!
//! Configuration is loaded from the first source that provides a value:
//!
//! 1. Explicit struct fields (programmatic construction)
//! 2. TOML config file at an explicit path
//! 3. File named by the `NTFY_CONFIG` environment variable
//! 4. `./ntfy.toml` in the current directory
//! 5. `~/.config/ntfy-subscriber/ntfy.toml`
//! 6. Environment variables only
//!
//! `NTFY_URL`, `NTFY_TOKEN`, `NTFY_ACTIVE_SERVER`, `NTFY_COMMANDS_TOPIC` and
//! `NTFY_RESPONSES_TOPIC` override file values.
//!
//! ## File format
//!
//! ```toml
//! active_server_id = "home"
//! commands_topic = "boat-commands"
//! responses_topic = "boat-responses"
//!
//! [[servers]]
//! id = "home"
//! name = "Home ntfy"
//! url = "http://192.168.1.5"
//!
//! [[servers]]
//! id = "public"
//! url = "https://ntfy.sh"
//! token = "tk_..."
//! is_default = true
//!
//! [reconnect]
//! backoff_tiers_ms = [1000, 2000, 5000, 10000, 30000, 60000]
//! max_attempts = 0
//! ```
//!
//! A file with no `[[servers]]` may use the older single-server keys
//! `ntfy_url` and `token`; they become a server with id `default`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "config-toml")]
use std::path::{Path, PathBuf};

use crate::backoff::{BackoffSchedule, DEFAULT_TIERS_MS};
use crate::endpoint::{ServerEndpoint, default_active_id, duplicate_ids, resolve_endpoint};
use crate::error::{NtfyError, NtfyResult};
use crate::protocol::TopicSet;

/// Public ntfy instance used when nothing else is configured.
pub const DEFAULT_NTFY_URL: &str = "https://ntfy.sh";

/// Id given to the server synthesized from the single-server keys.
pub const LEGACY_SERVER_ID: &str = "default";

/// Default inactivity window before a silent connection is recycled.
const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default period between inactivity checks.
const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Default period between outbound pings.
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Default max reconnect attempts (0 = unlimited).
const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 0;

/// Configuration for an ntfy topic listener.
///
/// # Examples
///
/// ```
/// use ntfy_subscriber::config::ListenerConfig;
/// use ntfy_subscriber::endpoint::ServerEndpoint;
///
/// let config = ListenerConfig::new(vec![ServerEndpoint::new("a", "https://ntfy.sh")])
///     .with_topics(Some("cmd1"), Some("resp1"));
/// assert_eq!(config.ws_url().unwrap(), "wss://ntfy.sh/cmd1,resp1/ws");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Known ntfy servers.
    #[serde(default)]
    pub servers: Vec<ServerEndpoint>,

    /// Id of the server to subscribe on.
    #[serde(default)]
    pub active_server_id: Option<String>,

    /// Topic carrying commands.
    #[serde(default)]
    pub commands_topic: Option<String>,

    /// Topic carrying responses.
    #[serde(default)]
    pub responses_topic: Option<String>,

    /// Single-server base URL, used only when `servers` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntfy_url: Option<String>,

    /// Single-server token, used only when `servers` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Reconnect behavior.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Liveness timing. Not read from files.
    #[serde(skip)]
    pub liveness: LivenessConfig,
}

/// Reconnect behavior when the WebSocket connection drops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay tiers in milliseconds, indexed by attempt number within a
    /// failure streak. Must be non-empty and non-decreasing.
    #[serde(default = "default_backoff_tiers")]
    pub backoff_tiers_ms: Vec<u64>,

    /// Maximum consecutive failed attempts before giving up. 0 means unlimited.
    #[serde(default = "default_reconnect_max_attempts")]
    pub max_attempts: u32,
}

/// Inactivity and keepalive timing for open connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Silence longer than this forces a reconnect.
    pub inactivity_timeout: Duration,

    /// How often the inactivity window is checked.
    pub check_interval: Duration,

    /// How often a ping frame is sent while open. `None` disables pings.
    pub ping_interval: Option<Duration>,
}

// ─── Defaults ───────────────────────────────────────────────────────────

fn default_backoff_tiers() -> Vec<u64> {
    DEFAULT_TIERS_MS.to_vec()
}

fn default_reconnect_max_attempts() -> u32 {
    DEFAULT_RECONNECT_MAX_ATTEMPTS
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            backoff_tiers_ms: default_backoff_tiers(),
            max_attempts: DEFAULT_RECONNECT_MAX_ATTEMPTS,
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            check_interval: DEFAULT_CHECK_INTERVAL,
            ping_interval: Some(DEFAULT_PING_INTERVAL),
        }
    }
}

impl LivenessConfig {
    /// Reject zero periods, which the interval timers cannot run with.
    ///
    /// # Errors
    /// Returns [`NtfyError::ConfigError`] naming the first zero setting.
    pub fn validate(&self) -> NtfyResult<()> {
        let settings = [
            ("inactivity_timeout", Some(self.inactivity_timeout)),
            ("check_interval", Some(self.check_interval)),
            ("ping_interval", self.ping_interval),
        ];
        for (name, value) in settings {
            if value == Some(Duration::ZERO) {
                return Err(NtfyError::ConfigError {
                    reason: format!("liveness {name} must be greater than zero"),
                });
            }
        }
        Ok(())
    }
}

impl ReconnectConfig {
    /// Validated backoff schedule.
    ///
    /// # Errors
    /// Returns [`NtfyError::ConfigError`] for an empty or decreasing table.
    pub fn schedule(&self) -> NtfyResult<BackoffSchedule> {
        BackoffSchedule::from_millis(&self.backoff_tiers_ms)
    }

    /// Attempt cap, `None` when unlimited.
    pub fn attempt_cap(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }
}

// ─── ListenerConfig impl ────────────────────────────────────────────────

impl ListenerConfig {
    /// Create a config for the given servers. The active server defaults to
    /// the one flagged `is_default`, else the first.
    pub fn new(servers: Vec<ServerEndpoint>) -> Self {
        let mut config = Self {
            servers,
            ..Self::default()
        };
        config.normalize();
        config
    }

    #[must_use]
    pub fn with_topics(mut self, commands: Option<&str>, responses: Option<&str>) -> Self {
        self.commands_topic = commands.map(str::to_string);
        self.responses_topic = responses.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_active_server(mut self, id: impl Into<String>) -> Self {
        self.active_server_id = Some(id.into());
        self
    }

    /// Fill in derived values: synthesize a server from the single-server
    /// keys when `servers` is empty, and pick an active server when none is
    /// set. Duplicate server ids are logged; the first occurrence wins.
    pub fn normalize(&mut self) {
        if self.servers.is_empty() {
            let url = self
                .ntfy_url
                .clone()
                .unwrap_or_else(|| DEFAULT_NTFY_URL.to_string());
            let mut server = ServerEndpoint::new(LEGACY_SERVER_ID, url)
                .with_name("Default server")
                .as_default();
            server.token.clone_from(&self.token);
            self.servers.push(server);
        }

        let duplicates = duplicate_ids(&self.servers);
        if !duplicates.is_empty() {
            tracing::error!(
                ?duplicates,
                "Duplicate ntfy server ids; the first occurrence of each is used"
            );
        }

        if self.active_server_id.is_none() {
            self.active_server_id = default_active_id(&self.servers).map(str::to_string);
        }
    }

    /// The configured topic pair.
    pub fn topics(&self) -> TopicSet {
        TopicSet::new(
            self.commands_topic.as_deref(),
            self.responses_topic.as_deref(),
        )
    }

    /// The server to subscribe on.
    ///
    /// # Errors
    /// Returns [`NtfyError::NoActiveEndpoint`] if no server matches.
    pub fn active_endpoint(&self) -> NtfyResult<&ServerEndpoint> {
        let active_id = self.active_server_id.as_deref().unwrap_or_default();
        resolve_endpoint(&self.servers, active_id)
    }

    /// WebSocket URL for the active server and configured topics.
    ///
    /// # Errors
    /// Returns a configuration error if there is no active server, no topic,
    /// or the server URL is unusable.
    pub fn ws_url(&self) -> NtfyResult<String> {
        let topics = self.topics();
        if topics.is_empty() {
            return Err(NtfyError::NoTopics);
        }
        self.active_endpoint()?.ws_url(&topics)
    }

    /// Load config from environment variables only.
    ///
    /// Reads `NTFY_URL` (default `https://ntfy.sh`), `NTFY_TOKEN`,
    /// `NTFY_ACTIVE_SERVER`, `NTFY_COMMANDS_TOPIC`, `NTFY_RESPONSES_TOPIC`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.normalize();
        config
    }

    /// Load config from a TOML file, with environment variable overrides.
    ///
    /// # Errors
    /// Returns [`NtfyError::ConfigError`] if the file cannot be read or parsed.
    #[cfg(feature = "config-toml")]
    pub fn from_file(path: impl AsRef<Path>) -> NtfyResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| NtfyError::ConfigError {
            reason: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut config: Self = toml::from_str(&contents)?;
        config.apply_env_overrides();
        config.normalize();
        Ok(config)
    }

    /// Discover and load config from the standard search path:
    ///
    /// 1. Explicit path (if `Some`)
    /// 2. `NTFY_CONFIG` environment variable
    /// 3. `./ntfy.toml`
    /// 4. `~/.config/ntfy-subscriber/ntfy.toml`
    ///
    /// Falls back to environment-variable-only config if no file is found.
    ///
    /// # Errors
    /// Returns [`NtfyError::ConfigError`] if a discovered file is invalid.
    #[cfg(feature = "config-toml")]
    pub fn discover(explicit_path: Option<&Path>) -> NtfyResult<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var("NTFY_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        let local_path = PathBuf::from("ntfy.toml");
        if local_path.exists() {
            return Self::from_file(&local_path);
        }

        if let Some(config_path) = dirs_config_path() {
            if config_path.exists() {
                return Self::from_file(&config_path);
            }
        }

        Ok(Self::from_env())
    }

    /// Environment overrides. `NTFY_URL`/`NTFY_TOKEN` replace the URL and
    /// token of the active server, or seed the single-server keys when no
    /// servers are configured yet.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("NTFY_ACTIVE_SERVER") {
            self.active_server_id = Some(id);
        }
        if let Ok(topic) = std::env::var("NTFY_COMMANDS_TOPIC") {
            self.commands_topic = Some(topic);
        }
        if let Ok(topic) = std::env::var("NTFY_RESPONSES_TOPIC") {
            self.responses_topic = Some(topic);
        }

        let url = std::env::var("NTFY_URL").ok();
        let token = std::env::var("NTFY_TOKEN").ok();
        if url.is_none() && token.is_none() {
            return;
        }

        if self.servers.is_empty() {
            if url.is_some() {
                self.ntfy_url = url;
            }
            if token.is_some() {
                self.token = token;
            }
            return;
        }

        let active_id = self
            .active_server_id
            .clone()
            .or_else(|| default_active_id(&self.servers).map(str::to_string));
        if let Some(server) = self
            .servers
            .iter_mut()
            .find(|s| Some(&s.id) == active_id.as_ref())
        {
            if let Some(url) = url {
                server.url = url;
            }
            if token.is_some() {
                server.token = token;
            }
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

/// Platform-appropriate config file path.
#[cfg(feature = "config-toml")]
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|dir| PathBuf::from(dir).join("ntfy-subscriber").join("ntfy.toml"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(|dir| {
            PathBuf::from(dir)
                .join(".config")
                .join("ntfy-subscriber")
                .join("ntfy.toml")
        })
    }
}

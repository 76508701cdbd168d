//! # Endpoints
//!
//! Server selection and WebSocket URL construction.
//!
//! ```
//! use ntfy_subscriber::endpoint::{ServerEndpoint, build_ws_url, resolve_endpoint};
//!
//! let servers = vec![
//!     ServerEndpoint::new("a", "https://ntfy.sh"),
//!     ServerEndpoint::new("b", "http://192.168.1.5"),
//! ];
//! let active = resolve_endpoint(&servers, "a").unwrap();
//! let url = build_ws_url(&active.url, "cmd1,resp1", None).unwrap();
//! assert_eq!(url, "wss://ntfy.sh/cmd1,resp1/ws");
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{NtfyError, NtfyResult};
use crate::protocol::constants::{AUTH_QUERY_PARAM, WS_PATH_SUFFIX};
use crate::protocol::TopicSet;

/// A configured ntfy server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    /// Unique identifier, referenced by `active_server_id`.
    pub id: String,

    /// Human-readable label.
    #[serde(default)]
    pub name: String,

    /// HTTP(S) base URL of the server, e.g. `https://ntfy.sh`.
    pub url: String,

    /// Access token for protected topics.
    #[serde(default)]
    pub token: Option<String>,

    /// Preferred server when no active id is configured.
    #[serde(default, alias = "isDefault")]
    pub is_default: bool,
}

impl ServerEndpoint {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            url: url.into(),
            token: None,
            is_default: false,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// WebSocket URL subscribing to `topics` on this server.
    ///
    /// # Errors
    /// Returns [`NtfyError::InvalidEndpoint`] if the URL or topic set is unusable.
    pub fn ws_url(&self, topics: &TopicSet) -> NtfyResult<String> {
        build_ws_url(&self.url, &topics.joined(), self.token.as_deref())
    }
}

impl std::fmt::Debug for ServerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerEndpoint")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// Find the server whose id equals `active_id`.
///
/// # Errors
/// Returns [`NtfyError::NoActiveEndpoint`] when `servers` is empty or no
/// server matches.
pub fn resolve_endpoint<'a>(
    servers: &'a [ServerEndpoint],
    active_id: &str,
) -> NtfyResult<&'a ServerEndpoint> {
    servers
        .iter()
        .find(|s| s.id == active_id)
        .ok_or_else(|| NtfyError::NoActiveEndpoint {
            active_id: active_id.to_string(),
        })
}

/// The id to use when none is configured: the server flagged as default,
/// otherwise the first one.
pub fn default_active_id(servers: &[ServerEndpoint]) -> Option<&str> {
    servers
        .iter()
        .find(|s| s.is_default)
        .or_else(|| servers.first())
        .map(|s| s.id.as_str())
}

/// Ids that appear more than once, in first-seen order.
pub fn duplicate_ids(servers: &[ServerEndpoint]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::with_capacity(servers.len());
    let mut duplicates = Vec::new();
    for server in servers {
        let id = server.id.as_str();
        if seen.contains(&id) {
            if !duplicates.contains(&id) {
                duplicates.push(id);
            }
        } else {
            seen.push(id);
        }
    }
    duplicates
}

/// Build the ntfy WebSocket subscription URL.
///
/// `http://` becomes `ws://` and `https://` becomes `wss://`; `ws(s)://`
/// URLs pass through. Each topic in the comma-separated `topics` list is
/// percent-encoded on its own. A non-blank `token` is sent as
/// `auth=<base64("Authorization: Bearer <token>")>`.
///
/// # Errors
/// Returns [`NtfyError::InvalidEndpoint`] if the base URL or the topic list
/// is empty, or the base URL has no recognised scheme.
pub fn build_ws_url(base_url: &str, topics: &str, token: Option<&str>) -> NtfyResult<String> {
    let base = base_url.trim();
    let base = base.strip_suffix('/').unwrap_or(base);
    if base.is_empty() {
        return Err(NtfyError::InvalidEndpoint {
            reason: "server URL is empty".into(),
        });
    }

    let encoded_topics: Vec<String> = topics
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| urlencoding::encode(t).into_owned())
        .collect();
    if encoded_topics.is_empty() {
        return Err(NtfyError::InvalidEndpoint {
            reason: "topic list is empty".into(),
        });
    }

    let ws_base = websocket_base(base)?;
    let mut url = format!("{ws_base}/{}/{WS_PATH_SUFFIX}", encoded_topics.join(","));

    if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
        let header = format!("Authorization: Bearer {token}");
        let auth = STANDARD.encode(header);
        url.push('?');
        url.push_str(AUTH_QUERY_PARAM);
        url.push('=');
        url.push_str(&urlencoding::encode(&auth));
    }

    Ok(url)
}

/// The URL with the `auth` query value hidden, for logs and display.
pub fn redact_auth(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?{AUTH_QUERY_PARAM}=<redacted>"),
        None => url.to_string(),
    }
}

/// Rewrite the scheme prefix only; the rest of the URL is untouched.
fn websocket_base(base: &str) -> NtfyResult<String> {
    let (scheme, rest) = if let Some(rest) = base.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        ("ws", rest)
    } else if let Some(rest) = base.strip_prefix("wss://") {
        ("wss", rest)
    } else if let Some(rest) = base.strip_prefix("ws://") {
        ("ws", rest)
    } else {
        return Err(NtfyError::InvalidEndpoint {
            reason: format!("'{base}' must start with http://, https://, ws:// or wss://"),
        });
    };

    if rest.is_empty() {
        return Err(NtfyError::InvalidEndpoint {
            reason: format!("'{base}' has no host"),
        });
    }
    Ok(format!("{scheme}://{rest}"))
}

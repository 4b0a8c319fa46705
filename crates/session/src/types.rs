//! Public types for session transports.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sessvault_protocol::RemoteLocation;
use sessvault_protocol::constants::{
    DEFAULT_API_URL, DEFAULT_APP_ID, DEFAULT_SCENARIO_ID, DEFAULT_SESSION_URL, DEFAULT_USER_TYPE,
    HANDSHAKE_TIMEOUT,
};

/// Lifecycle of a [`SessionTransport`](crate::SessionTransport).
///
/// Moves strictly forward. Any state may jump straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionState {
    /// Created, `start` not called yet.
    NotStarted,
    /// Socket opening or waiting for the handshake ack.
    Connecting,
    /// Handshake acknowledged.
    Connected,
    /// Terminal.
    Closed,
}

/// Why a connected transport closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called locally.
    Requested,
    /// The service closed the socket or the stream ended.
    Remote,
    /// The socket failed.
    Error(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("closed locally"),
            Self::Remote => f.write_str("closed by remote"),
            Self::Error(e) => write!(f, "socket error: {e}"),
        }
    }
}

/// Listener for `Session Changed` pushes. Receives the message payload.
pub type StateChangedListener = Box<dyn Fn(serde_json::Value) + Send + Sync>;

/// Listener for the `Connected → Closed` transition. Runs at most once.
pub type ClosedListener = Box<dyn FnOnce(CloseReason) + Send>;

/// Where and how to reach the session service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// WebSocket base URL, e.g. `wss://session.example`.
    pub session_url: String,
    /// REST base URL used for `POST /create`.
    pub api_url: String,
    pub app_id: String,
    pub scenario_id: String,
    /// User type path segment of the session URL.
    pub user_type: String,
    /// Connect plus handshake deadline, in seconds.
    pub handshake_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            session_url: DEFAULT_SESSION_URL.into(),
            api_url: DEFAULT_API_URL.into(),
            app_id: DEFAULT_APP_ID.into(),
            scenario_id: DEFAULT_SCENARIO_ID.into(),
            user_type: DEFAULT_USER_TYPE.into(),
            handshake_timeout_secs: HANDSHAKE_TIMEOUT.as_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs.max(1))
    }

    /// Builds the WebSocket URL addressing `location`.
    ///
    /// Session id and user type are upper-cased; the service treats them
    /// case-insensitively but keys sessions by the upper-case form.
    pub fn session_url_for(&self, location: &RemoteLocation) -> String {
        format!(
            "{}/{}/{}/{}?force=true",
            self.session_url.trim_end_matches('/'),
            location.id.to_uppercase(),
            self.user_type.to_uppercase(),
            location.principal,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_state_is_ordered() {
        assert!(ConnectionState::NotStarted < ConnectionState::Connecting);
        assert!(ConnectionState::Connecting < ConnectionState::Connected);
        assert!(ConnectionState::Connected < ConnectionState::Closed);
    }

    #[test]
    fn remote_config_defaults() {
        let config = RemoteConfig::default();
        assert_eq!(config.session_url, "wss://session.voxpop.run");
        assert_eq!(config.api_url, "https://api.voxpop.run");
        assert_eq!(config.app_id, "sup");
        assert_eq!(config.scenario_id, "sup-brewer");
        assert_eq!(config.handshake_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn session_url_uppercases_id_and_user_type() {
        let config = RemoteConfig {
            session_url: "wss://example.test/".into(),
            user_type: "a".into(),
            ..RemoteConfig::default()
        };
        let loc = RemoteLocation::new("abc12", "user-7");
        assert_eq!(
            config.session_url_for(&loc),
            "wss://example.test/ABC12/A/user-7?force=true"
        );
    }

    #[test]
    fn remote_config_partial_json_fills_defaults() {
        let config: RemoteConfig =
            serde_json::from_str(r#"{"app_id":"other","handshake_timeout_secs":5}"#).unwrap();
        assert_eq!(config.app_id, "other");
        assert_eq!(config.scenario_id, "sup-brewer");
        assert_eq!(config.handshake_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let config = RemoteConfig {
            handshake_timeout_secs: 0,
            ..RemoteConfig::default()
        };
        assert_eq!(config.handshake_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn close_reason_display() {
        assert_eq!(CloseReason::Requested.to_string(), "closed locally");
        assert_eq!(CloseReason::Remote.to_string(), "closed by remote");
        assert!(CloseReason::Error("reset".into()).to_string().contains("reset"));
    }
}

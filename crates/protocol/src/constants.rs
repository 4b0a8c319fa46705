use std::time::Duration;

/// JSON pointer of the record inside a session's state.
///
/// The handshake payload is the full session state; SessVault only ever
/// reads and replaces the value at this path.
pub const RECORD_POINTER: &str = "/scenario/data";

/// Default WebSocket endpoint of the session service.
pub const DEFAULT_SESSION_URL: &str = "wss://session.voxpop.run";

/// Default REST endpoint used to create sessions.
pub const DEFAULT_API_URL: &str = "https://api.voxpop.run";

/// Default application identifier sent with create requests.
pub const DEFAULT_APP_ID: &str = "sup";

/// Default scenario identifier sent with create requests.
pub const DEFAULT_SCENARIO_ID: &str = "sup-brewer";

/// Default user type segment of the session URL.
pub const DEFAULT_USER_TYPE: &str = "A";

/// Time allowed for connect plus handshake before giving up.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for queued writes to drain when a transport closes.
pub const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum message size in bytes (16 MB).
pub const WS_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Session message name carried in the envelope's `name` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageName {
    /// Handshake acknowledgment. Payload is the full session state.
    SessionEntered,
    /// Pushed by the service whenever the session state changes.
    SessionChanged,
    /// Outbound change request carrying JSON-patch operations.
    SessionChange,
    /// Keepalive exchanged in both directions.
    Heartbeat,
}

impl MessageName {
    /// Returns the string used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionEntered => "Session Entered",
            Self::SessionChanged => "Session Changed",
            Self::SessionChange => "Session Change",
            Self::Heartbeat => "Heartbeat",
        }
    }

    /// Parses a wire name. Unknown names yield `None`.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "Session Entered" => Some(Self::SessionEntered),
            "Session Changed" => Some(Self::SessionChanged),
            "Session Change" => Some(Self::SessionChange),
            "Heartbeat" => Some(Self::Heartbeat),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_parse_back() {
        for name in [
            MessageName::SessionEntered,
            MessageName::SessionChanged,
            MessageName::SessionChange,
            MessageName::Heartbeat,
        ] {
            assert_eq!(MessageName::from_wire(name.as_str()), Some(name));
        }
    }

    #[test]
    fn unknown_wire_name_is_none() {
        assert_eq!(MessageName::from_wire("Session Left"), None);
        assert_eq!(MessageName::from_wire("heartbeat"), None);
        assert_eq!(MessageName::from_wire(""), None);
    }

    #[test]
    fn record_pointer_is_json_pointer() {
        let state = serde_json::json!({"scenario": {"data": {"type": "chunk"}}});
        assert_eq!(state.pointer(RECORD_POINTER).unwrap()["type"], "chunk");
    }
}

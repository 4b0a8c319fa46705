//! Error types for the session layer.

use tokio_tungstenite::tungstenite;

/// Errors from the REST create call.
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("session creation rejected: {0}")]
    Rejected(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from session transports and the session client.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("connection closed: {0}")]
    Closed(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("handshake timed out")]
    Timeout,

    #[error("transport already started")]
    AlreadyStarted,

    #[error("transport not connected")]
    NotConnected,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("create failed: {0}")]
    Create(#[from] CreateError),

    #[error("read failed: {0}")]
    Read(#[source] Box<SessionError>),

    #[error("write failed: {0}")]
    Write(#[source] Box<SessionError>),
}

impl SessionError {
    /// Wraps an error raised while reading a record.
    pub fn read(err: SessionError) -> Self {
        Self::Read(Box::new(err))
    }

    /// Wraps an error raised while writing a record.
    pub fn write(err: SessionError) -> Self {
        Self::Write(Box::new(err))
    }

    /// Returns the innermost error, looking through read/write wrappers.
    pub fn root(&self) -> &SessionError {
        match self {
            Self::Read(inner) | Self::Write(inner) => inner.root(),
            other => other,
        }
    }

    /// The connection failed or went away.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.root(),
            Self::Ws(_) | Self::Closed(_) | Self::Timeout | Self::NotConnected
        )
    }

    /// The peer sent something other than what the protocol allows.
    pub fn is_protocol(&self) -> bool {
        matches!(self.root(), Self::Protocol(_))
    }
}

//! Remote session transport and record client.
//!
//! [`SessionTransport`] drives one WebSocket connection to a remote session
//! through its handshake and keeps it alive by answering heartbeats.
//! [`SessionClient`] builds create/read/write-and-commit on top of it, one
//! transport per logical call.

pub mod api;
pub mod client;
pub mod error;
pub(crate) mod pumps;
pub mod transport;
pub mod types;

pub use api::{CreatedSession, SessionApi};
pub use client::{BoxFuture, SessionClient, WsSessionClient};
pub use error::{CreateError, SessionError};
pub use transport::SessionTransport;
pub use types::{
    ClosedListener, CloseReason, ConnectionState, RemoteConfig, StateChangedListener,
};

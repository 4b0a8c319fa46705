//! Wire protocol types for SessVault.
//!
//! Covers the JSON envelope exchanged over a remote session's WebSocket,
//! the change-request patch format, and the record shapes SessVault
//! stores as session state.

pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::MessageName;
pub use envelope::Message;
pub use messages::{ChangeRequest, Heartbeat, PatchOp, PatchOpKind};
pub use types::{BlobMetadata, LocationParseError, RecordKind, RemoteLocation, SessionRecord};

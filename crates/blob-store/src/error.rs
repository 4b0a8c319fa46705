//! Blob store error types.

use sessvault_protocol::RecordKind;
use sessvault_session::SessionError;

/// Errors from decoding joined chunks.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Errors produced while storing or retrieving a blob.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("expected a {expected} record, found {found}")]
    Schema {
        expected: RecordKind,
        found: String,
    },

    #[error("malformed {kind} record: {source}")]
    Malformed {
        kind: RecordKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("cancelled")]
    Cancelled,

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

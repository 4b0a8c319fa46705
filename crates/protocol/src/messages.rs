use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// JSON-patch operation verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Remove,
    Replace,
}

/// A single JSON-patch-like operation applied to the session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub value: serde_json::Value,
}

impl PatchOp {
    /// Replaces the value at `path`.
    pub fn replace(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: path.into(),
            value,
        }
    }
}

/// Payload of a `Session Change` message.
///
/// The service expects the operation list under the singular `change` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub session_id: String,
    pub change: Vec<PatchOp>,
}

// ---------------------------------------------------------------------------
// Bidirectional payloads
// ---------------------------------------------------------------------------

/// Heartbeat payload. Timestamps are Unix milliseconds.
///
/// The service sends `sent`; the reply echoes it and fills `received`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub sent: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<i64>,
}

impl Heartbeat {
    /// Builds the reply to this heartbeat, stamped with `received_ms`.
    pub fn reply(&self, received_ms: i64) -> Self {
        Self {
            sent: self.sent,
            received: Some(received_ms),
        }
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Handle to a remote session plus the identity used to access it.
///
/// Issued by the create call and never modified afterwards. Inside meta
/// records the principal is stored under `teacherUser`, the name the
/// service gives the session's first user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteLocation {
    pub id: String,
    #[serde(rename = "teacherUser")]
    pub principal: String,
}

impl RemoteLocation {
    pub fn new(id: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            principal: principal.into(),
        }
    }
}

/// Textual form `ID:PRINCIPAL`.
impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.principal)
    }
}

/// Error returned when parsing a location handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid location {0:?}: expected ID:PRINCIPAL")]
pub struct LocationParseError(pub String);

impl FromStr for RemoteLocation {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((id, principal)) if !id.is_empty() && !principal.is_empty() => {
                Ok(Self::new(id, principal))
            }
            _ => Err(LocationParseError(s.to_string())),
        }
    }
}

/// Kind of record stored in a session, matching the record's `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Chunk,
    Meta,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chunk => "chunk",
            Self::Meta => "meta",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File description stored in a meta record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadata {
    pub filename: String,
    pub mime_type: String,
    /// Chunk sessions in reassembly order.
    pub chunk_locations: Vec<RemoteLocation>,
}

/// Value persisted as a session's record.
///
/// Serialized as `{"type": "chunk" | "meta", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SessionRecord {
    /// One base64 fragment of a blob.
    Chunk(String),
    /// Blob description listing its chunks.
    Meta(BlobMetadata),
}

impl SessionRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Chunk(_) => RecordKind::Chunk,
            Self::Meta(_) => RecordKind::Meta,
        }
    }

    /// Returns the `type` tag of a raw record value, if it has one.
    pub fn type_tag(value: &serde_json::Value) -> Option<&str> {
        value.get("type").and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_principal_wire_key() {
        let loc = RemoteLocation::new("ABC", "user-1");
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["id"], "ABC");
        assert_eq!(json["teacherUser"], "user-1");
        assert!(json.get("principal").is_none());
    }

    #[test]
    fn location_display_and_parse() {
        let loc = RemoteLocation::new("ABC", "user-1");
        assert_eq!(loc.to_string(), "ABC:user-1");
        assert_eq!("ABC:user-1".parse::<RemoteLocation>().unwrap(), loc);
        assert_eq!(" ABC:user-1\n".parse::<RemoteLocation>().unwrap(), loc);
    }

    #[test]
    fn location_parse_rejects_bad_input() {
        assert!("ABC".parse::<RemoteLocation>().is_err());
        assert!(":user".parse::<RemoteLocation>().is_err());
        assert!("ABC:".parse::<RemoteLocation>().is_err());
        assert!("".parse::<RemoteLocation>().is_err());
    }

    #[test]
    fn chunk_record_wire_format() {
        let record = SessionRecord::Chunk("SGVsbG8=".into());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"type": "chunk", "data": "SGVsbG8="}));
        assert_eq!(record.kind(), RecordKind::Chunk);
    }

    #[test]
    fn meta_record_wire_format() {
        let record = SessionRecord::Meta(BlobMetadata {
            filename: "f.bin".into(),
            mime_type: "application/octet-stream".into(),
            chunk_locations: vec![
                RemoteLocation::new("A", "u1"),
                RemoteLocation::new("B", "u2"),
            ],
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "meta");
        assert_eq!(json["data"]["filename"], "f.bin");
        assert_eq!(json["data"]["mimeType"], "application/octet-stream");
        assert_eq!(json["data"]["chunkLocations"][0]["id"], "A");
        assert_eq!(json["data"]["chunkLocations"][1]["teacherUser"], "u2");
    }

    #[test]
    fn meta_record_parses_original_layout() {
        let raw = r#"{"type":"meta","data":{"filename":"cat.png","mimeType":"image/png",
            "chunkLocations":[{"id":"X1","teacherUser":"t1"},{"id":"X2","teacherUser":"t2"}]}}"#;
        let record: SessionRecord = serde_json::from_str(raw).unwrap();
        match record {
            SessionRecord::Meta(meta) => {
                assert_eq!(meta.filename, "cat.png");
                assert_eq!(meta.chunk_locations.len(), 2);
                assert_eq!(meta.chunk_locations[1], RemoteLocation::new("X2", "t2"));
            }
            other => panic!("expected meta, got {other:?}"),
        }
    }

    #[test]
    fn type_tag_reads_raw_values() {
        let value = serde_json::json!({"type": "chunk", "data": ""});
        assert_eq!(SessionRecord::type_tag(&value), Some("chunk"));
        assert_eq!(SessionRecord::type_tag(&serde_json::Value::Null), None);
        assert_eq!(SessionRecord::type_tag(&serde_json::json!({"type": 3})), None);
    }
}

use serde::{Deserialize, Serialize};

use crate::constants::MessageName;

/// Envelope for all session WebSocket traffic.
///
/// The `name` field stays a plain string so that names this crate does not
/// know about still parse and can be ignored by the receiver. The `payload`
/// uses `serde_json::value::RawValue` to defer deserialization until the
/// receiver knows what it is looking at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
}

impl Message {
    /// Creates a new message with the given name and payload.
    pub fn new<T: Serialize>(
        name: MessageName,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        let raw = match payload {
            Some(p) => {
                let json = serde_json::to_string(p)?;
                Some(serde_json::value::RawValue::from_string(json)?)
            }
            None => None,
        };
        Ok(Self {
            name: name.as_str().to_string(),
            payload: raw,
        })
    }

    /// Returns the known message name, if any.
    pub fn kind(&self) -> Option<MessageName> {
        MessageName::from_wire(&self.name)
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.payload {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }

    /// Returns the payload as a JSON value, `Null` when absent.
    pub fn payload_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        Ok(self
            .parse_payload::<serde_json::Value>()?
            .unwrap_or(serde_json::Value::Null))
    }
}

//! Registry update events and their JSON wire codec.
//!
//! Every event is an object carrying `EventId` (the discriminator) and
//! `TargetId` (the roaming id of the registry it mutates), plus exactly the
//! member it adds or removes:
//!
//! ```json
//! { "EventId": "AddressAdd", "TargetId": "9f2c…", "Address": "/ip4/127.0.0.1/tcp/4001" }
//! ```

use nomad_types::{ContentId, Multiaddr};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A membership change for one registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "EventId")]
pub enum UpdateEvent {
    #[serde(rename_all = "PascalCase")]
    AddressAdd {
        target_id: ContentId,
        address: Multiaddr,
    },
    #[serde(rename_all = "PascalCase")]
    AddressRemove {
        target_id: ContentId,
        address: Multiaddr,
    },
    #[serde(rename_all = "PascalCase")]
    PeerAdd {
        target_id: ContentId,
        peer_id: ContentId,
    },
    #[serde(rename_all = "PascalCase")]
    PeerRemove {
        target_id: ContentId,
        peer_id: ContentId,
    },
    #[serde(rename_all = "PascalCase")]
    PeerSwarmAdd {
        target_id: ContentId,
        peer_swarm_id: ContentId,
    },
    #[serde(rename_all = "PascalCase")]
    PeerSwarmRemove {
        target_id: ContentId,
        peer_swarm_id: ContentId,
    },
}

/// Every discriminator the codec understands.
pub const EVENT_IDS: &[&str] = &[
    "AddressAdd",
    "AddressRemove",
    "PeerAdd",
    "PeerRemove",
    "PeerSwarmAdd",
    "PeerSwarmRemove",
];

impl UpdateEvent {
    /// The registry this event mutates.
    pub fn target_id(&self) -> ContentId {
        match self {
            Self::AddressAdd { target_id, .. }
            | Self::AddressRemove { target_id, .. }
            | Self::PeerAdd { target_id, .. }
            | Self::PeerRemove { target_id, .. }
            | Self::PeerSwarmAdd { target_id, .. }
            | Self::PeerSwarmRemove { target_id, .. } => *target_id,
        }
    }

    /// The wire discriminator.
    pub fn event_id(&self) -> &'static str {
        match self {
            Self::AddressAdd { .. } => "AddressAdd",
            Self::AddressRemove { .. } => "AddressRemove",
            Self::PeerAdd { .. } => "PeerAdd",
            Self::PeerRemove { .. } => "PeerRemove",
            Self::PeerSwarmAdd { .. } => "PeerSwarmAdd",
            Self::PeerSwarmRemove { .. } => "PeerSwarmRemove",
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            Self::AddressRemove { .. } | Self::PeerRemove { .. } | Self::PeerSwarmRemove { .. }
        )
    }

    /// The member field name and its wire value.
    fn payload(&self) -> (&'static str, String) {
        match self {
            Self::AddressAdd { address, .. } | Self::AddressRemove { address, .. } => {
                ("Address", address.to_string())
            }
            Self::PeerAdd { peer_id, .. } | Self::PeerRemove { peer_id, .. } => {
                ("PeerId", peer_id.to_hex())
            }
            Self::PeerSwarmAdd { peer_swarm_id, .. }
            | Self::PeerSwarmRemove { peer_swarm_id, .. } => ("PeerSwarmId", peer_swarm_id.to_hex()),
        }
    }
}

impl std::fmt::Display for UpdateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (field, value) = self.payload();
        write!(
            f,
            "{}({} {field}={value})",
            self.event_id(),
            self.target_id().short_hex()
        )
    }
}

/// Why an event record could not be decoded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EventCodecError {
    #[error("missing or blank field {field}")]
    MissingField { field: &'static str },

    #[error("unsupported event {event_id:?}")]
    UnsupportedEvent { event_id: String },

    #[error("invalid {event_id} event: {reason}")]
    InvalidEvent { event_id: String, reason: String },

    #[error("expected {expected}, found {found}")]
    NotAnObject {
        expected: &'static str,
        found: &'static str,
    },

    #[error("malformed JSON: {0}")]
    Malformed(String),
}

/// Encoder and decoder for [`UpdateEvent`] JSON, single and batched.
///
/// Decoding never coerces: an unknown discriminator or a missing field is an
/// error, and a batch with one bad slot fails as a whole.
pub struct EventCodec;

impl EventCodec {
    /// The serde representation is the wire shape; this only maps the
    /// error.
    pub fn encode(event: &UpdateEvent) -> Result<Value, EventCodecError> {
        serde_json::to_value(event).map_err(|e| EventCodecError::Malformed(e.to_string()))
    }

    /// Encode an optional event; `None` becomes `null`.
    pub fn encode_optional(event: Option<&UpdateEvent>) -> Result<Value, EventCodecError> {
        event.map_or(Ok(Value::Null), Self::encode)
    }

    pub fn decode(value: &Value) -> Result<UpdateEvent, EventCodecError> {
        let map = value.as_object().ok_or(EventCodecError::NotAnObject {
            expected: "object",
            found: json_type(value),
        })?;

        let event_id = required_str(map, "EventId")?;
        required_str(map, "TargetId")?;
        if !EVENT_IDS.contains(&event_id) {
            return Err(EventCodecError::UnsupportedEvent {
                event_id: event_id.to_string(),
            });
        }

        serde_json::from_value(value.clone()).map_err(|e| EventCodecError::InvalidEvent {
            event_id: event_id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Decode an optional event; `null` is `None`.
    pub fn decode_optional(value: &Value) -> Result<Option<UpdateEvent>, EventCodecError> {
        match value {
            Value::Null => Ok(None),
            other => Self::decode(other).map(Some),
        }
    }

    /// Encode a batch, keeping `None` slots as `null` in place.
    pub fn encode_batch(events: &[Option<UpdateEvent>]) -> Result<Value, EventCodecError> {
        events
            .iter()
            .map(|e| Self::encode_optional(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    /// Decode a batch, preserving slot order and `null` placeholders.
    pub fn decode_batch(value: &Value) -> Result<Vec<Option<UpdateEvent>>, EventCodecError> {
        let items = value.as_array().ok_or(EventCodecError::NotAnObject {
            expected: "array",
            found: json_type(value),
        })?;
        items.iter().map(Self::decode_optional).collect()
    }

    pub fn to_bytes(event: &UpdateEvent) -> Result<Vec<u8>, EventCodecError> {
        serde_json::to_vec(event).map_err(|e| EventCodecError::Malformed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<UpdateEvent, EventCodecError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| EventCodecError::Malformed(e.to_string()))?;
        Self::decode(&value)
    }
}

fn required_str<'a>(
    map: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, EventCodecError> {
    map.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(EventCodecError::MissingField { field })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

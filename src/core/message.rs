//! Message envelope and wire encoding

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, TransportError};

/// Maximum encoded message size (16MB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Wire schema version carried in every frame
pub const WIRE_VERSION: u8 = 1;

/// Frame header size (4 bytes length + 1 byte version)
const HEADER_SIZE: usize = 5;

/// Message purpose tag
///
/// A closed enumeration; extending the protocol means adding a variant
/// here, never sending a free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Liveness probe
    Ping,
    /// Application data, payload carries the value
    Data,
    /// State update from the controlled side
    State,
    /// Remote-control command
    Command,
    /// Peer announces it is going away
    Disconnect,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ping => "PING",
            Self::Data => "DATA",
            Self::State => "STATE",
            Self::Command => "COMMAND",
            Self::Disconnect => "DISCONNECT",
        };
        f.write_str(name)
    }
}

/// Immutable message envelope exchanged over the transport
///
/// An envelope is a type tag plus an optional payload and optional
/// metadata. It has no setters, so it can cross task boundaries without
/// copying or locking. Framing and ordering are the wire layer's job;
/// the envelope itself carries no identifiers or sequence numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    metadata: Option<BTreeMap<String, Value>>,
}

impl Message {
    /// Create an envelope with only a type tag
    #[must_use]
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            payload: None,
            metadata: None,
        }
    }

    /// Create an envelope with a payload
    #[must_use]
    pub fn with_payload(message_type: MessageType, payload: impl Into<Value>) -> Self {
        Self {
            message_type,
            payload: Some(payload.into()),
            metadata: None,
        }
    }

    /// Create an envelope with a payload and metadata
    #[must_use]
    pub fn with_metadata(
        message_type: MessageType,
        payload: impl Into<Value>,
        metadata: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            message_type,
            payload: Some(payload.into()),
            metadata: Some(metadata),
        }
    }

    /// Get the type tag
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Get the payload, if any
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Get the metadata mapping, if any
    #[must_use]
    pub fn metadata(&self) -> Option<&BTreeMap<String, Value>> {
        self.metadata.as_ref()
    }

    /// Look up a metadata value by key
    ///
    /// Returns `None` when metadata is absent or the key is missing;
    /// never panics.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref()?.get(key)
    }

    /// Encode into wire format (length-prefixed, versioned JSON body)
    pub fn encode(&self) -> Result<BytesMut> {
        let body = serde_json::to_vec(self)
            .map_err(|e| TransportError::serialization(format!("encode failed: {}", e)))?;

        if body.len() > MAX_MESSAGE_SIZE {
            return Err(TransportError::MessageTooLarge(body.len(), MAX_MESSAGE_SIZE));
        }

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
        buf.put_u32(body.len() as u32);
        buf.put_u8(WIRE_VERSION);
        buf.put_slice(&body);
        Ok(buf)
    }

    /// Decode one envelope from wire format
    ///
    /// Returns `Ok(None)` when `buf` does not yet hold a complete frame;
    /// the caller should read more bytes and retry. On success the frame
    /// is consumed from `buf`, which may still contain further frames.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&buf[..4]);
        let len = u32::from_be_bytes(length_bytes) as usize;

        if len > MAX_MESSAGE_SIZE {
            return Err(TransportError::MessageTooLarge(len, MAX_MESSAGE_SIZE));
        }

        let version = buf[4];
        if version != WIRE_VERSION {
            return Err(TransportError::decode(format!(
                "unsupported wire version {} (expected {})",
                version, WIRE_VERSION
            )));
        }

        if buf.len() < HEADER_SIZE + len {
            return Ok(None);
        }

        buf.advance(HEADER_SIZE);
        let body = buf.split_to(len);

        let message = serde_json::from_slice(&body)
            .map_err(|e| TransportError::decode(format!("malformed envelope: {}", e)))?;

        Ok(Some(message))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message[{}]", self.message_type)
    }
}

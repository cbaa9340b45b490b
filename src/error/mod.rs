//! Error types for the transport

use std::io;
use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encode/decode stream could not be established for a direction
    #[error("Stream unavailable: {0}")]
    StreamUnavailable(String),

    /// Malformed or unrecognized inbound record
    #[error("Decode error: {0}")]
    Decode(String),

    /// I/O failure while writing a record
    #[error("Write error: {0}")]
    Write(String),

    /// Operation attempted on a disabled direction or a disconnected transport
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Queue was closed while an operation was in flight
    #[error("Queue closed: {0}")]
    QueueClosed(String),

    /// Message exceeds the wire size limit
    #[error("Message too large: {0} bytes (max: {1} bytes)")]
    MessageTooLarge(usize, usize),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TransportError {
    /// Create a stream-unavailable error
    pub fn stream_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::StreamUnavailable(msg.into())
    }

    /// Create a decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a write error
    pub fn write<S: Into<String>>(msg: S) -> Self {
        Self::Write(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a queue-closed error
    pub fn queue_closed<S: Into<String>>(msg: S) -> Self {
        Self::QueueClosed(msg.into())
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TransportError::invalid_state("outbound disabled");
        assert_eq!(err.to_string(), "Invalid state: outbound disabled");

        let err = TransportError::decode("bad frame");
        assert_eq!(err.to_string(), "Decode error: bad frame");

        let err = TransportError::MessageTooLarge(1000, 512);
        assert_eq!(
            err.to_string(),
            "Message too large: 1000 bytes (max: 512 bytes)"
        );
    }
}

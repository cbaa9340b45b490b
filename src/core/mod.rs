//! Core transport functionality

pub mod codec;
pub mod message;
pub mod queue;
pub mod transport;

pub use codec::{FrameReader, FrameWriter};
pub use message::{Message, MessageType, MAX_MESSAGE_SIZE, WIRE_VERSION};
pub use queue::TransportQueue;
pub use transport::{SocketTransport, TransportConfig};

//! Message Transport
//!
//! A bidirectional, message-oriented transport layer over a single
//! connected stream socket, built on tokio. It decouples application logic
//! from raw byte-stream I/O with two ordered queues per connection: one
//! outbound, drained onto the wire by a background writer loop, and one
//! inbound, filled by a background reader loop decoding length-prefixed,
//! versioned frames.
//!
//! The transport deliberately stops at moving envelopes. Routing,
//! handshakes, authentication, discovery, and reconnect policy are the
//! caller's business.
//!
//! ## Example
//!
//! ```no_run
//! use message_transport::{Message, MessageType, SocketTransport};
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = TcpStream::connect("127.0.0.1:8080").await?;
//!     let transport = SocketTransport::new(stream);
//!
//!     transport.enqueue_outbound(Message::new(MessageType::Ping))?;
//!
//!     while let Some(message) = transport.recv().await? {
//!         println!("received {}", message);
//!     }
//!
//!     transport.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod diag;
pub mod error;

// Re-export main types
pub use crate::core::{
    FrameReader, FrameWriter, Message, MessageType, SocketTransport, TransportConfig,
    TransportQueue, MAX_MESSAGE_SIZE, WIRE_VERSION,
};
pub use crate::diag::{DiagnosticsSink, TracingDiagnostics};
pub use crate::error::{Result, TransportError};

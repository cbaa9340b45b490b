//! Minimal remote-control server example
//!
//! Accepts one connection at a time, wraps it in a transport, and answers
//! every COMMAND with a STATE update until the peer goes away.

use message_transport::{Message, MessageType, SocketTransport, TracingDiagnostics, TransportConfig};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let listener = TcpListener::bind("127.0.0.1:8080").await?;
    println!("Listening on 127.0.0.1:8080");

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        println!("Connection from {}", peer_addr);

        let config = TransportConfig::new().with_diagnostics(Arc::new(TracingDiagnostics));
        let transport = SocketTransport::with_config(stream, config);

        while let Some(message) = transport.recv().await? {
            println!("received: {}", message);

            match message.message_type() {
                MessageType::Command => {
                    transport.enqueue_outbound(Message::with_payload(
                        MessageType::State,
                        json!({"ack": message.payload()}),
                    ))?;
                }
                MessageType::Ping => {
                    transport.enqueue_outbound(Message::new(MessageType::Ping))?;
                }
                MessageType::Disconnect => break,
                _ => {}
            }
        }

        println!("Peer {} gone, tearing down", peer_addr);
        transport.disconnect().await;
    }
}

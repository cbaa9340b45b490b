//! Loopback transport pair example
//!
//! Builds two transports over a local TCP connection in one process and
//! exchanges a few messages in both directions.

use message_transport::{Message, MessageType, SocketTransport, TracingDiagnostics, TransportConfig};
use serde_json::json;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let client = TcpStream::connect(addr).await?;
    let (server, _) = listener.accept().await?;

    let config = TransportConfig::new().with_diagnostics(Arc::new(TracingDiagnostics));
    let remote = SocketTransport::with_config(client, config.clone());
    let host = SocketTransport::with_config(server, config);

    // Remote side sends a few commands
    remote.enqueue_outbound(Message::new(MessageType::Ping))?;
    remote.enqueue_outbound(Message::with_payload(MessageType::Command, json!("play")))?;
    remote.enqueue_outbound(Message::with_payload(
        MessageType::Command,
        json!({"seek": 42}),
    ))?;

    // Host drains them and answers with a state update
    for _ in 0..3 {
        if let Some(message) = host.recv().await? {
            println!("host received: {}", message);
        }
    }
    host.enqueue_outbound(Message::with_payload(
        MessageType::State,
        json!({"status": "playing", "position": 42}),
    ))?;

    if let Some(state) = remote.recv().await? {
        println!("remote received: {}", state);
        println!("  payload: {:?}", state.payload());
    }

    println!("Disconnecting...");
    remote.disconnect().await;
    host.disconnect().await;

    println!("Done!");
    Ok(())
}

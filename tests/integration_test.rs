//! Integration tests for the message transport

use message_transport::{Message, MessageType, SocketTransport, TransportConfig, TransportError};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Build a connected transport pair over loopback
async fn transport_pair(
    config_a: TransportConfig,
    config_b: TransportConfig,
) -> (SocketTransport, SocketTransport) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client = TcpStream::connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();

    (
        SocketTransport::with_config(client, config_a),
        SocketTransport::with_config(server, config_b),
    )
}

async fn recv_with_timeout(transport: &SocketTransport) -> Option<Message> {
    tokio::time::timeout(Duration::from_secs(5), transport.recv())
        .await
        .expect("recv timed out")
        .expect("inbound direction not active")
}

#[tokio::test]
async fn test_messages_arrive_in_enqueue_order() {
    let (a, b) = transport_pair(TransportConfig::new(), TransportConfig::new()).await;

    let first = Message::new(MessageType::Ping);
    let second = Message::with_payload(MessageType::Data, json!("x"));

    a.enqueue_outbound(first.clone()).unwrap();
    a.enqueue_outbound(second.clone()).unwrap();

    let got_first = recv_with_timeout(&b).await.unwrap();
    let got_second = recv_with_timeout(&b).await.unwrap();

    assert_eq!(got_first, first);
    assert_eq!(got_second, second);

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_many_messages_preserve_order() {
    let (a, b) = transport_pair(TransportConfig::new(), TransportConfig::new()).await;

    for i in 0..200 {
        a.enqueue_outbound(Message::with_payload(MessageType::Data, json!(i)))
            .unwrap();
    }

    for i in 0..200 {
        let msg = recv_with_timeout(&b).await.unwrap();
        assert_eq!(msg.payload(), Some(&json!(i)));
    }

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_bidirectional_exchange() {
    let (a, b) = transport_pair(TransportConfig::new(), TransportConfig::new()).await;

    a.enqueue_outbound(Message::with_payload(MessageType::Command, json!("play")))
        .unwrap();
    b.enqueue_outbound(Message::with_payload(MessageType::State, json!("playing")))
        .unwrap();

    let at_b = recv_with_timeout(&b).await.unwrap();
    let at_a = recv_with_timeout(&a).await.unwrap();

    assert_eq!(at_b.message_type(), MessageType::Command);
    assert_eq!(at_a.message_type(), MessageType::State);

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_metadata_travels_with_the_message() {
    let (a, b) = transport_pair(TransportConfig::new(), TransportConfig::new()).await;

    let mut metadata = BTreeMap::new();
    metadata.insert("origin".to_string(), json!("handset"));
    metadata.insert("seq".to_string(), json!(7));

    a.enqueue_outbound(Message::with_metadata(
        MessageType::Command,
        json!("volume_up"),
        metadata,
    ))
    .unwrap();

    let received = recv_with_timeout(&b).await.unwrap();
    assert_eq!(received.metadata_value("origin"), Some(&json!("handset")));
    assert_eq!(received.metadata_value("seq"), Some(&json!(7)));
    assert!(received.metadata_value("absent").is_none());

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_outbound_disabled_rejects_enqueue_immediately() {
    let (a, b) = transport_pair(
        TransportConfig::new().with_outbound(false),
        TransportConfig::new(),
    )
    .await;

    assert!(!a.outbound_active());
    assert!(a.inbound_active());

    let result = a.enqueue_outbound(Message::new(MessageType::Ping));
    assert!(matches!(result, Err(TransportError::InvalidState(_))));

    // The inbound direction still works in this degraded shape
    b.enqueue_outbound(Message::new(MessageType::Ping)).unwrap();
    let msg = recv_with_timeout(&a).await.unwrap();
    assert_eq!(msg.message_type(), MessageType::Ping);

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_inbound_disabled_rejects_recv() {
    let (a, b) = transport_pair(
        TransportConfig::new().with_inbound(false),
        TransportConfig::new(),
    )
    .await;

    assert!(!a.inbound_active());
    assert!(matches!(
        a.recv().await,
        Err(TransportError::InvalidState(_))
    ));
    assert!(matches!(
        a.try_recv(),
        Err(TransportError::InvalidState(_))
    ));

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_try_recv_polls_without_blocking() {
    let (a, b) = transport_pair(TransportConfig::new(), TransportConfig::new()).await;

    assert!(b.try_recv().unwrap().is_none());

    a.enqueue_outbound(Message::new(MessageType::Ping)).unwrap();

    // Poll until the reader loop has moved the message into the queue
    let mut polled = None;
    for _ in 0..100 {
        if let Some(msg) = b.try_recv().unwrap() {
            polled = Some(msg);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(polled.unwrap().message_type(), MessageType::Ping);

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_envelope_without_payload_survives_the_wire() {
    let (a, b) = transport_pair(TransportConfig::new(), TransportConfig::new()).await;

    a.enqueue_outbound(Message::new(MessageType::Disconnect))
        .unwrap();

    let received = recv_with_timeout(&b).await.unwrap();
    assert_eq!(received.message_type(), MessageType::Disconnect);
    assert!(received.payload().is_none());
    assert!(received.metadata().is_none());

    a.disconnect().await;
    b.disconnect().await;
}

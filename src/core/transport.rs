//! Socket transport
//!
//! One [`SocketTransport`] owns one connected socket for its whole life:
//! the two message queues, the reader and writer loop tasks, and the
//! teardown that stops them. It is deliberately dumb about message
//! content; routing, handshakes, and reconnect policy all live above it.

use std::fmt;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::codec::{FrameReader, FrameWriter};
use crate::core::message::Message;
use crate::core::queue::TransportQueue;
use crate::diag::{Diag, DiagnosticsSink};
use crate::error::{Result, TransportError};

/// Transport configuration
///
/// Directions are independently toggleable; a transport with both
/// disabled is legal but inert.
#[derive(Clone)]
pub struct TransportConfig {
    /// Whether to run the reader loop
    pub inbound_enabled: bool,
    /// Whether to run the writer loop
    pub outbound_enabled: bool,
    /// Optional diagnostics sink; absence suppresses all output
    pub diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            inbound_enabled: true,
            outbound_enabled: true,
            diagnostics: None,
        }
    }
}

impl TransportConfig {
    /// Create a configuration with both directions enabled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the inbound direction
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_inbound(mut self, enabled: bool) -> Self {
        self.inbound_enabled = enabled;
        self
    }

    /// Enable or disable the outbound direction
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_outbound(mut self, enabled: bool) -> Self {
        self.outbound_enabled = enabled;
        self
    }

    /// Set the diagnostics sink
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("inbound_enabled", &self.inbound_enabled)
            .field("outbound_enabled", &self.outbound_enabled)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

/// Monotonic disconnect flag shared by both loops
///
/// Set at most once, never reverts. Both loops await it at every
/// suspension point, so teardown never depends on traffic arriving.
struct DisconnectSignal {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl DisconnectSignal {
    fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Set the flag; returns true only for the first caller
    fn set(&self) -> bool {
        !self.tx.send_replace(true)
    }

    fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the flag is set
    async fn wait(&self) {
        let mut rx = self.rx.clone();
        // Sender lives as long as self, so this cannot fail
        let _ = rx.wait_for(|disconnected| *disconnected).await;
    }
}

/// Background task handles and socket halves not driven by a loop
#[derive(Default)]
struct TaskHandles {
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    // Halves for disabled directions are parked here instead of being
    // dropped at construction, so the peer does not see a premature FIN
    parked_reader: Option<FrameReader>,
    parked_writer: Option<FrameWriter>,
}

/// Bidirectional, queue-backed message transport over one connected socket
///
/// Construction starts one background task per enabled direction. The
/// writer loop drains the outbound queue onto the wire; the reader loop
/// decodes frames into the inbound queue. [`disconnect`](Self::disconnect)
/// is the only teardown path and is terminal; a new connection needs a
/// new transport.
pub struct SocketTransport {
    inbound: Arc<TransportQueue>,
    outbound: Arc<TransportQueue>,
    shutdown: Arc<DisconnectSignal>,
    tasks: tokio::sync::Mutex<TaskHandles>,
    inbound_active: bool,
    outbound_active: bool,
    diag: Diag,
}

impl SocketTransport {
    /// Create a transport over a connected socket with both directions
    /// enabled
    ///
    /// Must be called from within a Tokio runtime; loop tasks are spawned
    /// immediately and construction never waits for the peer.
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self::with_config(stream, TransportConfig::default())
    }

    /// Create a transport over a connected socket with custom configuration
    #[must_use]
    pub fn with_config(stream: TcpStream, config: TransportConfig) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self::from_streams(
            Some(FrameReader::new(read_half)),
            Some(FrameWriter::new(write_half)),
            config,
        )
    }

    /// Create a transport from pre-built frame streams
    ///
    /// This is the path for collaborators that negotiated a handshake
    /// before handing the connection over: build the [`FrameReader`] and
    /// [`FrameWriter`] during the handshake and reuse them here.
    ///
    /// An enabled direction with no stream supplied is reported through
    /// diagnostics and left inactive; the transport still comes up in
    /// degraded half-duplex mode rather than failing construction.
    #[must_use]
    pub fn from_streams(
        reader: Option<FrameReader>,
        writer: Option<FrameWriter>,
        config: TransportConfig,
    ) -> Self {
        let diag = Diag::new(config.diagnostics.clone());
        let shutdown = Arc::new(DisconnectSignal::new());
        let inbound = Arc::new(TransportQueue::new());
        let outbound = Arc::new(TransportQueue::new());
        let mut handles = TaskHandles::default();

        let mut reader = reader;
        let mut writer = writer;

        let inbound_active = if config.inbound_enabled {
            match reader.take() {
                Some(frame_reader) => {
                    handles.reader = Some(tokio::spawn(reader_loop(
                        frame_reader,
                        Arc::clone(&inbound),
                        Arc::clone(&shutdown),
                        diag.clone(),
                    )));
                    true
                }
                None => {
                    let err = TransportError::stream_unavailable(
                        "inbound enabled but no decode stream supplied",
                    );
                    diag.error(&err.to_string());
                    false
                }
            }
        } else {
            false
        };

        let outbound_active = if config.outbound_enabled {
            match writer.take() {
                Some(frame_writer) => {
                    handles.writer = Some(tokio::spawn(writer_loop(
                        frame_writer,
                        Arc::clone(&outbound),
                        Arc::clone(&shutdown),
                        diag.clone(),
                    )));
                    true
                }
                None => {
                    let err = TransportError::stream_unavailable(
                        "outbound enabled but no encode stream supplied",
                    );
                    diag.error(&err.to_string());
                    false
                }
            }
        } else {
            false
        };

        if !inbound_active {
            inbound.close();
        }
        if !outbound_active {
            outbound.close();
        }

        handles.parked_reader = reader;
        handles.parked_writer = writer;

        Self {
            inbound,
            outbound,
            shutdown,
            tasks: tokio::sync::Mutex::new(handles),
            inbound_active,
            outbound_active,
            diag,
        }
    }

    /// Queue a message for sending
    ///
    /// Returns immediately; the queue is unbounded, so there is no
    /// backpressure here. Fails with [`TransportError::InvalidState`] when
    /// the outbound direction was never established or the transport is
    /// disconnected.
    pub fn enqueue_outbound(&self, message: Message) -> Result<()> {
        if !self.outbound_active {
            return Err(TransportError::invalid_state(
                "outbound direction is not enabled",
            ));
        }
        if self.shutdown.is_set() {
            return Err(TransportError::invalid_state("transport is disconnected"));
        }

        self.outbound
            .enqueue(message)
            .map_err(|_| TransportError::invalid_state("transport is disconnected"))
    }

    /// Receive the next inbound message, waiting for one to arrive
    ///
    /// Returns `Ok(None)` once the inbound side is closed (reader loop
    /// terminated and the queue is drained); that is the collaborator's
    /// signal that the peer went away. Fails with
    /// [`TransportError::InvalidState`] when inbound was never established.
    pub async fn recv(&self) -> Result<Option<Message>> {
        if !self.inbound_active {
            return Err(TransportError::invalid_state(
                "inbound direction is not enabled",
            ));
        }
        Ok(self.inbound.dequeue().await)
    }

    /// Receive the next inbound message without waiting
    ///
    /// Returns `Ok(None)` when no message is currently queued.
    pub fn try_recv(&self) -> Result<Option<Message>> {
        if !self.inbound_active {
            return Err(TransportError::invalid_state(
                "inbound direction is not enabled",
            ));
        }
        Ok(self.inbound.try_dequeue())
    }

    /// Whether the inbound direction came up at construction
    #[must_use]
    pub fn inbound_active(&self) -> bool {
        self.inbound_active
    }

    /// Whether the outbound direction came up at construction
    #[must_use]
    pub fn outbound_active(&self) -> bool {
        self.outbound_active
    }

    /// Whether disconnect has been triggered
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.shutdown.is_set()
    }

    /// Number of messages waiting in the inbound queue
    #[must_use]
    pub fn inbound_depth(&self) -> u64 {
        self.inbound.depth()
    }

    /// Number of messages waiting in the outbound queue
    #[must_use]
    pub fn outbound_depth(&self) -> u64 {
        self.outbound.depth()
    }

    /// Tear the transport down
    ///
    /// Teardown order: set the disconnect flag, let the writer flush its
    /// buffered bytes and close the write direction, then wait for both
    /// loop tasks to finish. After this returns no further bytes are read
    /// or written and both tasks are known to have stopped.
    ///
    /// Idempotent and safe to call concurrently: every caller returns only
    /// after teardown is complete, resources are released exactly once,
    /// and close errors are swallowed and logged rather than surfaced.
    pub async fn disconnect(&self) {
        if self.shutdown.set() {
            // Closing the outbound queue wakes a writer blocked on dequeue
            // even before it observes the flag
            self.outbound.close();
            self.diag.info("transport disconnecting");
        }

        let mut tasks = self.tasks.lock().await;

        if let Some(writer) = tasks.writer.take() {
            if writer.await.is_err() {
                self.diag.warn("writer task aborted during teardown");
            }
        }
        if let Some(reader) = tasks.reader.take() {
            if reader.await.is_err() {
                self.diag.warn("reader task aborted during teardown");
            }
        }

        // Release halves of directions that never ran; this closes the
        // remaining socket resources
        tasks.parked_reader.take();
        tasks.parked_writer.take();
    }
}

impl fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketTransport")
            .field("inbound_active", &self.inbound_active)
            .field("outbound_active", &self.outbound_active)
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}

/// Writer loop: Running -> Draining -> Stopped
///
/// Blocks on the outbound queue (never spin-polls) and re-checks the
/// disconnect flag at every suspension point via `select!`. A write
/// failure terminates only this loop; retry policy belongs to the
/// collaborator.
async fn writer_loop(
    mut writer: FrameWriter,
    outbound: Arc<TransportQueue>,
    shutdown: Arc<DisconnectSignal>,
    diag: Diag,
) {
    loop {
        tokio::select! {
            // Checked first so the flag always wins over queued traffic
            biased;
            _ = shutdown.wait() => break,
            message = outbound.dequeue() => match message {
                Some(message) => {
                    if let Err(e) = writer.write_frame(&message).await {
                        diag.error(&format!("writer loop terminated: {}", e));
                        return;
                    }
                }
                // Queue closed: disconnect in progress
                None => break,
            }
        }
    }

    // Draining: push out whatever is buffered, then send FIN
    if let Err(e) = writer.flush().await {
        diag.warn(&format!("flush on teardown failed: {}", e));
    }
    let _ = writer.shutdown().await;
}

/// Reader loop: Running -> Stopped
///
/// Decode errors and end-of-stream both mean the peer is gone: report and
/// stop, without touching the writer side. Closing the inbound queue on
/// exit is what turns a blocked `recv` into the `None` closed signal.
async fn reader_loop(
    mut reader: FrameReader,
    inbound: Arc<TransportQueue>,
    shutdown: Arc<DisconnectSignal>,
    diag: Diag,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            frame = reader.read_frame() => match frame {
                Ok(Some(message)) => {
                    if inbound.enqueue(message).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    diag.info("peer closed the connection");
                    break;
                }
                Err(e) => {
                    diag.error(&format!("reader loop terminated: {}", e));
                    break;
                }
            }
        }
    }

    inbound.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::MessageType;

    #[tokio::test]
    async fn test_config_builder() {
        let config = TransportConfig::new()
            .with_inbound(false)
            .with_outbound(true);

        assert!(!config.inbound_enabled);
        assert!(config.outbound_enabled);
        assert!(config.diagnostics.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_signal_is_monotonic() {
        let signal = DisconnectSignal::new();
        assert!(!signal.is_set());

        assert!(signal.set());
        assert!(signal.is_set());

        // Second set is a no-op and reports not-first
        assert!(!signal.set());
        assert!(signal.is_set());
    }

    #[tokio::test]
    async fn test_disconnect_signal_wakes_waiter() {
        let signal = Arc::new(DisconnectSignal::new());
        let waiter_signal = Arc::clone(&signal);

        let waiter = tokio::spawn(async move { waiter_signal.wait().await });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        signal.set();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter did not observe the flag")
            .unwrap();
    }

    #[tokio::test]
    async fn test_enqueue_without_outbound_stream() {
        // Outbound enabled but no encode stream supplied: degraded mode
        let transport = SocketTransport::from_streams(None, None, TransportConfig::new());

        assert!(!transport.outbound_active());
        assert!(!transport.inbound_active());

        let result = transport.enqueue_outbound(Message::new(MessageType::Ping));
        assert!(matches!(result, Err(TransportError::InvalidState(_))));
    }
}

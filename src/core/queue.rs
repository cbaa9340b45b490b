//! Transport queues
//!
//! Each transport owns two of these: one inbound, one outbound. The queue
//! is unbounded by design, so enqueue never waits; a stalled peer or a slow
//! consumer lets the queue grow without limit. Callers that need a bound
//! must impose it above this layer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::message::Message;
use crate::error::{Result, TransportError};

/// Unbounded FIFO queue of messages, safe for concurrent producers and
/// consumers
///
/// Insertion order is preserved. Closing the queue is the "no more
/// messages" signal: blocked consumers drain whatever remains and then
/// observe `None`.
pub struct TransportQueue {
    tx: parking_lot::Mutex<Option<mpsc::UnboundedSender<Message>>>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Message>>>,
    enqueued_count: AtomicU64,
    dequeued_count: AtomicU64,
}

impl TransportQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: parking_lot::Mutex::new(Some(tx)),
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            enqueued_count: AtomicU64::new(0),
            dequeued_count: AtomicU64::new(0),
        }
    }

    /// Append a message
    ///
    /// Never waits; the queue is unbounded. Fails only after [`close`](Self::close).
    pub fn enqueue(&self, message: Message) -> Result<()> {
        let guard = self.tx.lock();
        let tx = guard
            .as_ref()
            .ok_or_else(|| TransportError::queue_closed("queue is closed"))?;

        tx.send(message)
            .map_err(|_| TransportError::queue_closed("queue receiver dropped"))?;

        self.enqueued_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Remove the next message, waiting for one to arrive
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn dequeue(&self) -> Option<Message> {
        let mut rx_guard = self.rx.lock().await;
        let message = rx_guard.recv().await;

        if message.is_some() {
            self.dequeued_count.fetch_add(1, Ordering::Relaxed);
        }

        message
    }

    /// Remove the next message without waiting
    ///
    /// Returns `None` when the queue is currently empty or another consumer
    /// holds the receiver.
    pub fn try_dequeue(&self) -> Option<Message> {
        let mut rx_guard = self.rx.try_lock().ok()?;
        let message = rx_guard.try_recv().ok();

        if message.is_some() {
            self.dequeued_count.fetch_add(1, Ordering::Relaxed);
        }

        message
    }

    /// Close the queue
    ///
    /// Idempotent. Pending messages stay dequeueable; once drained,
    /// consumers observe `None`.
    pub fn close(&self) {
        self.tx.lock().take();
    }

    /// Whether the queue has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Current number of queued messages
    #[must_use]
    pub fn depth(&self) -> u64 {
        let enqueued = self.enqueued_count.load(Ordering::Relaxed);
        let dequeued = self.dequeued_count.load(Ordering::Relaxed);
        enqueued.saturating_sub(dequeued)
    }

    /// Whether the queue is currently empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }
}

impl Default for TransportQueue {
    fn default() -> Self {
        Self::new()
    }
}

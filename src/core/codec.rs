//! Frame streams over the split socket halves
//!
//! [`FrameReader`] and [`FrameWriter`] are the decode/encode streams the
//! transport runs its loops over. They are public so a collaborator that
//! negotiates a handshake before constructing the transport can build them
//! itself and hand them over via
//! [`SocketTransport::from_streams`](crate::core::transport::SocketTransport::from_streams).

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::core::message::{Message, MAX_MESSAGE_SIZE};
use crate::error::{Result, TransportError};

/// Read buffer cap; decode returning `None` past this means malformed input
const MAX_BUFFER_SIZE: usize = MAX_MESSAGE_SIZE + 1024;

const INITIAL_BUFFER_CAPACITY: usize = 4096;

/// Decoding stream producing one envelope per complete frame
pub struct FrameReader {
    read_half: OwnedReadHalf,
    // Persists across read_frame calls; one TCP read may carry several frames
    buffer: BytesMut,
}

impl FrameReader {
    /// Wrap the read half of a connected socket
    #[must_use]
    pub fn new(read_half: OwnedReadHalf) -> Self {
        Self {
            read_half,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next envelope from the stream
    ///
    /// Blocks until a complete frame is available. Returns `Ok(None)` on a
    /// clean end-of-stream at a frame boundary; end-of-stream in the middle
    /// of a frame is a decode error, as is any malformed frame. No
    /// partial-message recovery is attempted after an error.
    pub async fn read_frame(&mut self) -> Result<Option<Message>> {
        loop {
            if let Some(message) = Message::decode(&mut self.buffer)? {
                return Ok(Some(message));
            }

            if self.buffer.len() >= MAX_BUFFER_SIZE {
                return Err(TransportError::decode(
                    "buffer exceeded maximum size without a complete frame",
                ));
            }

            let n = self.read_half.read_buf(&mut self.buffer).await?;

            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(TransportError::decode(format!(
                    "connection closed mid-frame ({} bytes pending)",
                    self.buffer.len()
                )));
            }
        }
    }
}

/// Encoding stream writing one frame per envelope
pub struct FrameWriter {
    write_half: OwnedWriteHalf,
}

impl FrameWriter {
    /// Wrap the write half of a connected socket
    #[must_use]
    pub fn new(write_half: OwnedWriteHalf) -> Self {
        Self { write_half }
    }

    /// Encode and write one envelope
    pub async fn write_frame(&mut self, message: &Message) -> Result<()> {
        let data = message.encode()?;
        self.write_half
            .write_all(&data)
            .await
            .map_err(|e| TransportError::write(format!("failed to write frame: {}", e)))?;
        Ok(())
    }

    /// Flush buffered bytes to the socket
    pub async fn flush(&mut self) -> Result<()> {
        self.write_half
            .flush()
            .await
            .map_err(|e| TransportError::write(format!("failed to flush: {}", e)))?;
        Ok(())
    }

    /// Flush and shut down the write direction (sends FIN to the peer)
    pub async fn shutdown(&mut self) -> Result<()> {
        self.write_half
            .shutdown()
            .await
            .map_err(|e| TransportError::write(format!("failed to shut down: {}", e)))?;
        Ok(())
    }
}

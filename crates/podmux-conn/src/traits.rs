use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// The receiving half of a message-framed connection.
///
/// Exactly one task may read from a source at a time; the multiplexer's
/// demultiplexing pump is the sole reader once a session owns the
/// connection.
#[async_trait]
pub trait MessageSource: Send {
    /// Receive the next complete message.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    /// Message boundaries are the transport's (e.g. one WebSocket binary
    /// message); this layer never splits or coalesces them.
    async fn recv(&mut self) -> Result<Option<Bytes>>;
}

/// The sending half of a message-framed connection.
#[async_trait]
pub trait MessageSink: Send {
    /// Send one complete message.
    ///
    /// Suspends until the transport accepts the message; backpressure from
    /// a slow peer keeps this pending.
    async fn send(&mut self, message: Bytes) -> Result<()>;

    /// Flush anything buffered and close the sending direction.
    ///
    /// Idempotent. After a close the peer's source observes end of stream.
    async fn close(&mut self) -> Result<()>;
}

/// An established, bidirectional, message-framed connection.
///
/// Implementations wrap an already-upgraded transport (a WebSocket after
/// the exec subprotocol handshake, an in-memory [`pair`](crate::pair::pair)
/// in tests). Splitting hands the two halves to independent tasks.
pub trait MessageConnection: Send {
    /// Split into independently owned receive and send halves.
    fn split(self) -> (Box<dyn MessageSource>, Box<dyn MessageSink>);
}

//! Per-channel stream handles.
//!
//! A [`ChannelStream`] is one logical byte stream carried over the shared
//! connection. The demultiplexer pump is the sole producer into its buffer
//! and the caller is the sole consumer, so the buffer itself needs no lock
//! beyond the queue. Writes never touch the connection directly; they
//! funnel through the session's serialized write path.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use podmux_frame::{ChannelDirection, ChannelSpec};

use crate::error::{Result, SessionError};
use crate::io::{ChannelReader, ChannelWriter};
use crate::lifecycle::SessionState;
use crate::resize::TerminalSize;
use crate::session::SharedConn;

/// One logical channel, presented as an independent stream.
///
/// Obtained from [`MuxSession::take_stream`](crate::session::MuxSession::take_stream).
/// Bytes read preserve the wire order of this channel's frames; no ordering
/// is defined relative to other channels.
pub struct ChannelStream {
    pub(crate) spec: ChannelSpec,
    pub(crate) rx: mpsc::Receiver<Bytes>,
    pub(crate) pending: Bytes,
    pub(crate) shared: Arc<SharedConn>,
}

impl ChannelStream {
    /// The channel's name in the session's channel set.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// The channel's wire index.
    pub fn index(&self) -> u8 {
        self.spec.index
    }

    /// Direction bytes flow on this channel.
    pub fn direction(&self) -> ChannelDirection {
        self.spec.direction
    }

    /// Whether [`write`](Self::write) is allowed on this channel.
    pub fn is_writable(&self) -> bool {
        self.spec.direction == ChannelDirection::Write
    }

    /// Read up to `max` bytes, FIFO in frame-arrival order.
    ///
    /// Suspends until at least one byte is buffered. Returns `Ok(None)`
    /// once the channel has closed and its buffer has drained; a faulted
    /// session surfaces the originating error instead. `cancel` aborts
    /// only this call, with no effect on other channels or the pump.
    pub async fn read(&mut self, max: usize, cancel: &CancellationToken) -> Result<Option<Bytes>> {
        if max == 0 {
            return Ok(Some(Bytes::new()));
        }
        if let SessionState::Faulted(reason) = self.shared.lifecycle.current() {
            return Err(reason.into());
        }
        if !self.pending.is_empty() {
            return Ok(Some(self.take_pending(max)));
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            chunk = self.rx.recv() => match chunk {
                Some(chunk) => {
                    self.pending = chunk;
                    Ok(Some(self.take_pending(max)))
                }
                // The pump dropped its sender: consult the terminal state.
                None => match self.shared.lifecycle.current() {
                    SessionState::Faulted(reason) => Err(reason.into()),
                    _ => Ok(None),
                },
            },
        }
    }

    /// Write `payload` as one frame on this channel.
    ///
    /// Suspends until the shared connection accepts the frame; backpressure
    /// from a slow peer propagates back here. Fails with
    /// [`SessionError::NotWritable`] on read-direction channels and
    /// [`SessionError::SessionClosed`] once shutdown has begun.
    pub async fn write(&self, payload: &[u8], cancel: &CancellationToken) -> Result<()> {
        if !self.is_writable() {
            return Err(SessionError::NotWritable(self.spec.name.clone()));
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            result = self.shared.send_frame(self.spec.index, payload) => result,
        }
    }

    /// Encode and write a terminal resize notification.
    ///
    /// Meaningful on the resize channel of a TTY session; the frame goes
    /// out on whatever channel this stream is bound to.
    pub async fn write_resize(&self, size: TerminalSize, cancel: &CancellationToken) -> Result<()> {
        let payload = serde_json::to_vec(&size)?;
        self.write(&payload, cancel).await
    }

    /// Stop accepting new bytes from the demultiplexer.
    ///
    /// Already-buffered bytes still drain through [`read`](Self::read);
    /// frames arriving afterwards are dropped. Idempotent. Other channels
    /// are unaffected.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Convert into a [`tokio::io::AsyncRead`] adapter.
    pub fn into_reader(self) -> ChannelReader {
        ChannelReader::new(self)
    }

    /// Convert into a [`tokio::io::AsyncWrite`] adapter.
    ///
    /// Fails with [`SessionError::NotWritable`] on read-direction channels.
    pub fn into_writer(self) -> Result<ChannelWriter> {
        if !self.is_writable() {
            return Err(SessionError::NotWritable(self.spec.name.clone()));
        }
        Ok(ChannelWriter::new(self.spec, self.shared))
    }

    fn take_pending(&mut self, max: usize) -> Bytes {
        let n = self.pending.len().min(max);
        self.pending.split_to(n)
    }
}

impl std::fmt::Debug for ChannelStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStream")
            .field("name", &self.spec.name)
            .field("index", &self.spec.index)
            .field("direction", &self.spec.direction)
            .field("pending", &self.pending.len())
            .finish()
    }
}

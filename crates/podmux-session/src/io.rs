//! `tokio::io` adapters for channel streams.
//!
//! [`ChannelReader`] and [`ChannelWriter`] let a channel plug into
//! `tokio::io::copy`, `AsyncReadExt`/`AsyncWriteExt`, and anything else
//! speaking the standard traits. End-of-stream maps to a zero-byte read;
//! a session fault maps to `io::Error`.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use podmux_frame::ChannelSpec;

use crate::error::SessionError;
use crate::lifecycle::SessionState;
use crate::session::SharedConn;
use crate::stream::ChannelStream;

/// `AsyncRead` over one channel's byte stream.
pub struct ChannelReader {
    inner: ChannelStream,
}

impl ChannelReader {
    pub(crate) fn new(inner: ChannelStream) -> Self {
        Self { inner }
    }

    /// The channel's name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }
}

impl AsyncRead for ChannelReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let SessionState::Faulted(reason) = this.inner.shared.lifecycle.current() {
            return Poll::Ready(Err(io::Error::other(SessionError::from(reason))));
        }
        loop {
            if !this.inner.pending.is_empty() {
                let n = this.inner.pending.len().min(buf.remaining());
                let chunk = this.inner.pending.split_to(n);
                buf.put_slice(&chunk);
                return Poll::Ready(Ok(()));
            }
            match this.inner.rx.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => this.inner.pending = chunk,
                Poll::Ready(None) => {
                    return Poll::Ready(match this.inner.shared.lifecycle.current() {
                        SessionState::Faulted(reason) => {
                            Err(io::Error::other(SessionError::from(reason)))
                        }
                        _ => Ok(()), // zero bytes appended: end of stream
                    });
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

type SendFuture = Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send>>;

/// `AsyncWrite` over one writable channel.
///
/// Each `poll_write` call sends one frame through the session's serialized
/// write path. A frame left in flight by a `Pending` poll is finished
/// before new bytes are accepted.
pub struct ChannelWriter {
    spec: ChannelSpec,
    shared: Arc<SharedConn>,
    in_flight: Option<(usize, SendFuture)>,
    /// Length of a frame completed by `poll_flush`, still owed to the next
    /// `poll_write` call.
    flushed: Option<usize>,
}

impl ChannelWriter {
    pub(crate) fn new(spec: ChannelSpec, shared: Arc<SharedConn>) -> Self {
        Self {
            spec,
            shared,
            in_flight: None,
            flushed: None,
        }
    }

    /// The channel's name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    fn poll_in_flight(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<usize>> {
        match self.in_flight.as_mut() {
            None => Poll::Ready(Ok(0)),
            Some((len, fut)) => {
                let len = *len;
                match fut.as_mut().poll(cx) {
                    Poll::Ready(Ok(())) => {
                        self.in_flight = None;
                        Poll::Ready(Ok(len))
                    }
                    Poll::Ready(Err(err)) => {
                        self.in_flight = None;
                        Poll::Ready(Err(io::Error::other(err)))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }
}

impl AsyncWrite for ChannelWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Some(n) = this.flushed.take() {
            return Poll::Ready(Ok(n));
        }
        if this.in_flight.is_none() {
            let shared = Arc::clone(&this.shared);
            let channel = this.spec.index;
            let payload = Bytes::copy_from_slice(buf);
            let len = payload.len();
            this.in_flight = Some((
                len,
                Box::pin(async move { shared.send_frame(channel, &payload).await }),
            ));
        }
        this.poll_in_flight(cx)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.in_flight.is_none() {
            return Poll::Ready(Ok(()));
        }
        match this.poll_in_flight(cx) {
            Poll::Ready(Ok(n)) => {
                // The frame was accepted while flushing; the length is
                // reported by the next poll_write.
                this.flushed = Some(n);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // Closing one channel never closes the shared connection; the
        // session owns that decision.
        self.poll_flush(cx)
    }
}

#[cfg(test)]
mod tests {
    use podmux_conn::{pair, MessageConnection, MessageSink, MessageSource};
    use podmux_frame::{decode_frame, encode_frame, ChannelSet, STDOUT};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::session::MuxSession;

    #[tokio::test]
    async fn reader_supports_read_to_end() {
        let set = ChannelSet::standard();
        let (local, remote) = pair(8);
        let session = MuxSession::new(local, set.clone());
        let stdout = session.take_stream("stdout").unwrap();
        let (_remote_rx, mut remote_tx) = remote.split();

        for payload in [&b"Hello"[..], &b", "[..], &b"world"[..]] {
            let wire = encode_frame(&set, STDOUT, payload).unwrap();
            remote_tx.send(wire).await.unwrap();
        }
        remote_tx.close().await.unwrap();

        let mut reader = stdout.into_reader();
        let mut collected = Vec::new();
        reader.read_to_end(&mut collected).await.unwrap();
        assert_eq!(collected, b"Hello, world");
    }

    #[tokio::test]
    async fn writer_sends_one_frame_per_write() {
        let (local, remote) = pair(8);
        let session = MuxSession::new(local, ChannelSet::standard());
        let stdin = session.take_stream("stdin").unwrap();
        let (mut remote_rx, _remote_tx) = remote.split();

        let mut writer = stdin.into_writer().unwrap();
        writer.write_all(b"line one").await.unwrap();
        writer.write_all(b"line two").await.unwrap();
        writer.flush().await.unwrap();

        let first = decode_frame(remote_rx.recv().await.unwrap().unwrap()).unwrap();
        assert_eq!(first.channel, podmux_frame::STDIN);
        assert_eq!(first.payload.as_ref(), b"line one");

        let second = decode_frame(remote_rx.recv().await.unwrap().unwrap()).unwrap();
        assert_eq!(second.payload.as_ref(), b"line two");
    }

    #[tokio::test]
    async fn read_only_channel_refuses_writer() {
        let (local, _remote) = pair(8);
        let session = MuxSession::new(local, ChannelSet::standard());
        let stdout = session.take_stream("stdout").unwrap();

        assert!(stdout.into_writer().is_err());
    }

    #[tokio::test]
    async fn copy_bridges_channels() {
        let set = ChannelSet::standard();
        let (local, remote) = pair(32);
        let session = MuxSession::new(local, set.clone());
        let stdout = session.take_stream("stdout").unwrap();
        let stdin = session.take_stream("stdin").unwrap();
        let (mut remote_rx, mut remote_tx) = remote.split();

        let body = b"looped back through the session".to_vec();
        for chunk in body.chunks(7) {
            let wire = encode_frame(&set, STDOUT, chunk).unwrap();
            remote_tx.send(wire).await.unwrap();
        }

        let mut reader = stdout.into_reader().take(body.len() as u64);
        let mut writer = stdin.into_writer().unwrap();
        tokio::io::copy(&mut reader, &mut writer).await.unwrap();

        let mut echoed = Vec::new();
        while let Some(message) = remote_rx.recv().await.unwrap() {
            let frame = decode_frame(message).unwrap();
            assert_eq!(frame.channel, podmux_frame::STDIN);
            echoed.extend_from_slice(&frame.payload);
            if echoed.len() >= body.len() {
                break;
            }
        }
        assert_eq!(echoed, body);
    }

    #[tokio::test]
    async fn writer_fails_after_session_shutdown() {
        let (local, _remote) = pair(8);
        let session = MuxSession::new(local, ChannelSet::standard());
        let stdin = session.take_stream("stdin").unwrap();

        let cancel = tokio_util::sync::CancellationToken::new();
        session
            .shutdown(crate::session::ShutdownMode::Immediate, &cancel)
            .await
            .unwrap();

        let mut writer = stdin.into_writer().unwrap();
        let err = writer.write_all(b"too late").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
    }
}

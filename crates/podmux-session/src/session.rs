//! The multiplex session: lifecycle and coordination root.
//!
//! A [`MuxSession`] takes exclusive ownership of an established
//! message-framed connection, allocates one [`ChannelStream`] per channel
//! in the negotiated set, and runs the demultiplexer pump in the
//! background. All writes from all channels funnel through one serialized
//! send path so frames never interleave mid-frame on the wire.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use podmux_conn::{MessageConnection, MessageSink};
use podmux_frame::{encode_frame, ChannelSet};

use crate::config::SessionConfig;
use crate::demux::Demultiplexer;
use crate::error::{Result, SessionError};
use crate::lifecycle::{FaultReason, Lifecycle, SessionState};
use crate::stream::ChannelStream;

/// How [`MuxSession::shutdown`] tears the session down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Wait for the in-flight write to flush, then close the connection.
    Graceful,
    /// Close at once; pending reads settle to end-of-stream and pending
    /// writes fail with [`SessionError::SessionClosed`].
    Immediate,
}

/// State shared between the session handle, its channel streams, and the
/// demultiplexer pump.
pub(crate) struct SharedConn {
    sink: tokio::sync::Mutex<Box<dyn podmux_conn::MessageSink>>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) shutdown: CancellationToken,
    pub(crate) channels: ChannelSet,
}

impl SharedConn {
    /// Encode and transmit one frame, serialized against every other
    /// writer. At most one frame is in flight at a time; the lock is the
    /// write-side backpressure point.
    pub(crate) async fn send_frame(&self, channel: u8, payload: &[u8]) -> Result<()> {
        if !matches!(self.lifecycle.current(), SessionState::Open) {
            return Err(self.lifecycle.terminal_error());
        }
        let message = encode_frame(&self.channels, channel, payload)?;

        let mut sink = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(self.lifecycle.terminal_error()),
            sink = self.sink.lock() => sink,
        };
        // Shutdown may have begun while this writer waited for the lock.
        if !matches!(self.lifecycle.current(), SessionState::Open) {
            return Err(self.lifecycle.terminal_error());
        }

        let sent = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(self.lifecycle.terminal_error()),
            sent = sink.send(message) => sent,
        };
        match sent {
            Ok(()) => Ok(()),
            Err(err) => {
                let reason = FaultReason::Connection(err.to_string());
                self.lifecycle.fault(reason.clone());
                self.shutdown.cancel();
                Err(reason.into())
            }
        }
    }

    async fn close_sink(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(err) = sink.close().await {
            debug!(%err, "connection close reported an error");
        }
    }
}

/// A multiplexed session over one shared connection.
///
/// Construction spawns the demultiplexer task, so it must happen inside a
/// tokio runtime. The connection is owned exclusively from construction
/// until shutdown; nothing else may read or write it.
pub struct MuxSession {
    shared: Arc<SharedConn>,
    streams: Mutex<HashMap<String, ChannelStream>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    config: SessionConfig,
}

impl MuxSession {
    /// Wrap an established connection with the default configuration.
    pub fn new(conn: impl MessageConnection, channels: ChannelSet) -> Self {
        Self::with_config(conn, channels, SessionConfig::default())
    }

    /// Wrap an established connection with explicit configuration.
    ///
    /// One stream is allocated per channel in `channels` (the set is fixed
    /// for the session's lifetime) and the demultiplexer pump starts
    /// immediately.
    pub fn with_config(
        conn: impl MessageConnection,
        channels: ChannelSet,
        config: SessionConfig,
    ) -> Self {
        let (source, sink) = conn.split();
        let shared = Arc::new(SharedConn {
            sink: tokio::sync::Mutex::new(sink),
            lifecycle: Lifecycle::new(),
            shutdown: CancellationToken::new(),
            channels: channels.clone(),
        });

        let mut routes = Vec::with_capacity(channels.len());
        let mut streams = HashMap::with_capacity(channels.len());
        for spec in channels.iter() {
            let (tx, rx) = mpsc::channel(config.channel_buffer.get());
            routes.push(tx);
            streams.insert(
                spec.name.clone(),
                ChannelStream {
                    spec: spec.clone(),
                    rx,
                    pending: Bytes::new(),
                    shared: Arc::clone(&shared),
                },
            );
        }

        let pump = tokio::spawn(Demultiplexer::new(source, routes, Arc::clone(&shared)).run());

        Self {
            shared,
            streams: Mutex::new(streams),
            pump: Mutex::new(Some(pump)),
            config,
        }
    }

    /// The session's negotiated channel set.
    pub fn channels(&self) -> &ChannelSet {
        &self.shared.channels
    }

    /// Current lifecycle state. `Closed` means shutdown was requested (or
    /// the peer closed cleanly); `Faulted` means the connection or
    /// protocol failed.
    pub fn state(&self) -> SessionState {
        self.shared.lifecycle.current()
    }

    /// Take ownership of the named channel's stream.
    ///
    /// Each channel's stream can be taken exactly once: its buffer has a
    /// single consumer. Fails with [`SessionError::UnknownChannelName`]
    /// when the name is not in the negotiated set (e.g. requesting
    /// `stderr` on a connection set up with stderr folded into stdout).
    pub fn take_stream(&self, name: &str) -> Result<ChannelStream> {
        if self.shared.channels.by_name(name).is_none() {
            return Err(SessionError::UnknownChannelName(name.to_string()));
        }
        lock_unpoisoned(&self.streams)
            .remove(name)
            .ok_or_else(|| SessionError::ChannelTaken(name.to_string()))
    }

    /// Shut the session down.
    ///
    /// Idempotent; concurrent callers converge on the same terminal state.
    /// Cancelling a graceful shutdown mid-flush escalates to an immediate
    /// close and returns [`SessionError::Cancelled`].
    pub async fn shutdown(&self, mode: ShutdownMode, cancel: &CancellationToken) -> Result<()> {
        match mode {
            ShutdownMode::Immediate => {
                self.close_now().await;
                Ok(())
            }
            ShutdownMode::Graceful => {
                if !self.shared.lifecycle.begin_drain() {
                    // Another caller is driving shutdown, or the session is
                    // already terminal; observe the same completion.
                    return self.wait_settled(cancel).await;
                }
                self.drain_and_close(cancel).await
            }
        }
    }

    /// Graceful path after winning the Open -> Draining transition.
    async fn drain_and_close(&self, cancel: &CancellationToken) -> Result<()> {
        let flush = self.shared.close_sink();
        let outcome = match self.config.shutdown_timeout {
            Some(limit) => tokio::select! {
                _ = cancel.cancelled() => Err(SessionError::Cancelled),
                flushed = tokio::time::timeout(limit, flush) => Ok(flushed.is_ok()),
            },
            None => tokio::select! {
                _ = cancel.cancelled() => Err(SessionError::Cancelled),
                _ = flush => Ok(true),
            },
        };

        match outcome {
            Ok(true) => {
                self.shared.lifecycle.close();
                self.shared.shutdown.cancel();
                self.join_pump().await;
                Ok(())
            }
            Ok(false) => {
                debug!("graceful flush timed out; closing immediately");
                self.close_now().await;
                Ok(())
            }
            Err(cancelled) => {
                self.close_now().await;
                Err(cancelled)
            }
        }
    }

    async fn close_now(&self) {
        self.shared.lifecycle.close();
        // Cancelling first unblocks any writer holding or awaiting the
        // sink lock, so the close below cannot deadlock behind a stalled
        // peer.
        self.shared.shutdown.cancel();
        self.shared.close_sink().await;
        self.join_pump().await;
    }

    async fn wait_settled(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            _ = self.shared.lifecycle.wait_terminal() => {
                self.join_pump().await;
                Ok(())
            }
        }
    }

    async fn join_pump(&self) {
        let handle = lock_unpoisoned(&self.pump).take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                debug!(%err, "demultiplexer task ended abnormally");
            }
        }
    }
}

impl Drop for MuxSession {
    fn drop(&mut self) {
        // Disposal without an explicit shutdown still tears the session
        // down: the pump stops and outstanding operations settle.
        self.shared.lifecycle.close();
        self.shared.shutdown.cancel();
    }
}

impl std::fmt::Debug for MuxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuxSession")
            .field("channels", &self.shared.channels.len())
            .field("state", &self.shared.lifecycle.current())
            .finish()
    }
}

/// Mutex poisoning only happens if a holder panicked; the guarded maps
/// stay structurally valid, so recover the guard instead of propagating.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

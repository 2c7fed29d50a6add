//! The demultiplexing read pump.
//!
//! One background task per session; the sole reader of the shared
//! connection. Frames are decoded and their payloads routed into the
//! owning channel's queue. Protocol violations (zero-length message,
//! channel outside the negotiated set) fault the whole session — partial
//! recovery could desynchronize channel framing.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use podmux_conn::MessageSource;
use podmux_frame::decode_frame;

use crate::lifecycle::FaultReason;
use crate::session::SharedConn;

pub(crate) struct Demultiplexer {
    source: Box<dyn MessageSource>,
    /// Queue senders indexed by wire channel.
    routes: Vec<mpsc::Sender<Bytes>>,
    shared: Arc<SharedConn>,
}

impl Demultiplexer {
    pub(crate) fn new(
        source: Box<dyn MessageSource>,
        routes: Vec<mpsc::Sender<Bytes>>,
        shared: Arc<SharedConn>,
    ) -> Self {
        Self {
            source,
            routes,
            shared,
        }
    }

    pub(crate) async fn run(mut self) {
        let shutdown = self.shared.shutdown.clone();
        debug!(channels = self.routes.len(), "demultiplexer started");

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.source.recv() => received,
            };

            match received {
                Ok(Some(message)) => {
                    let frame = match decode_frame(message) {
                        Ok(frame) => frame,
                        Err(_) => {
                            self.fail(FaultReason::MalformedFrame);
                            break;
                        }
                    };

                    let Some(route) = self.routes.get(frame.channel as usize) else {
                        self.fail(FaultReason::UnknownChannel(frame.channel));
                        break;
                    };

                    if frame.payload.is_empty() {
                        // Keep-alive; carries no bytes and never ends the stream.
                        trace!(channel = frame.channel, "empty frame");
                        continue;
                    }

                    // A full queue suspends the pump (and with it the whole
                    // connection) until the reader catches up; frames are
                    // never dropped for an open channel.
                    let delivered = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        delivered = route.send(frame.payload) => delivered,
                    };
                    if delivered.is_err() {
                        trace!(channel = frame.channel, "channel closed by reader; payload dropped");
                    }
                }
                Ok(None) => {
                    debug!("peer closed the connection");
                    self.shared.lifecycle.close();
                    self.shared.shutdown.cancel();
                    break;
                }
                Err(err) => {
                    self.fail(FaultReason::Connection(err.to_string()));
                    break;
                }
            }
        }

        debug!("demultiplexer stopped");
        // Dropping `routes` here wakes every pending reader into its
        // end-of-stream or fault result.
    }

    fn fail(&self, reason: FaultReason) {
        self.shared.lifecycle.fault(reason);
        self.shared.shutdown.cancel();
    }
}

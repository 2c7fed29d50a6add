//! In-memory connected pair.
//!
//! The message-oriented analog of a socketpair: two [`PairConn`] ends wired
//! together over bounded queues. Messages sent on one end arrive, whole and
//! in order, on the other. Used by tests and examples; also handy as a
//! loopback transport when both sides of a session live in one process.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ConnError, Result};
use crate::traits::{MessageConnection, MessageSink, MessageSource};

/// Create a connected pair of in-memory message connections.
///
/// `capacity` bounds each direction's queue, in messages. A sender whose
/// direction is full suspends until the other end receives — the same
/// backpressure shape a real transport exhibits against a slow peer.
pub fn pair(capacity: usize) -> (PairConn, PairConn) {
    let (left_tx, right_rx) = mpsc::channel(capacity.max(1));
    let (right_tx, left_rx) = mpsc::channel(capacity.max(1));

    (
        PairConn {
            tx: left_tx,
            rx: left_rx,
        },
        PairConn {
            tx: right_tx,
            rx: right_rx,
        },
    )
}

/// One end of an in-memory connected pair.
pub struct PairConn {
    tx: mpsc::Sender<Bytes>,
    rx: mpsc::Receiver<Bytes>,
}

impl MessageConnection for PairConn {
    fn split(self) -> (Box<dyn MessageSource>, Box<dyn MessageSink>) {
        (
            Box::new(PairSource { rx: self.rx }),
            Box::new(PairSink { tx: Some(self.tx) }),
        )
    }
}

impl std::fmt::Debug for PairConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairConn")
            .field("capacity", &self.tx.max_capacity())
            .finish()
    }
}

struct PairSource {
    rx: mpsc::Receiver<Bytes>,
}

#[async_trait]
impl MessageSource for PairSource {
    async fn recv(&mut self) -> Result<Option<Bytes>> {
        Ok(self.rx.recv().await)
    }
}

struct PairSink {
    tx: Option<mpsc::Sender<Bytes>>,
}

#[async_trait]
impl MessageSink for PairSink {
    async fn send(&mut self, message: Bytes) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(ConnError::Closed)?;
        tx.send(message).await.map_err(|_| ConnError::Closed)
    }

    async fn close(&mut self) -> Result<()> {
        if self.tx.take().is_some() {
            debug!("pair sink closed");
        }
        Ok(())
    }
}

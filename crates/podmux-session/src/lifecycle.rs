//! Session lifecycle state machine.
//!
//! `Open -> Draining -> Closed`, with `Faulted` reachable from Open and
//! Draining. Closed and Faulted are terminal; no transition leaves them.
//! Closed means "we asked for this" (local shutdown or a clean remote
//! close); Faulted means the connection or protocol failed underneath us.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::SessionError;

/// Why a session faulted. Cloneable so every stream can surface the same
/// originating error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultReason {
    /// A zero-length message arrived: protocol violation.
    MalformedFrame,
    /// A frame referenced a channel outside the negotiated set.
    UnknownChannel(u8),
    /// The underlying transport failed.
    Connection(String),
}

impl From<FaultReason> for SessionError {
    fn from(reason: FaultReason) -> Self {
        match reason {
            FaultReason::MalformedFrame => {
                SessionError::Frame(podmux_frame::FrameError::MalformedFrame)
            }
            FaultReason::UnknownChannel(channel) => SessionError::UnknownChannel(channel),
            FaultReason::Connection(message) => SessionError::Connection(message),
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Frames flow in both directions.
    Open,
    /// Graceful shutdown requested; writes rejected, reads still drain.
    Draining,
    /// Terminal: shut down on request, or the peer closed cleanly.
    Closed,
    /// Terminal: the connection or protocol failed.
    Faulted(FaultReason),
}

impl SessionState {
    /// Whether the state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Faulted(_))
    }
}

/// Shared lifecycle cell; transitions are serialized by the watch sender.
pub(crate) struct Lifecycle {
    tx: watch::Sender<SessionState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            tx: watch::channel(SessionState::Open).0,
        }
    }

    pub(crate) fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Open -> Draining. Returns whether this call made the transition.
    pub(crate) fn begin_drain(&self) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if matches!(state, SessionState::Open) {
                *state = SessionState::Draining;
                applied = true;
            }
            applied
        });
        if applied {
            debug!("session draining");
        }
        applied
    }

    /// Open|Draining -> Closed. Returns whether this call made the
    /// transition.
    pub(crate) fn close(&self) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if !state.is_terminal() {
                *state = SessionState::Closed;
                applied = true;
            }
            applied
        });
        if applied {
            debug!("session closed");
        }
        applied
    }

    /// Open|Draining -> Faulted. Returns whether this call made the
    /// transition; a session that is already terminal keeps its state.
    pub(crate) fn fault(&self, reason: FaultReason) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if !state.is_terminal() {
                warn!(?reason, "session faulted");
                *state = SessionState::Faulted(reason.clone());
                applied = true;
            }
            applied
        });
        applied
    }

    /// Suspend until the session reaches Closed or Faulted.
    pub(crate) async fn wait_terminal(&self) -> SessionState {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so wait_for cannot error.
        let result = rx.wait_for(SessionState::is_terminal).await;
        match result {
            Ok(state) => (*state).clone(),
            Err(_) => self.current(),
        }
    }

    /// The error a pending operation should surface once the session is no
    /// longer Open.
    pub(crate) fn terminal_error(&self) -> SessionError {
        match self.current() {
            SessionState::Faulted(reason) => reason.into(),
            _ => SessionError::SessionClosed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_then_close() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.current(), SessionState::Open);

        assert!(lifecycle.begin_drain());
        assert_eq!(lifecycle.current(), SessionState::Draining);

        assert!(lifecycle.close());
        assert_eq!(lifecycle.current(), SessionState::Closed);
    }

    #[test]
    fn drain_only_from_open() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_drain());
        assert!(!lifecycle.begin_drain());

        assert!(lifecycle.close());
        assert!(!lifecycle.begin_drain());
    }

    #[test]
    fn terminal_states_are_sticky() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.fault(FaultReason::MalformedFrame));

        assert!(!lifecycle.close());
        assert!(!lifecycle.fault(FaultReason::UnknownChannel(9)));
        assert_eq!(
            lifecycle.current(),
            SessionState::Faulted(FaultReason::MalformedFrame)
        );
    }

    #[test]
    fn close_does_not_overwrite_fault() {
        let lifecycle = Lifecycle::new();
        lifecycle.fault(FaultReason::Connection("reset".into()));
        assert!(!lifecycle.close());
        assert!(matches!(
            lifecycle.current(),
            SessionState::Faulted(FaultReason::Connection(_))
        ));
    }

    #[test]
    fn terminal_error_reflects_state() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_drain();
        assert!(matches!(
            lifecycle.terminal_error(),
            SessionError::SessionClosed
        ));

        let faulted = Lifecycle::new();
        faulted.fault(FaultReason::UnknownChannel(7));
        assert!(matches!(
            faulted.terminal_error(),
            SessionError::UnknownChannel(7)
        ));
    }

    #[tokio::test]
    async fn wait_terminal_wakes_on_close() {
        let lifecycle = std::sync::Arc::new(Lifecycle::new());
        let waiter = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.wait_terminal().await })
        };

        tokio::task::yield_now().await;
        lifecycle.close();

        assert_eq!(waiter.await.unwrap(), SessionState::Closed);
    }

    #[tokio::test]
    async fn wait_terminal_returns_immediately_when_already_terminal() {
        let lifecycle = Lifecycle::new();
        lifecycle.fault(FaultReason::MalformedFrame);
        assert_eq!(
            lifecycle.wait_terminal().await,
            SessionState::Faulted(FaultReason::MalformedFrame)
        );
    }

    #[test]
    fn fault_reason_converts_to_session_error() {
        let err: SessionError = FaultReason::MalformedFrame.into();
        assert!(matches!(
            err,
            SessionError::Frame(podmux_frame::FrameError::MalformedFrame)
        ));

        let err: SessionError = FaultReason::Connection("broken pipe".into()).into();
        assert!(matches!(err, SessionError::Connection(m) if m == "broken pipe"));
    }
}

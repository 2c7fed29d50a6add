/// Errors that can occur in multiplex session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Frame-level error (malformed frame, invalid channel index).
    #[error("frame error: {0}")]
    Frame(#[from] podmux_frame::FrameError),

    /// A received frame referenced a channel index outside the negotiated
    /// set. Fatal to the session: silently dropping the payload would
    /// desynchronize ordered delivery.
    #[error("unknown channel index {0} on the wire")]
    UnknownChannel(u8),

    /// The channel only carries bytes from the remote peer.
    #[error("channel '{0}' is not writable")]
    NotWritable(String),

    /// The requested name is not part of this session's channel set.
    #[error("unknown channel name '{0}'")]
    UnknownChannelName(String),

    /// The channel's stream handle was already taken by an earlier call.
    #[error("channel '{0}' stream already taken")]
    ChannelTaken(String),

    /// The session was shut down before or during the operation.
    #[error("session closed")]
    SessionClosed,

    /// The underlying connection failed. Terminal; this layer never
    /// reconnects.
    #[error("connection error: {0}")]
    Connection(String),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// A typed control payload failed to encode or decode.
    #[error("control payload error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

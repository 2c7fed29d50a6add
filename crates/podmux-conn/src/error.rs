/// Errors that can occur on a message-framed connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    /// The connection was closed before the operation could complete.
    #[error("connection closed")]
    Closed,

    /// An I/O error occurred on the underlying transport.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport reported a protocol-level failure.
    #[error("transport protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, ConnError>;

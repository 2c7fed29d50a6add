//! Channel-multiplexed exec streams over one shared connection.
//!
//! podmux presents the logical streams of an exec/attach-style connection
//! (stdin, stdout, stderr, error, resize) as independent byte streams
//! over one message-framed transport, with a one-byte channel prefix per
//! frame.
//!
//! The transport itself — typically a WebSocket produced by an API
//! server's upgrade handshake — is established elsewhere and handed in as
//! a [`conn::MessageConnection`].
//!
//! # Crate Structure
//!
//! - [`conn`] — Message-framed connection abstraction and in-memory pair
//! - [`frame`] — Channel registry and channel-prefix frame codec
//! - [`session`] — The multiplex session, channel streams, and lifecycle
//!
//! # Example
//!
//! ```no_run
//! use podmux::frame::ChannelSet;
//! use podmux::session::{MuxSession, ShutdownMode};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(conn: impl podmux::conn::MessageConnection) -> podmux::session::Result<()> {
//! let session = MuxSession::new(conn, ChannelSet::standard());
//! let mut stdout = session.take_stream("stdout")?;
//!
//! let cancel = CancellationToken::new();
//! while let Some(chunk) = stdout.read(4096, &cancel).await? {
//!     print!("{}", String::from_utf8_lossy(&chunk));
//! }
//! session.shutdown(ShutdownMode::Graceful, &cancel).await?;
//! # Ok(())
//! # }
//! ```

/// Re-export connection types.
pub mod conn {
    pub use podmux_conn::*;
}

/// Re-export frame types.
pub mod frame {
    pub use podmux_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use podmux_session::*;
}

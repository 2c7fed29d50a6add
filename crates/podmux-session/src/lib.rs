//! Multiplex session: per-channel streams over one shared connection.
//!
//! This is the core value-add layer of podmux. A [`MuxSession`] wraps an
//! established message-framed connection and presents each negotiated
//! channel (stdin, stdout, stderr, error, resize) as an independent
//! [`ChannelStream`]:
//!
//! - a single background demultiplexer task routes incoming frames into
//!   bounded per-channel buffers;
//! - writes from any number of tasks funnel through one serialized send
//!   path, so frames never interleave on the wire;
//! - shutdown and faults propagate to every channel, and every blocking
//!   operation accepts a cancellation token.

pub mod config;
mod demux;
pub mod error;
pub mod io;
pub mod lifecycle;
pub mod resize;
pub mod session;
pub mod status;
pub mod stream;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use io::{ChannelReader, ChannelWriter};
pub use lifecycle::{FaultReason, SessionState};
pub use resize::TerminalSize;
pub use session::{MuxSession, ShutdownMode};
pub use status::{CommandStatus, StatusCause, StatusDetails};
pub use stream::ChannelStream;

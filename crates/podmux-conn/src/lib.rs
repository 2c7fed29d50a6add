//! Message-framed connection abstraction.
//!
//! Provides a unified interface over bidirectional, message-oriented
//! transports: one transport message in equals one multiplexer frame out.
//! The WebSocket upgrade (or whichever handshake produced the connection)
//! happens elsewhere; this crate only defines the contract the multiplexer
//! consumes, plus an in-memory [`pair`] implementation for tests and
//! examples.
//!
//! This is the lowest layer of podmux. Everything else builds on top of
//! the [`MessageConnection`] trait defined here.

pub mod error;
pub mod pair;
pub mod traits;

pub use error::{ConnError, Result};
pub use pair::{pair, PairConn};
pub use traits::{MessageConnection, MessageSink, MessageSource};

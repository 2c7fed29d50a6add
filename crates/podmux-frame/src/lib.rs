//! Channel-prefix framing for multiplexed exec streams.
//!
//! This is the wire vocabulary of podmux. Every transport message is one
//! frame:
//! - A 1-byte channel index (0-based, assigned in the order channels were
//!   requested at connection setup)
//! - The raw payload, with no length prefix (message framing belongs to
//!   the transport)
//!
//! The [`ChannelSet`] fixes the index/name/direction table for a session.

pub mod channel;
pub mod codec;
pub mod error;

pub use channel::{
    channel_name, ChannelDirection, ChannelSet, ChannelSetBuilder, ChannelSpec, ERROR, MAX_CHANNEL,
    RESIZE, STDERR, STDIN, STDOUT,
};
pub use codec::{decode_frame, encode_frame, Frame, PREFIX_SIZE};
pub use error::{FrameError, Result};

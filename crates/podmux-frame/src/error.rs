/// Errors that can occur during frame encoding/decoding and channel-set
/// construction.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A zero-length message carries no channel byte.
    #[error("malformed frame: zero-length message")]
    MalformedFrame,

    /// The channel index is outside the negotiated set.
    #[error("invalid channel {channel} (max {max})")]
    InvalidChannel { channel: u8, max: u8 },

    /// A channel set must contain at least one channel.
    #[error("channel set is empty")]
    EmptyChannelSet,

    /// Channel names within one set must be unique.
    #[error("duplicate channel name '{0}'")]
    DuplicateChannel(String),

    /// The one-byte prefix bounds how many channels a set may hold.
    #[error("too many channels ({count}, max {max})")]
    TooManyChannels { count: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;

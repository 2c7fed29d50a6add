use std::num::NonZeroUsize;
use std::time::Duration;

/// Configuration for a multiplex session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Per-channel receive buffer, in payload chunks.
    ///
    /// When a channel's buffer is full the demultiplexer suspends, which
    /// stalls delivery on every channel and ultimately backpressures the
    /// shared connection. Frames are never dropped.
    pub channel_buffer: NonZeroUsize,

    /// How long a graceful shutdown waits for the in-flight write to flush
    /// before escalating to an immediate close. `None` waits indefinitely.
    pub shutdown_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel_buffer: NonZeroUsize::new(64).expect("64 is non-zero"),
            shutdown_timeout: Some(Duration::from_secs(5)),
        }
    }
}

//! Channel registry.
//!
//! A session's channel set is fixed at connection setup: indices are
//! assigned 0-based in the order the channels were requested, and the
//! mapping is never renegotiated mid-session. The well-known layout used
//! by exec/attach connections is stdin(0), stdout(1), stderr(2), error(3),
//! with resize(4) added for TTY sessions.

use crate::error::{FrameError, Result};

/// Standard input, written by the caller.
pub const STDIN: u8 = 0;

/// Standard output, read by the caller.
pub const STDOUT: u8 = 1;

/// Standard error, read by the caller.
pub const STDERR: u8 = 2;

/// Error/status channel, read by the caller.
pub const ERROR: u8 = 3;

/// Terminal resize channel, written by the caller (TTY sessions only).
pub const RESIZE: u8 = 4;

/// Highest representable channel index; one byte on the wire.
pub const MAX_CHANNEL: u8 = u8::MAX;

/// Returns a human-readable name for a standard channel index.
pub fn channel_name(index: u8) -> &'static str {
    match index {
        STDIN => "stdin",
        STDOUT => "stdout",
        STDERR => "stderr",
        ERROR => "error",
        RESIZE => "resize",
        _ => "custom",
    }
}

/// Data direction of a channel, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDirection {
    /// Bytes flow from the remote peer to the caller (stdout, stderr, error).
    Read,
    /// Bytes flow from the caller to the remote peer (stdin, resize).
    Write,
}

/// One channel's entry in the session's channel table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Wire index; the first byte of every frame on this channel.
    pub index: u8,
    /// Name callers use to obtain the channel's stream.
    pub name: String,
    /// Direction bytes flow on this channel.
    pub direction: ChannelDirection,
}

/// The fixed set of channels negotiated for one session.
///
/// Indices are contiguous from zero in request order, matching the wire
/// contract of the connection-setup collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSet {
    specs: Vec<ChannelSpec>,
}

impl ChannelSet {
    /// The standard exec/attach channel set: stdin, stdout, stderr, error.
    pub fn standard() -> Self {
        Self::builder()
            .write("stdin")
            .read("stdout")
            .read("stderr")
            .read("error")
            .build()
            .expect("standard channel set is valid")
    }

    /// The standard set plus the terminal resize channel for TTY sessions.
    pub fn tty() -> Self {
        Self::builder()
            .write("stdin")
            .read("stdout")
            .read("stderr")
            .read("error")
            .write("resize")
            .build()
            .expect("tty channel set is valid")
    }

    /// Start building a custom channel set.
    pub fn builder() -> ChannelSetBuilder {
        ChannelSetBuilder { specs: Vec::new() }
    }

    /// Look up a channel by wire index.
    pub fn get(&self, index: u8) -> Option<&ChannelSpec> {
        self.specs.get(index as usize)
    }

    /// Look up a channel by name.
    pub fn by_name(&self, name: &str) -> Option<&ChannelSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// Whether the wire index belongs to this set.
    pub fn contains(&self, index: u8) -> bool {
        (index as usize) < self.specs.len()
    }

    /// Number of channels in the set.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// A channel set is never empty; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Highest valid wire index in this set.
    pub fn max_index(&self) -> u8 {
        (self.specs.len() - 1) as u8
    }

    /// Iterate the channel table in index order.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelSpec> {
        self.specs.iter()
    }
}

/// Builder assigning wire indices in call order.
#[derive(Debug)]
pub struct ChannelSetBuilder {
    specs: Vec<ChannelSpec>,
}

impl ChannelSetBuilder {
    /// Append a channel the caller reads from.
    pub fn read(self, name: impl Into<String>) -> Self {
        self.push(name.into(), ChannelDirection::Read)
    }

    /// Append a channel the caller writes to.
    pub fn write(self, name: impl Into<String>) -> Self {
        self.push(name.into(), ChannelDirection::Write)
    }

    fn push(mut self, name: String, direction: ChannelDirection) -> Self {
        // Indices past MAX_CHANNEL never escape: build() rejects the set.
        let index = self.specs.len().min(MAX_CHANNEL as usize) as u8;
        self.specs.push(ChannelSpec {
            index,
            name,
            direction,
        });
        self
    }

    /// Validate and finalize the set.
    pub fn build(self) -> Result<ChannelSet> {
        if self.specs.is_empty() {
            return Err(FrameError::EmptyChannelSet);
        }
        if self.specs.len() > MAX_CHANNEL as usize + 1 {
            return Err(FrameError::TooManyChannels {
                count: self.specs.len(),
                max: MAX_CHANNEL as usize + 1,
            });
        }
        for (i, spec) in self.specs.iter().enumerate() {
            if self.specs[..i].iter().any(|other| other.name == spec.name) {
                return Err(FrameError::DuplicateChannel(spec.name.clone()));
            }
        }
        Ok(ChannelSet { specs: self.specs })
    }
}

use bytes::{BufMut, Bytes, BytesMut};

use crate::channel::ChannelSet;
use crate::error::{FrameError, Result};

/// Size of the channel prefix preceding every payload.
pub const PREFIX_SIZE: usize = 1;

/// A decoded frame: one channel-prefixed unit of payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The channel this payload belongs to.
    pub channel: u8,
    /// The payload bytes; empty payloads are valid (keep-alive frames).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(channel: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (prefix + payload).
    pub fn wire_size(&self) -> usize {
        PREFIX_SIZE + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// +-------------+----------------------+
/// | Channel (1B)| Payload (0..n bytes) |
/// +-------------+----------------------+
/// ```
///
/// There is no length prefix; message framing is the transport's job.
/// Fails with [`FrameError::InvalidChannel`] when `channel` is outside the
/// set — the index is never clamped.
pub fn encode_frame(channels: &ChannelSet, channel: u8, payload: &[u8]) -> Result<Bytes> {
    if !channels.contains(channel) {
        return Err(FrameError::InvalidChannel {
            channel,
            max: channels.max_index(),
        });
    }
    let mut buf = BytesMut::with_capacity(PREFIX_SIZE + payload.len());
    buf.put_u8(channel);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Decode a frame from one transport message.
///
/// A zero-length message is a protocol violation (no channel byte) and
/// fails with [`FrameError::MalformedFrame`]; a one-byte message is a valid
/// frame with an empty payload. Channel membership is not checked here —
/// the demultiplexer owns that decision against its negotiated set.
pub fn decode_frame(mut message: Bytes) -> Result<Frame> {
    if message.is_empty() {
        return Err(FrameError::MalformedFrame);
    }
    let prefix = message.split_to(PREFIX_SIZE);
    Ok(Frame {
        channel: prefix[0],
        payload: message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{STDERR, STDIN, STDOUT};

    #[test]
    fn encode_decode_roundtrip() {
        let set = ChannelSet::standard();
        let payload = b"hello, podmux!";

        let wire = encode_frame(&set, STDOUT, payload).unwrap();
        assert_eq!(wire.len(), PREFIX_SIZE + payload.len());

        let frame = decode_frame(wire).unwrap();
        assert_eq!(frame.channel, STDOUT);
        assert_eq!(frame.payload.as_ref(), payload);
    }

    #[test]
    fn roundtrip_every_channel_and_empty_payload() {
        let set = ChannelSet::tty();
        for spec in set.iter() {
            for payload in [&b""[..], &b"x"[..], &b"longer payload"[..]] {
                let wire = encode_frame(&set, spec.index, payload).unwrap();
                let frame = decode_frame(wire).unwrap();
                assert_eq!(frame.channel, spec.index);
                assert_eq!(frame.payload.as_ref(), payload);
            }
        }
    }

    #[test]
    fn empty_payload_is_a_valid_frame() {
        let set = ChannelSet::standard();
        let wire = encode_frame(&set, STDIN, b"").unwrap();
        assert_eq!(wire.len(), 1);

        let frame = decode_frame(wire).unwrap();
        assert_eq!(frame.channel, STDIN);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn zero_length_message_is_malformed() {
        let result = decode_frame(Bytes::new());
        assert!(matches!(result, Err(FrameError::MalformedFrame)));
    }

    #[test]
    fn encode_rejects_channel_outside_set() {
        let set = ChannelSet::standard();
        let result = encode_frame(&set, 4, b"data");
        assert!(matches!(
            result,
            Err(FrameError::InvalidChannel { channel: 4, max: 3 })
        ));
    }

    #[test]
    fn decode_does_not_validate_membership() {
        // Membership is the demultiplexer's call; the codec only splits.
        let frame = decode_frame(Bytes::from_static(&[200, 1, 2, 3])).unwrap();
        assert_eq!(frame.channel, 200);
        assert_eq!(frame.payload.as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn frame_wire_size() {
        let frame = Frame::new(STDERR, Bytes::from_static(b"test"));
        assert_eq!(frame.wire_size(), PREFIX_SIZE + 4);
    }
}

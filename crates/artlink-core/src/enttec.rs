//! Enttec DMX USB Pro framing
//!
//! The Pro speaks a simple envelope over serial:
//! `[0x7E, label, len_lo, len_hi, payload..., 0xE7]`. For the
//! "Send DMX Packet" request (label 6) the payload is the DMX start code
//! followed by up to 512 channel bytes. No checksum, no escaping.

use bytes::{BufMut, Bytes, BytesMut};

use crate::MAX_CHANNELS;

/// Frame start delimiter
pub const FRAME_START: u8 = 0x7E;
/// Frame end delimiter
pub const FRAME_END: u8 = 0xE7;
/// "Send DMX Packet" request label
pub const LABEL_SEND_DMX: u8 = 0x06;
/// DMX512 start code for standard lighting data
pub const DMX_START_CODE: u8 = 0x00;

/// Envelope bytes around the payload: start, label, two length bytes,
/// start code, end.
pub const FRAME_OVERHEAD: usize = 6;

/// Encode channel data into a "Send DMX Packet" frame.
///
/// Input beyond 512 channels is silently truncated; the interface
/// cannot address more, and the relay accepts the loss. Empty input is
/// valid and yields a start-code-only frame.
pub fn encode_dmx(channels: &[u8]) -> Bytes {
    let channels = &channels[..channels.len().min(MAX_CHANNELS)];
    // Length field counts the start code too
    let payload_len = channels.len() + 1;

    let mut frame = BytesMut::with_capacity(channels.len() + FRAME_OVERHEAD);
    frame.put_u8(FRAME_START);
    frame.put_u8(LABEL_SEND_DMX);
    frame.put_u8((payload_len & 0xff) as u8);
    frame.put_u8((payload_len >> 8) as u8);
    frame.put_u8(DMX_START_CODE);
    frame.put_slice(channels);
    frame.put_u8(FRAME_END);
    frame.freeze()
}

//! DMX payload types and universe filtering

use bytes::Bytes;

use crate::MAX_CHANNELS;

/// One decoded ArtDMX payload.
///
/// Created per datagram and dropped as soon as it has been filtered and
/// (possibly) encoded; nothing retains these across packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxPayload {
    /// Art-Net `Net` field (0-127)
    pub net: u8,
    /// Art-Net `SubUni` field
    pub sub_uni: u8,
    /// Advisory sequence counter; carried but not enforced
    pub sequence: u8,
    /// Channel intensity bytes, at most 512
    pub channels: Bytes,
}

impl DmxPayload {
    /// The 15-bit universe this payload addresses.
    pub fn universe(&self) -> u16 {
        universe_id(self.net, self.sub_uni)
    }

    /// Number of channels carried.
    pub fn channel_count(&self) -> usize {
        self.channels.len().min(MAX_CHANNELS)
    }
}

/// Derive the universe number from the Art-Net address fields.
pub fn universe_id(net: u8, sub_uni: u8) -> u16 {
    u16::from(net) * 256 + u16::from(sub_uni)
}

/// Universe filter: does a payload with these address fields belong to
/// `target`? Pure and re-evaluated per packet; the target can change
/// between packets.
pub fn universe_matches(net: u8, sub_uni: u8, target: u16) -> bool {
    universe_id(net, sub_uni) == target
}

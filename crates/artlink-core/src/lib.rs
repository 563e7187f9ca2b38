//! artlink core
//!
//! Pure protocol logic for the Art-Net to Enttec DMX USB Pro relay.
//! No sockets, no serial ports, just the pieces that can be reasoned
//! about (and tested) in isolation:
//!
//! - DMX payload types and universe filtering ([`dmx`])
//! - Enttec Pro "Send DMX Packet" framing ([`enttec`])
//! - Target-universe parsing and the shared atomic target ([`target`])

pub mod dmx;
pub mod enttec;
pub mod target;

pub use dmx::{universe_id, universe_matches, DmxPayload};
pub use enttec::encode_dmx;
pub use target::{parse_target, TargetUniverse};

/// UDP port the relay listens on for Art-Net traffic
pub const ARTNET_PORT: u16 = 6455;

/// Largest datagram the listener will accept
pub const MAX_DATAGRAM: usize = 1024;

/// Channels in one DMX512 universe
pub const MAX_CHANNELS: usize = 512;

/// Highest addressable universe (7-bit net, 8-bit sub-universe)
pub const MAX_UNIVERSE: u16 = 32767;

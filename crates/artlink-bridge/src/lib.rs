//! artlink bridge
//!
//! The I/O half of the relay:
//! - [`ArtNetListener`] receives and decodes Art-Net datagrams
//! - [`EnttecPro`] writes Enttec Pro frames to a serial port
//! - [`Relay`] drives receive, decode, filter, encode and transmit under
//!   cooperative cancellation
//!
//! Delivery is best-effort end to end: nothing is buffered, retried, or
//! replayed. A lost frame is a lost frame; the next datagram starts over.

pub mod artnet;
pub mod error;
pub mod relay;
pub mod serial;
pub mod traits;

pub use artnet::{ArtNetListener, Received};
pub use error::{BridgeError, Result};
pub use relay::{Relay, RelayStats, StatsSnapshot, StatusBoard, StatusSnapshot};
pub use serial::EnttecPro;
pub use traits::{FrameSink, RelayEvent};

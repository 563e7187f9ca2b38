//! Seam between the relay loop and the output device

use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;

use crate::error::Result;

/// Something that accepts one encoded Enttec frame at a time.
///
/// The relay only ever holds one in-flight send; implementations need no
/// queueing. [`crate::EnttecPro`] is the real device, tests substitute
/// their own.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Write one frame. Failure is reported but the frame is gone either
    /// way; the relay never retries it.
    async fn send_frame(&self, frame: Bytes) -> Result<()>;
}

/// Observable relay activity, one event per state transition of note.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// Listener bound and receiving
    Listening { addr: SocketAddr },
    /// A matching payload was encoded and handed to the sink
    Forwarded {
        from: SocketAddr,
        universe: u16,
        channels: usize,
    },
    /// The sink rejected a frame
    SendFailed(String),
    /// The relay observed cancellation and exited
    Stopped,
}

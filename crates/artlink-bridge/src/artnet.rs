//! Art-Net listener
//!
//! Binds the relay's UDP endpoint and turns datagrams into
//! [`DmxPayload`]s. Port 6455 is shared territory: other Art-Net packet
//! types, other nodes' chatter, and plain garbage all legitimately show
//! up here, so anything that is not a well-formed ArtDMX packet is
//! discarded without an error; the caller sees [`Received::Ignored`]
//! and can count it.

use artnet_protocol::ArtCommand;
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use artlink_core::{DmxPayload, MAX_DATAGRAM};

use crate::error::{BridgeError, Result};

/// Outcome of one receive call.
#[derive(Debug, Clone)]
pub enum Received {
    /// A decodable ArtDMX payload
    Dmx(DmxPayload, SocketAddr),
    /// Protocol noise: undecodable bytes or a non-DMX opcode
    Ignored,
}

/// UDP listener for ArtDMX traffic.
pub struct ArtNetListener {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl ArtNetListener {
    /// Bind the listening endpoint. Failure here is fatal to the
    /// listener (there is no rebind path) but callers are expected to
    /// keep the rest of the process alive.
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| BridgeError::BindFailed(format!("{addr}: {e}")))?;

        info!("Art-Net listener bound to {}", addr);

        Ok(Self {
            socket,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(BridgeError::Io)
    }

    /// Wait for the next datagram and attempt to decode it.
    ///
    /// Cancel-safe: callers select over this and a shutdown signal.
    pub async fn recv(&mut self) -> Result<Received> {
        let (len, from) = self
            .socket
            .recv_from(&mut self.buf)
            .await
            .map_err(|e| BridgeError::Receive(e.to_string()))?;

        match decode_art_dmx(&self.buf[..len]) {
            Some(payload) => Ok(Received::Dmx(payload, from)),
            None => {
                debug!("Ignoring {} non-ArtDMX bytes from {}", len, from);
                Ok(Received::Ignored)
            }
        }
    }
}

/// Decode one datagram as an ArtDMX payload.
///
/// Returns `None` for anything else: malformed framing, or a valid
/// Art-Net packet of another opcode (Poll, PollReply, ...).
pub fn decode_art_dmx(buf: &[u8]) -> Option<DmxPayload> {
    match ArtCommand::from_buffer(buf) {
        Ok(ArtCommand::Output(output)) => {
            let data: &[u8] = &output.data;
            // A lying length header must never over-read the data
            let declared = usize::from(output.length).min(data.len());
            Some(DmxPayload {
                net: (output.subnet >> 8) as u8,
                sub_uni: (output.subnet & 0xff) as u8,
                sequence: output.sequence,
                channels: Bytes::copy_from_slice(&data[..declared]),
            })
        }
        Ok(_) => None,
        Err(_) => None,
    }
}

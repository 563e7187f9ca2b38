//! Enttec DMX USB Pro serial output
//!
//! Open-per-frame strategy: the port is opened, written, and dropped for
//! every single frame. A wedged or unplugged device therefore fails one
//! send and never poisons the next attempt, and there is no reconnect
//! state machine to get wrong. The cost in open/close latency is
//! acceptable at Art-Net frame rates.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, StopBits};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::traits::FrameSink;

/// Baud rate mandated by the Enttec Pro
pub const BAUD_RATE: u32 = 57600;

/// Enttec Pro output on a named serial port.
#[derive(Debug, Clone)]
pub struct EnttecPro {
    port_name: String,
}

impl EnttecPro {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn open(&self) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(&self.port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .open_native_async()
            .map_err(|e| BridgeError::SerialOpen {
                port: self.port_name.clone(),
                reason: e.to_string(),
            })
    }

    /// One-shot startup probe: can the device be opened at all?
    ///
    /// Open-then-close, nothing written. The result feeds the status
    /// surface once and is never refreshed.
    pub fn probe(&self) -> bool {
        match self.open() {
            Ok(_) => {
                info!("Device present on {}", self.port_name);
                true
            }
            Err(e) => {
                warn!("Device probe failed: {}", e);
                false
            }
        }
    }

    /// List serial ports that look like DMX interfaces.
    pub fn list_ports() -> Result<Vec<String>> {
        let ports = tokio_serial::available_ports()
            .map_err(|e| BridgeError::SerialOpen {
                port: "<enumeration>".into(),
                reason: e.to_string(),
            })?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}

#[async_trait]
impl FrameSink for EnttecPro {
    async fn send_frame(&self, frame: Bytes) -> Result<()> {
        // The port drops (and closes) on every exit path below
        let mut port = self.open()?;

        port.write_all(&frame)
            .await
            .map_err(|e| BridgeError::SerialWrite {
                port: self.port_name.clone(),
                reason: e.to_string(),
            })?;
        port.flush()
            .await
            .map_err(|e| BridgeError::SerialWrite {
                port: self.port_name.clone(),
                reason: e.to_string(),
            })?;

        debug!("Wrote {} byte frame to {}", frame.len(), self.port_name);
        Ok(())
    }
}

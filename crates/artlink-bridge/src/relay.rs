//! Relay loop
//!
//! One task, no queue: receive a datagram, decode it, filter by target
//! universe, encode, hand the frame to the sink, go back to receiving.
//! A slow serial write delays the next datagram; that is the accepted
//! backpressure model. Cancellation is observed between packets via
//! `tokio::select!`; an in-flight write is never interrupted.
//!
//! Every discard path increments a [`RelayStats`] counter so "the
//! transmitter was never called" is checkable as a number, not an
//! absence.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use artlink_core::{encode_dmx, universe_matches, DmxPayload, TargetUniverse, MAX_CHANNELS};

use crate::artnet::{ArtNetListener, Received};
use crate::error::Result;
use crate::traits::{FrameSink, RelayEvent};

/// Counters for every path a datagram can take through the relay.
#[derive(Debug, Default)]
pub struct RelayStats {
    /// Datagrams received, decodable or not
    pub received: AtomicU64,
    /// Datagrams that were not ArtDMX (noise, other opcodes)
    pub ignored: AtomicU64,
    /// ArtDMX payloads addressed to some other universe
    pub mismatched: AtomicU64,
    /// Payloads whose channel data exceeded 512 and was cut down
    pub truncated: AtomicU64,
    /// Frames handed to the sink successfully
    pub forwarded: AtomicU64,
    /// Frames the sink rejected
    pub send_failed: AtomicU64,
}

impl RelayStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            mismatched: self.mismatched.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            send_failed: self.send_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub ignored: u64,
    pub mismatched: u64,
    pub truncated: u64,
    pub forwarded: u64,
    pub send_failed: u64,
}

/// Read-only status strings for a front end.
///
/// The device line is written once from the startup probe; the Art-Net
/// line tracks the most recently forwarded payload.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    inner: Arc<StatusInner>,
}

#[derive(Debug)]
struct StatusInner {
    device: Mutex<String>,
    last_artnet: Mutex<String>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            inner: Arc::new(StatusInner {
                device: Mutex::new("Device not connected".to_string()),
                last_artnet: Mutex::new("Art-Net not received".to_string()),
            }),
        }
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_device(&self, text: impl Into<String>) {
        *self.inner.device.lock() = text.into();
    }

    pub fn device(&self) -> String {
        self.inner.device.lock().clone()
    }

    pub fn set_last_artnet(&self, text: impl Into<String>) {
        *self.inner.last_artnet.lock() = text.into();
    }

    pub fn last_artnet(&self) -> String {
        self.inner.last_artnet.lock().clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            device: self.device(),
            last_artnet: self.last_artnet(),
        }
    }
}

/// Point-in-time copy of [`StatusBoard`], shaped for a front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub device: String,
    pub last_artnet: String,
}

/// The relay: receive, decode, filter, encode, transmit.
pub struct Relay<S: FrameSink> {
    listener: ArtNetListener,
    sink: S,
    target: TargetUniverse,
    stats: Arc<RelayStats>,
    status: StatusBoard,
    events: Option<mpsc::Sender<RelayEvent>>,
}

impl<S: FrameSink> Relay<S> {
    pub fn new(listener: ArtNetListener, sink: S, target: TargetUniverse) -> Self {
        Self {
            listener,
            sink,
            target,
            stats: Arc::new(RelayStats::default()),
            status: StatusBoard::new(),
            events: None,
        }
    }

    /// Handle to the counters; stays valid after the relay is consumed.
    pub fn stats(&self) -> Arc<RelayStats> {
        self.stats.clone()
    }

    /// Handle to the status strings; stays valid after the relay is
    /// consumed.
    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    /// Subscribe to relay activity. Call before [`run`](Self::run);
    /// dropping the receiver is fine, events are then discarded.
    pub fn events(&mut self) -> mpsc::Receiver<RelayEvent> {
        let (tx, rx) = mpsc::channel(100);
        self.events = Some(tx);
        rx
    }

    async fn emit(&self, event: RelayEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Run until the shutdown channel yields (or closes).
    ///
    /// No failure inside the loop ends it: receive errors, undecodable
    /// packets, universe mismatches, and serial failures are all logged
    /// or counted and the loop re-enters. Only cancellation exits.
    pub async fn run(mut self, shutdown: &mut mpsc::Receiver<()>) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            self.emit(RelayEvent::Listening { addr }).await;
        }

        loop {
            let received = tokio::select! {
                _ = shutdown.recv() => break,
                received = self.listener.recv() => received,
            };

            match received {
                Ok(Received::Dmx(payload, from)) => {
                    self.stats.received.fetch_add(1, Ordering::Relaxed);
                    self.forward(payload, from).await;
                }
                Ok(Received::Ignored) => {
                    self.stats.received.fetch_add(1, Ordering::Relaxed);
                    self.stats.ignored.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    // Transient socket errors; keep listening
                    error!("Art-Net receive error: {}", e);
                }
            }
        }

        self.emit(RelayEvent::Stopped).await;
        drop(self.listener);
        info!("UDP socket closed");
        info!("Art-Net relay stopped");
        Ok(())
    }

    async fn forward(&self, payload: DmxPayload, from: SocketAddr) {
        let target = self.target.get();
        if !universe_matches(payload.net, payload.sub_uni, target) {
            self.stats.mismatched.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if payload.channels.len() > MAX_CHANNELS {
            warn!(
                "Truncating {} channel bytes to {}",
                payload.channels.len(),
                MAX_CHANNELS
            );
            self.stats.truncated.fetch_add(1, Ordering::Relaxed);
        }

        let universe = payload.universe();
        let channels = payload.channel_count();
        info!(
            "Art-Net received: {}, universe {}, {} channels",
            from, universe, channels
        );
        self.status
            .set_last_artnet(format!("{} universe {} ({} ch)", from, universe, channels));

        let frame = encode_dmx(&payload.channels);
        match self.sink.send_frame(frame).await {
            Ok(()) => {
                self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                self.emit(RelayEvent::Forwarded {
                    from,
                    universe,
                    channels,
                })
                .await;
            }
            Err(e) => {
                // Best effort: report, count, move on to the next packet
                error!("DMX transmission error: {}", e);
                self.stats.send_failed.fetch_add(1, Ordering::Relaxed);
                self.emit(RelayEvent::SendFailed(e.to_string())).await;
            }
        }
    }
}

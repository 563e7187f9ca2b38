//! Relay end-to-end tests over loopback UDP
//!
//! Real sockets on ephemeral ports, a recording sink in place of the
//! serial device. These verify the paths that must and must not reach
//! the transmitter, plus cancellation.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use artnet_protocol::{ArtCommand, Output, Poll};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use artlink_bridge::{
    ArtNetListener, BridgeError, FrameSink, Relay, RelayEvent, RelayStats,
};
use artlink_core::TargetUniverse;

/// Sink that records every frame it is handed.
#[derive(Clone, Default)]
struct RecordingSink {
    frames: Arc<Mutex<Vec<Bytes>>>,
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send_frame(&self, frame: Bytes) -> artlink_bridge::Result<()> {
        self.frames.lock().push(frame);
        Ok(())
    }
}

/// Sink that fails every send but counts the attempts.
#[derive(Clone, Default)]
struct FailingSink {
    attempts: Arc<AtomicU64>,
}

#[async_trait]
impl FrameSink for FailingSink {
    async fn send_frame(&self, _frame: Bytes) -> artlink_bridge::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BridgeError::SerialOpen {
            port: "/dev/test-null".into(),
            reason: "no such device".into(),
        })
    }
}

struct Harness {
    addr: SocketAddr,
    sender: UdpSocket,
    shutdown_tx: mpsc::Sender<()>,
    stats: Arc<RelayStats>,
    events: mpsc::Receiver<RelayEvent>,
    handle: JoinHandle<artlink_bridge::Result<()>>,
}

async fn start_relay<S: FrameSink + 'static>(target: TargetUniverse, sink: S) -> Harness {
    let listener = ArtNetListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    let mut relay = Relay::new(listener, sink, target);
    let stats = relay.stats();
    let mut events = relay.events();

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    let handle = tokio::spawn(async move { relay.run(&mut shutdown_rx).await });

    // First event confirms the loop is up
    match next_event(&mut events).await {
        RelayEvent::Listening { addr: bound } => assert_eq!(bound, addr),
        other => panic!("expected Listening, got {:?}", other),
    }

    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("bind sender");

    Harness {
        addr,
        sender,
        shutdown_tx,
        stats,
        events,
        handle,
    }
}

async fn next_event(rx: &mut mpsc::Receiver<RelayEvent>) -> RelayEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for relay event")
        .expect("event channel closed")
}

async fn wait_until<F>(stats: &Arc<RelayStats>, cond: F)
where
    F: Fn(&artlink_bridge::StatsSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if cond(&stats.snapshot()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("stats condition not reached in time");
}

fn art_dmx(universe: u16, channels: &[u8]) -> Vec<u8> {
    let mut output = Output::default();
    output.subnet = universe;
    output.data = channels.to_vec().into();
    output.length = channels.len() as u16;
    ArtCommand::Output(output)
        .into_buffer()
        .expect("serialize ArtDMX")
}

#[tokio::test]
async fn matching_universe_is_forwarded_as_enttec_frame() {
    let sink = RecordingSink::default();
    let mut h = start_relay(TargetUniverse::new(0), sink.clone()).await;

    h.sender
        .send_to(&art_dmx(0, &[0xff, 0x00, 0x10, 0x20]), h.addr)
        .await
        .unwrap();

    match next_event(&mut h.events).await {
        RelayEvent::Forwarded { universe, channels, .. } => {
            assert_eq!(universe, 0);
            assert_eq!(channels, 4);
        }
        other => panic!("expected Forwarded, got {:?}", other),
    }

    let frames = sink.frames.lock();
    assert_eq!(frames.len(), 1);
    assert_eq!(
        &frames[0][..],
        &[0x7e, 0x06, 0x05, 0x00, 0x00, 0xff, 0x00, 0x10, 0x20, 0xe7]
    );
}

#[tokio::test]
async fn other_universes_never_reach_the_sink() {
    let sink = RecordingSink::default();
    let mut h = start_relay(TargetUniverse::new(5), sink.clone()).await;

    // Universe 258 first, then a matching one; the loop is strictly
    // sequential, so seeing the forward means the mismatch was processed
    h.sender
        .send_to(&art_dmx(258, &[0x01, 0x02]), h.addr)
        .await
        .unwrap();
    h.sender
        .send_to(&art_dmx(5, &[0x0a, 0x0b]), h.addr)
        .await
        .unwrap();

    loop {
        if let RelayEvent::Forwarded { universe, .. } = next_event(&mut h.events).await {
            assert_eq!(universe, 5);
            break;
        }
    }
    wait_until(&h.stats, |s| s.received == 2).await;

    assert_eq!(sink.frames.lock().len(), 1);
    let stats = h.stats.snapshot();
    assert_eq!(stats.mismatched, 1);
    assert_eq!(stats.forwarded, 1);
}

#[tokio::test]
async fn noise_is_counted_and_skipped() {
    let sink = RecordingSink::default();
    let mut h = start_relay(TargetUniverse::new(0), sink.clone()).await;

    h.sender
        .send_to(b"random non-artnet bytes", h.addr)
        .await
        .unwrap();
    let poll = ArtCommand::Poll(Poll::default()).into_buffer().unwrap();
    h.sender.send_to(&poll, h.addr).await.unwrap();
    h.sender
        .send_to(&art_dmx(0, &[0x42, 0x43]), h.addr)
        .await
        .unwrap();

    loop {
        if matches!(next_event(&mut h.events).await, RelayEvent::Forwarded { .. }) {
            break;
        }
    }
    wait_until(&h.stats, |s| s.received == 3).await;

    assert_eq!(sink.frames.lock().len(), 1);
    let stats = h.stats.snapshot();
    assert_eq!(stats.ignored, 2);
    assert_eq!(stats.forwarded, 1);
}

#[tokio::test]
async fn failed_sends_are_independent_attempts() {
    let sink = FailingSink::default();
    let mut h = start_relay(TargetUniverse::new(0), sink.clone()).await;

    h.sender
        .send_to(&art_dmx(0, &[0x10, 0x11]), h.addr)
        .await
        .unwrap();
    assert!(matches!(
        next_event(&mut h.events).await,
        RelayEvent::SendFailed(_)
    ));

    // The next packet gets a fresh attempt, no retry of the lost frame
    h.sender
        .send_to(&art_dmx(0, &[0x20, 0x21]), h.addr)
        .await
        .unwrap();
    assert!(matches!(
        next_event(&mut h.events).await,
        RelayEvent::SendFailed(_)
    ));

    assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
    let stats = h.stats.snapshot();
    assert_eq!(stats.send_failed, 2);
    assert_eq!(stats.forwarded, 0);
}

#[tokio::test]
async fn target_changes_apply_to_the_next_packet() {
    let target = TargetUniverse::new(5);
    let sink = RecordingSink::default();
    let mut h = start_relay(target.clone(), sink.clone()).await;

    h.sender
        .send_to(&art_dmx(258, &[0x01, 0x02]), h.addr)
        .await
        .unwrap();

    // Wait until the mismatch has been counted before retargeting
    wait_until(&h.stats, |s| s.mismatched == 1).await;

    target.set_from_text("258");
    h.sender
        .send_to(&art_dmx(258, &[0x01, 0x02]), h.addr)
        .await
        .unwrap();

    loop {
        if let RelayEvent::Forwarded { universe, .. } = next_event(&mut h.events).await {
            assert_eq!(universe, 258);
            break;
        }
    }
    assert_eq!(sink.frames.lock().len(), 1);
}

#[tokio::test]
async fn shutdown_signal_stops_the_loop() {
    let sink = RecordingSink::default();
    let mut h = start_relay(TargetUniverse::new(0), sink).await;

    h.shutdown_tx.send(()).await.unwrap();

    assert!(matches!(
        next_event(&mut h.events).await,
        RelayEvent::Stopped
    ));

    let result = tokio::time::timeout(Duration::from_secs(2), h.handle)
        .await
        .expect("relay did not exit after shutdown")
        .expect("relay task panicked");
    assert!(result.is_ok());
}

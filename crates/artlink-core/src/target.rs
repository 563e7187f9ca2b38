//! Target-universe configuration
//!
//! The target is set by a front end (text input) and read by the relay
//! on every packet, from different tasks. It is published through an
//! atomic so a read can never observe a torn value; a read that races a
//! write only filters one packet against the old target, which is fine.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use crate::MAX_UNIVERSE;

/// Parse decimal text into a target universe.
///
/// Anything unparsable or outside 0..=32767 resolves to universe 0.
/// This is the defined fallback, not an error.
pub fn parse_target(text: &str) -> u16 {
    match text.trim().parse::<u16>() {
        Ok(universe) if universe <= MAX_UNIVERSE => universe,
        _ => 0,
    }
}

/// Shared, atomically-published target universe.
///
/// Cloning hands out another handle to the same value.
#[derive(Debug, Clone, Default)]
pub struct TargetUniverse(Arc<AtomicU16>);

impl TargetUniverse {
    pub fn new(universe: u16) -> Self {
        Self(Arc::new(AtomicU16::new(universe.min(MAX_UNIVERSE))))
    }

    /// Current target, as of this instant.
    pub fn get(&self) -> u16 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, universe: u16) {
        self.0.store(universe.min(MAX_UNIVERSE), Ordering::Relaxed);
    }

    /// Update from raw front-end text, with the coerce-to-0 fallback.
    pub fn set_from_text(&self, text: &str) {
        self.set(parse_target(text));
    }
}

//! Event channel adapter
//!
//! Keeps one WebSocket open to the library topic and converts broadcast
//! envelopes into registry commands. See [`connection`] for the connection
//! lifecycle and [`dispatch`] for how events reach the registry.

pub mod connection;
pub mod dispatch;
pub mod envelope;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use connection::{
    ChannelHandle, ChannelSettings, PumpEnd, backoff_delay, pump_events,
};
pub use dispatch::{DispatchOutcome, EventDispatcher, ResolutionError};
pub use envelope::{EnvelopeError, decode_envelope};
pub use tokio_tungstenite::tungstenite;

/// Whether the push channel is currently delivering events.
///
/// Shared between the connection task (writer) and the fetch client
/// (reader), which falls back to local mutations while this is false.
#[derive(Debug, Clone, Default)]
pub struct ChannelAvailability(Arc<AtomicBool>);

impl ChannelAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set_live(&self, live: bool) {
        self.0.store(live, Ordering::Release);
    }
}

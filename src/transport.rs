//! Relay transport seam.
//!
//! The listener never talks to relays directly: it hands a [`TransportFactory`]
//! the relay list, the recipient to filter on and an [`EventSink`], and gets
//! back an opaque handle it can later shut down. Connection and reconnect
//! mechanics, subscription framing and relay protocol details all live on
//! the other side of these traits.
//!
//! No delivery ordering or at-most-once guarantee is assumed from the
//! transport: duplicates across relays are expected and handled upstream.

use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::InboundEnvelope;
use crate::Result;

/// Receiver for transport callbacks. Implemented internally by the listener;
/// transports call it from whatever threads or tasks they run on.
pub trait EventSink: Send + Sync {
    /// A subscription delivered an envelope from the given relay.
    fn on_event(&self, relay_url: &str, envelope: InboundEnvelope);

    /// A relay-level connection or protocol error. Non-fatal: other relays
    /// may still deliver.
    fn on_error(&self, relay_url: &str, message: &str);
}

/// Handle to a running set of relay subscriptions.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Close all connections and stop delivering events. Idempotent.
    async fn shutdown(&self);
}

/// Opens relay subscriptions for a recipient.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Connect to `relays` and subscribe to events of `kind` addressed to
    /// `recipient`, delivering them to `sink` until the returned handle is
    /// shut down.
    async fn subscribe(
        &self,
        relays: &[String],
        recipient: &str,
        kind: u16,
        sink: Arc<dyn EventSink>,
    ) -> Result<Box<dyn RelayTransport>>;
}

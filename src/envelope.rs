//! Inbound delivery units and their unwrapped form.

use serde::{Deserialize, Serialize};

/// Nostr event kind for NIP-59 gift wraps. Subscriptions are filtered to
/// this kind; the orchestrator double-checks it anyway.
pub const GIFT_WRAP_KIND: u16 = 1059;

/// An inbound, possibly-encrypted delivery unit produced by the transport.
///
/// The `content` is opaque ciphertext until the unwrap collaborator peels
/// it; the `id` is the transport-level unique identifier that deduplication
/// keys on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// Unique event identifier, as delivered by the relay.
    pub id: String,
    /// Transport-level kind discriminator.
    pub kind: u16,
    /// Sender public key (the gift-wrap's ephemeral author).
    pub pubkey: String,
    /// Opaque ciphertext body.
    pub content: String,
    /// Event creation timestamp (unix epoch seconds).
    #[serde(default)]
    pub created_at: i64,
}

impl InboundEnvelope {
    /// Create a gift-wrap envelope. Mostly useful for tests and transports.
    pub fn gift_wrap(id: impl Into<String>, pubkey: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: GIFT_WRAP_KIND,
            pubkey: pubkey.into(),
            content: content.into(),
            created_at: 0,
        }
    }
}

/// Plaintext payload extracted from an envelope, tagged with its origin so
/// later log lines can correlate back to the delivery.
#[derive(Clone, Debug)]
pub struct UnwrappedPayload {
    /// Identifier of the envelope this payload came out of.
    pub envelope_id: String,
    /// The plaintext content (a payment-request payload as JSON).
    pub content: String,
}

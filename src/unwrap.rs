//! Envelope unwrap seam.
//!
//! Wraps the external NIP-59/NIP-44 unwrap-and-decrypt collaborator behind a
//! uniform success/failure contract. Sub-reasons (bad seal, wrong recipient,
//! truncated ciphertext) stay opaque: the listener only needs to know the
//! attempt yielded no usable content.

use crate::config::SecretKey;
use crate::envelope::{InboundEnvelope, UnwrappedPayload};

/// Opaque unwrap failure. The inner string is whatever diagnostic the
/// collaborator produced.
#[derive(thiserror::Error, Debug)]
#[error("gift wrap unwrap failed: {0}")]
pub struct UnwrapError(pub String);

impl UnwrapError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// Wrap any error from the underlying decrypt library.
    pub fn from_source<E: std::error::Error>(err: E) -> Self {
        Self(err.to_string())
    }
}

/// Collaborator that peels a gift wrap down to its plaintext rumor content.
///
/// Implementations are pure: a function of the envelope and the recipient
/// secret, with no side effects and no state shared with the listener.
/// Empty plaintext after a structurally successful unwrap means "nothing to
/// process" and the event is dropped without a callback.
pub trait GiftWrapOpener: Send + Sync {
    fn open(
        &self,
        envelope: &InboundEnvelope,
        secret_key: &SecretKey,
    ) -> std::result::Result<UnwrappedPayload, UnwrapError>;
}

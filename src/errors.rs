//! Error types for the payment listener.
//!
//! Per-event failures are classified so callers can tell decrypt problems
//! from settlement problems from relay problems. None of them are fatal to
//! the listener itself.

use crate::redeem::RedeemError;
use crate::unwrap::UnwrapError;

/// Result type for listener operations.
pub type Result<T> = std::result::Result<T, ListenerError>;

#[derive(thiserror::Error, Debug)]
pub enum ListenerError {
    /// Secret key material has the wrong length for the envelope scheme.
    #[error("secret key must be {expected} bytes, got {actual}")]
    InvalidSecretKey { expected: usize, actual: usize },

    /// Secret key hex string could not be decoded.
    #[error("secret key is not valid hex: {0}")]
    InvalidSecretKeyEncoding(String),

    /// The unwrap collaborator could not produce usable plaintext.
    #[error(transparent)]
    Unwrap(#[from] UnwrapError),

    /// The redemption collaborator raised its typed failure.
    #[error(transparent)]
    Redemption(#[from] RedeemError),

    /// Relay-level connection or protocol error, forwarded verbatim.
    #[error("relay transport error from {relay}: {message}")]
    Transport { relay: String, message: String },

    /// A per-event handler failed in a way none of the collaborators
    /// classified, such as a panic while processing a delivery.
    #[error("unexpected listener failure: {0}")]
    Unexpected(String),
}

impl ListenerError {
    /// Create a transport error tagged with its relay of origin.
    pub fn transport(relay: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            relay: relay.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error came from the settlement step rather than
    /// the transport or decrypt steps.
    pub fn is_redemption(&self) -> bool {
        matches!(self, Self::Redemption(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_names_relay() {
        let err = ListenerError::transport("wss://relay.example", "connection reset");
        assert!(err.to_string().contains("wss://relay.example"));
        assert!(err.to_string().contains("connection reset"));
        assert!(!err.is_redemption());
    }

    #[test]
    fn redemption_error_is_classified() {
        let err = ListenerError::from(RedeemError::rejected("amount too low"));
        assert!(err.is_redemption());
    }
}

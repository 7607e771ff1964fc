//! Listener configuration and recipient key material.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{ListenerError, Result};

/// Secret key for the ephemeral recipient identity.
///
/// Exactly 32 bytes, length-checked at construction. The bytes are wiped on
/// drop and never printed by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; SecretKey::LEN]);

impl SecretKey {
    /// Key length required by the gift-wrap envelope scheme.
    pub const LEN: usize = 32;

    /// Build a key from raw bytes, rejecting any length other than 32.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; Self::LEN] =
            bytes
                .try_into()
                .map_err(|_| ListenerError::InvalidSecretKey {
                    expected: Self::LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(bytes))
    }

    /// Build a key from a hex string (the form the surrounding app hands
    /// keys around in).
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes =
            hex::decode(s).map_err(|e| ListenerError::InvalidSecretKeyEncoding(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Immutable configuration for one listener instance.
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    secret_key: SecretKey,
    /// Hex-encoded public identifier of the ephemeral recipient.
    pub recipient: String,
    /// Amount (in the smallest unit) the enclosed payment must settle.
    pub expected_amount: u64,
    /// Mints the merchant accepts directly; empty means any mint.
    pub allowed_mints: Vec<String>,
    /// Relay addresses to subscribe on.
    pub relays: Vec<String>,
}

impl ListenerConfig {
    pub fn new(
        secret_key: SecretKey,
        recipient: impl Into<String>,
        expected_amount: u64,
        allowed_mints: Vec<String>,
        relays: Vec<String>,
    ) -> Self {
        Self {
            secret_key,
            recipient: recipient.into(),
            expected_amount,
            allowed_mints,
            relays,
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}

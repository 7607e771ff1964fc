//! Gift-wrapped Nostr DM payment listener.
//!
//! Listens on a set of relays for NIP-59 gift wraps (kind 1059) addressed
//! to one ephemeral recipient key, unwraps each delivery to a
//! payment-request payload, attempts redemption once per distinct event id,
//! and reports the first success exactly once before stopping itself.
//!
//! The relay transport, the unwrap/decrypt primitives and the settlement
//! engine are all external collaborators injected through traits; this
//! crate owns only the coordination around them: cross-relay
//! deduplication, the one-shot life cycle, single-winner selection and
//! error classification.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nostr_payment_listener::{ListenerConfig, PaymentListener, SecretKey};
//!
//! let config = ListenerConfig::new(
//!     SecretKey::from_hex(&ephemeral_secret_hex)?,
//!     recipient_pubkey_hex,
//!     1000,
//!     vec!["https://mint.example".into()],
//!     vec!["wss://relay.damus.io".into(), "wss://nos.lol".into()],
//! );
//!
//! let listener = PaymentListener::new(
//!     config,
//!     Arc::new(nip59_opener),
//!     Arc::new(cashu_redeemer),
//!     Arc::new(websocket_factory),
//!     Arc::new(|token| println!("paid: {} bytes of token", token.len())),
//!     Arc::new(|message, cause| eprintln!("{message}: {cause}")),
//! );
//! listener.start().await?;
//! ```

pub mod config;
pub mod dedup;
pub mod envelope;
pub mod errors;
pub mod listener;
pub mod redeem;
pub mod transport;
pub mod unwrap;

/// In-memory mock collaborators.
///
/// Only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{ListenerConfig, SecretKey};
pub use dedup::SeenEvents;
pub use envelope::{InboundEnvelope, UnwrappedPayload, GIFT_WRAP_KIND};
pub use errors::{ListenerError, Result};
pub use listener::{ErrorCallback, ListenerState, PaymentListener, SuccessCallback};
pub use redeem::{PaymentContext, PaymentRedeemer, RedeemError};
pub use transport::{EventSink, RelayTransport, TransportFactory};
pub use unwrap::{GiftWrapOpener, UnwrapError};

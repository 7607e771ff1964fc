//! In-memory mock collaborators for testing the listener without a network,
//! real NIP-59 crypto, or a mint.
//!
//! The mocks mirror the seams the listener depends on: a relay hub that
//! plays the transport and lets tests inject deliveries, a passthrough
//! gift-wrap opener, and a scriptable redeemer.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::config::SecretKey;
use crate::envelope::{InboundEnvelope, UnwrappedPayload};
use crate::errors::ListenerError;
use crate::redeem::{PaymentContext, PaymentRedeemer, RedeemError};
use crate::transport::{EventSink, RelayTransport, TransportFactory};
use crate::unwrap::{GiftWrapOpener, UnwrapError};
use crate::Result;

/// What a subscription was opened with, for assertions.
#[derive(Clone, Debug)]
pub struct Subscription {
    pub relays: Vec<String>,
    pub recipient: String,
    pub kind: u16,
}

struct HubState {
    sink: RwLock<Option<Arc<dyn EventSink>>>,
    subscription: RwLock<Option<Subscription>>,
    shutdown: AtomicBool,
    fail_subscribe: AtomicBool,
    subscribe_calls: AtomicUsize,
}

/// Mock relay network. Implements [`TransportFactory`]; tests keep a clone
/// and push events through [`MockRelayHub::deliver`].
///
/// The sink is intentionally kept after shutdown so tests can exercise the
/// listener's own terminal-state guard with late deliveries; a real
/// transport would stop delivering on its own.
#[derive(Clone)]
pub struct MockRelayHub {
    state: Arc<HubState>,
}

impl MockRelayHub {
    pub fn new() -> Self {
        Self {
            state: Arc::new(HubState {
                sink: RwLock::new(None),
                subscription: RwLock::new(None),
                shutdown: AtomicBool::new(false),
                fail_subscribe: AtomicBool::new(false),
                subscribe_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Make the next `subscribe` call fail.
    pub fn refuse_subscriptions(&self) {
        self.state.fail_subscribe.store(true, Ordering::SeqCst);
    }

    /// Deliver an envelope as if `relay_url` pushed it.
    pub fn deliver(&self, relay_url: &str, envelope: InboundEnvelope) {
        let sink = {
            let guard = self
                .state
                .sink
                .read()
                .unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        if let Some(sink) = sink {
            sink.on_event(relay_url, envelope);
        }
    }

    /// Report a relay-level error into the listener.
    pub fn fail(&self, relay_url: &str, message: &str) {
        let sink = {
            let guard = self
                .state
                .sink
                .read()
                .unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        if let Some(sink) = sink {
            sink.on_error(relay_url, message);
        }
    }

    /// Whether the handle returned from `subscribe` was shut down.
    pub fn is_shutdown(&self) -> bool {
        self.state.shutdown.load(Ordering::SeqCst)
    }

    /// How many times `subscribe` was called.
    pub fn subscribe_calls(&self) -> usize {
        self.state.subscribe_calls.load(Ordering::SeqCst)
    }

    /// The parameters the listener subscribed with, if it did.
    pub fn subscription(&self) -> Option<Subscription> {
        self.state
            .subscription
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockRelayHub {
    fn default() -> Self {
        Self::new()
    }
}

struct HubTransport {
    state: Arc<HubState>,
}

#[async_trait]
impl RelayTransport for HubTransport {
    async fn shutdown(&self) {
        self.state.shutdown.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportFactory for MockRelayHub {
    async fn subscribe(
        &self,
        relays: &[String],
        recipient: &str,
        kind: u16,
        sink: Arc<dyn EventSink>,
    ) -> Result<Box<dyn RelayTransport>> {
        self.state.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_subscribe.load(Ordering::SeqCst) {
            let relay = relays.first().cloned().unwrap_or_default();
            return Err(ListenerError::transport(relay, "subscription refused"));
        }
        {
            let mut guard = self
                .state
                .sink
                .write()
                .unwrap_or_else(|e| e.into_inner());
            *guard = Some(sink);
        }
        {
            let mut guard = self
                .state
                .subscription
                .write()
                .unwrap_or_else(|e| e.into_inner());
            *guard = Some(Subscription {
                relays: relays.to_vec(),
                recipient: recipient.to_string(),
                kind,
            });
        }
        Ok(Box::new(HubTransport {
            state: self.state.clone(),
        }))
    }
}

/// Gift-wrap opener that treats the envelope body as the plaintext payload.
/// Individual event ids can be scripted to fail.
#[derive(Default)]
pub struct MockOpener {
    fail_ids: Mutex<HashSet<String>>,
}

impl MockOpener {
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Make unwrap fail for the given envelope id.
    pub fn fail_for(&self, id: &str) {
        let mut ids = self.fail_ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.insert(id.to_string());
    }
}

impl GiftWrapOpener for MockOpener {
    fn open(
        &self,
        envelope: &InboundEnvelope,
        _secret_key: &SecretKey,
    ) -> std::result::Result<UnwrappedPayload, UnwrapError> {
        let fail = {
            let ids = self.fail_ids.lock().unwrap_or_else(|e| e.into_inner());
            ids.contains(&envelope.id)
        };
        if fail {
            return Err(UnwrapError::new("seal verification failed"));
        }
        Ok(UnwrappedPayload {
            envelope_id: envelope.id.clone(),
            content: envelope.content.clone(),
        })
    }
}

/// Scripted outcome of a mock redemption.
#[derive(Clone, Debug)]
pub enum MockOutcome {
    /// `Ok(Some(token))`: success, possibly with an empty token.
    Token(String),
    /// `Ok(None)`: nothing to redeem, silent no-op.
    NoToken,
    /// Typed settlement failure.
    Rejected(String),
    /// Incidental runtime failure.
    Unexpected(String),
}

/// Scriptable [`PaymentRedeemer`]. Outcomes can be set per payload, with a
/// default for everything else; an optional barrier holds all in-flight
/// redemptions until every participant has arrived, which is how the
/// concurrency tests get several attempts to complete together.
pub struct MockRedeemer {
    default_outcome: Mutex<MockOutcome>,
    per_payload: Mutex<HashMap<String, MockOutcome>>,
    gate: Mutex<Option<Arc<tokio::sync::Barrier>>>,
    calls: AtomicUsize,
    payloads: Mutex<Vec<String>>,
    last_request: Mutex<Option<RedeemRequest>>,
}

/// Arguments of the most recent redemption attempt, for assertions.
#[derive(Clone, Debug)]
pub struct RedeemRequest {
    pub payload_json: String,
    pub expected_amount: u64,
    pub allowed_mints: Vec<String>,
    pub context: PaymentContext,
}

impl MockRedeemer {
    pub fn new(default_outcome: MockOutcome) -> Self {
        Self {
            default_outcome: Mutex::new(default_outcome),
            per_payload: Mutex::new(HashMap::new()),
            gate: Mutex::new(None),
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
            last_request: Mutex::new(None),
        }
    }

    /// Redeemer that yields the given token for every payload.
    pub fn succeeding(token: &str) -> Self {
        Self::new(MockOutcome::Token(token.to_string()))
    }

    /// Script the outcome for one specific payload.
    pub fn set_outcome(&self, payload: &str, outcome: MockOutcome) {
        let mut map = self.per_payload.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(payload.to_string(), outcome);
    }

    /// Hold every redemption call on the barrier before it resolves.
    pub fn hold_on(&self, barrier: Arc<tokio::sync::Barrier>) {
        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        *gate = Some(barrier);
    }

    /// Number of redemption attempts made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Payloads seen so far, in call order.
    pub fn payloads(&self) -> Vec<String> {
        self.payloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Full arguments of the most recent attempt, if any.
    pub fn last_request(&self) -> Option<RedeemRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PaymentRedeemer for MockRedeemer {
    async fn redeem(
        &self,
        payload_json: &str,
        expected_amount: u64,
        allowed_mints: &[String],
        context: &PaymentContext,
    ) -> std::result::Result<Option<String>, RedeemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut payloads = self.payloads.lock().unwrap_or_else(|e| e.into_inner());
            payloads.push(payload_json.to_string());
        }
        {
            let mut last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
            *last = Some(RedeemRequest {
                payload_json: payload_json.to_string(),
                expected_amount,
                allowed_mints: allowed_mints.to_vec(),
                context: context.clone(),
            });
        }

        let gate = {
            let guard = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        if let Some(barrier) = gate {
            barrier.wait().await;
        }

        let outcome = {
            let map = self.per_payload.lock().unwrap_or_else(|e| e.into_inner());
            map.get(payload_json).cloned().unwrap_or_else(|| {
                self.default_outcome
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone()
            })
        };
        match outcome {
            MockOutcome::Token(token) => Ok(Some(token)),
            MockOutcome::NoToken => Ok(None),
            MockOutcome::Rejected(reason) => Err(RedeemError::rejected(reason)),
            MockOutcome::Unexpected(reason) => Err(RedeemError::unexpected(reason)),
        }
    }
}

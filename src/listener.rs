//! Listener orchestrator.
//!
//! Owns the life-cycle state machine, fans in events from every relay
//! subscription, drives dedup -> unwrap -> redeem per event, and enforces
//! the single-winner rule: exactly one success callback per listener
//! instance, no matter how many relays or in-flight redemptions there are.
//!
//! # Thread Safety
//!
//! The only state touched from more than one task is the seen-set (one
//! critical section per admission) and the state flag (a single atomic;
//! every terminating path goes through the same `Listening -> Stopped`
//! compare-and-swap and only the winner performs teardown and callbacks).
//! The transport handle is owned exclusively under the start/stop mutex.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::sync::Mutex;

use crate::config::ListenerConfig;
use crate::dedup::SeenEvents;
use crate::envelope::{InboundEnvelope, GIFT_WRAP_KIND};
use crate::errors::ListenerError;
use crate::redeem::{PaymentContext, PaymentRedeemer, RedeemError};
use crate::transport::{EventSink, RelayTransport, TransportFactory};
use crate::unwrap::GiftWrapOpener;
use crate::Result;

/// Life-cycle state of a listener instance. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ListenerState {
    Idle = 0,
    Listening = 1,
    Stopped = 2,
}

impl ListenerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Listening,
            _ => Self::Stopped,
        }
    }
}

/// Invoked at most once per listener instance with the redeemed token. The
/// token may be empty for same-channel settlements.
pub type SuccessCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Invoked zero or more times with a human-readable message and the
/// classified cause; never after the success callback, never after an
/// explicit stop has completed.
pub type ErrorCallback = Arc<dyn Fn(&str, &ListenerError) + Send + Sync>;

/// High-level listener for a single gift-wrapped DM payment.
///
/// Subscribes to the configured relays for kind-1059 gift wraps addressed to
/// the ephemeral recipient, redeems the first payload that settles, then
/// stops itself and reports the token.
pub struct PaymentListener {
    inner: Arc<Inner>,
}

struct Inner {
    config: ListenerConfig,
    opener: Arc<dyn GiftWrapOpener>,
    redeemer: Arc<dyn PaymentRedeemer>,
    factory: Arc<dyn TransportFactory>,
    on_success: SuccessCallback,
    on_error: ErrorCallback,
    state: AtomicU8,
    seen: SeenEvents,
    transport: Mutex<Option<Box<dyn RelayTransport>>>,
}

impl PaymentListener {
    pub fn new(
        config: ListenerConfig,
        opener: Arc<dyn GiftWrapOpener>,
        redeemer: Arc<dyn PaymentRedeemer>,
        factory: Arc<dyn TransportFactory>,
        on_success: SuccessCallback,
        on_error: ErrorCallback,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                opener,
                redeemer,
                factory,
                on_success,
                on_error,
                state: AtomicU8::new(ListenerState::Idle as u8),
                seen: SeenEvents::new(),
                transport: Mutex::new(None),
            }),
        }
    }

    /// Open subscriptions on all configured relays and begin listening.
    ///
    /// Idempotent: a no-op when already listening or stopped, and safe
    /// against concurrent calls; only one caller constructs the transport.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        let mut guard = inner.transport.lock().await;
        match inner.state_now() {
            ListenerState::Listening | ListenerState::Stopped => return Ok(()),
            ListenerState::Idle => {}
        }

        tracing::info!(
            recipient = %inner.config.recipient,
            amount = inner.config.expected_amount,
            relays = ?inner.config.relays,
            "starting payment listener"
        );

        // The listener counts as listening from the moment the subscription
        // starts opening: a relay may deliver the first event before
        // `subscribe` returns, and a redemption settling then must be able
        // to claim the terminal transition.
        if inner
            .state
            .compare_exchange(
                ListenerState::Idle as u8,
                ListenerState::Listening as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Ok(());
        }

        let sink: Arc<dyn EventSink> = Arc::new(ListenerSink {
            inner: Arc::downgrade(inner),
            runtime: Handle::current(),
        });
        let transport = match inner
            .factory
            .subscribe(
                &inner.config.relays,
                &inner.config.recipient,
                GIFT_WRAP_KIND,
                sink,
            )
            .await
        {
            Ok(transport) => transport,
            Err(err) => {
                // Roll back to idle unless stop() got there first.
                let _ = inner.state.compare_exchange(
                    ListenerState::Listening as u8,
                    ListenerState::Idle as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                return Err(err);
            }
        };

        // stop() or a winning redemption may have raced in while the
        // subscription was being opened; in that case the fresh transport
        // is released, not installed.
        if inner.is_stopped() {
            transport.shutdown().await;
            return Ok(());
        }
        *guard = Some(transport);
        Ok(())
    }

    /// Stop listening and tear down the transport. Idempotent; safe to call
    /// concurrently or from within a callback. The terminal flag is set
    /// before teardown so in-flight event handlers observe it.
    pub async fn stop(&self) {
        let prev = self
            .inner
            .state
            .swap(ListenerState::Stopped as u8, Ordering::AcqRel);
        if prev != ListenerState::Stopped as u8 {
            tracing::info!("stopping payment listener");
        }
        self.inner.release_transport().await;
    }

    /// Current life-cycle state.
    pub fn state(&self) -> ListenerState {
        self.inner.state_now()
    }

    /// Number of distinct envelope ids admitted so far.
    pub fn admitted_count(&self) -> usize {
        self.inner.seen.len()
    }
}

impl Inner {
    fn state_now(&self) -> ListenerState {
        ListenerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn is_stopped(&self) -> bool {
        self.state_now() == ListenerState::Stopped
    }

    async fn release_transport(&self) {
        let handle = {
            let mut guard = self.transport.lock().await;
            guard.take()
        };
        if let Some(transport) = handle {
            transport.shutdown().await;
        }
    }

    /// One unit of work per delivered envelope. Admission checks are cheap;
    /// only the redemption call can take real time, and it blocks nothing
    /// but this task.
    async fn process_event(self: Arc<Self>, relay_url: String, envelope: InboundEnvelope) {
        if self.is_stopped() {
            return;
        }
        // Subscriptions are already filtered to gift wraps; double-check.
        if envelope.kind != GIFT_WRAP_KIND {
            tracing::debug!(relay = %relay_url, kind = envelope.kind, "ignoring event of unexpected kind");
            return;
        }
        if envelope.id.is_empty() {
            tracing::warn!(relay = %relay_url, "gift wrap event without id; skipping");
            return;
        }
        if !self.seen.admit(&envelope.id) {
            tracing::debug!(relay = %relay_url, id = %envelope.id, "ignoring duplicate event");
            return;
        }
        tracing::debug!(relay = %relay_url, id = %envelope.id, "received gift wrap event");

        let payload = match self.opener.open(&envelope, self.config.secret_key()) {
            Ok(payload) => payload,
            Err(err) => {
                self.report_error(&ListenerError::Unwrap(err));
                return;
            }
        };
        if payload.content.is_empty() {
            tracing::warn!(id = %envelope.id, "unwrapped content is empty; skipping");
            return;
        }

        let context = PaymentContext::new(None, self.config.expected_amount);
        let outcome = self
            .redeemer
            .redeem(
                &payload.content,
                self.config.expected_amount,
                &self.config.allowed_mints,
                &context,
            )
            .await;

        match outcome {
            Ok(Some(token)) => self.finish(&envelope.id, token).await,
            Ok(None) => {
                tracing::warn!(id = %envelope.id, "redemption returned no token; ignoring");
            }
            Err(err) => self.report_error(&ListenerError::Redemption(err)),
        }
    }

    /// Single-winner completion: whichever redemption claims the
    /// `Listening -> Stopped` transition tears down the transport and fires
    /// the success callback; everyone else is suppressed.
    async fn finish(&self, envelope_id: &str, token: String) {
        if self
            .state
            .compare_exchange(
                ListenerState::Listening as u8,
                ListenerState::Stopped as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::debug!(id = %envelope_id, "redemption finished after listener stopped; suppressing");
            return;
        }
        tracing::info!(id = %envelope_id, token_len = token.len(), "redemption succeeded; stopping listener");
        self.release_transport().await;
        (self.on_success)(token);
    }

    fn report_error(&self, err: &ListenerError) {
        if self.is_stopped() {
            tracing::debug!(error = %err, "error after listener stopped; suppressing");
            return;
        }
        let message = match err {
            ListenerError::Unwrap(_) => "gift wrap unwrap failed",
            ListenerError::Redemption(RedeemError::Rejected { .. }) => {
                "payment payload redemption failed"
            }
            ListenerError::Redemption(RedeemError::Unexpected(_)) => {
                "unexpected error during payment redemption"
            }
            ListenerError::Transport { .. } => "relay transport error",
            ListenerError::Unexpected(_) => "unexpected error while handling delivery",
            _ => "payment listener error",
        };
        tracing::error!(error = %err, "{message}");
        (self.on_error)(message, err);
    }
}

/// Internal sink handed to the transport. Holds the listener weakly so a
/// detached transport can never keep a dropped listener alive, and spawns
/// one task per delivery so transports may call in from any thread.
struct ListenerSink {
    inner: Weak<Inner>,
    runtime: Handle,
}

impl EventSink for ListenerSink {
    fn on_event(&self, relay_url: &str, envelope: InboundEnvelope) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        if inner.is_stopped() {
            return;
        }
        let relay_url = relay_url.to_string();
        let task = self.runtime.spawn({
            let inner = Arc::clone(&inner);
            async move { inner.process_event(relay_url, envelope).await }
        });
        // A collaborator panic must surface through the error callback
        // instead of vanishing with the task.
        self.runtime.spawn(async move {
            if let Err(err) = task.await {
                if err.is_panic() {
                    inner.report_error(&ListenerError::Unexpected(panic_reason(
                        err.into_panic(),
                    )));
                }
            }
        });
    }

    fn on_error(&self, relay_url: &str, message: &str) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        inner.report_error(&ListenerError::transport(relay_url, message));
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "event handler panicked".to_string())
}

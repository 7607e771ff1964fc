//! Redemption seam.
//!
//! Bridges the asynchronous settlement collaborator into one call per
//! admitted envelope. The outcome is a three-way union, carried structurally
//! instead of being tunneled through a generic error and re-cased later:
//!
//! - `Ok(Some(token))`: redemption succeeded. The token may legitimately be
//!   empty (a same-channel settlement with nothing further to hand the
//!   caller); success is "the call returned", not "the string is non-empty".
//! - `Ok(None)`: the collaborator had nothing to redeem. Dropped silently.
//! - `Err(RedeemError)`: a classified failure, reported to the caller
//!   without stopping the listener.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Correlates a redemption attempt to the expected amount.
///
/// This delivery channel carries no explicit transaction id, so
/// `payment_id` is `None` here; callers correlate via channel metadata if
/// they need to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub expected_amount: u64,
}

impl PaymentContext {
    pub fn new(payment_id: Option<String>, expected_amount: u64) -> Self {
        Self {
            payment_id,
            expected_amount,
        }
    }
}

/// Classified redemption failure.
#[derive(thiserror::Error, Debug)]
pub enum RedeemError {
    /// The settlement engine rejected the payload (bad token, wrong amount,
    /// disallowed mint, already spent, ...).
    #[error("payment payload redemption failed: {reason}")]
    Rejected {
        reason: String,
        /// Mint the payload pointed at, when the collaborator knows it.
        mint: Option<String>,
    },

    /// Anything else that surfaced during the attempt (I/O, panic-adjacent
    /// runtime failures inside the collaborator).
    #[error("unexpected error during payment redemption: {0}")]
    Unexpected(String),
}

impl RedeemError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
            mint: None,
        }
    }

    pub fn rejected_at_mint(reason: impl Into<String>, mint: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
            mint: Some(mint.into()),
        }
    }

    pub fn unexpected(reason: impl Into<String>) -> Self {
        Self::Unexpected(reason.into())
    }

    /// True for failures the settlement engine itself classified, as opposed
    /// to incidental runtime failures.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Collaborator that presents a payment-request payload to the settlement
/// engine. May perform network I/O and take non-trivial time; each admitted
/// envelope gets its own call on its own task, so a slow redemption never
/// delays other envelopes.
#[async_trait]
pub trait PaymentRedeemer: Send + Sync {
    async fn redeem(
        &self,
        payload_json: &str,
        expected_amount: u64,
        allowed_mints: &[String],
        context: &PaymentContext,
    ) -> std::result::Result<Option<String>, RedeemError>;
}

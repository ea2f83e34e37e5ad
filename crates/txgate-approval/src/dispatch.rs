//! Decision dispatch to the signing/submission collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use txgate_core::{RequestId, SigningHandle};

/// The final verdict on a pending-transaction request.
///
/// Constructed exactly once per request lifecycle by the session state
/// machine and handed to the [`SubmissionDispatcher`]; never constructed
/// twice for the same request id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the user approved the transaction.
    pub approved: bool,
    /// The request this decision resolves.
    #[serde(rename = "txRequestID")]
    pub request_id: RequestId,
    /// Signing capability, borrowed purely for routing.
    pub signer: SigningHandle,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.approved { "approve" } else { "reject" };
        write!(f, "{} -> {verdict}", self.request_id)
    }
}

/// Failure of the signing/submission call itself.
///
/// Reported to the user but does not corrupt session state; the session
/// still resolves, and any retry is a fresh user-initiated request.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("dispatch failed: {reason}")]
pub struct DispatchError {
    /// What went wrong.
    pub reason: String,
}

impl DispatchError {
    /// Create a dispatch error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// External collaborator that signs and submits (or discards) a transaction
/// according to a [`Decision`].
///
/// The authoritative outcome of the transaction is owned by this service;
/// the approval workflow only routes the verdict.
#[async_trait]
pub trait SubmissionDispatcher: Send + Sync {
    /// Perform signing/submission for a decision.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the call itself fails. The caller
    /// surfaces the failure but treats the request as handled either way.
    async fn dispatch(&self, decision: Decision) -> Result<(), DispatchError>;
}

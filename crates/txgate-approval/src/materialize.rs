//! Transaction materialization.
//!
//! The [`TransactionMaterializer`] decodes raw pending-transaction bytes into
//! a structured, sender-resolved [`MaterializedTransaction`]. It is pure and
//! synchronous, and memoizes on `(payload, sender)` so repeated calls during
//! a session return the *same* `Arc` — downstream analysis is expensive and
//! keyed on that identity.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use txgate_core::Address;

use crate::error::{ApprovalError, ApprovalResult};
use crate::request::TxPayload;

/// The structured transaction decoded from a request payload.
///
/// The envelope is a JSON object with camelCase fields; everything except
/// the shape itself is opaque to this workflow and only carried through for
/// presentation and simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    /// Sender account, if the payload already names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    /// Recipient account, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Address>,
    /// Transfer amount in base units.
    #[serde(default)]
    pub amount: u64,
    /// Gas budget proposed by the application, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_budget: Option<u64>,
}

/// A decoded transaction with its sender resolved, exclusively owned by the
/// approval session.
///
/// Shared as `Arc<MaterializedTransaction>`; identity (`Arc::ptr_eq`) is the
/// memo key for analysis, so it must not change spuriously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedTransaction {
    /// The decoded transaction, sender assigned if it was absent.
    pub tx: UnsignedTransaction,
}

impl MaterializedTransaction {
    /// The resolved sender, if any.
    #[must_use]
    pub fn sender(&self) -> Option<&Address> {
        self.tx.sender.as_ref()
    }
}

struct Memo {
    payload: TxPayload,
    sender: Option<Address>,
    tx: Arc<MaterializedTransaction>,
}

/// Decodes payloads into [`MaterializedTransaction`]s, memoized on
/// `(payload, sender)`.
///
/// One materializer lives per approval session, so a single-entry memo is
/// enough: the inputs only ever step forward when the payload or candidate
/// sender changes.
#[derive(Default)]
pub struct TransactionMaterializer {
    memo: Mutex<Option<Memo>>,
}

impl TransactionMaterializer {
    /// Create a materializer with an empty memo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `payload` and resolve its sender.
    ///
    /// If `sender` is given and the decoded transaction has no sender set,
    /// the sender is assigned; an already-set sender is never overwritten.
    /// Identical inputs return the identical `Arc`.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::MalformedPayload`] if the bytes cannot be decoded.
    /// This is fatal for the request and must not be retried.
    pub fn materialize(
        &self,
        payload: &TxPayload,
        sender: Option<&Address>,
    ) -> ApprovalResult<Arc<MaterializedTransaction>> {
        let mut memo = match self.memo.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(entry) = memo.as_ref()
            && entry.payload == *payload
            && entry.sender.as_ref() == sender
        {
            return Ok(Arc::clone(&entry.tx));
        }

        let mut tx: UnsignedTransaction = serde_json::from_slice(payload.as_bytes())
            .map_err(|e| ApprovalError::MalformedPayload {
                reason: e.to_string(),
            })?;

        if tx.sender.is_none() {
            tx.sender = sender.cloned();
        }

        let materialized = Arc::new(MaterializedTransaction { tx });
        *memo = Some(Memo {
            payload: payload.clone(),
            sender: sender.cloned(),
            tx: Arc::clone(&materialized),
        });
        Ok(materialized)
    }
}

impl std::fmt::Debug for TransactionMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionMaterializer")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> TxPayload {
        TxPayload::new(json.as_bytes().to_vec())
    }

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn test_assigns_sender_when_absent() {
        let materializer = TransactionMaterializer::new();
        let tx = materializer
            .materialize(&payload(r#"{"amount": 5}"#), Some(&addr("0xa1")))
            .unwrap();
        assert_eq!(tx.sender(), Some(&addr("0xa1")));
        assert_eq!(tx.tx.amount, 5);
    }

    #[test]
    fn test_never_overwrites_existing_sender() {
        let materializer = TransactionMaterializer::new();
        let tx = materializer
            .materialize(&payload(r#"{"sender": "0xb2"}"#), Some(&addr("0xa1")))
            .unwrap();
        assert_eq!(tx.sender(), Some(&addr("0xb2")));
    }

    #[test]
    fn test_identical_inputs_return_same_arc() {
        let materializer = TransactionMaterializer::new();
        let p = payload(r#"{"amount": 1}"#);
        let first = materializer.materialize(&p, Some(&addr("0xa1"))).unwrap();
        let second = materializer.materialize(&p, Some(&addr("0xa1"))).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_changed_sender_recomputes() {
        let materializer = TransactionMaterializer::new();
        let p = payload(r#"{"amount": 1}"#);
        let first = materializer.materialize(&p, Some(&addr("0xa1"))).unwrap();
        let second = materializer.materialize(&p, Some(&addr("0xb2"))).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.sender(), Some(&addr("0xb2")));
    }

    #[test]
    fn test_changed_payload_recomputes() {
        let materializer = TransactionMaterializer::new();
        let first = materializer
            .materialize(&payload(r#"{"amount": 1}"#), None)
            .unwrap();
        let second = materializer
            .materialize(&payload(r#"{"amount": 2}"#), None)
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.tx.amount, 2);
    }

    #[test]
    fn test_malformed_payload_is_fatal() {
        let materializer = TransactionMaterializer::new();
        let result = materializer.materialize(&payload("not json"), None);
        assert!(matches!(
            result,
            Err(ApprovalError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_invalid_sender_address_is_fatal() {
        let materializer = TransactionMaterializer::new();
        let result = materializer.materialize(&payload(r#"{"sender": "garbage"}"#), None);
        assert!(matches!(
            result,
            Err(ApprovalError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_no_sender_anywhere() {
        let materializer = TransactionMaterializer::new();
        let tx = materializer.materialize(&payload("{}"), None).unwrap();
        assert!(tx.sender().is_none());
    }
}

//! Pending-transaction approval requests.
//!
//! A [`TransactionApprovalRequest`] is the immutable record of a transaction
//! proposed by an external application. It is created when the proposal
//! arrives and removed from the caller's pending queue once a decision has
//! been dispatched and acknowledged; this crate never persists it.

use serde::{Deserialize, Serialize};
use std::fmt;
use txgate_core::{Address, RequestId, Timestamp};

/// Raw, undecoded transaction bytes as supplied by the requesting
/// application.
///
/// Opaque until handed to the
/// [`TransactionMaterializer`](crate::materialize::TransactionMaterializer).
/// On the wire the bytes travel hex-encoded.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxPayload(#[serde(with = "hex::serde")] pub Vec<u8>);

impl TxPayload {
    /// Wrap raw payload bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TxPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads can be large; log the size, not the bytes.
        write!(f, "TxPayload({} bytes)", self.0.len())
    }
}

/// A pending transaction proposed by an external application, awaiting user
/// disposition.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionApprovalRequest {
    /// Unique request identifier, minted by the requesting application.
    pub id: RequestId,
    /// Origin of the requesting application (e.g. a dapp URL).
    pub origin: String,
    /// Reference to the origin's icon, if one was supplied.
    pub origin_icon: Option<String>,
    /// The raw transaction payload.
    pub payload: TxPayload,
    /// The account the application proposed as sender, if any.
    pub account: Option<Address>,
    /// When the request was received.
    pub created_at: Timestamp,
}

impl TransactionApprovalRequest {
    /// Create a new approval request.
    #[must_use]
    pub fn new(id: impl Into<RequestId>, origin: impl Into<String>, payload: TxPayload) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
            origin_icon: None,
            payload,
            account: None,
            created_at: Timestamp::now(),
        }
    }

    /// Attach an origin icon reference.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.origin_icon = Some(icon.into());
        self
    }

    /// Associate an account address.
    #[must_use]
    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }
}

impl fmt::Display for TransactionApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.id, self.origin)
    }
}

/// Wire form of an inbound pending-transaction request.
///
/// `{id, origin, originIcon?, tx: {account?, data}}` with camelCase field
/// names and hex-encoded transaction bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundTxRequest {
    /// Request id.
    pub id: String,
    /// Requesting application origin.
    pub origin: String,
    /// Optional icon reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_icon: Option<String>,
    /// The proposed transaction.
    pub tx: InboundTxBody,
}

/// The transaction portion of an inbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundTxBody {
    /// Proposed sender account, if the application named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Address>,
    /// Raw transaction bytes, hex-encoded on the wire.
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

impl From<InboundTxRequest> for TransactionApprovalRequest {
    fn from(inbound: InboundTxRequest) -> Self {
        let mut request = Self::new(
            RequestId::new(inbound.id),
            inbound.origin,
            TxPayload::new(inbound.tx.data),
        );
        request.origin_icon = inbound.origin_icon;
        request.account = inbound.tx.account;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = TransactionApprovalRequest::new(
            "r1",
            "https://dapp.example",
            TxPayload::new(b"{}".to_vec()),
        )
        .with_icon("icon.png")
        .with_account(Address::parse("0xa1").unwrap());

        assert_eq!(request.id.as_str(), "r1");
        assert_eq!(request.origin_icon.as_deref(), Some("icon.png"));
        assert!(request.account.is_some());
        assert!(!request.created_at.is_future());
    }

    #[test]
    fn test_payload_debug_hides_bytes() {
        let payload = TxPayload::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(format!("{payload:?}"), "TxPayload(4 bytes)");
    }

    #[test]
    fn test_inbound_wire_format() {
        let json = r#"{
            "id": "r1",
            "origin": "https://dapp.example",
            "originIcon": "icon.png",
            "tx": { "account": "0xa1", "data": "deadbeef" }
        }"#;
        let inbound: InboundTxRequest = serde_json::from_str(json).unwrap();
        let request = TransactionApprovalRequest::from(inbound);

        assert_eq!(request.id.as_str(), "r1");
        assert_eq!(request.account.as_ref().map(Address::as_str), Some("0xa1"));
        assert_eq!(request.payload.as_bytes(), [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_inbound_optional_fields_absent() {
        let json = r#"{ "id": "r2", "origin": "https://dapp.example", "tx": { "data": "00" } }"#;
        let inbound: InboundTxRequest = serde_json::from_str(json).unwrap();
        let request = TransactionApprovalRequest::from(inbound);

        assert!(request.origin_icon.is_none());
        assert!(request.account.is_none());
    }

    #[test]
    fn test_request_display() {
        let request =
            TransactionApprovalRequest::new("r1", "https://dapp.example", TxPayload::new(vec![]));
        assert_eq!(request.to_string(), "txreq:r1 from https://dapp.example");
    }
}

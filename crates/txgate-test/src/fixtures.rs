//! Fixture builders for approval-workflow tests.

use txgate_approval::analysis::SimulationReport;
use txgate_approval::request::{TransactionApprovalRequest, TxPayload};
use txgate_core::{Address, SigningHandle};

/// A clean simulation report: the transaction would succeed.
#[must_use]
pub fn ok_report() -> SimulationReport {
    SimulationReport {
        would_succeed: true,
        gas_used: 1_000,
        gas_budget: 10_000,
        failure_reason: None,
    }
}

/// A report saying the transaction would fail on-chain.
#[must_use]
pub fn failing_report(reason: impl Into<String>) -> SimulationReport {
    SimulationReport {
        would_succeed: false,
        gas_used: 1_000,
        gas_budget: 10_000,
        failure_reason: Some(reason.into()),
    }
}

/// A minimal well-formed transaction payload.
#[must_use]
pub fn valid_payload() -> TxPayload {
    TxPayload::new(br#"{"recipient": "0xb2", "amount": 42}"#.to_vec())
}

/// A test address.
///
/// # Panics
///
/// Panics if `hex` is not a valid `0x`-prefixed address.
#[must_use]
pub fn test_address(hex: &str) -> Address {
    match Address::parse(hex) {
        Ok(address) => address,
        Err(e) => panic!("bad test address {hex}: {e}"),
    }
}

/// A signing handle for `0xa1`.
#[must_use]
pub fn test_signer() -> SigningHandle {
    SigningHandle::for_account(test_address("0xa1"))
}

/// A pending-transaction request with a valid payload and account `0xa1`.
#[must_use]
pub fn test_request(id: &str) -> TransactionApprovalRequest {
    TransactionApprovalRequest::new(id, "https://dapp.example", valid_payload())
        .with_icon("https://dapp.example/favicon.ico")
        .with_account(test_address("0xa1"))
}

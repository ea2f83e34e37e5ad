//! Txgate Approval - the approval workflow for pending blockchain
//! transactions.
//!
//! An external application proposes a transaction to a user-held signing
//! key. This crate accepts the opaque pending-transaction request, derives
//! the concrete transaction and its cost by simulation, presents the result
//! to a human decision-maker, and routes the approve/reject decision to a
//! signing collaborator — intercepting the case where simulation says the
//! transaction will likely fail on-chain behind a second, explicit
//! confirmation.
//!
//! # Components
//!
//! - [`TransactionMaterializer`]: raw bytes → sender-resolved transaction,
//!   memoized on input identity.
//! - [`TransactionAnalyzer`]: drives the black-box [`Simulator`] and
//!   delivers generation-tagged, cancellation-safe results.
//! - [`ApprovalSession`]: the state machine merging analysis state with
//!   user decisions; produces at most one [`Decision`] per request.
//! - [`SessionRunner`] / [`SessionHandle`]: the event loop around the
//!   machine and the surface handed to UI collaborators.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use txgate_approval::{SessionConfig, SessionRunner};
//!
//! let (runner, handle) = SessionRunner::new(
//!     request, signer, simulator, dispatcher, prompt, SessionConfig::new(),
//! )?;
//! tokio::spawn(runner.run());
//!
//! // UI side: observe snapshots, send decisions.
//! let snapshot = handle.snapshot();
//! if !snapshot.controls_disabled {
//!     handle.approve().await?;
//! }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod analysis;
pub mod config;
pub mod dispatch;
/// Error types and results for the approval workflow.
pub mod error;
pub mod materialize;
pub mod request;
pub mod runner;
pub mod session;
pub mod surface;

pub use analysis::{
    AnalysisData, AnalysisFailure, AnalysisResult, AnalysisUpdate, SimulationReport, Simulator,
    SimulatorError, TransactionAnalyzer,
};
pub use config::SessionConfig;
pub use dispatch::{Decision, DispatchError, SubmissionDispatcher};
pub use error::{ApprovalError, ApprovalResult};
pub use materialize::{MaterializedTransaction, TransactionMaterializer, UnsignedTransaction};
pub use request::{InboundTxRequest, TransactionApprovalRequest, TxPayload};
pub use runner::{SessionCommand, SessionHandle, SessionRunner};
pub use session::{ApprovalSession, Effect, SessionEvent, SessionState, UserAction};
pub use surface::{ConfirmationPrompt, RiskAcknowledgement, SessionSnapshot};

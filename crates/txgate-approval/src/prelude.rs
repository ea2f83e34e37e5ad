//! Prelude module - commonly used types for convenient import.
//!
//! Use `use txgate_approval::prelude::*;` to import the workflow surface.

// Errors
pub use crate::{ApprovalError, ApprovalResult};

// Requests and payloads
pub use crate::{TransactionApprovalRequest, TxPayload};

// Materialization
pub use crate::{MaterializedTransaction, TransactionMaterializer};

// Analysis
pub use crate::{AnalysisFailure, AnalysisResult, SimulationReport, Simulator};

// The state machine
pub use crate::{ApprovalSession, SessionEvent, SessionState, UserAction};

// Dispatch
pub use crate::{Decision, SubmissionDispatcher};

// Driver and UI contracts
pub use crate::{
    ConfirmationPrompt, RiskAcknowledgement, SessionConfig, SessionHandle, SessionRunner,
    SessionSnapshot,
};

//! Contracts for the UI collaborators.
//!
//! Rendering and layout live outside this crate. The UI consumes
//! [`SessionSnapshot`]s published by the runner and sends commands back
//! through the [`SessionHandle`](crate::runner::SessionHandle) (the primary
//! approval surface). The one UI interaction the workflow itself initiates
//! is the risk warning, modeled by [`ConfirmationPrompt`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisFailure, AnalysisResult};
use crate::request::TransactionApprovalRequest;
use crate::session::SessionState;

/// Read-only view of session state for thin UI consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current state-machine state.
    pub state: SessionState,
    /// Current analysis result.
    pub analysis: AnalysisResult,
    /// Whether the risk confirmation is showing.
    pub confirmation_visible: bool,
    /// Whether the primary approve/reject controls must be disabled.
    /// The surface must not allow invoking approve while this is true.
    pub controls_disabled: bool,
    /// Human-visible dispatch failure, if the signing call errored.
    pub dispatch_error: Option<String>,
}

/// The user's answer to the risk warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskAcknowledgement {
    /// The user accepts the risk; submission resumes with approval.
    Accepted,
    /// The user declines; the session aborts without dispatch.
    Declined,
}

/// The secondary confirmation gate shown when simulation indicates the
/// transaction will likely fail on-chain.
///
/// Fixed semantics: the prompt presents the risk warning; the affirmative
/// action resumes submission with `approved=true`, the negative action
/// aborts without any dispatch.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    /// Show the warning for `request` and wait for the user's answer.
    async fn confirm_risk(
        &self,
        request: &TransactionApprovalRequest,
        failure: &AnalysisFailure,
    ) -> RiskAcknowledgement;
}

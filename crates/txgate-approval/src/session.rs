//! The approval session state machine.
//!
//! [`ApprovalSession`] is the core of the workflow: it merges the analyzer's
//! tri-state result with user decision events and produces at most one
//! outbound [`Decision`] per request. Every transition is synchronous and
//! runs to completion, which is what makes the invariants (at-most-once
//! dispatch, no decisions while analysis is pending) enforceable without
//! locks — the async world only feeds it events and executes its effects.
//!
//! # Transition summary
//!
//! - `Idle` → `AwaitingAnalysis` on session start.
//! - `AwaitingAnalysis` → `ReadyToDecide` when analysis resolves (cleanly or
//!   failed); approve/reject events arriving earlier are dropped.
//! - `ReadyToDecide` + approve: dispatch when analysis is `Ready`; show the
//!   risk confirmation when it is `Failed`.
//! - `ReadyToDecide` + reject: dispatch `approved=false` immediately —
//!   rejection never needs confirming.
//! - `ConfirmationPending` + confirm: dispatch the preserved approval.
//! - `ConfirmationPending` + decline: resolve with no dispatch at all; the
//!   request stays pending for a later attempt.
//! - `Submitting` → `Resolved` once the dispatcher call completes, whether
//!   or not the call itself succeeded.

use tracing::{debug, trace, warn};
use txgate_core::SigningHandle;

use crate::analysis::{AnalysisData, AnalysisFailure, AnalysisResult};
use crate::dispatch::{Decision, DispatchError};
use crate::error::{ApprovalError, ApprovalResult};
use crate::request::TransactionApprovalRequest;
use crate::surface::SessionSnapshot;

/// The states of an approval session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Session created, analysis not yet started.
    Idle,
    /// Analysis outstanding; decision events are dropped.
    AwaitingAnalysis,
    /// Analysis resolved; the user may decide.
    ReadyToDecide,
    /// Analysis failed and the user approved; awaiting the second, explicit
    /// risk confirmation.
    ConfirmationPending,
    /// A decision is being dispatched to the signing collaborator.
    Submitting,
    /// Terminal. Entered at most once per request.
    Resolved,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingAnalysis => "awaiting_analysis",
            Self::ReadyToDecide => "ready_to_decide",
            Self::ConfirmationPending => "confirmation_pending",
            Self::Submitting => "submitting",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decision-related action taken by the human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Approve the transaction.
    Approve,
    /// Reject the transaction.
    Reject,
    /// Accept the risk warning and resume the preserved approval.
    ConfirmRisk,
    /// Decline the risk warning; abort without dispatch.
    DeclineRisk,
}

/// An event consumed by the state machine.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Analysis has begun for the session's transaction.
    AnalysisStarted,
    /// The current-generation analysis completed.
    AnalysisOutcome(Result<AnalysisData, AnalysisFailure>),
    /// The analysis inputs changed; any resolved result is stale.
    AnalysisReset,
    /// The user acted.
    User(UserAction),
    /// The dispatcher call finished.
    DispatchCompleted(Result<(), DispatchError>),
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::AnalysisStarted => "analysis_started",
            Self::AnalysisOutcome(_) => "analysis_outcome",
            Self::AnalysisReset => "analysis_reset",
            Self::User(UserAction::Approve) => "approve",
            Self::User(UserAction::Reject) => "reject",
            Self::User(UserAction::ConfirmRisk) => "confirm_risk",
            Self::User(UserAction::DeclineRisk) => "decline_risk",
            Self::DispatchCompleted(_) => "dispatch_completed",
        }
    }
}

/// An observable side effect requested by a transition.
///
/// Effects are executed by the driver ([`SessionRunner`]) outside the
/// synchronous transition, then fed back as events.
///
/// [`SessionRunner`]: crate::runner::SessionRunner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Hand the decision to the submission dispatcher.
    Dispatch(Decision),
}

/// The approval state machine for one pending-transaction request.
#[derive(Debug)]
pub struct ApprovalSession {
    request: TransactionApprovalRequest,
    signer: SigningHandle,
    state: SessionState,
    analysis: AnalysisResult,
    confirmation_visible: bool,
    dispatched: bool,
    dispatch_error: Option<String>,
    closed: bool,
}

impl ApprovalSession {
    /// Create a session for a request, borrowing the signing handle that
    /// will be forwarded with the eventual decision.
    #[must_use]
    pub fn new(request: TransactionApprovalRequest, signer: SigningHandle) -> Self {
        Self {
            request,
            signer,
            state: SessionState::Idle,
            analysis: AnalysisResult::Pending,
            confirmation_visible: false,
            dispatched: false,
            dispatch_error: None,
            closed: false,
        }
    }

    /// Apply one event, returning the effect (if any) the driver must
    /// execute.
    ///
    /// Events the current state cannot act on are dropped silently — that
    /// is load-bearing: approve/reject while analysis is pending, repeated
    /// clicks while submitting, and anything after resolution must all be
    /// no-ops.
    ///
    /// # Errors
    ///
    /// - [`ApprovalError::SessionClosed`] after [`close`](Self::close).
    /// - [`ApprovalError::AlreadyDispatched`] if a transition would
    ///   construct a second decision (programming error).
    /// - [`ApprovalError::InvalidTransition`] for events that can never
    ///   legally reach the current state, e.g. a dispatch completion while
    ///   not submitting.
    pub fn apply(&mut self, event: SessionEvent) -> ApprovalResult<Option<Effect>> {
        if self.closed {
            return Err(ApprovalError::SessionClosed);
        }

        let event_name = event.name();
        match (self.state, event) {
            (SessionState::Idle, SessionEvent::AnalysisStarted) => {
                self.analysis = AnalysisResult::Pending;
                self.transition(SessionState::AwaitingAnalysis);
                Ok(None)
            }

            (SessionState::AwaitingAnalysis, SessionEvent::AnalysisOutcome(outcome)) => {
                self.analysis = match outcome {
                    Ok(data) => AnalysisResult::Ready(data),
                    Err(failure) => AnalysisResult::Failed(failure),
                };
                self.transition(SessionState::ReadyToDecide);
                Ok(None)
            }

            // A reset while deciding (or even mid-confirmation) throws away
            // the resolved result and hides the warning; the decision
            // context it was based on no longer exists.
            (
                SessionState::AwaitingAnalysis
                | SessionState::ReadyToDecide
                | SessionState::ConfirmationPending,
                SessionEvent::AnalysisReset,
            ) => {
                self.analysis = AnalysisResult::Pending;
                self.confirmation_visible = false;
                self.transition(SessionState::AwaitingAnalysis);
                Ok(None)
            }

            (SessionState::ReadyToDecide, SessionEvent::User(UserAction::Approve)) => {
                match &self.analysis {
                    AnalysisResult::Ready(_) => self.begin_dispatch(true),
                    AnalysisResult::Failed(_) => {
                        self.confirmation_visible = true;
                        self.transition(SessionState::ConfirmationPending);
                        Ok(None)
                    }
                    AnalysisResult::Pending => {
                        // ReadyToDecide implies a resolved analysis; treat a
                        // pending one as a dropped event rather than a panic.
                        warn!(state = %self.state, "approve with pending analysis dropped");
                        Ok(None)
                    }
                }
            }

            (SessionState::ReadyToDecide, SessionEvent::User(UserAction::Reject)) => {
                // Rejection never needs confirming, even on failed analysis.
                self.begin_dispatch(false)
            }

            (SessionState::ConfirmationPending, SessionEvent::User(UserAction::ConfirmRisk)) => {
                self.confirmation_visible = false;
                self.begin_dispatch(true)
            }

            (SessionState::ConfirmationPending, SessionEvent::User(UserAction::DeclineRisk)) => {
                self.confirmation_visible = false;
                self.transition(SessionState::Resolved);
                debug!(request = %self.request.id, "risk warning declined, no decision dispatched");
                Ok(None)
            }

            (SessionState::Submitting, SessionEvent::DispatchCompleted(result)) => {
                if let Err(e) = result {
                    warn!(request = %self.request.id, error = %e, "decision dispatch failed");
                    self.dispatch_error = Some(e.reason);
                }
                self.transition(SessionState::Resolved);
                Ok(None)
            }

            (_, SessionEvent::DispatchCompleted(_)) => Err(ApprovalError::InvalidTransition {
                state: self.state.name(),
                event: event_name,
            }),

            (_, SessionEvent::AnalysisStarted) => Err(ApprovalError::InvalidTransition {
                state: self.state.name(),
                event: event_name,
            }),

            // Everything else is a dropped event: user input while pending
            // or submitting, confirmation answers with no prompt showing,
            // stale analysis noise after resolution.
            (state, _) => {
                trace!(state = %state, event = event_name, "event dropped");
                Ok(None)
            }
        }
    }

    fn begin_dispatch(&mut self, approved: bool) -> ApprovalResult<Option<Effect>> {
        if self.dispatched {
            return Err(ApprovalError::AlreadyDispatched {
                request_id: self.request.id.clone(),
            });
        }
        self.dispatched = true;
        self.transition(SessionState::Submitting);
        Ok(Some(Effect::Dispatch(Decision {
            approved,
            request_id: self.request.id.clone(),
            signer: self.signer.clone(),
        })))
    }

    fn transition(&mut self, next: SessionState) {
        debug!(request = %self.request.id, from = %self.state, to = %next, "session transition");
        self.state = next;
    }

    /// Tear the session down. Outstanding analyzer/dispatch results are to
    /// be discarded by the driver; every further `apply` fails and no
    /// decision can be dispatched.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current analysis result, read-only.
    #[must_use]
    pub fn analysis(&self) -> &AnalysisResult {
        &self.analysis
    }

    /// Whether the risk confirmation is currently shown.
    #[must_use]
    pub fn confirmation_visible(&self) -> bool {
        self.confirmation_visible
    }

    /// Whether a decision was dispatched during this session.
    #[must_use]
    pub fn dispatched(&self) -> bool {
        self.dispatched
    }

    /// Whether the session reached its terminal state.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state == SessionState::Resolved
    }

    /// The request this session decides.
    #[must_use]
    pub fn request(&self) -> &TransactionApprovalRequest {
        &self.request
    }

    /// The derived "controls disabled" signal for the primary approval
    /// surface: the UI must not allow invoking approve while this is true.
    #[must_use]
    pub fn controls_disabled(&self) -> bool {
        matches!(
            self.state,
            SessionState::AwaitingAnalysis | SessionState::Submitting
        ) || self.confirmation_visible
    }

    /// Snapshot of observable session state for UI consumers.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            analysis: self.analysis.clone(),
            confirmation_visible: self.confirmation_visible,
            controls_disabled: self.controls_disabled(),
            dispatch_error: self.dispatch_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::TxPayload;
    use txgate_core::{Address, RequestId};

    fn session() -> ApprovalSession {
        let request = TransactionApprovalRequest::new(
            "r1",
            "https://dapp.example",
            TxPayload::new(b"{}".to_vec()),
        );
        let signer = SigningHandle::for_account(Address::parse("0xa1").unwrap());
        ApprovalSession::new(request, signer)
    }

    fn data() -> AnalysisData {
        AnalysisData {
            gas_used: 100,
            gas_budget: 1_000,
        }
    }

    fn failure() -> AnalysisFailure {
        AnalysisFailure::Simulation {
            reason: "would fail".to_string(),
        }
    }

    fn start(s: &mut ApprovalSession) {
        assert!(s.apply(SessionEvent::AnalysisStarted).unwrap().is_none());
        assert_eq!(s.state(), SessionState::AwaitingAnalysis);
    }

    fn resolve_ready(s: &mut ApprovalSession) {
        start(s);
        s.apply(SessionEvent::AnalysisOutcome(Ok(data()))).unwrap();
        assert_eq!(s.state(), SessionState::ReadyToDecide);
    }

    fn resolve_failed(s: &mut ApprovalSession) {
        start(s);
        s.apply(SessionEvent::AnalysisOutcome(Err(failure())))
            .unwrap();
        assert_eq!(s.state(), SessionState::ReadyToDecide);
        assert!(s.analysis().is_failed());
    }

    // -----------------------------------------------------------------------
    // Decisions while analysis is pending
    // -----------------------------------------------------------------------

    #[test]
    fn test_decisions_dropped_while_pending() {
        let mut s = session();
        start(&mut s);

        assert!(
            s.apply(SessionEvent::User(UserAction::Approve))
                .unwrap()
                .is_none()
        );
        assert!(
            s.apply(SessionEvent::User(UserAction::Reject))
                .unwrap()
                .is_none()
        );
        assert_eq!(s.state(), SessionState::AwaitingAnalysis);
        assert!(!s.dispatched());
        assert!(s.controls_disabled());
    }

    // -----------------------------------------------------------------------
    // Clean analysis: either decision dispatches immediately
    // -----------------------------------------------------------------------

    #[test]
    fn test_approve_after_clean_analysis_dispatches() {
        let mut s = session();
        resolve_ready(&mut s);
        assert!(!s.controls_disabled());

        let effect = s.apply(SessionEvent::User(UserAction::Approve)).unwrap();
        let Some(Effect::Dispatch(decision)) = effect else {
            panic!("expected dispatch effect");
        };
        assert!(decision.approved);
        assert_eq!(decision.request_id, RequestId::new("r1"));
        assert_eq!(decision.signer.account().as_str(), "0xa1");
        assert_eq!(s.state(), SessionState::Submitting);
        assert!(s.controls_disabled());
    }

    #[test]
    fn test_reject_after_clean_analysis_dispatches() {
        let mut s = session();
        resolve_ready(&mut s);

        let effect = s.apply(SessionEvent::User(UserAction::Reject)).unwrap();
        let Some(Effect::Dispatch(decision)) = effect else {
            panic!("expected dispatch effect");
        };
        assert!(!decision.approved);
    }

    // -----------------------------------------------------------------------
    // Failed analysis: the confirmation gate
    // -----------------------------------------------------------------------

    #[test]
    fn test_approve_after_failed_analysis_requires_confirmation() {
        let mut s = session();
        resolve_failed(&mut s);

        let effect = s.apply(SessionEvent::User(UserAction::Approve)).unwrap();
        assert!(effect.is_none(), "no dispatch before confirmation");
        assert_eq!(s.state(), SessionState::ConfirmationPending);
        assert!(s.confirmation_visible());
        assert!(s.controls_disabled());
    }

    #[test]
    fn test_confirm_risk_dispatches_preserved_approval() {
        let mut s = session();
        resolve_failed(&mut s);
        s.apply(SessionEvent::User(UserAction::Approve)).unwrap();

        let effect = s
            .apply(SessionEvent::User(UserAction::ConfirmRisk))
            .unwrap();
        let Some(Effect::Dispatch(decision)) = effect else {
            panic!("expected dispatch effect");
        };
        assert!(decision.approved);
        assert!(!s.confirmation_visible());
        assert_eq!(s.state(), SessionState::Submitting);
    }

    #[test]
    fn test_decline_risk_resolves_without_dispatch() {
        let mut s = session();
        resolve_failed(&mut s);
        s.apply(SessionEvent::User(UserAction::Approve)).unwrap();

        let effect = s
            .apply(SessionEvent::User(UserAction::DeclineRisk))
            .unwrap();
        assert!(effect.is_none());
        assert!(s.is_resolved());
        assert!(!s.dispatched());
        // Controls come back for a further attempt.
        assert!(!s.controls_disabled());
    }

    #[test]
    fn test_reject_after_failed_analysis_skips_confirmation() {
        let mut s = session();
        resolve_failed(&mut s);

        let effect = s.apply(SessionEvent::User(UserAction::Reject)).unwrap();
        let Some(Effect::Dispatch(decision)) = effect else {
            panic!("expected dispatch effect");
        };
        assert!(!decision.approved);
        assert!(!s.confirmation_visible());
    }

    #[test]
    fn test_decisions_dropped_while_confirmation_visible() {
        let mut s = session();
        resolve_failed(&mut s);
        s.apply(SessionEvent::User(UserAction::Approve)).unwrap();

        assert!(
            s.apply(SessionEvent::User(UserAction::Approve))
                .unwrap()
                .is_none()
        );
        assert!(
            s.apply(SessionEvent::User(UserAction::Reject))
                .unwrap()
                .is_none()
        );
        assert_eq!(s.state(), SessionState::ConfirmationPending);
    }

    // -----------------------------------------------------------------------
    // At-most-once dispatch
    // -----------------------------------------------------------------------

    #[test]
    fn test_rapid_repeated_input_dispatches_once() {
        let mut s = session();
        resolve_ready(&mut s);

        let first = s.apply(SessionEvent::User(UserAction::Approve)).unwrap();
        assert!(first.is_some());
        // Hammering the controls while submitting does nothing.
        assert!(
            s.apply(SessionEvent::User(UserAction::Approve))
                .unwrap()
                .is_none()
        );
        assert!(
            s.apply(SessionEvent::User(UserAction::Reject))
                .unwrap()
                .is_none()
        );
        assert_eq!(s.state(), SessionState::Submitting);
    }

    #[test]
    fn test_dispatch_completion_resolves() {
        let mut s = session();
        resolve_ready(&mut s);
        s.apply(SessionEvent::User(UserAction::Approve)).unwrap();

        s.apply(SessionEvent::DispatchCompleted(Ok(()))).unwrap();
        assert!(s.is_resolved());
        assert!(s.snapshot().dispatch_error.is_none());
    }

    #[test]
    fn test_dispatch_failure_still_resolves() {
        let mut s = session();
        resolve_ready(&mut s);
        s.apply(SessionEvent::User(UserAction::Approve)).unwrap();

        s.apply(SessionEvent::DispatchCompleted(Err(DispatchError::new(
            "signer offline",
        ))))
        .unwrap();
        assert!(s.is_resolved());
        assert_eq!(
            s.snapshot().dispatch_error.as_deref(),
            Some("signer offline")
        );
    }

    #[test]
    fn test_dispatch_completed_outside_submitting_is_invalid() {
        let mut s = session();
        resolve_ready(&mut s);

        let err = s
            .apply(SessionEvent::DispatchCompleted(Ok(())))
            .unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidTransition { .. }));
    }

    #[test]
    fn test_user_input_after_resolution_is_dropped() {
        let mut s = session();
        resolve_ready(&mut s);
        s.apply(SessionEvent::User(UserAction::Reject)).unwrap();
        s.apply(SessionEvent::DispatchCompleted(Ok(()))).unwrap();

        assert!(
            s.apply(SessionEvent::User(UserAction::Approve))
                .unwrap()
                .is_none()
        );
        assert!(s.is_resolved());
    }

    // -----------------------------------------------------------------------
    // Analysis reset (inputs changed)
    // -----------------------------------------------------------------------

    #[test]
    fn test_reset_returns_to_awaiting_and_clears_result() {
        let mut s = session();
        resolve_ready(&mut s);

        s.apply(SessionEvent::AnalysisReset).unwrap();
        assert_eq!(s.state(), SessionState::AwaitingAnalysis);
        assert!(s.analysis().is_pending());
        assert!(s.controls_disabled());
    }

    #[test]
    fn test_reset_hides_confirmation() {
        let mut s = session();
        resolve_failed(&mut s);
        s.apply(SessionEvent::User(UserAction::Approve)).unwrap();
        assert!(s.confirmation_visible());

        s.apply(SessionEvent::AnalysisReset).unwrap();
        assert!(!s.confirmation_visible());
        assert_eq!(s.state(), SessionState::AwaitingAnalysis);
    }

    #[test]
    fn test_reset_ignored_while_submitting() {
        let mut s = session();
        resolve_ready(&mut s);
        s.apply(SessionEvent::User(UserAction::Approve)).unwrap();

        s.apply(SessionEvent::AnalysisReset).unwrap();
        assert_eq!(s.state(), SessionState::Submitting);
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    #[test]
    fn test_closed_session_accepts_nothing() {
        let mut s = session();
        resolve_ready(&mut s);
        s.close();

        let err = s
            .apply(SessionEvent::User(UserAction::Approve))
            .unwrap_err();
        assert!(matches!(err, ApprovalError::SessionClosed));
        assert!(!s.dispatched());
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    #[test]
    fn test_snapshot_reflects_state() {
        let mut s = session();
        start(&mut s);
        let snap = s.snapshot();
        assert_eq!(snap.state, SessionState::AwaitingAnalysis);
        assert!(snap.controls_disabled);
        assert!(snap.analysis.is_pending());
        assert!(!snap.confirmation_visible);
    }
}

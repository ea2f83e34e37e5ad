//! The session driver.
//!
//! [`SessionRunner`] is the single logical event loop around the pure
//! [`ApprovalSession`] state machine. It feeds the machine analyzer updates
//! and user commands, executes its effects (the dispatcher call), shows the
//! risk prompt when the machine asks for confirmation, and publishes
//! [`SessionSnapshot`]s on a watch channel for thin UI consumers.
//!
//! The only suspension points are the simulator call (inside the spawned
//! analysis task), the dispatcher call, and the confirmation prompt (in its
//! own spawned task, so teardown and analysis resets can preempt it); every
//! state transition itself is synchronous and runs to completion.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, trace};
use txgate_core::{Address, SigningHandle};

use crate::analysis::{
    AnalysisFailure, AnalysisResult, AnalysisUpdate, Simulator, TransactionAnalyzer,
};
use crate::config::SessionConfig;
use crate::dispatch::SubmissionDispatcher;
use crate::error::{ApprovalError, ApprovalResult};
use crate::materialize::{MaterializedTransaction, TransactionMaterializer};
use crate::request::TransactionApprovalRequest;
use crate::session::{ApprovalSession, Effect, SessionEvent, SessionState, UserAction};
use crate::surface::{ConfirmationPrompt, RiskAcknowledgement, SessionSnapshot};

/// Commands the primary approval surface may send into the session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// The user approved the transaction.
    Approve,
    /// The user rejected the transaction.
    Reject,
    /// The resolved sender changed; re-materialize and re-analyze.
    SetSender(Address),
    /// Tear the session down without a decision.
    Close,
}

/// The primary approval surface contract handed to the UI collaborator.
///
/// Exposes the approve/reject actions and, via [`snapshot`](Self::snapshot)
/// or the watch channel, the derived `controls_disabled` flag. The UI must
/// not invoke [`approve`](Self::approve) while that flag is true; the state
/// machine drops such events regardless, so a race cannot cause an unsafe
/// submission.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Approve the transaction.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::ChannelClosed`] if the session is gone.
    pub async fn approve(&self) -> ApprovalResult<()> {
        self.send(SessionCommand::Approve).await
    }

    /// Reject the transaction.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::ChannelClosed`] if the session is gone.
    pub async fn reject(&self) -> ApprovalResult<()> {
        self.send(SessionCommand::Reject).await
    }

    /// Change the resolved sender, discarding any in-flight analysis.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::ChannelClosed`] if the session is gone.
    pub async fn set_sender(&self, sender: Address) -> ApprovalResult<()> {
        self.send(SessionCommand::SetSender(sender)).await
    }

    /// Tear the session down; no decision will be dispatched after this.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::ChannelClosed`] if the session is gone.
    pub async fn close(&self) -> ApprovalResult<()> {
        self.send(SessionCommand::Close).await
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A watch receiver for observing snapshot updates.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    async fn send(&self, command: SessionCommand) -> ApprovalResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ApprovalError::ChannelClosed)
    }
}

/// A risk-prompt answer tagged with the prompt generation that asked for it.
struct PromptAck {
    generation: u64,
    ack: RiskAcknowledgement,
}

/// Event loop driving one approval session to resolution.
pub struct SessionRunner {
    session: ApprovalSession,
    materializer: TransactionMaterializer,
    analyzer: TransactionAnalyzer,
    dispatcher: Arc<dyn SubmissionDispatcher>,
    prompt: Arc<dyn ConfirmationPrompt>,
    config: SessionConfig,
    sender: Address,
    tx: Arc<MaterializedTransaction>,
    commands: mpsc::Receiver<SessionCommand>,
    updates: mpsc::Receiver<AnalysisUpdate>,
    acks_tx: mpsc::Sender<PromptAck>,
    acks: mpsc::Receiver<PromptAck>,
    prompt_generation: u64,
    snapshots: watch::Sender<SessionSnapshot>,
    deadline: Option<Instant>,
}

impl SessionRunner {
    /// Set up a session for `request`, materializing its payload eagerly.
    ///
    /// The sender used for materialization and analysis is the request's
    /// account when present, otherwise the signer's account.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::MalformedPayload`] if the payload cannot be decoded
    /// — fatal for the request; the caller should reject it outright rather
    /// than retry.
    pub fn new(
        request: TransactionApprovalRequest,
        signer: SigningHandle,
        simulator: Arc<dyn Simulator>,
        dispatcher: Arc<dyn SubmissionDispatcher>,
        prompt: Arc<dyn ConfirmationPrompt>,
        config: SessionConfig,
    ) -> ApprovalResult<(Self, SessionHandle)> {
        let sender = request
            .account
            .clone()
            .unwrap_or_else(|| signer.account().clone());

        let materializer = TransactionMaterializer::new();
        let tx = materializer.materialize(&request.payload, Some(&sender))?;

        let (command_tx, command_rx) = mpsc::channel(config.channel_capacity);
        let (update_tx, update_rx) = mpsc::channel(config.channel_capacity);
        let (ack_tx, ack_rx) = mpsc::channel(config.channel_capacity);
        let analyzer = TransactionAnalyzer::new(simulator, update_tx);

        let session = ApprovalSession::new(request, signer);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        let runner = Self {
            session,
            materializer,
            analyzer,
            dispatcher,
            prompt,
            config,
            sender,
            tx,
            commands: command_rx,
            updates: update_rx,
            acks_tx: ack_tx,
            acks: ack_rx,
            prompt_generation: 0,
            snapshots: snapshot_tx,
            deadline: None,
        };
        let handle = SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        };
        Ok((runner, handle))
    }

    /// Drive the session until it resolves or is torn down, returning the
    /// final snapshot.
    ///
    /// # Errors
    ///
    /// Propagates state-machine invariant violations; these indicate a bug,
    /// not a user-facing condition.
    pub async fn run(mut self) -> ApprovalResult<SessionSnapshot> {
        self.step(SessionEvent::AnalysisStarted).await?;
        self.analyzer.submit(&self.sender, &self.tx);
        self.arm_deadline();

        while !self.session.is_resolved() {
            let awaiting = self.session.state() == SessionState::AwaitingAnalysis;
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Approve) => {
                        self.step(SessionEvent::User(UserAction::Approve)).await?;
                    }
                    Some(SessionCommand::Reject) => {
                        self.step(SessionEvent::User(UserAction::Reject)).await?;
                    }
                    Some(SessionCommand::SetSender(sender)) => {
                        self.change_sender(sender).await?;
                    }
                    Some(SessionCommand::Close) | None => {
                        debug!(request = %self.session.request().id, "session torn down");
                        self.session.close();
                        break;
                    }
                },
                update = self.updates.recv() => {
                    let Some(update) = update else { break };
                    if self.analyzer.is_current(&update) {
                        self.deadline = None;
                        self.step(SessionEvent::AnalysisOutcome(update.outcome)).await?;
                    } else {
                        trace!(
                            stale = update.generation,
                            current = self.analyzer.generation(),
                            "superseded analysis result discarded",
                        );
                    }
                },
                ack = self.acks.recv() => {
                    let Some(PromptAck { generation, ack }) = ack else { break };
                    let current = generation == self.prompt_generation;
                    if current && self.session.confirmation_visible() {
                        let action = match ack {
                            RiskAcknowledgement::Accepted => UserAction::ConfirmRisk,
                            RiskAcknowledgement::Declined => UserAction::DeclineRisk,
                        };
                        self.step(SessionEvent::User(action)).await?;
                    } else {
                        trace!(generation, "superseded risk acknowledgement discarded");
                    }
                },
                () = Self::sleep_until(self.deadline), if awaiting && self.deadline.is_some() => {
                    self.deadline = None;
                    self.step(SessionEvent::AnalysisOutcome(Err(AnalysisFailure::Service {
                        reason: "analysis timed out".to_string(),
                    })))
                    .await?;
                },
            }
        }

        Ok(self.session.snapshot())
    }

    /// Apply an event, then execute whatever it demands: a dispatch becomes
    /// a dispatcher call whose completion feeds back in, and a newly visible
    /// confirmation starts the prompt task.
    async fn step(&mut self, event: SessionEvent) -> ApprovalResult<()> {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            let was_visible = self.session.confirmation_visible();
            let effect = self.session.apply(event)?;
            self.publish();

            if let Some(Effect::Dispatch(decision)) = effect {
                debug!(%decision, "dispatching decision");
                let result = self.dispatcher.dispatch(decision).await;
                next = Some(SessionEvent::DispatchCompleted(result));
                continue;
            }

            if !was_visible
                && self.session.confirmation_visible()
                && let AnalysisResult::Failed(failure) = self.session.analysis().clone()
            {
                self.show_prompt(failure);
            }
        }
        Ok(())
    }

    /// Run the risk prompt as its own task so a teardown or analysis reset
    /// can preempt it. The answer comes back through the ack channel tagged
    /// with the prompt generation; an answer to a prompt that is no longer
    /// showing (or no longer current) is discarded, never acted on.
    fn show_prompt(&mut self, failure: AnalysisFailure) {
        self.prompt_generation = self.prompt_generation.wrapping_add(1);
        let generation = self.prompt_generation;
        let prompt = Arc::clone(&self.prompt);
        let request = self.session.request().clone();
        let acks = self.acks_tx.clone();
        tokio::spawn(async move {
            let ack = prompt.confirm_risk(&request, &failure).await;
            // Receiver gone means the session ended; nothing to do.
            let _ = acks.send(PromptAck { generation, ack }).await;
        });
    }

    async fn change_sender(&mut self, sender: Address) -> ApprovalResult<()> {
        if sender == self.sender {
            return Ok(());
        }
        if matches!(
            self.session.state(),
            SessionState::Submitting | SessionState::Resolved
        ) {
            trace!(state = %self.session.state(), "sender change after decision dropped");
            return Ok(());
        }

        self.sender = sender;
        self.tx = self
            .materializer
            .materialize(&self.session.request().payload, Some(&self.sender))?;
        self.step(SessionEvent::AnalysisReset).await?;
        self.analyzer.submit(&self.sender, &self.tx);
        self.arm_deadline();
        Ok(())
    }

    fn arm_deadline(&mut self) {
        self.deadline = self
            .config
            .analysis_timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }

    async fn sleep_until(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

impl std::fmt::Debug for SessionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRunner")
            .field("state", &self.session.state())
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

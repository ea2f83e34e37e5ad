//! Mock implementations of the workflow's external collaborators.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use txgate_approval::analysis::{SimulationReport, Simulator, SimulatorError};
use txgate_approval::dispatch::{Decision, DispatchError, SubmissionDispatcher};
use txgate_approval::materialize::MaterializedTransaction;
use txgate_approval::request::TransactionApprovalRequest;
use txgate_approval::surface::{ConfirmationPrompt, RiskAcknowledgement};
use txgate_core::Address;

use crate::fixtures::ok_report;

/// Releases one gated mock call per [`release`](Self::release) call.
#[derive(Debug, Clone)]
pub struct MockGate(Arc<Semaphore>);

impl MockGate {
    fn new() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    /// Allow one pending (or future) gated call to proceed.
    pub fn release(&self) {
        self.0.add_permits(1);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.0.acquire().await {
            permit.forget();
        }
    }
}

/// Mock [`Simulator`] with scripted reports.
///
/// Reports are returned in FIFO order; when the script runs out, a clean
/// [`ok_report`] is returned. A gated simulator blocks each call until the
/// gate is released, which lets tests hold analysis in the pending state.
#[derive(Debug)]
pub struct MockSimulator {
    reports: Arc<Mutex<VecDeque<Result<SimulationReport, SimulatorError>>>>,
    gate: Option<MockGate>,
}

impl MockSimulator {
    /// Create an ungated mock that answers with [`ok_report`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: Arc::new(Mutex::new(VecDeque::new())),
            gate: None,
        }
    }

    /// Queue a scripted report.
    #[must_use]
    pub fn with_report(self, report: Result<SimulationReport, SimulatorError>) -> Self {
        if let Ok(mut guard) = self.reports.lock() {
            guard.push_back(report);
        }
        self
    }

    /// Gate every simulation on an explicit [`MockGate::release`].
    #[must_use]
    pub fn gated(mut self) -> Self {
        self.gate = Some(MockGate::new());
        self
    }

    /// The gate for a [`gated`](Self::gated) simulator.
    ///
    /// # Panics
    ///
    /// Panics if the simulator is not gated.
    #[must_use]
    pub fn gate(&self) -> MockGate {
        match &self.gate {
            Some(gate) => gate.clone(),
            None => panic!("MockSimulator::gate() on an ungated simulator"),
        }
    }
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Simulator for MockSimulator {
    async fn simulate(
        &self,
        _sender: &Address,
        _tx: &MaterializedTransaction,
    ) -> Result<SimulationReport, SimulatorError> {
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        let scripted = self.reports.lock().ok().and_then(|mut g| g.pop_front());
        scripted.unwrap_or_else(|| Ok(ok_report()))
    }
}

/// Mock [`SubmissionDispatcher`] that records every decision it receives.
#[derive(Debug, Default)]
pub struct MockDispatcher {
    dispatched: Arc<Mutex<Vec<Decision>>>,
    failures: Arc<Mutex<VecDeque<DispatchError>>>,
}

impl MockDispatcher {
    /// Create a dispatcher that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a scripted dispatch failure.
    #[must_use]
    pub fn with_failure(self, reason: impl Into<String>) -> Self {
        if let Ok(mut guard) = self.failures.lock() {
            guard.push_back(DispatchError::new(reason));
        }
        self
    }

    /// Every decision dispatched so far, in order.
    #[must_use]
    pub fn dispatched(&self) -> Vec<Decision> {
        self.dispatched
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SubmissionDispatcher for MockDispatcher {
    async fn dispatch(&self, decision: Decision) -> Result<(), DispatchError> {
        if let Ok(mut guard) = self.dispatched.lock() {
            guard.push(decision);
        }
        match self.failures.lock().ok().and_then(|mut g| g.pop_front()) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// Mock [`ConfirmationPrompt`] with scripted acknowledgements.
///
/// Answers are returned in FIFO order; an empty script declines, which is
/// the safe default for tests that never expect the prompt. A gated prompt
/// stays open until the gate is released, which lets tests act while the
/// warning is showing.
#[derive(Debug, Default)]
pub struct MockPrompt {
    acks: Arc<Mutex<VecDeque<RiskAcknowledgement>>>,
    invocations: AtomicUsize,
    gate: Option<MockGate>,
}

impl MockPrompt {
    /// Create a prompt that declines by default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a scripted acknowledgement.
    #[must_use]
    pub fn with_ack(self, ack: RiskAcknowledgement) -> Self {
        if let Ok(mut guard) = self.acks.lock() {
            guard.push_back(ack);
        }
        self
    }

    /// Hold every prompt open until an explicit [`MockGate::release`].
    #[must_use]
    pub fn gated(mut self) -> Self {
        self.gate = Some(MockGate::new());
        self
    }

    /// The gate for a [`gated`](Self::gated) prompt.
    ///
    /// # Panics
    ///
    /// Panics if the prompt is not gated.
    #[must_use]
    pub fn gate(&self) -> MockGate {
        match &self.gate {
            Some(gate) => gate.clone(),
            None => panic!("MockPrompt::gate() on an ungated prompt"),
        }
    }

    /// How many times the prompt was shown.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmationPrompt for MockPrompt {
    async fn confirm_risk(
        &self,
        _request: &TransactionApprovalRequest,
        _failure: &txgate_approval::analysis::AnalysisFailure,
    ) -> RiskAcknowledgement {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        self.acks
            .lock()
            .ok()
            .and_then(|mut g| g.pop_front())
            .unwrap_or(RiskAcknowledgement::Declined)
    }
}

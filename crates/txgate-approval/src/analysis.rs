//! Asynchronous transaction analysis.
//!
//! The [`TransactionAnalyzer`] drives a black-box [`Simulator`] to derive
//! cost and validity facts about a materialized transaction. Results are
//! tri-state ([`AnalysisResult`]): `Pending` the instant the inputs change,
//! then exactly one of `Ready` or `Failed`.
//!
//! Cancellation is handled with a generation counter: every submission gets
//! the next generation number, and an outcome is only accepted if its
//! generation is still current. A superseded outcome is silently discarded,
//! never delivered late.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use txgate_core::Address;

use crate::materialize::MaterializedTransaction;

/// What the simulation engine reports for a candidate transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Whether the transaction would succeed on-chain.
    pub would_succeed: bool,
    /// Gas the simulation consumed.
    pub gas_used: u64,
    /// Gas budget the simulation settled on.
    pub gas_budget: u64,
    /// Failure detail when `would_succeed` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Error from the simulation service itself (network, RPC, etc.).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("simulator error: {reason}")]
pub struct SimulatorError {
    /// What went wrong.
    pub reason: String,
}

impl SimulatorError {
    /// Create a simulator error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Black-box transaction simulation engine.
///
/// The workflow only needs one operation: estimate the outcome and cost of
/// a materialized transaction for a given sender.
#[async_trait]
pub trait Simulator: Send + Sync {
    /// Simulate `tx` as sent by `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError`] when the computation itself fails; a
    /// transaction that simulates cleanly but *would not succeed on-chain*
    /// is reported through [`SimulationReport::would_succeed`] instead.
    async fn simulate(
        &self,
        sender: &Address,
        tx: &MaterializedTransaction,
    ) -> Result<SimulationReport, SimulatorError>;
}

/// Facts derived from a successful simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisData {
    /// Estimated gas consumption.
    pub gas_used: u64,
    /// Gas budget for submission.
    pub gas_budget: u64,
}

/// Why analysis failed.
///
/// Both variants require the secondary confirmation gate before an approval
/// may proceed; the distinction is only surfaced for presentation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AnalysisFailure {
    /// The simulation ran, and reports the transaction would fail on-chain.
    #[error("transaction would fail on-chain: {reason}")]
    Simulation {
        /// Failure detail from the simulation.
        reason: String,
    },
    /// The simulation service itself failed.
    #[error("simulation unavailable: {reason}")]
    Service {
        /// What went wrong.
        reason: String,
    },
}

/// Tri-state analysis outcome, owned by the analyzer and consumed read-only
/// by the session state machine.
///
/// Transitions strictly `Pending` → `Ready`/`Failed`; a new materialized
/// transaction resets it to `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AnalysisResult {
    /// Analysis is outstanding; no decision may be acted on yet.
    Pending,
    /// Simulation completed cleanly.
    Ready(AnalysisData),
    /// Simulation failed or reported the transaction would fail.
    Failed(AnalysisFailure),
}

impl AnalysisResult {
    /// Whether analysis is still outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether analysis completed cleanly.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Whether analysis resolved to failure.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// An analysis outcome tagged with the generation that produced it.
#[derive(Debug, Clone)]
pub struct AnalysisUpdate {
    /// Generation token of the submission that produced this outcome.
    pub generation: u64,
    /// The outcome itself.
    pub outcome: Result<AnalysisData, AnalysisFailure>,
}

/// Drives the [`Simulator`] and delivers generation-tagged outcomes over an
/// mpsc channel.
///
/// Re-invoked only when `(sender, materialized-tx identity)` changes;
/// resubmitting identical inputs is a no-op.
pub struct TransactionAnalyzer {
    simulator: Arc<dyn Simulator>,
    updates: mpsc::Sender<AnalysisUpdate>,
    generation: u64,
    current: Option<(Address, Arc<MaterializedTransaction>)>,
}

impl TransactionAnalyzer {
    /// Create an analyzer that reports outcomes on `updates`.
    #[must_use]
    pub fn new(simulator: Arc<dyn Simulator>, updates: mpsc::Sender<AnalysisUpdate>) -> Self {
        Self {
            simulator,
            updates,
            generation: 0,
            current: None,
        }
    }

    /// Start (or restart) analysis for `(sender, tx)`.
    ///
    /// Returns `false` without doing anything if the inputs are identical to
    /// the current submission — memoization on input identity. Otherwise the
    /// generation advances (implicitly discarding any in-flight computation)
    /// and a new simulation is spawned.
    pub fn submit(&mut self, sender: &Address, tx: &Arc<MaterializedTransaction>) -> bool {
        if let Some((cur_sender, cur_tx)) = &self.current
            && cur_sender == sender
            && Arc::ptr_eq(cur_tx, tx)
        {
            trace!(generation = self.generation, "analysis inputs unchanged");
            return false;
        }

        self.generation = self.generation.wrapping_add(1);
        self.current = Some((sender.clone(), Arc::clone(tx)));

        let generation = self.generation;
        let simulator = Arc::clone(&self.simulator);
        let updates = self.updates.clone();
        let sender = sender.clone();
        let tx = Arc::clone(tx);

        debug!(generation, %sender, "starting transaction analysis");
        tokio::spawn(async move {
            let outcome = match simulator.simulate(&sender, &tx).await {
                Ok(report) if report.would_succeed => Ok(AnalysisData {
                    gas_used: report.gas_used,
                    gas_budget: report.gas_budget,
                }),
                Ok(report) => Err(AnalysisFailure::Simulation {
                    reason: report
                        .failure_reason
                        .unwrap_or_else(|| "transaction would fail on-chain".to_string()),
                }),
                Err(e) => Err(AnalysisFailure::Service { reason: e.reason }),
            };
            // Receiver gone means the session was torn down; nothing to do.
            let _ = updates.send(AnalysisUpdate { generation, outcome }).await;
        });
        true
    }

    /// Whether an update belongs to the current generation.
    ///
    /// Stale updates must be discarded by the caller without delivery.
    #[must_use]
    pub fn is_current(&self, update: &AnalysisUpdate) -> bool {
        update.generation == self.generation
    }

    /// The current generation token.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for TransactionAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionAnalyzer")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

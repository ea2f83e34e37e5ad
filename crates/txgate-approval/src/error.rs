/// Errors that can occur in the approval workflow.
///
/// Note that a failed simulation is *not* an error: it is the regular
/// [`AnalysisResult::Failed`](crate::analysis::AnalysisResult) state value
/// consumed by the session state machine.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The raw transaction payload could not be decoded. Fatal for the
    /// request; surfaced immediately and never retried.
    #[error("malformed transaction payload: {reason}")]
    MalformedPayload {
        /// Why decoding failed.
        reason: String,
    },

    /// A second decision was about to be constructed for a request that
    /// already dispatched one. At-most-once dispatch is a hard invariant;
    /// hitting this is a programming error.
    #[error("decision already dispatched for {request_id}")]
    AlreadyDispatched {
        /// The request whose decision was already dispatched.
        request_id: txgate_core::RequestId,
    },

    /// An event was applied that the current state can never accept.
    #[error("invalid transition: {event} in state {state}")]
    InvalidTransition {
        /// The state the session was in.
        state: &'static str,
        /// The event that was applied.
        event: &'static str,
    },

    /// The session was torn down; no further events are accepted and no
    /// decision may be dispatched.
    #[error("approval session closed")]
    SessionClosed,

    /// An internal channel closed unexpectedly.
    #[error("session channel closed")]
    ChannelClosed,
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;

use thiserror::Error;

/// Orchestrator-surfaced error kinds (spec.md §7). Agents never throw past
/// their own boundary — every variant here is something only the
/// orchestrator itself, or the hash chain, can produce.
#[derive(Debug, Error)]
pub enum TriageError {
    /// Malformed or empty required field, reported to the caller and never
    /// retried. The boundary translates this to HTTP 400.
    #[error("input error: {0}")]
    InputError(String),
    /// Timeout exhaustion across all retry attempts, or a soft-failure
    /// marker containing "circuit_breaker" that propagated without being
    /// retried. Increments the circuit breaker's failure counter.
    #[error("agent hard failure in {0}: {1}")]
    AgentHardFailure(String, String),
    /// The circuit breaker is open; this triage failed fast without
    /// running any agent. The boundary translates this to HTTP 503.
    #[error("circuit breaker is open")]
    CircuitOpen,
    /// Hash computation or audit append failure — fatal to this triage.
    #[error("audit integrity error: {0}")]
    AuditIntegrityError(String),
    /// The caller's deadline elapsed (or the token was cancelled)
    /// cooperatively between retry/step boundaries; partial results are
    /// discarded, matching "never a partial payload" (spec.md §8).
    #[error("triage run was cancelled")]
    Cancelled,
}

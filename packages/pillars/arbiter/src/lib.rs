//! Risk scoring, the circuit breaker, and the triage orchestrator that
//! sequences all five agents (spec.md §4.6, §4.9).

mod circuit_breaker;
mod error;
mod orchestrator;
mod risk_scorer;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use error::TriageError;
pub use orchestrator::Orchestrator;
pub use risk_scorer::{Features, RiskModel, RiskScorerAgent};

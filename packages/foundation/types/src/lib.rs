//! Shared domain model for the case triage orchestration core.
//!
//! Every pillar crate (gate, arbiter, nexus, synapse, governance) depends on
//! this crate so that `Case`, `AgentResult`, `Team`, `Config`, and
//! `FinalDecision` have exactly one definition instead of five slightly
//! different ones (Design Note: "cyclic references between agents and the
//! registry are broken by passing only prior AgentResults to later agents").

mod audit;
mod case;
mod config;
mod decision;
pub mod keywords;
mod result;
mod team;

pub use audit::AuditEntry;
pub use case::{AttachmentRef, Case, CaseType, MetadataValue, Urgency};
pub use config::Config;
pub use decision::{AgentSummary, FinalDecision};
pub use result::{
    AgentResult, ClassificationResult, ComplianceResult, DecisionSupportResult, Direction,
    FeatureContribution, RiskLevel, RiskScoreResult, RoutingResult,
};
pub use team::Team;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::AgentSummary;

/// One link in the tamper-evident audit chain (spec.md §4.10). The struct
/// lives here because it crosses crate boundaries (compliance produces it,
/// the orchestrator and the HTTP boundary read it); the hashing and
/// chain-append logic that constructs one lives in
/// `agentkern-governance::audit::ledger`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: String,
    pub timestamp: DateTime<Utc>,
    pub case_id: String,
    pub agent_summaries: Vec<AgentSummary>,
    pub pii_detected: bool,
    pub pii_types: Vec<String>,
    /// 64 lowercase hex chars, or empty for the genesis entry of a chain.
    pub previous_hash: String,
    pub current_hash: String,
    pub retention_deadline: DateTime<Utc>,
}

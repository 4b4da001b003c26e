use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::{CaseType, RiskLevel, Urgency};

/// One agent's contribution, as carried in `FinalDecision.agent_summaries`
/// and `AuditEntry.agent_summaries` — enough to audit what ran without
/// duplicating full per-agent payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_name: String,
    pub confidence: f64,
    pub processing_time_ms: u64,
}

/// The orchestrator's final, assembled output for one triage run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalDecision {
    pub case_id: String,
    pub case_type: CaseType,
    pub urgency: Urgency,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub recommended_team: String,
    pub sla_target_hours: u32,
    pub escalation_flag: bool,
    pub suggested_actions: Vec<String>,
    pub template_response: String,
    pub pii_detected: bool,
    pub overall_confidence: f64,
    pub audit_id: String,
    pub agent_summaries: Vec<AgentSummary>,
    pub decided_at: DateTime<Utc>,
}

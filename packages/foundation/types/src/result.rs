use serde::{Deserialize, Serialize};

use crate::case::{CaseType, RiskLevel, Urgency};

/// Common envelope every agent's output carries, regardless of payload.
/// Mirrors `backend/data/schemas.py::AgentResult` in the original source:
/// `agent_name`, `confidence`, the component-specific `result`, `reasoning`,
/// `processing_time_ms`, and an optional `error` marker for soft failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult<T> {
    pub agent_name: String,
    pub confidence: f64,
    pub result: T,
    pub reasoning: String,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> AgentResult<T> {
    pub fn new(
        agent_name: impl Into<String>,
        confidence: f64,
        result: T,
        reasoning: impl Into<String>,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            result,
            reasoning: reasoning.into(),
            processing_time_ms,
            error: None,
        }
    }

    /// A soft failure: the agent caught an internal error and collapsed to
    /// its documented safe default. The step still counts as a successful
    /// orchestrator step, just at lowered confidence (§7, "Agent soft
    /// failure").
    pub fn soft_failure(
        agent_name: impl Into<String>,
        result: T,
        reasoning: impl Into<String>,
        processing_time_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            confidence: 0.5,
            result,
            reasoning: reasoning.into(),
            processing_time_ms,
            error: Some(error.into()),
        }
    }

    pub fn is_soft_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub case_type: CaseType,
    pub urgency: Urgency,
    pub confidence: f64,
    pub reasoning: String,
    pub missing_fields: Vec<String>,
}

/// Sign of a feature's contribution to the risk score, used in the
/// top-feature explanation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub importance: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScoreResult {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub rationale: String,
    pub top_features: Vec<FeatureContribution>,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingResult {
    pub recommended_team: String,
    pub sla_target_hours: u32,
    pub escalation_flag: bool,
    pub confidence: f64,
    pub reasoning: String,
    pub policy_applied: String,
    pub alternative_routes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionSupportResult {
    pub suggested_actions: Vec<String>,
    pub template_response: String,
    pub checklist: Vec<String>,
    pub knowledge_sources: Vec<String>,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub pii_detected: bool,
    pub pii_types: Vec<String>,
    pub redacted_content: crate::case::Case,
    pub audit_id: String,
    pub compliance_issues: Vec<String>,
    pub confidence: f64,
    pub reasoning: String,
}

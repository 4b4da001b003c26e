use std::time::Instant;

use chrono::{Duration, Utc};
use uuid::Uuid;

use agentkern_types::{
    AgentResult, AgentSummary, Case, CaseType, ComplianceResult, Config, MetadataValue,
};

use crate::audit::{AuditChain, DataClass};
use crate::pii::redact_text;

/// Per-case-type required fields, carried over from
/// `backend/agents/compliance.py`'s literal table (spec.md's distillation
/// only says "missing case-type-specific required fields" generically; the
/// original names the fields, and Non-goals don't exclude it, so we keep
/// the literal table per SPEC_FULL.md §4.8). The original's dict has no
/// `fraud_review` entry — its lookup is a `.get(case_type, [])`, so
/// fraud_review cases never raise a missing-field issue there, reproduced
/// here as an empty slice rather than an invented requirement.
fn required_fields(case_type: CaseType) -> &'static [&'static str] {
    match case_type {
        CaseType::InsuranceClaim => &["customer_id", "amount", "description"],
        CaseType::HealthcarePriorAuth => &["patient_id", "provider", "treatment"],
        CaseType::BankDispute => &["account_number", "transaction_id", "amount"],
        CaseType::LegalIntake => &["client_name", "case_type", "description"],
        CaseType::FraudReview => &[],
    }
}

/// Keywords that, if present anywhere in the case's combined text, flag a
/// `compliance_issues` entry regardless of case type.
const SENSITIVE_KEYWORDS: &[&str] = &[
    "whistleblower",
    "discrimination",
    "harassment",
    "bankruptcy",
    "class action",
    "regulatory investigation",
];

fn field_present(case: &Case, field: &str) -> bool {
    match field {
        "customer_id" => case.customer_id.is_some(),
        "amount" => case.amount.is_some(),
        "description" => !case.description.trim().is_empty(),
        "case_type" => case.case_type_hint.is_some(),
        _ => case.metadata.contains_key(field),
    }
}

/// Deep-copies `case` with every PII match in `title`, `description`, and
/// string metadata values replaced by its redaction token. Non-string
/// metadata values are left untouched (spec.md §4.8).
fn redact_case(case: &Case) -> (Case, bool, Vec<String>) {
    let mut redacted = case.clone();
    let mut all_types = std::collections::BTreeSet::new();

    let (title, types) = redact_text(&redacted.title);
    redacted.title = title;
    all_types.extend(types);

    let (description, types) = redact_text(&redacted.description);
    redacted.description = description;
    all_types.extend(types);

    for value in redacted.metadata.values_mut() {
        if let MetadataValue::String(s) = value {
            let (red, types) = redact_text(s);
            *s = red;
            all_types.extend(types);
        }
    }

    let pii_detected = !all_types.is_empty();
    let pii_types: Vec<String> = all_types.into_iter().map(str::to_string).collect();
    (redacted, pii_detected, pii_types)
}

/// The compliance agent: PII detect/redact plus audit-entry construction.
/// Holds a reference to the process's single `AuditChain` so consecutive
/// triage runs link into one chain (spec.md §4.10).
pub struct ComplianceAgent<'a> {
    chain: &'a AuditChain,
}

impl<'a> ComplianceAgent<'a> {
    pub fn new(chain: &'a AuditChain) -> Self {
        Self { chain }
    }

    /// Analyzes `case` given the case type determined upstream and the
    /// summaries of every agent that ran before compliance in this triage
    /// (classifier, risk scorer, router, decision support). Never panics —
    /// any internal failure is caught by the orchestrator's retry wrapper,
    /// not produced here, since this agent has no fallible external call.
    pub fn analyze(
        &self,
        case: &Case,
        case_type: CaseType,
        prior_summaries: &[AgentSummary],
        config: &Config,
    ) -> AgentResult<ComplianceResult> {
        let start = Instant::now();

        let (redacted_content, pii_detected, pii_types) = if config.pii_detection_enabled {
            redact_case(case)
        } else {
            (case.clone(), false, Vec::new())
        };

        let mut issues = Vec::new();

        for field in required_fields(case_type) {
            if !field_present(case, field) {
                issues.push(format!("missing_required_field:{field}"));
            }
        }

        let text = case.text_corpus();
        for keyword in SENSITIVE_KEYWORDS {
            if text.contains(keyword) {
                issues.push(format!("sensitive_keyword:{keyword}"));
            }
        }

        for summary in prior_summaries {
            if summary.confidence < 0.7 {
                issues.push(format!("low_confidence_agent:{}", summary.agent_name));
            }
        }

        let retention_window = Duration::days(config.audit_log_retention_days);
        if Utc::now() - case.submitted_at > retention_window {
            issues.push("case_data_exceeds_retention_window".to_string());
        }

        let mut confidence = 0.8;
        if pii_detected {
            confidence -= 0.1;
        }
        confidence -= 0.05 * issues.len() as f64;
        let confidence = confidence.clamp(0.0, 1.0);

        let mut all_summaries = prior_summaries.to_vec();
        all_summaries.push(AgentSummary {
            agent_name: "ComplianceAgent".to_string(),
            confidence,
            processing_time_ms: start.elapsed().as_millis() as u64,
        });

        let audit_id = Uuid::new_v4().to_string();
        let entry = self.chain.append(
            audit_id.clone(),
            Utc::now(),
            case.id.clone(),
            all_summaries,
            pii_detected,
            pii_types.clone(),
            DataClass::CaseData,
        );

        let reasoning = if pii_detected {
            format!(
                "detected {} PII type(s); {} compliance issue(s) flagged",
                pii_types.len(),
                issues.len()
            )
        } else {
            format!("no PII detected; {} compliance issue(s) flagged", issues.len())
        };

        AgentResult::new(
            "ComplianceAgent",
            confidence,
            ComplianceResult {
                pii_detected,
                pii_types,
                redacted_content,
                audit_id: entry.audit_id,
                compliance_issues: issues,
                confidence,
                reasoning: reasoning.clone(),
            },
            reasoning,
            start.elapsed().as_millis() as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_case() -> Case {
        Case {
            id: "case-1".to_string(),
            title: "Emergency pre-authorization".to_string(),
            description: "Cardiac surgery required; patient SSN 123-45-6789".to_string(),
            customer_id: None,
            amount: None,
            metadata: HashMap::from([(
                "email".to_string(),
                MetadataValue::String("lee@example.org".to_string()),
            )]),
            attachments: vec![],
            case_type_hint: None,
            urgency_hint: None,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn detects_pii_and_redacts() {
        let chain = AuditChain::new();
        let agent = ComplianceAgent::new(&chain);
        let config = Config::default();
        let result = agent.analyze(&base_case(), CaseType::HealthcarePriorAuth, &[], &config);
        assert!(result.result.pii_detected);
        assert!(result.result.pii_types.contains(&"ssn".to_string()));
        assert!(result.result.redacted_content.description.contains("[SSN_REDACTED]"));
        assert!(!result.result.redacted_content.description.contains("123-45-6789"));
    }

    #[test]
    fn flags_low_confidence_agents() {
        let chain = AuditChain::new();
        let agent = ComplianceAgent::new(&chain);
        let config = Config::default();
        let summaries = vec![AgentSummary {
            agent_name: "RiskScorerAgent".to_string(),
            confidence: 0.5,
            processing_time_ms: 1,
        }];
        let result = agent.analyze(&base_case(), CaseType::HealthcarePriorAuth, &summaries, &config);
        assert!(result
            .result
            .compliance_issues
            .iter()
            .any(|i| i.starts_with("low_confidence_agent")));
    }

    #[test]
    fn audit_entries_chain_across_calls() {
        let chain = AuditChain::new();
        let agent = ComplianceAgent::new(&chain);
        let config = Config::default();
        agent.analyze(&base_case(), CaseType::HealthcarePriorAuth, &[], &config);
        agent.analyze(&base_case(), CaseType::HealthcarePriorAuth, &[], &config);
        let entries = chain.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].previous_hash, entries[0].current_hash);
    }
}

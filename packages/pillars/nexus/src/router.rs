use std::time::Instant;

use agentkern_gate::PolicyEvaluatorClient;
use agentkern_treasury::TeamLedger;
use agentkern_types::{
    keywords, Case, CaseType, ClassificationResult, RiskLevel, RiskScoreResult, RoutingResult,
};
use tokio_util::sync::CancellationToken;

use crate::catalogue::{self, alternatives_for};

const AT_CAPACITY_THRESHOLD: f64 = 0.9;
const ALTERNATIVE_ACCEPT_THRESHOLD: f64 = 0.8;

struct BuiltinDecision {
    team: String,
    sla_target_hours: u32,
    escalation_flag: bool,
    policy_applied: String,
}

/// Routes a classified, scored case to a team. Tries the external policy
/// evaluator first, falls through to built-in priority rules, then a
/// capacity check with ordered alternatives. Grounded in
/// `backend/agents/router.py::RouterAgent`.
pub struct RouterAgent<'a> {
    policy_client: Option<&'a PolicyEvaluatorClient>,
    ledger: &'a TeamLedger,
}

impl<'a> RouterAgent<'a> {
    pub fn new(ledger: &'a TeamLedger) -> Self {
        Self { policy_client: None, ledger }
    }

    pub fn with_policy_client(mut self, client: &'a PolicyEvaluatorClient) -> Self {
        self.policy_client = Some(client);
        self
    }

    pub async fn route(
        &self,
        case: &Case,
        classification: &ClassificationResult,
        risk: &RiskScoreResult,
    ) -> agentkern_types::AgentResult<RoutingResult> {
        self.route_cancellable(case, classification, risk, None).await
    }

    /// Same as [`route`](Self::route) but races the policy evaluator call
    /// against `cancel` when one is supplied — cancellation propagates
    /// cooperatively "inside the policy evaluator call" (spec.md §5).
    pub async fn route_cancellable(
        &self,
        case: &Case,
        classification: &ClassificationResult,
        risk: &RiskScoreResult,
        cancel: Option<&CancellationToken>,
    ) -> agentkern_types::AgentResult<RoutingResult> {
        let start = Instant::now();
        let decision = self.route_inner(case, classification, risk, cancel).await;
        let elapsed = start.elapsed().as_millis() as u64;

        match decision {
            Ok((result, confidence)) => {
                let reasoning = result.reasoning.clone();
                agentkern_types::AgentResult::new("RouterAgent", confidence, result, reasoning, elapsed)
            }
            Err(reason) => agentkern_types::AgentResult::soft_failure(
                "RouterAgent",
                RoutingResult {
                    recommended_team: "Tier-2".to_string(),
                    sla_target_hours: 72,
                    escalation_flag: false,
                    confidence: 0.5,
                    reasoning: format!("Routing failed: {reason}"),
                    policy_applied: "default".to_string(),
                    alternative_routes: vec!["Tier-1".to_string(), "Specialist".to_string()],
                },
                format!("Routing failed: {reason}"),
                elapsed,
                reason,
            ),
        }
    }

    async fn route_inner(
        &self,
        case: &Case,
        classification: &ClassificationResult,
        risk: &RiskScoreResult,
        cancel: Option<&CancellationToken>,
    ) -> Result<(RoutingResult, f64), String> {
        let teams = catalogue::default_teams();
        let team_names: Vec<&str> = teams.iter().map(|t| t.name.as_str()).collect();

        let policy_decision = match self.policy_client {
            Some(client) => {
                let input = build_policy_input(case, classification, risk, &teams);
                let outcome = match cancel {
                    Some(token) => client.evaluate_cancellable("routing/decision", input, None, token).await,
                    None => client.evaluate("routing/decision", input, None).await,
                };
                match outcome {
                    Ok(decision) => extract_policy_team(&decision.result, &team_names),
                    Err(_) => None,
                }
            }
            None => None,
        };

        let (team, sla_target_hours, escalation_flag, confidence, policy_applied) =
            match policy_decision {
                Some(d) => (d.team, d.sla_target_hours, d.escalation_flag, 0.95, d.policy_applied),
                None => {
                    let builtin = apply_builtin_rules(case, classification, risk);
                    (builtin.team, builtin.sla_target_hours, builtin.escalation_flag, 0.9, builtin.policy_applied)
                }
            };

        let alternative_routes = alternative_routes_for(classification.case_type, risk.risk_level, &teams);

        let (final_team, final_sla, final_confidence, reasoning) =
            self.apply_capacity_check(&team, sla_target_hours, confidence, &teams);

        Ok((
            RoutingResult {
                recommended_team: final_team,
                sla_target_hours: final_sla,
                escalation_flag,
                confidence: final_confidence,
                reasoning,
                policy_applied,
                alternative_routes,
            },
            final_confidence,
        ))
    }

    /// Reroutes to the first alternative under 80% capacity when the chosen
    /// team is at or above 90% capacity; falls back to Tier-2 if none
    /// qualify. Consults `TeamLedger` snapshots rather than the static
    /// catalogue, so a caller-preloaded load (spec.md §8 scenario 4) is
    /// honored.
    fn apply_capacity_check(
        &self,
        team: &str,
        sla_target_hours: u32,
        confidence: f64,
        catalogue: &[agentkern_types::Team],
    ) -> (String, u32, f64, String) {
        let live = self.ledger.get(team).or_else(|| catalogue.iter().find(|t| t.name == team).cloned());
        let Some(live) = live else {
            return ("Tier-2".to_string(), 72, confidence * 0.8, format!("Team {team} not found, routed to Tier-2"));
        };

        if live.utilization() < AT_CAPACITY_THRESHOLD {
            return (team.to_string(), sla_target_hours, confidence, format!("Routed to {team}"));
        }

        for alt_name in alternatives_for(team) {
            let alt = self.ledger.get(alt_name).or_else(|| catalogue.iter().find(|t| &t.name == alt_name).cloned());
            if let Some(alt) = alt {
                if alt.utilization() < ALTERNATIVE_ACCEPT_THRESHOLD {
                    return (
                        alt.name.clone(),
                        alt.sla_target_hours,
                        confidence * 0.9,
                        format!("Team {team} at capacity, routed to {}", alt.name),
                    );
                }
            }
        }

        ("Tier-2".to_string(), 72, confidence * 0.9, format!("Team {team} at capacity, routed to Tier-2"))
    }
}

struct PolicyTeamDecision {
    team: String,
    sla_target_hours: u32,
    escalation_flag: bool,
    policy_applied: String,
}

fn extract_policy_team(result: &serde_json::Value, known_teams: &[&str]) -> Option<PolicyTeamDecision> {
    let team = result.get("team")?.as_str()?;
    if !known_teams.contains(&team) {
        return None;
    }
    Some(PolicyTeamDecision {
        team: team.to_string(),
        sla_target_hours: result
            .get("sla_hours")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(72),
        escalation_flag: result.get("escalation").and_then(|v| v.as_bool()).unwrap_or(false),
        policy_applied: result
            .get("policy")
            .and_then(|v| v.as_str())
            .unwrap_or("opa_policy")
            .to_string(),
    })
}

fn build_policy_input(
    case: &Case,
    classification: &ClassificationResult,
    risk: &RiskScoreResult,
    teams: &[agentkern_types::Team],
) -> serde_json::Value {
    serde_json::json!({
        "case": {
            "id": case.id,
            "title": case.title,
            "description": case.description,
            "case_type": classification.case_type,
            "urgency": classification.urgency,
            "risk_level": risk.risk_level,
            "risk_score": risk.risk_score,
            "amount": case.amount,
            "customer_id": case.customer_id,
            "missing_fields": classification.missing_fields,
        },
        "teams": teams,
    })
}

/// Built-in priority-ordered rules; first match wins (spec.md §4.6).
fn apply_builtin_rules(
    case: &Case,
    classification: &ClassificationResult,
    risk: &RiskScoreResult,
) -> BuiltinDecision {
    if matches!(risk.risk_level, RiskLevel::High | RiskLevel::Extreme) {
        return BuiltinDecision {
            team: "Escalation".to_string(),
            sla_target_hours: 4,
            escalation_flag: true,
            policy_applied: "high_risk_escalation".to_string(),
        };
    }

    let has_fraud_indicators = keywords::count_matches(&case.text_corpus(), keywords::FRAUD_INDICATORS) > 0;
    if classification.case_type == CaseType::FraudReview || has_fraud_indicators {
        return BuiltinDecision {
            team: "Fraud-Review".to_string(),
            sla_target_hours: 24,
            escalation_flag: false,
            policy_applied: "fraud_review".to_string(),
        };
    }

    if classification.case_type == CaseType::LegalIntake {
        return BuiltinDecision {
            team: "Specialist".to_string(),
            sla_target_hours: 48,
            escalation_flag: false,
            policy_applied: "legal_cases".to_string(),
        };
    }

    use agentkern_types::Urgency;
    if matches!(classification.urgency, Urgency::Critical | Urgency::High) {
        return BuiltinDecision {
            team: "Tier-1".to_string(),
            sla_target_hours: 2,
            escalation_flag: false,
            policy_applied: "urgent_cases".to_string(),
        };
    }

    BuiltinDecision {
        team: "Tier-2".to_string(),
        sla_target_hours: 72,
        escalation_flag: false,
        policy_applied: "standard_processing".to_string(),
    }
}

fn alternative_routes_for(
    case_type: CaseType,
    risk_level: RiskLevel,
    teams: &[agentkern_types::Team],
) -> Vec<String> {
    teams
        .iter()
        .filter(|t| t.accepted_types.contains(&case_type) && t.max_risk_level >= risk_level)
        .map(|t| t.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkern_types::Urgency;
    use std::collections::HashMap;

    fn case() -> Case {
        Case {
            id: "case-1".to_string(),
            title: "Dispute".to_string(),
            description: "Routine billing question".to_string(),
            customer_id: Some("cust-1".to_string()),
            amount: Some(100.0),
            metadata: HashMap::new(),
            attachments: vec![],
            case_type_hint: None,
            urgency_hint: None,
            submitted_at: chrono::Utc::now(),
        }
    }

    fn classification(case_type: CaseType, urgency: Urgency) -> ClassificationResult {
        ClassificationResult {
            case_type,
            urgency,
            confidence: 0.8,
            reasoning: String::new(),
            missing_fields: vec![],
        }
    }

    fn risk(level: RiskLevel) -> RiskScoreResult {
        RiskScoreResult {
            risk_score: 0.1,
            risk_level: level,
            confidence: 0.8,
            rationale: String::new(),
            top_features: vec![],
            risk_factors: vec![],
        }
    }

    #[tokio::test]
    async fn high_risk_escalates() {
        let ledger = TeamLedger::new(catalogue::default_teams());
        let agent = RouterAgent::new(&ledger);
        let result = agent
            .route(&case(), &classification(CaseType::InsuranceClaim, Urgency::Medium), &risk(RiskLevel::High))
            .await;
        assert_eq!(result.result.recommended_team, "Escalation");
        assert!(result.result.escalation_flag);
    }

    #[tokio::test]
    async fn standard_case_routes_to_tier_2() {
        let ledger = TeamLedger::new(catalogue::default_teams());
        let agent = RouterAgent::new(&ledger);
        let result = agent
            .route(&case(), &classification(CaseType::InsuranceClaim, Urgency::Low), &risk(RiskLevel::Low))
            .await;
        assert_eq!(result.result.recommended_team, "Tier-2");
    }

    #[tokio::test]
    async fn at_capacity_team_reroutes_to_alternative() {
        let ledger = TeamLedger::new(catalogue::default_teams());
        ledger.set_load("Tier-1", 95).unwrap();
        let agent = RouterAgent::new(&ledger);
        let result = agent
            .route(&case(), &classification(CaseType::InsuranceClaim, Urgency::High), &risk(RiskLevel::Low))
            .await;
        assert_ne!(result.result.recommended_team, "Tier-1");
        assert!(result.result.confidence < 0.9);
    }
}

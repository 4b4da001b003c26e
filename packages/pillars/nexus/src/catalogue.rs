use agentkern_types::{CaseType, RiskLevel, Team};

/// Default team catalogue (spec.md §4.6), in priority-stable order. Callers
/// that need capacity tracking wrap this in an
/// `agentkern_treasury::TeamLedger`.
pub fn default_teams() -> Vec<Team> {
    use CaseType::*;
    vec![
        Team {
            name: "Tier-1".to_string(),
            accepted_types: vec![InsuranceClaim, HealthcarePriorAuth, BankDispute],
            max_risk_level: RiskLevel::High,
            capacity: 100,
            current_load: 0,
            sla_target_hours: 2,
        },
        Team {
            name: "Tier-2".to_string(),
            accepted_types: vec![InsuranceClaim, HealthcarePriorAuth],
            max_risk_level: RiskLevel::Medium,
            capacity: 200,
            current_load: 0,
            sla_target_hours: 72,
        },
        Team {
            name: "Specialist".to_string(),
            accepted_types: vec![LegalIntake, FraudReview, HealthcarePriorAuth],
            max_risk_level: RiskLevel::Extreme,
            capacity: 50,
            current_load: 0,
            sla_target_hours: 48,
        },
        Team {
            name: "Fraud-Review".to_string(),
            accepted_types: vec![FraudReview, BankDispute],
            max_risk_level: RiskLevel::Extreme,
            capacity: 30,
            current_load: 0,
            sla_target_hours: 24,
        },
        Team {
            name: "Escalation".to_string(),
            accepted_types: vec![InsuranceClaim, HealthcarePriorAuth, BankDispute, LegalIntake],
            max_risk_level: RiskLevel::Extreme,
            capacity: 20,
            current_load: 0,
            sla_target_hours: 4,
        },
    ]
}

/// Ordered alternative-team priority list consulted when the chosen team is
/// at or above 90% capacity. Declared constants, matching
/// `RouterAgent._find_alternative_team` in the original source.
pub fn alternatives_for(team: &str) -> &'static [&'static str] {
    match team {
        "Tier-1" => &["Tier-2", "Specialist"],
        "Tier-2" => &["Tier-1", "Specialist"],
        "Specialist" => &["Tier-1", "Tier-2"],
        "Fraud-Review" => &["Specialist", "Escalation"],
        "Escalation" => &["Specialist", "Tier-1"],
        _ => &["Tier-2"],
    }
}
